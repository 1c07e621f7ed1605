//! Loan management service

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Utc};
use validator::Validate;

use crate::{
    error::{AppError, AppResult, LoanAction, PolicyError},
    models::{
        book::CopyStatus,
        loan::{LoanDetails, LoanFilter, LoanRecord, NewLoan},
        requests::{
            BulkRemindOutcome, BulkRemindRequest, CreateLoanRequest, LoanQuery, RemindFailure,
            ReturnLoanRequest, SettleFineRequest,
        },
    },
    policy::{self, BorrowingPolicy},
    repository::LoanStore,
};

use super::{
    clock::Clock,
    email::{OverdueReminder, ReminderSender},
    inflight::{InFlight, InFlightGuard},
};

#[derive(Clone)]
pub struct LoansService {
    store: Arc<dyn LoanStore>,
    reminders: Arc<dyn ReminderSender>,
    policy: BorrowingPolicy,
    clock: Arc<dyn Clock>,
    inflight: InFlight,
}

impl LoansService {
    pub fn new(
        store: Arc<dyn LoanStore>,
        reminders: Arc<dyn ReminderSender>,
        policy: BorrowingPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            reminders,
            policy,
            clock,
            inflight: InFlight::new(),
        }
    }

    /// Check that the backing store answers
    pub async fn ready(&self) -> AppResult<()> {
        self.store.ping().await
    }

    /// Borrow a copy for a reader
    pub async fn borrow(&self, form: CreateLoanRequest) -> AppResult<LoanDetails> {
        form.validate()?;

        let copy_ref = form.copy_ref()?;

        let copy = self
            .store
            .find_copy(&copy_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book copy with {} not found", copy_ref)))?;

        if copy.status != CopyStatus::Available {
            return Err(AppError::BusinessRule(format!(
                "Book copy {} is not available (status {})",
                copy.id, copy.status
            )));
        }

        if !self.store.reader_exists(form.reader_id).await? {
            return Err(AppError::NotFound(format!(
                "Reader with id {} not found",
                form.reader_id
            )));
        }

        let now = self.clock.now();
        let new_loan = NewLoan {
            book_copy_id: copy.id,
            reader_id: form.reader_id,
            borrowed_at: now,
            due_date: self.policy.due_date_for(now),
        };

        let loan_id = self.store.insert(&new_loan).await?;
        tracing::info!(loan_id, book_copy_id = copy.id, reader_id = form.reader_id, "Loan created");

        self.get(loan_id).await
    }

    /// Get a loan with its live overdue figures
    pub async fn get(&self, loan_id: i64) -> AppResult<LoanDetails> {
        let record = self.fetch(loan_id).await?;
        Ok(self.details(record, self.clock.now()))
    }

    /// List loans with filters and pagination
    pub async fn list(&self, query: &LoanQuery) -> AppResult<(Vec<LoanDetails>, i64)> {
        query.validate()?;

        let filter = LoanFilter {
            status: query.status,
            search: query.search.clone(),
            limit: query.per_page(),
            offset: query.offset(),
        };

        let (records, total) = self.store.list(&filter).await?;
        let now = self.clock.now();
        let loans = records
            .into_iter()
            .map(|record| self.details(record, now))
            .collect();

        Ok((loans, total))
    }

    /// Return a borrowed copy
    pub async fn return_loan(&self, loan_id: i64, form: ReturnLoanRequest) -> AppResult<LoanDetails> {
        let _guard = self.acquire(loan_id)?;
        let mut record = self.fetch(loan_id).await?;
        let now = self.clock.now();

        let returned = policy::apply_return(&record.loan, form.returned_at.unwrap_or(now))?;

        if !self.store.mark_returned(&returned).await? {
            return Err(AppError::Conflict(format!(
                "Loan {} was returned by another request",
                loan_id
            )));
        }

        tracing::info!(loan_id, was = %record.loan.status, "Loan returned");

        record.loan = returned;
        record.book_copy.status = CopyStatus::Available;
        Ok(self.details(record, now))
    }

    /// Record the fine applied by staff to an overdue loan
    pub async fn settle_fine(&self, loan_id: i64, form: SettleFineRequest) -> AppResult<LoanDetails> {
        let _guard = self.acquire(loan_id)?;
        let mut record = self.fetch(loan_id).await?;

        let fined = policy::apply_fine(&record.loan, form.fine_amount)?;

        if !self.store.record_fine(&fined).await? {
            return Err(AppError::Conflict(format!(
                "Loan {} is no longer overdue",
                loan_id
            )));
        }

        tracing::info!(loan_id, fine_amount = fined.fine_amount, "Fine recorded");

        record.loan = fined;
        Ok(self.details(record, self.clock.now()))
    }

    /// Send an overdue reminder to the reader of one loan
    pub async fn remind(&self, loan_id: i64) -> AppResult<LoanDetails> {
        let _guard = self.acquire(loan_id)?;
        let record = self.fetch(loan_id).await?;
        let now = self.clock.now();

        let record = self.send_reminder(record, now).await?;
        Ok(self.details(record, now))
    }

    /// Send reminders for the given loans, or for every stored OVERDUE loan.
    ///
    /// Each loan is attempted independently; failures are reported in the
    /// outcome rather than aborting the run.
    pub async fn bulk_remind(&self, form: BulkRemindRequest) -> AppResult<BulkRemindOutcome> {
        form.validate()?;

        let mut loan_ids = match form.loan_ids {
            Some(ids) => ids,
            None => self.store.overdue_ids().await?,
        };
        // One reminder per loan, first occurrence wins
        let mut seen = HashSet::new();
        loan_ids.retain(|id| seen.insert(*id));

        let now = self.clock.now();
        let mut outcome = BulkRemindOutcome::default();

        for loan_id in loan_ids {
            let result = match self.acquire(loan_id) {
                Ok(_guard) => match self.fetch(loan_id).await {
                    Ok(record) => self.send_reminder(record, now).await.map(|_| ()),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => outcome.sent.push(loan_id),
                Err(e) => {
                    tracing::warn!(loan_id, error = %e, "Reminder not sent");
                    outcome.failed.push(RemindFailure {
                        loan_id,
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            sent = outcome.sent.len(),
            failed = outcome.failed.len(),
            "Bulk reminder run finished"
        );

        Ok(outcome)
    }

    /// Promote every BORROWED loan past its due date to OVERDUE
    pub async fn sync_overdue(&self) -> AppResult<u64> {
        let promoted = self.store.mark_overdue(self.clock.now()).await?;
        if promoted > 0 {
            tracing::info!(promoted, "Loans marked overdue");
        } else {
            tracing::debug!("No loans to mark overdue");
        }
        Ok(promoted)
    }

    async fn send_reminder(&self, mut record: LoanRecord, now: DateTime<Utc>) -> AppResult<LoanRecord> {
        let loan = &record.loan;
        if !policy::can_remind(loan, now) {
            return Err(PolicyError::InvalidTransition {
                action: LoanAction::Remind,
                status: loan.status,
            }
            .into());
        }

        let email = record.reader.email.clone().ok_or_else(|| {
            AppError::BusinessRule(format!(
                "Reader {} has no email address",
                record.reader.student_id
            ))
        })?;

        let reminder = OverdueReminder {
            loan_id: loan.id,
            reader_name: record.reader.name.clone(),
            email,
            book_title: record.book_copy.book.title.clone(),
            due_date: loan.due_date,
            overdue_days: policy::overdue_days(loan, now),
            fine: self.policy.fine(loan, now),
        };

        self.reminders.send_overdue_reminder(&reminder).await?;
        self.store.record_reminder(reminder.loan_id, now).await?;

        record.last_reminded_at = Some(now);
        Ok(record)
    }

    async fn fetch(&self, loan_id: i64) -> AppResult<LoanRecord> {
        self.store
            .get(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))
    }

    fn acquire(&self, loan_id: i64) -> AppResult<InFlightGuard> {
        self.inflight.try_acquire(loan_id).ok_or_else(|| {
            AppError::Conflict(format!(
                "An action on loan {} is already in progress",
                loan_id
            ))
        })
    }

    fn details(&self, record: LoanRecord, now: DateTime<Utc>) -> LoanDetails {
        let LoanRecord {
            loan,
            book_copy,
            reader,
            last_reminded_at,
        } = record;

        LoanDetails {
            borrow_id: loan.id,
            is_overdue: policy::is_overdue(&loan, now),
            overdue_days: policy::overdue_days(&loan, now),
            computed_fine: self.policy.fine(&loan, now),
            book_copy,
            reader,
            borrowed_at: loan.borrowed_at,
            due_date: loan.due_date,
            returned_at: loan.returned_at,
            status: loan.status,
            fine_amount: loan.fine_amount,
            last_reminded_at,
        }
    }
}
