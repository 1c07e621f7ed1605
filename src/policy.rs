//! Borrowing policy: overdue status, overdue days, fines and legal loan
//! transitions.
//!
//! Everything here is a pure function of its inputs. The current time is
//! always passed in by the caller, never read from the system clock.

use chrono::{DateTime, Duration, Utc};

use crate::{
    error::{LoanAction, PolicyError},
    models::loan::{Loan, LoanStatus},
};

/// Daily fine applied when no rate is configured, in VND
pub const DEFAULT_DAILY_FINE_RATE: i64 = 10_000;

/// Lending period applied when none is configured, in days
pub const DEFAULT_LOAN_PERIOD_DAYS: i64 = 14;

/// `true` iff the loan has not been returned and `now` is past its due date.
pub fn is_overdue(loan: &Loan, now: DateTime<Utc>) -> bool {
    loan.returned_at.is_none() && now > loan.due_date
}

/// Whole days past the due date, any started day counting as a full one.
///
/// Returns 0 when the loan is not overdue.
pub fn overdue_days(loan: &Loan, now: DateTime<Utc>) -> i64 {
    if !is_overdue(loan, now) {
        return 0;
    }
    let late = now - loan.due_date;
    let days = late.num_days();
    // Exact remainder, so sub-millisecond lateness still starts a day
    if late > Duration::days(days) {
        days + 1
    } else {
        days
    }
}

/// Advisory fine for the loan at `now`: overdue days times `daily_rate`.
///
/// This is not the recorded `fine_amount`, which only changes when staff
/// settle a fine. `daily_rate` is expected to be non-negative.
pub fn compute_fine(loan: &Loan, now: DateTime<Utc>, daily_rate: i64) -> i64 {
    overdue_days(loan, now).saturating_mul(daily_rate)
}

pub fn can_return(loan: &Loan) -> bool {
    matches!(loan.status, LoanStatus::Borrowed | LoanStatus::Overdue)
}

/// Return the loan at `returned_at`.
pub fn apply_return(loan: &Loan, returned_at: DateTime<Utc>) -> Result<Loan, PolicyError> {
    if !can_return(loan) {
        return Err(PolicyError::InvalidTransition {
            action: LoanAction::Return,
            status: loan.status,
        });
    }
    if returned_at < loan.borrowed_at {
        return Err(PolicyError::InvalidTimestamp(format!(
            "return date {} precedes borrow date {}",
            returned_at, loan.borrowed_at
        )));
    }

    Ok(Loan {
        status: LoanStatus::Returned,
        returned_at: Some(returned_at),
        ..loan.clone()
    })
}

pub fn can_settle_fine(loan: &Loan) -> bool {
    loan.status == LoanStatus::Overdue
}

/// Record `amount` as the loan's fine. The status stays OVERDUE; returning
/// the copy is a separate action.
pub fn apply_fine(loan: &Loan, amount: i64) -> Result<Loan, PolicyError> {
    if !can_settle_fine(loan) {
        return Err(PolicyError::InvalidTransition {
            action: LoanAction::SettleFine,
            status: loan.status,
        });
    }
    if amount < 0 {
        return Err(PolicyError::InvalidAmount(amount));
    }

    Ok(Loan {
        fine_amount: amount,
        ..loan.clone()
    })
}

pub fn can_mark_overdue(loan: &Loan, now: DateTime<Utc>) -> bool {
    loan.status == LoanStatus::Borrowed && is_overdue(loan, now)
}

/// Promote a BORROWED loan whose due date has passed to OVERDUE.
pub fn apply_overdue(loan: &Loan, now: DateTime<Utc>) -> Result<Loan, PolicyError> {
    if !can_mark_overdue(loan, now) {
        return Err(PolicyError::InvalidTransition {
            action: LoanAction::MarkOverdue,
            status: loan.status,
        });
    }

    Ok(Loan {
        status: LoanStatus::Overdue,
        ..loan.clone()
    })
}

/// Reminders go to loans that are still out and late, whether the lateness
/// is already recorded or only derived from the due date.
pub fn can_remind(loan: &Loan, now: DateTime<Utc>) -> bool {
    loan.status == LoanStatus::Overdue || is_overdue(loan, now)
}

/// Configured policy values, validated once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorrowingPolicy {
    daily_fine_rate: i64,
    loan_period: Duration,
}

impl BorrowingPolicy {
    pub fn new(daily_fine_rate: i64, loan_period_days: i64) -> Result<Self, PolicyError> {
        if daily_fine_rate < 0 {
            return Err(PolicyError::InvalidAmount(daily_fine_rate));
        }
        if loan_period_days <= 0 {
            return Err(PolicyError::InvalidTimestamp(format!(
                "loan period must be at least one day, got {}",
                loan_period_days
            )));
        }

        Ok(Self {
            daily_fine_rate,
            loan_period: Duration::days(loan_period_days),
        })
    }

    pub fn daily_fine_rate(&self) -> i64 {
        self.daily_fine_rate
    }

    pub fn loan_period(&self) -> Duration {
        self.loan_period
    }

    /// Due date of a loan borrowed at `borrowed_at`
    pub fn due_date_for(&self, borrowed_at: DateTime<Utc>) -> DateTime<Utc> {
        borrowed_at + self.loan_period
    }

    /// [`compute_fine`] at the configured rate
    pub fn fine(&self, loan: &Loan, now: DateTime<Utc>) -> i64 {
        compute_fine(loan, now, self.daily_fine_rate)
    }
}

impl Default for BorrowingPolicy {
    fn default() -> Self {
        Self {
            daily_fine_rate: DEFAULT_DAILY_FINE_RATE,
            loan_period: Duration::days(DEFAULT_LOAN_PERIOD_DAYS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn loan(status: LoanStatus, due: DateTime<Utc>, returned_at: Option<DateTime<Utc>>) -> Loan {
        Loan {
            id: 1,
            book_copy_id: 10,
            reader_id: 100,
            borrowed_at: due - Duration::days(14),
            due_date: due,
            returned_at,
            status,
            fine_amount: 0,
        }
    }

    fn borrowed(due: DateTime<Utc>) -> Loan {
        loan(LoanStatus::Borrowed, due, None)
    }

    #[test]
    fn test_not_overdue_before_or_at_due_date() {
        let due = ts(2024, 1, 10, 0, 0, 0);
        let l = borrowed(due);
        for now in [due - Duration::days(3), due - Duration::milliseconds(1), due] {
            assert!(!is_overdue(&l, now));
            assert_eq!(overdue_days(&l, now), 0);
            assert_eq!(compute_fine(&l, now, DEFAULT_DAILY_FINE_RATE), 0);
        }
    }

    #[test]
    fn test_partial_day_counts_as_full_day() {
        let l = borrowed(ts(2024, 1, 10, 0, 0, 0));
        assert_eq!(overdue_days(&l, ts(2024, 1, 10, 0, 0, 1)), 1);
        assert_eq!(overdue_days(&l, ts(2024, 1, 11, 0, 0, 0)), 1);
        assert_eq!(overdue_days(&l, ts(2024, 1, 11, 0, 0, 1)), 2);
    }

    #[test]
    fn test_one_day_and_one_millisecond_is_two_days() {
        let due = ts(2024, 1, 10, 0, 0, 0);
        let l = borrowed(due);
        let now = due + Duration::days(1) + Duration::milliseconds(1);
        assert_eq!(overdue_days(&l, now), 2);
    }

    #[test]
    fn test_sub_millisecond_lateness_is_one_day() {
        let due = ts(2024, 1, 10, 0, 0, 0);
        let l = borrowed(due);
        let now = due + Duration::microseconds(500);
        assert!(is_overdue(&l, now));
        assert_eq!(overdue_days(&l, now), 1);
        assert_eq!(compute_fine(&l, now, DEFAULT_DAILY_FINE_RATE), 10_000);
        assert_eq!(overdue_days(&l, due + Duration::nanoseconds(1)), 1);
    }

    #[test]
    fn test_returned_loan_is_never_overdue() {
        let due = ts(2024, 3, 15, 0, 0, 0);
        let l = loan(LoanStatus::Returned, due, Some(ts(2024, 3, 18, 0, 0, 0)));
        for now in [due, ts(2024, 3, 20, 0, 0, 0), ts(2030, 1, 1, 0, 0, 0)] {
            assert!(!is_overdue(&l, now));
            assert_eq!(overdue_days(&l, now), 0);
            assert_eq!(compute_fine(&l, now, DEFAULT_DAILY_FINE_RATE), 0);
        }
    }

    #[test]
    fn test_fine_is_days_times_rate() {
        let due = ts(2024, 3, 15, 0, 0, 0);
        let l = borrowed(due);
        let now = ts(2024, 3, 20, 0, 0, 0);
        assert_eq!(overdue_days(&l, now), 5);
        assert_eq!(compute_fine(&l, now, 10_000), 50_000);
        assert_eq!(compute_fine(&l, now, 2_500), 5 * 2_500);
        assert_eq!(compute_fine(&l, now, 0), 0);
    }

    #[test]
    fn test_calculations_are_repeatable() {
        let l = borrowed(ts(2024, 3, 15, 0, 0, 0));
        let now = ts(2024, 4, 2, 13, 45, 0);
        assert_eq!(is_overdue(&l, now), is_overdue(&l, now));
        assert_eq!(overdue_days(&l, now), overdue_days(&l, now));
        assert_eq!(compute_fine(&l, now, 10_000), compute_fine(&l, now, 10_000));
    }

    #[test]
    fn test_fine_does_not_overflow() {
        let l = borrowed(ts(2024, 3, 15, 0, 0, 0));
        assert_eq!(compute_fine(&l, ts(2024, 3, 20, 0, 0, 0), i64::MAX), i64::MAX);
    }

    #[test]
    fn test_return_borrowed_and_overdue() {
        let due = ts(2024, 3, 15, 0, 0, 0);
        let returned_at = ts(2024, 3, 18, 9, 0, 0);
        for status in [LoanStatus::Borrowed, LoanStatus::Overdue] {
            let l = loan(status, due, None);
            assert!(can_return(&l));
            let returned = apply_return(&l, returned_at).unwrap();
            assert_eq!(returned.status, LoanStatus::Returned);
            assert_eq!(returned.returned_at, Some(returned_at));
            assert_eq!(returned.due_date, l.due_date);
            assert_eq!(returned.borrowed_at, l.borrowed_at);
        }
    }

    #[test]
    fn test_return_twice_is_invalid_transition() {
        let due = ts(2024, 3, 15, 0, 0, 0);
        let l = loan(LoanStatus::Returned, due, Some(ts(2024, 3, 10, 0, 0, 0)));
        assert!(!can_return(&l));
        let err = apply_return(&l, ts(2024, 3, 20, 0, 0, 0)).unwrap_err();
        assert_eq!(
            err,
            PolicyError::InvalidTransition {
                action: LoanAction::Return,
                status: LoanStatus::Returned,
            }
        );
    }

    #[test]
    fn test_return_before_borrow_is_invalid_timestamp() {
        let l = borrowed(ts(2024, 3, 15, 0, 0, 0));
        let err = apply_return(&l, l.borrowed_at - Duration::seconds(1)).unwrap_err();
        assert!(matches!(err, PolicyError::InvalidTimestamp(_)));

        assert!(apply_return(&l, l.borrowed_at).is_ok());
    }

    #[test]
    fn test_fine_only_while_overdue() {
        let due = ts(2024, 3, 15, 0, 0, 0);
        let b = borrowed(due);
        assert!(!can_settle_fine(&b));
        assert_eq!(
            apply_fine(&b, 50_000).unwrap_err(),
            PolicyError::InvalidTransition {
                action: LoanAction::SettleFine,
                status: LoanStatus::Borrowed,
            }
        );

        let r = loan(LoanStatus::Returned, due, Some(ts(2024, 3, 18, 0, 0, 0)));
        assert!(apply_fine(&r, 50_000).is_err());
    }

    #[test]
    fn test_fine_keeps_overdue_status_and_repeats() {
        let o = loan(LoanStatus::Overdue, ts(2024, 3, 15, 0, 0, 0), None);
        let fined = apply_fine(&o, 50_000).unwrap();
        assert_eq!(fined.status, LoanStatus::Overdue);
        assert_eq!(fined.fine_amount, 50_000);

        let refined = apply_fine(&fined, 30_000).unwrap();
        assert_eq!(refined.fine_amount, 30_000);
        assert_eq!(refined.status, LoanStatus::Overdue);
    }

    #[test]
    fn test_negative_fine_is_invalid_amount() {
        let o = loan(LoanStatus::Overdue, ts(2024, 3, 15, 0, 0, 0), None);
        assert_eq!(apply_fine(&o, -1).unwrap_err(), PolicyError::InvalidAmount(-1));
        assert_eq!(apply_fine(&o, 0).unwrap().fine_amount, 0);
    }

    #[test]
    fn test_mark_overdue_requires_borrowed_and_late() {
        let due = ts(2024, 3, 15, 0, 0, 0);
        let b = borrowed(due);
        assert!(apply_overdue(&b, due).is_err());

        let late = ts(2024, 3, 16, 0, 0, 0);
        assert_eq!(apply_overdue(&b, late).unwrap().status, LoanStatus::Overdue);

        let o = loan(LoanStatus::Overdue, due, None);
        assert!(!can_mark_overdue(&o, late));
    }

    #[test]
    fn test_can_remind() {
        let due = ts(2024, 3, 15, 0, 0, 0);
        let b = borrowed(due);
        assert!(!can_remind(&b, due));
        assert!(can_remind(&b, ts(2024, 3, 16, 0, 0, 0)));

        let o = loan(LoanStatus::Overdue, due, None);
        assert!(can_remind(&o, due - Duration::days(1)));

        let r = loan(LoanStatus::Returned, due, Some(ts(2024, 3, 18, 0, 0, 0)));
        assert!(!can_remind(&r, ts(2024, 3, 20, 0, 0, 0)));
    }

    #[test]
    fn test_policy_values() {
        let policy = BorrowingPolicy::default();
        let borrowed_at = ts(2024, 3, 1, 8, 30, 0);
        assert_eq!(policy.due_date_for(borrowed_at), ts(2024, 3, 15, 8, 30, 0));
        assert_eq!(policy.daily_fine_rate(), 10_000);

        let l = borrowed(ts(2024, 3, 15, 0, 0, 0));
        assert_eq!(policy.fine(&l, ts(2024, 3, 20, 0, 0, 0)), 50_000);
    }

    #[test]
    fn test_policy_rejects_bad_configuration() {
        assert_eq!(BorrowingPolicy::new(-1, 14).unwrap_err(), PolicyError::InvalidAmount(-1));
        assert!(BorrowingPolicy::new(10_000, 0).is_err());
        assert!(BorrowingPolicy::new(0, 7).is_ok());
    }
}
