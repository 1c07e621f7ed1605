//! Repository layer for database operations

pub mod loans;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        book::{CopyAvailability, CopyRef},
        loan::{Loan, LoanFilter, LoanRecord, NewLoan},
    },
};

/// Persistence operations the loans service relies on.
///
/// Conditional writes return `false` when the row was not in the expected
/// state, which means another request changed it first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// Check that the store is reachable
    async fn ping(&self) -> AppResult<()>;

    async fn get(&self, id: i64) -> AppResult<Option<LoanRecord>>;

    /// Loans matching the filter, with the total count ignoring pagination
    async fn list(&self, filter: &LoanFilter) -> AppResult<(Vec<LoanRecord>, i64)>;

    async fn find_copy(&self, copy: &CopyRef) -> AppResult<Option<CopyAvailability>>;

    async fn reader_exists(&self, reader_id: i64) -> AppResult<bool>;

    /// Create a BORROWED loan and flag the copy as borrowed
    async fn insert(&self, loan: &NewLoan) -> AppResult<i64>;

    /// Persist a returned loan and release its copy
    async fn mark_returned(&self, loan: &Loan) -> AppResult<bool>;

    /// Persist the fine of an OVERDUE loan
    async fn record_fine(&self, loan: &Loan) -> AppResult<bool>;

    /// Promote every BORROWED loan due before `now` to OVERDUE
    async fn mark_overdue(&self, now: DateTime<Utc>) -> AppResult<u64>;

    async fn record_reminder(&self, id: i64, at: DateTime<Utc>) -> AppResult<()>;

    /// IDs of loans whose stored status is OVERDUE
    async fn overdue_ids(&self) -> AppResult<Vec<i64>>;
}

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub loans: loans::LoansRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            loans: loans::LoansRepository::new(pool.clone()),
            pool,
        }
    }
}
