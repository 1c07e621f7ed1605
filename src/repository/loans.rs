//! Borrowings repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{CopyAvailability, CopyRef, CopyStatus},
        loan::{Loan, LoanFilter, LoanRecord, LoanRow, LoanStatus, NewLoan},
    },
};

use super::LoanStore;

const LOAN_SELECT: &str = r#"
    SELECT b.id, b.book_copy_id, b.reader_id, b.borrowed_at, b.due_date,
           b.returned_at, b.status, b.fine_amount, b.last_reminded_at,
           bk.id AS book_id, bk.title AS book_title, bk.author AS book_author,
           bk.isbn AS book_isbn,
           c.qr_code, c.library, c.shelf_location, c.status AS copy_status,
           r.name AS reader_name, r.student_id, r.email AS reader_email,
           r.phone AS reader_phone, r.faculty, r.major, r.year, r.campus
    FROM borrowings b
    JOIN book_copies c ON c.id = b.book_copy_id
    JOIN books bk ON bk.id = c.book_id
    JOIN readers r ON r.id = b.reader_id
"#;

const LOAN_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR b.status = $1)
      AND ($2::text IS NULL
           OR r.name ILIKE $2
           OR r.student_id ILIKE $2
           OR bk.title ILIKE $2)
"#;

/// Turn free text into an ILIKE pattern, treating wildcards literally
fn search_pattern(search: &str) -> String {
    let escaped = search
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanStore for LoansRepository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get(&self, id: i64) -> AppResult<Option<LoanRecord>> {
        let row = sqlx::query_as::<_, LoanRow>(&format!("{} WHERE b.id = $1", LOAN_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(LoanRecord::try_from).transpose()
    }

    async fn list(&self, filter: &LoanFilter) -> AppResult<(Vec<LoanRecord>, i64)> {
        let status = filter.status.map(|s| s.as_str());
        let pattern = filter
            .search
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(search_pattern);

        let total: i64 = sqlx::query_scalar(&format!(
            r#"
            SELECT COUNT(*)
            FROM borrowings b
            JOIN book_copies c ON c.id = b.book_copy_id
            JOIN books bk ON bk.id = c.book_id
            JOIN readers r ON r.id = b.reader_id
            {}
            "#,
            LOAN_FILTER
        ))
        .bind(status)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, LoanRow>(&format!(
            "{} {} ORDER BY b.due_date, b.id LIMIT $3 OFFSET $4",
            LOAN_SELECT, LOAN_FILTER
        ))
        .bind(status)
        .bind(&pattern)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        let loans = rows
            .into_iter()
            .map(LoanRecord::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((loans, total))
    }

    async fn find_copy(&self, copy: &CopyRef) -> AppResult<Option<CopyAvailability>> {
        let row = match copy {
            CopyRef::QrCode(code) => {
                sqlx::query("SELECT id, status FROM book_copies WHERE qr_code = $1")
                    .bind(code)
                    .fetch_optional(&self.pool)
                    .await?
            }
            CopyRef::Id(id) => {
                sqlx::query("SELECT id, status FROM book_copies WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        row.map(|r| -> AppResult<CopyAvailability> {
            Ok(CopyAvailability {
                id: r.get("id"),
                status: r.get::<String, _>("status").parse::<CopyStatus>()?,
            })
        })
        .transpose()
    }

    async fn reader_exists(&self, reader_id: i64) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM readers WHERE id = $1)")
                .bind(reader_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn insert(&self, loan: &NewLoan) -> AppResult<i64> {
        let mut tx = self.pool.begin().await?;

        // Claim the copy first so two concurrent borrows cannot both succeed
        let claimed = sqlx::query(
            "UPDATE book_copies SET status = $2 WHERE id = $1 AND status = $3",
        )
        .bind(loan.book_copy_id)
        .bind(CopyStatus::Borrowed.as_str())
        .bind(CopyStatus::Available.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            return Err(AppError::Conflict(format!(
                "Book copy {} is no longer available",
                loan.book_copy_id
            )));
        }

        let loan_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO borrowings (book_copy_id, reader_id, borrowed_at, due_date, status, fine_amount)
            VALUES ($1, $2, $3, $4, $5, 0)
            RETURNING id
            "#,
        )
        .bind(loan.book_copy_id)
        .bind(loan.reader_id)
        .bind(loan.borrowed_at)
        .bind(loan.due_date)
        .bind(LoanStatus::Borrowed.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::Conflict(
                format!("Book copy {} already has an open loan", loan.book_copy_id),
            ),
            other => AppError::Database(other),
        })?;

        tx.commit().await?;

        Ok(loan_id)
    }

    async fn mark_returned(&self, loan: &Loan) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE borrowings
            SET status = $2, returned_at = $3
            WHERE id = $1 AND status <> $2
            "#,
        )
        .bind(loan.id)
        .bind(LoanStatus::Returned.as_str())
        .bind(loan.returned_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE book_copies SET status = $2 WHERE id = $1")
            .bind(loan.book_copy_id)
            .bind(CopyStatus::Available.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(true)
    }

    async fn record_fine(&self, loan: &Loan) -> AppResult<bool> {
        let updated = sqlx::query(
            "UPDATE borrowings SET fine_amount = $2 WHERE id = $1 AND status = $3",
        )
        .bind(loan.id)
        .bind(loan.fine_amount)
        .bind(LoanStatus::Overdue.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated == 1)
    }

    async fn mark_overdue(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let updated = sqlx::query(
            "UPDATE borrowings SET status = $1 WHERE status = $2 AND due_date < $3",
        )
        .bind(LoanStatus::Overdue.as_str())
        .bind(LoanStatus::Borrowed.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated)
    }

    async fn record_reminder(&self, id: i64, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE borrowings SET last_reminded_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn overdue_ids(&self) -> AppResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM borrowings WHERE status = $1 ORDER BY due_date, id",
        )
        .bind(LoanStatus::Overdue.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
