//! Loan (borrowing) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::{AppError, PolicyError};

use super::book::{Book, BookCopy, CopyStatus};
use super::reader::Reader;

/// Status of a loan as stored by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Borrowed,
    Returned,
    Overdue,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Borrowed => "BORROWED",
            LoanStatus::Returned => "RETURNED",
            LoanStatus::Overdue => "OVERDUE",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BORROWED" => Ok(LoanStatus::Borrowed),
            "RETURNED" => Ok(LoanStatus::Returned),
            "OVERDUE" => Ok(LoanStatus::Overdue),
            other => Err(AppError::Internal(format!("Unknown loan status '{}'", other))),
        }
    }
}

/// A borrowing record: one book copy lent to one reader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: i64,
    pub book_copy_id: i64,
    pub reader_id: i64,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub fine_amount: i64,
}

impl Loan {
    /// Build a loan, checking the invariants that do not depend on the clock
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: i64,
        book_copy_id: i64,
        reader_id: i64,
        borrowed_at: DateTime<Utc>,
        due_date: DateTime<Utc>,
        returned_at: Option<DateTime<Utc>>,
        status: LoanStatus,
        fine_amount: i64,
    ) -> Result<Self, PolicyError> {
        if due_date <= borrowed_at {
            return Err(PolicyError::InvalidTimestamp(format!(
                "due date {} must be after borrow date {}",
                due_date, borrowed_at
            )));
        }
        match (status, returned_at) {
            (LoanStatus::Returned, None) => {
                return Err(PolicyError::InvalidTimestamp(
                    "returned loan has no return date".to_string(),
                ))
            }
            (LoanStatus::Borrowed | LoanStatus::Overdue, Some(at)) => {
                return Err(PolicyError::InvalidTimestamp(format!(
                    "loan with status {} has a return date {}",
                    status, at
                )))
            }
            _ => {}
        }
        if fine_amount < 0 {
            return Err(PolicyError::InvalidAmount(fine_amount));
        }

        Ok(Self {
            id,
            book_copy_id,
            reader_id,
            borrowed_at,
            due_date,
            returned_at,
            status,
            fine_amount,
        })
    }
}

/// A loan joined with the copy and reader it references
#[derive(Debug, Clone, PartialEq)]
pub struct LoanRecord {
    pub loan: Loan,
    pub book_copy: BookCopy,
    pub reader: Reader,
    pub last_reminded_at: Option<DateTime<Utc>>,
}

/// Flat row returned by the borrowing queries
#[derive(Debug, Clone, FromRow)]
pub struct LoanRow {
    pub id: i64,
    pub book_copy_id: i64,
    pub reader_id: i64,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: String,
    pub fine_amount: i64,
    pub last_reminded_at: Option<DateTime<Utc>>,
    pub book_id: i64,
    pub book_title: String,
    pub book_author: Option<String>,
    pub book_isbn: Option<String>,
    pub qr_code: String,
    pub library: String,
    pub shelf_location: Option<String>,
    pub copy_status: String,
    pub reader_name: String,
    pub student_id: String,
    pub reader_email: Option<String>,
    pub reader_phone: Option<String>,
    pub faculty: Option<String>,
    pub major: Option<String>,
    pub year: Option<i16>,
    pub campus: Option<String>,
}

impl TryFrom<LoanRow> for LoanRecord {
    type Error = AppError;

    fn try_from(row: LoanRow) -> Result<Self, Self::Error> {
        let loan = Loan::new(
            row.id,
            row.book_copy_id,
            row.reader_id,
            row.borrowed_at,
            row.due_date,
            row.returned_at,
            row.status.parse()?,
            row.fine_amount,
        )
        .map_err(|e| AppError::Internal(format!("Stored loan {} is inconsistent: {}", row.id, e)))?;

        Ok(LoanRecord {
            loan,
            book_copy: BookCopy {
                id: row.book_copy_id,
                book: Book {
                    id: row.book_id,
                    title: row.book_title,
                    author: row.book_author,
                    isbn: row.book_isbn,
                },
                qr_code: row.qr_code,
                library: row.library,
                shelf_location: row.shelf_location,
                status: row.copy_status.parse::<CopyStatus>()?,
            },
            reader: Reader {
                id: row.reader_id,
                name: row.reader_name,
                student_id: row.student_id,
                email: row.reader_email,
                phone: row.reader_phone,
                faculty: row.faculty,
                major: row.major,
                year: row.year,
                campus: row.campus,
            },
            last_reminded_at: row.last_reminded_at,
        })
    }
}

/// Loan as exposed to API clients, with live overdue figures
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoanDetails {
    pub borrow_id: i64,
    pub book_copy: BookCopy,
    pub reader: Reader,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<DateTime<Utc>>,
    /// Status as recorded by the backend
    pub status: LoanStatus,
    /// Fine recorded by staff, in VND
    pub fine_amount: i64,
    /// Derived from the due date at response time
    pub is_overdue: bool,
    pub overdue_days: i64,
    /// Advisory fine for the current overdue days, in VND
    pub computed_fine: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reminded_at: Option<DateTime<Utc>>,
}

/// Input for creating a loan once the copy and reader are resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub book_copy_id: i64,
    pub reader_id: i64,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// Storage-level filter for listing loans
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanFilter {
    pub status: Option<LoanStatus>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}
