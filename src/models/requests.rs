//! Typed request forms for circulation actions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use super::{book::CopyRef, loan::LoanStatus};

pub const DEFAULT_PER_PAGE: i64 = 20;

/// Borrow a copy for a reader
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_copy_reference"))]
pub struct CreateLoanRequest {
    /// QR code printed on the copy
    #[validate(length(min = 1, message = "QR code must not be empty"))]
    pub qr_code: Option<String>,
    /// Copy ID, when the QR code is not at hand
    pub book_copy_id: Option<i64>,
    #[validate(range(min = 1, message = "Reader ID must be positive"))]
    pub reader_id: i64,
}

impl CreateLoanRequest {
    /// The copy named by the request, when exactly one reference is given
    pub fn copy_ref(&self) -> Result<CopyRef, ValidationError> {
        match (&self.qr_code, self.book_copy_id) {
            (Some(code), None) => Ok(CopyRef::QrCode(code.clone())),
            (None, Some(id)) => Ok(CopyRef::Id(id)),
            _ => {
                let mut err = ValidationError::new("copy_reference");
                err.message = Some("Exactly one of qrCode or bookCopyId is required".into());
                Err(err)
            }
        }
    }
}

fn validate_copy_reference(form: &CreateLoanRequest) -> Result<(), ValidationError> {
    form.copy_ref().map(|_| ())
}

/// Return a borrowed copy
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnLoanRequest {
    /// Defaults to the current time
    pub returned_at: Option<DateTime<Utc>>,
}

/// Record the fine applied to an overdue loan
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettleFineRequest {
    /// Amount in VND
    pub fine_amount: i64,
}

/// Loan list filters and pagination
#[derive(Debug, Clone, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LoanQuery {
    /// Stored status to filter on
    pub status: Option<LoanStatus>,
    /// Matches reader name, student ID or book title
    #[validate(length(max = 100, message = "Search text is too long"))]
    pub search: Option<String>,
    #[validate(range(min = 1, max = 1_000_000, message = "Page must be between 1 and 1000000"))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "perPage must be between 1 and 100"))]
    pub per_page: Option<i64>,
}

impl LoanQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.per_page())
    }
}

/// Send overdue reminders in bulk
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkRemindRequest {
    /// Loans to remind; every stored OVERDUE loan when absent
    #[validate(length(max = 500, message = "Too many loans in one request"))]
    pub loan_ids: Option<Vec<i64>>,
}

/// A reminder that could not be sent
#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemindFailure {
    pub loan_id: i64,
    pub message: String,
}

/// Outcome of a bulk reminder run
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkRemindOutcome {
    pub sent: Vec<i64>,
    pub failed: Vec<RemindFailure>,
}
