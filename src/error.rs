//! Error types for the circulation server

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::models::loan::LoanStatus;

/// Numeric error codes exposed to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    DbFailure = 3,
    NoSuchLoan = 4,
    BadValue = 18,
    InvalidTransition = 30,
    InvalidTimestamp = 31,
    InvalidAmount = 32,
    ActionInFlight = 33,
    NotificationFailure = 34,
}

/// Actions a caller may request on an existing loan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanAction {
    Return,
    SettleFine,
    MarkOverdue,
    Remind,
}

impl std::fmt::Display for LoanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LoanAction::Return => "return",
            LoanAction::SettleFine => "settle the fine of",
            LoanAction::MarkOverdue => "mark as overdue",
            LoanAction::Remind => "send a reminder for",
        };
        write!(f, "{}", label)
    }
}

/// Local validation failures raised by the borrowing policy.
///
/// These are detected before anything is persisted or sent, so callers can
/// report them without touching the database.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Cannot {action} a loan with status {status}")]
    InvalidTransition { action: LoanAction, status: LoanStatus },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid amount: {0} (must not be negative)")]
    InvalidAmount(i64),
}

/// A single failed rule on a request form field
#[derive(Debug, Clone, Serialize, PartialEq, Eq, utoipa::ToSchema)]
pub struct FieldError {
    pub field: String,
    pub code: String,
    pub message: String,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |e| FieldError {
                    field: field.clone(),
                    code: e.code.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        // HashMap iteration order is unstable
        fields.sort_by(|a, b| a.field.cmp(&b.field).then(a.code.cmp(&b.code)));
        AppError::Validation(fields)
    }
}

impl From<validator::ValidationError> for AppError {
    fn from(error: validator::ValidationError) -> Self {
        let mut errors = validator::ValidationErrors::new();
        errors.add("__all__", error);
        errors.into()
    }
}

impl AppError {
    fn rejected(field: &str, code: &str, message: String) -> Self {
        AppError::Validation(vec![FieldError {
            field: field.to_string(),
            code: code.to_string(),
            message,
        }])
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::rejected("body", "json", rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::rejected("query", "query", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::rejected("path", "path", rejection.body_text())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: u32,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut field_errors = Vec::new();
        let (status, code, message) = match self {
            AppError::Policy(e) => {
                let (status, code) = match e {
                    PolicyError::InvalidTransition { .. } => {
                        (StatusCode::CONFLICT, ErrorCode::InvalidTransition)
                    }
                    PolicyError::InvalidTimestamp(_) => {
                        (StatusCode::BAD_REQUEST, ErrorCode::InvalidTimestamp)
                    }
                    PolicyError::InvalidAmount(_) => {
                        (StatusCode::BAD_REQUEST, ErrorCode::InvalidAmount)
                    }
                };
                (status, code, e.to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchLoan, msg),
            AppError::Validation(errors) => {
                let message = format!("Invalid request: {}", summarize(&errors));
                field_errors = errors;
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, message)
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::ActionInFlight, msg),
            AppError::BusinessRule(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::Failure, msg)
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Notification(msg) => {
                tracing::warn!("Notification error: {}", msg);
                (StatusCode::BAD_GATEWAY, ErrorCode::NotificationFailure, msg)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            code: code as u32,
            error: format!("{:?}", code),
            message,
            errors: field_errors,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Form {
        #[validate(range(min = 0, message = "must be positive"))]
        amount: i64,
    }

    #[test]
    fn test_validation_errors_are_structured() {
        let err: AppError = Form { amount: -1 }.validate().unwrap_err().into();
        match err {
            AppError::Validation(fields) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].field, "amount");
                assert_eq!(fields[0].code, "range");
                assert_eq!(fields[0].message, "must be positive");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_policy_error_status_codes() {
        let transition = AppError::from(PolicyError::InvalidTransition {
            action: LoanAction::Return,
            status: LoanStatus::Returned,
        });
        assert_eq!(transition.into_response().status(), StatusCode::CONFLICT);

        let amount = AppError::from(PolicyError::InvalidAmount(-5));
        assert_eq!(amount.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_transition_message() {
        let e = PolicyError::InvalidTransition {
            action: LoanAction::SettleFine,
            status: LoanStatus::Borrowed,
        };
        assert_eq!(e.to_string(), "Cannot settle the fine of a loan with status BORROWED");
    }
}
