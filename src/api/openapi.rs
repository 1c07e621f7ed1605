//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, loans};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Circulation API",
        version = "0.1.0",
        description = "University library borrowing, return, fine and reminder API. \
            Successful responses are wrapped as {success, data, message}.",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Borrowings
        loans::list_loans,
        loans::create_loan,
        loans::get_loan,
        loans::return_loan,
        loans::settle_fine,
        loans::remind_loan,
        loans::bulk_remind,
        loans::sync_overdue,
    ),
    components(
        schemas(
            // Borrowings
            crate::models::loan::LoanDetails,
            crate::models::loan::LoanStatus,
            crate::models::book::Book,
            crate::models::book::BookCopy,
            crate::models::book::CopyStatus,
            crate::models::reader::Reader,
            crate::models::requests::CreateLoanRequest,
            crate::models::requests::ReturnLoanRequest,
            crate::models::requests::SettleFineRequest,
            crate::models::requests::BulkRemindRequest,
            crate::models::requests::BulkRemindOutcome,
            crate::models::requests::RemindFailure,
            loans::LoanPage,
            loans::SyncResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
            crate::error::FieldError,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "borrowings", description = "Loan lifecycle, fines and reminders")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_borrowing_paths() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/borrowings",
            "/borrowings/{id}",
            "/borrowings/{id}/return",
            "/borrowings/{id}/fine",
            "/borrowings/{id}/remind",
            "/borrowings/overdue/bulk-remind",
            "/borrowings/overdue/sync",
        ] {
            assert!(paths.iter().any(|p| p.as_str() == expected), "missing {}", expected);
        }
    }
}
