//! Borrowing endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        loan::LoanDetails,
        requests::{
            BulkRemindOutcome, BulkRemindRequest, CreateLoanRequest, LoanQuery, ReturnLoanRequest,
            SettleFineRequest,
        },
    },
};

use super::{
    extract::{JsonBody, PathParam, QueryParams},
    ApiResponse,
};

/// One page of loans
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoanPage {
    pub items: Vec<LoanDetails>,
    /// Total number of matching loans
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Result of an overdue synchronisation run
#[derive(Serialize, ToSchema)]
pub struct SyncResponse {
    /// Loans promoted from BORROWED to OVERDUE
    pub promoted: u64,
}

/// List loans with filters and pagination
#[utoipa::path(
    get,
    path = "/borrowings",
    tag = "borrowings",
    params(LoanQuery),
    responses(
        (status = 200, description = "Page of loans", body = LoanPage),
        (status = 400, description = "Invalid filters", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    QueryParams(query): QueryParams<LoanQuery>,
) -> AppResult<Json<ApiResponse<LoanPage>>> {
    let (items, total) = state.services.loans.list(&query).await?;

    Ok(ApiResponse::ok(LoanPage {
        items,
        total,
        page: query.page(),
        per_page: query.per_page(),
    }))
}

/// Borrow a copy (scanned QR code or copy ID) for a reader
#[utoipa::path(
    post,
    path = "/borrowings",
    tag = "borrowings",
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan created", body = LoanDetails),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 404, description = "Copy or reader not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Copy not available", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    JsonBody(request): JsonBody<CreateLoanRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<LoanDetails>>)> {
    let loan = state.services.loans.borrow(request).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(loan, "Book borrowed successfully"),
    ))
}

/// Get a loan by ID
#[utoipa::path(
    get,
    path = "/borrowings/{id}",
    tag = "borrowings",
    params(
        ("id" = i64, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    PathParam(loan_id): PathParam<i64>,
) -> AppResult<Json<ApiResponse<LoanDetails>>> {
    let loan = state.services.loans.get(loan_id).await?;
    Ok(ApiResponse::ok(loan))
}

/// Return a borrowed copy
#[utoipa::path(
    put,
    path = "/borrowings/{id}/return",
    tag = "borrowings",
    params(
        ("id" = i64, Path, description = "Loan ID")
    ),
    request_body = ReturnLoanRequest,
    responses(
        (status = 200, description = "Copy returned", body = LoanDetails),
        (status = 400, description = "Return date precedes borrow date", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Already returned or action in progress", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    PathParam(loan_id): PathParam<i64>,
    JsonBody(request): JsonBody<ReturnLoanRequest>,
) -> AppResult<Json<ApiResponse<LoanDetails>>> {
    let loan = state.services.loans.return_loan(loan_id, request).await?;
    Ok(ApiResponse::with_message(loan, "Book returned successfully"))
}

/// Record the fine of an overdue loan
#[utoipa::path(
    put,
    path = "/borrowings/{id}/fine",
    tag = "borrowings",
    params(
        ("id" = i64, Path, description = "Loan ID")
    ),
    request_body = SettleFineRequest,
    responses(
        (status = 200, description = "Fine recorded", body = LoanDetails),
        (status = 400, description = "Negative amount", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Loan is not overdue or action in progress", body = crate::error::ErrorResponse)
    )
)]
pub async fn settle_fine(
    State(state): State<crate::AppState>,
    PathParam(loan_id): PathParam<i64>,
    JsonBody(request): JsonBody<SettleFineRequest>,
) -> AppResult<Json<ApiResponse<LoanDetails>>> {
    let loan = state.services.loans.settle_fine(loan_id, request).await?;
    Ok(ApiResponse::with_message(loan, "Fine recorded"))
}

/// Send an overdue reminder to the reader
#[utoipa::path(
    post,
    path = "/borrowings/{id}/remind",
    tag = "borrowings",
    params(
        ("id" = i64, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Reminder sent", body = LoanDetails),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Loan is not overdue", body = crate::error::ErrorResponse),
        (status = 422, description = "Reader has no email", body = crate::error::ErrorResponse),
        (status = 502, description = "Email delivery failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn remind_loan(
    State(state): State<crate::AppState>,
    PathParam(loan_id): PathParam<i64>,
) -> AppResult<Json<ApiResponse<LoanDetails>>> {
    let loan = state.services.loans.remind(loan_id).await?;
    Ok(ApiResponse::with_message(loan, "Reminder sent"))
}

/// Send reminders for several overdue loans
#[utoipa::path(
    post,
    path = "/borrowings/overdue/bulk-remind",
    tag = "borrowings",
    request_body = BulkRemindRequest,
    responses(
        (status = 200, description = "Per-loan outcome", body = BulkRemindOutcome),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse)
    )
)]
pub async fn bulk_remind(
    State(state): State<crate::AppState>,
    JsonBody(request): JsonBody<BulkRemindRequest>,
) -> AppResult<Json<ApiResponse<BulkRemindOutcome>>> {
    let outcome = state.services.loans.bulk_remind(request).await?;
    let message = format!(
        "{} reminder(s) sent, {} failed",
        outcome.sent.len(),
        outcome.failed.len()
    );
    Ok(ApiResponse::with_message(outcome, message))
}

/// Mark every loan past its due date as OVERDUE
#[utoipa::path(
    post,
    path = "/borrowings/overdue/sync",
    tag = "borrowings",
    responses(
        (status = 200, description = "Loans promoted", body = SyncResponse)
    )
)]
pub async fn sync_overdue(
    State(state): State<crate::AppState>,
) -> AppResult<Json<ApiResponse<SyncResponse>>> {
    let promoted = state.services.loans.sync_overdue().await?;
    Ok(ApiResponse::ok(SyncResponse { promoted }))
}
