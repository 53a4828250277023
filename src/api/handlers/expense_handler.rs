//! Expense claim handlers.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    response::{Json, Response},
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::file_response;
use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::config::DEFAULT_PAGE_SIZE;
use crate::domain::{
    Expense, ExpenseCategory, ExpenseChanges, ExpenseDecision, ExpenseFilter, ExpenseStats,
    ExpenseStatus,
};
use crate::errors::{AppError, AppResult};
use crate::services::{ExpenseSubmission, ReceiptUpload};
use crate::types::{ApiResponse, Created, Paginated, PaginationParams};

/// Room for the text fields and multipart framing around a receipt.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ExpenseQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<ExpenseStatus>,
    pub category: Option<ExpenseCategory>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Title or description
    pub search: Option<String>,
    /// Admins only; ignored for employees
    pub employee_id: Option<Uuid>,
}

/// Multipart form accepted by `POST /api/expenses`
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct ExpenseForm {
    #[schema(example = "Printer paper")]
    title: String,
    #[schema(example = "Two reams for the finance team")]
    description: String,
    #[schema(example = "1200.00")]
    amount: String,
    category: ExpenseCategory,
    #[schema(example = "2024-06-14")]
    expense_date: String,
    /// JPEG, PNG or PDF
    #[schema(value_type = Option<String>, format = Binary)]
    receipt: Option<Vec<u8>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExpenseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub amount: Option<Decimal>,
    pub category: Option<ExpenseCategory>,
    pub expense_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseStatusRequest {
    pub status: ExpenseStatus,
    /// Required when rejecting, 5-200 characters
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CommentRequest {
    #[validate(length(min = 1, message = "Comment message is required"))]
    pub message: String,
}

/// `/expenses` routes, mounted behind the auth middleware
pub fn expense_routes(max_file_size: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_expenses)
                .post(create_expense)
                .layer(DefaultBodyLimit::max(max_file_size + MULTIPART_OVERHEAD)),
        )
        .route("/stats/overview", get(expense_stats))
        .route(
            "/:id",
            get(get_expense).put(update_expense).delete(delete_expense),
        )
        .route("/:id/status", put(decide_expense))
        .route("/:id/comments", post(add_comment))
        .route("/:id/receipt", get(download_receipt))
}

/// Text fields plus the optional `receipt` file of the multipart form
#[derive(Debug, Default)]
struct ExpenseFormParts {
    title: Option<String>,
    description: Option<String>,
    amount: Option<String>,
    category: Option<String>,
    expense_date: Option<String>,
    receipt: Option<ReceiptUpload>,
}

impl ExpenseFormParts {
    async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut parts = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "receipt" {
                let original_name = field.file_name().unwrap_or("receipt").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::bad_request(e.body_text()))?;
                if !bytes.is_empty() {
                    parts.receipt = Some(ReceiptUpload {
                        original_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| AppError::bad_request(e.body_text()))?;
            match name.as_str() {
                "title" => parts.title = Some(value),
                "description" => parts.description = Some(value),
                "amount" => parts.amount = Some(value),
                "category" => parts.category = Some(value),
                "expenseDate" => parts.expense_date = Some(value),
                other => tracing::debug!(field = other, "Ignoring unknown form field"),
            }
        }

        Ok(parts)
    }

    fn submission(&self) -> AppResult<ExpenseSubmission> {
        let required = |value: &Option<String>, label: &str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| AppError::validation(format!("{} is required", label)))
        };

        let amount = required(&self.amount, "Amount")?;
        let amount = Decimal::from_str(&amount)
            .map_err(|_| AppError::validation("Amount must be a number"))?;

        Ok(ExpenseSubmission {
            title: required(&self.title, "Title")?,
            description: required(&self.description, "Description")?,
            amount,
            category: required(&self.category, "Category")?.parse()?,
            expense_date: parse_date(&required(&self.expense_date, "Expense date")?)?,
        })
    }
}

/// `YYYY-MM-DD`, or a full RFC 3339 timestamp as sent by date pickers
fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| {
            DateTime::parse_from_rfc3339(value).map(|d| d.with_timezone(&Utc).date_naive())
        })
        .map_err(|_| AppError::validation("Expense date must be a valid date"))
}

#[utoipa::path(
    post,
    path = "/api/expenses",
    tag = "Expenses",
    security(("bearer_auth" = [])),
    request_body(content = ExpenseForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Claim submitted", body = Expense),
        (status = 400, description = "Validation error or unsupported receipt"),
        (status = 403, description = "Employees only")
    )
)]
pub async fn create_expense(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> AppResult<Created<Expense>> {
    let mut form = ExpenseFormParts::read(multipart).await?;
    let submission = form.submission()?;

    let expense = state
        .services
        .expenses()
        .create(&user.actor(), submission, form.receipt.take())
        .await?;

    Ok(Created(expense))
}

#[utoipa::path(
    get,
    path = "/api/expenses",
    tag = "Expenses",
    security(("bearer_auth" = [])),
    params(ExpenseQuery),
    responses((status = 200, description = "Page of claims, newest first", body = [Expense]))
)]
pub async fn list_expenses(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ExpenseQuery>,
) -> AppResult<Json<Paginated<Expense>>> {
    let page = PaginationParams::from_query(query.page, query.limit, DEFAULT_PAGE_SIZE);
    let filter = ExpenseFilter {
        employee_id: query.employee_id,
        status: query.status,
        category: query.category,
        start_date: query.start_date,
        end_date: query.end_date,
        search: query.search,
    };

    let expenses = state
        .services
        .expenses()
        .list(&user.actor(), filter, page)
        .await?;

    Ok(Json(expenses))
}

#[utoipa::path(
    get,
    path = "/api/expenses/stats/overview",
    tag = "Expenses",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Expense statistics", body = ExpenseStats))
)]
pub async fn expense_stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<ExpenseStats>>> {
    let stats = state.services.expenses().stats(&user.actor()).await?;
    Ok(Json(ApiResponse::success(stats)))
}

#[utoipa::path(
    get,
    path = "/api/expenses/{id}",
    tag = "Expenses",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Expense id")),
    responses(
        (status = 200, description = "Claim with its comments", body = Expense),
        (status = 404, description = "Expense not found")
    )
)]
pub async fn get_expense(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Expense>>> {
    let expense = state.services.expenses().get(&user.actor(), id).await?;
    Ok(Json(ApiResponse::success(expense)))
}

#[utoipa::path(
    put,
    path = "/api/expenses/{id}",
    tag = "Expenses",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Expense id")),
    request_body = UpdateExpenseRequest,
    responses(
        (status = 200, description = "Updated claim", body = Expense),
        (status = 409, description = "Claim is no longer pending")
    )
)]
pub async fn update_expense(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateExpenseRequest>,
) -> AppResult<Json<ApiResponse<Expense>>> {
    let changes = ExpenseChanges {
        title: payload.title,
        description: payload.description,
        amount: payload.amount,
        category: payload.category,
        expense_date: payload.expense_date,
    };

    let expense = state
        .services
        .expenses()
        .update(&user.actor(), id, changes)
        .await?;

    Ok(Json(ApiResponse::with_message(
        expense,
        "Expense updated successfully",
    )))
}

#[utoipa::path(
    put,
    path = "/api/expenses/{id}/status",
    tag = "Expenses",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Expense id")),
    request_body = ExpenseStatusRequest,
    responses(
        (status = 200, description = "Decision recorded", body = Expense),
        (status = 400, description = "Missing or invalid rejection reason"),
        (status = 409, description = "Claim already decided")
    )
)]
pub async fn decide_expense(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<ExpenseStatusRequest>,
) -> AppResult<Json<ApiResponse<Expense>>> {
    let decision =
        ExpenseDecision::from_request(payload.status, payload.rejection_reason.as_deref())?;

    let expense = state
        .services
        .expenses()
        .decide(&user.actor(), id, decision)
        .await?;

    let message = format!("Expense {} successfully", expense.status.as_str());
    Ok(Json(ApiResponse::with_message(expense, message)))
}

#[utoipa::path(
    post,
    path = "/api/expenses/{id}/comments",
    tag = "Expenses",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Expense id")),
    request_body = CommentRequest,
    responses((status = 201, description = "Comment added", body = Expense))
)]
pub async fn add_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CommentRequest>,
) -> AppResult<Created<Expense>> {
    let expense = state
        .services
        .expenses()
        .comment(&user.actor(), id, payload.message)
        .await?;

    Ok(Created(expense))
}

#[utoipa::path(
    delete,
    path = "/api/expenses/{id}",
    tag = "Expenses",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Expense id")),
    responses(
        (status = 200, description = "Claim deleted"),
        (status = 409, description = "Claim is no longer pending")
    )
)]
pub async fn delete_expense(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.services.expenses().delete(&user.actor(), id).await?;
    Ok(Json(ApiResponse::message("Expense deleted successfully")))
}

#[utoipa::path(
    get,
    path = "/api/expenses/{id}/receipt",
    tag = "Expenses",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Expense id")),
    responses(
        (status = 200, description = "Stored receipt file"),
        (status = 404, description = "No receipt attached")
    )
)]
pub async fn download_receipt(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let receipt = state.services.expenses().receipt(&user.actor(), id).await?;
    file_response(
        receipt.bytes,
        &receipt.content_type,
        &receipt.file_name,
        false,
    )
}
