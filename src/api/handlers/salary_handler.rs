//! Salary slip handlers.

use axum::{
    extract::{Path, Query, State},
    response::{Json, Response},
    routing::{get, post, put},
    Router,
};
use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::file_response;
use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::config::DEFAULT_PAGE_SIZE;
use crate::domain::{
    Allowances, AllowancesPatch, Deductions, DeductionsPatch, PayPeriod, SalarySlip, SalaryStats,
    SlipChanges, SlipFilter, SlipInput, SlipStatus, WorkingDays,
};
use crate::errors::AppResult;
use crate::services::EmployeeSlips;
use crate::types::{ApiResponse, Created, Paginated, PaginationParams};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SlipQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub status: Option<SlipStatus>,
    /// Admins only; ignored for employees
    pub employee_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct YearQuery {
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSlipRequest {
    pub employee_id: Uuid,
    #[validate(range(min = 1, max = 12, message = "Month must be between 1 and 12"))]
    #[schema(example = 6)]
    pub month: u32,
    #[schema(example = 2024)]
    pub year: i32,
    #[schema(value_type = f64, example = 50000.0)]
    pub basic_salary: Decimal,
    #[serde(default)]
    pub allowances: Allowances,
    #[serde(default)]
    pub deductions: Deductions,
    pub working_days: WorkingDays,
    pub notes: Option<String>,
}

/// Partial update of a draft; component objects merge field by field
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSlipRequest {
    #[schema(value_type = Option<f64>)]
    pub basic_salary: Option<Decimal>,
    pub allowances: Option<AllowancesPatch>,
    pub deductions: Option<DeductionsPatch>,
    pub working_days: Option<WorkingDays>,
    pub notes: Option<String>,
}

/// `/salary-slips` routes, mounted behind the auth middleware
pub fn salary_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_slips).post(create_slip))
        .route("/stats/overview", get(slip_stats))
        .route("/employee/:employee_id", get(employee_slips))
        .route("/:id", get(get_slip).put(update_slip).delete(delete_slip))
        .route("/:id/finalize", put(finalize_slip))
        .route("/:id/generate-pdf", post(generate_pdf))
        .route("/:id/send-email", post(send_slip))
        .route("/:id/download", get(download_slip))
}

#[utoipa::path(
    post,
    path = "/api/salary-slips",
    tag = "Salary slips",
    security(("bearer_auth" = [])),
    request_body = CreateSlipRequest,
    responses(
        (status = 201, description = "Draft slip created", body = SalarySlip),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "A slip already exists for this period")
    )
)]
pub async fn create_slip(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(payload): ValidatedJson<CreateSlipRequest>,
) -> AppResult<Created<SalarySlip>> {
    let input = SlipInput {
        employee_id: payload.employee_id,
        period: PayPeriod::new(payload.month, payload.year, Utc::now().year())?,
        basic_salary: payload.basic_salary,
        allowances: payload.allowances,
        deductions: payload.deductions,
        working_days: payload.working_days,
        notes: payload.notes,
    };

    let slip = state
        .services
        .salary_slips()
        .create(&user.actor(), input)
        .await?;

    Ok(Created(slip))
}

#[utoipa::path(
    get,
    path = "/api/salary-slips",
    tag = "Salary slips",
    security(("bearer_auth" = [])),
    params(SlipQuery),
    responses(
        (status = 200, description = "Page of slips, latest period first", body = [SalarySlip])
    )
)]
pub async fn list_slips(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<SlipQuery>,
) -> AppResult<Json<Paginated<SalarySlip>>> {
    let page = PaginationParams::from_query(query.page, query.limit, DEFAULT_PAGE_SIZE);
    let filter = SlipFilter {
        employee_id: query.employee_id,
        month: query.month,
        year: query.year,
        status: query.status,
    };

    let slips = state
        .services
        .salary_slips()
        .list(&user.actor(), filter, page)
        .await?;

    Ok(Json(slips))
}

#[utoipa::path(
    get,
    path = "/api/salary-slips/stats/overview",
    tag = "Salary slips",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Payout statistics", body = SalaryStats))
)]
pub async fn slip_stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<SalaryStats>>> {
    let stats = state.services.salary_slips().stats(&user.actor()).await?;
    Ok(Json(ApiResponse::success(stats)))
}

#[utoipa::path(
    get,
    path = "/api/salary-slips/employee/{employee_id}",
    tag = "Salary slips",
    security(("bearer_auth" = [])),
    params(
        ("employee_id" = Uuid, Path, description = "Employee account id"),
        YearQuery
    ),
    responses(
        (status = 200, description = "Employee with their slips", body = EmployeeSlips),
        (status = 404, description = "Employee not found")
    )
)]
pub async fn employee_slips(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(employee_id): Path<Uuid>,
    Query(query): Query<YearQuery>,
) -> AppResult<Json<ApiResponse<EmployeeSlips>>> {
    let slips = state
        .services
        .salary_slips()
        .for_employee(&user.actor(), employee_id, query.year)
        .await?;

    Ok(Json(ApiResponse::success(slips)))
}

#[utoipa::path(
    get,
    path = "/api/salary-slips/{id}",
    tag = "Salary slips",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Salary slip id")),
    responses(
        (status = 200, description = "Salary slip", body = SalarySlip),
        (status = 404, description = "Salary slip not found")
    )
)]
pub async fn get_slip(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SalarySlip>>> {
    let slip = state.services.salary_slips().get(&user.actor(), id).await?;
    Ok(Json(ApiResponse::success(slip)))
}

#[utoipa::path(
    put,
    path = "/api/salary-slips/{id}",
    tag = "Salary slips",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Salary slip id")),
    request_body = UpdateSlipRequest,
    responses(
        (status = 200, description = "Recomputed draft", body = SalarySlip),
        (status = 409, description = "Slip is not a draft")
    )
)]
pub async fn update_slip(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateSlipRequest>,
) -> AppResult<Json<ApiResponse<SalarySlip>>> {
    let changes = SlipChanges {
        basic_salary: payload.basic_salary,
        allowances: payload.allowances,
        deductions: payload.deductions,
        working_days: payload.working_days,
        notes: payload.notes,
    };

    let slip = state
        .services
        .salary_slips()
        .update(&user.actor(), id, changes)
        .await?;

    Ok(Json(ApiResponse::with_message(
        slip,
        "Salary slip updated successfully",
    )))
}

#[utoipa::path(
    put,
    path = "/api/salary-slips/{id}/finalize",
    tag = "Salary slips",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Salary slip id")),
    responses(
        (status = 200, description = "Slip finalized", body = SalarySlip),
        (status = 409, description = "Slip is not a draft")
    )
)]
pub async fn finalize_slip(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SalarySlip>>> {
    let slip = state
        .services
        .salary_slips()
        .finalize(&user.actor(), id)
        .await?;

    Ok(Json(ApiResponse::with_message(
        slip,
        "Salary slip finalized successfully",
    )))
}

#[utoipa::path(
    post,
    path = "/api/salary-slips/{id}/generate-pdf",
    tag = "Salary slips",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Salary slip id")),
    responses((status = 200, description = "Document stored", body = SalarySlip))
)]
pub async fn generate_pdf(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SalarySlip>>> {
    let slip = state
        .services
        .salary_slips()
        .generate_document(&user.actor(), id)
        .await?;

    Ok(Json(ApiResponse::with_message(
        slip,
        "PDF generated successfully",
    )))
}

#[utoipa::path(
    post,
    path = "/api/salary-slips/{id}/send-email",
    tag = "Salary slips",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Salary slip id")),
    responses(
        (status = 200, description = "Slip marked sent and email queued", body = SalarySlip),
        (status = 400, description = "Generate the PDF first"),
        (status = 409, description = "Slip is not finalized")
    )
)]
pub async fn send_slip(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SalarySlip>>> {
    let slip = state
        .services
        .salary_slips()
        .send(&user.actor(), id)
        .await?;

    Ok(Json(ApiResponse::with_message(
        slip,
        "Salary slip sent successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/api/salary-slips/{id}/download",
    tag = "Salary slips",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Salary slip id")),
    responses(
        (status = 200, description = "PDF document", content_type = "application/pdf"),
        (status = 404, description = "No document generated yet")
    )
)]
pub async fn download_slip(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let document = state
        .services
        .salary_slips()
        .download(&user.actor(), id)
        .await?;

    file_response(
        document.bytes,
        "application/pdf",
        &document.file_name,
        true,
    )
}

#[utoipa::path(
    delete,
    path = "/api/salary-slips/{id}",
    tag = "Salary slips",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Salary slip id")),
    responses(
        (status = 200, description = "Draft deleted"),
        (status = 409, description = "Slip is not a draft")
    )
)]
pub async fn delete_slip(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    state
        .services
        .salary_slips()
        .delete(&user.actor(), id)
        .await?;

    Ok(Json(ApiResponse::message("Salary slip deleted successfully")))
}
