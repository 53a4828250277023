//! Account directory handlers.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, put},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::config::DEFAULT_PAGE_SIZE;
use crate::domain::{
    AccountChanges, AccountFilter, AccountResponse, AccountStats, BankDetails, BaseSalary,
    EmployeeSummary, Role,
};
use crate::errors::AppResult;
use crate::services::AccountDraft;
use crate::types::{ApiResponse, Created, Paginated, PaginationParams};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AccountQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Name, email or employee code
    pub search: Option<String>,
    pub role: Option<Role>,
    pub department: Option<String>,
    pub is_active: Option<bool>,
}

/// Admin-created account, any role
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    pub password: String,
    pub role: Role,
    pub department: Option<String>,
    pub position: Option<String>,
    pub joining_date: Option<NaiveDate>,
    #[serde(default)]
    pub salary: BaseSalary,
    #[serde(default)]
    pub bank_details: BankDetails,
}

/// Profile update; `salary` is only honoured for admins
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub name: Option<String>,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub salary: Option<BaseSalary>,
    pub bank_details: Option<BankDetails>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

/// `/users` routes, mounted behind the auth middleware
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_accounts).post(create_account))
        .route("/employees", get(list_employees))
        .route("/stats/overview", get(account_stats))
        .route(
            "/:id",
            get(get_account).put(update_account).delete(deactivate_account),
        )
        .route("/:id/activate", put(activate_account))
        .route("/:id/role", put(change_role))
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(AccountQuery),
    responses(
        (status = 200, description = "Page of accounts", body = [AccountResponse]),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_accounts(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<AccountQuery>,
) -> AppResult<Json<Paginated<AccountResponse>>> {
    let page = PaginationParams::from_query(query.page, query.limit, DEFAULT_PAGE_SIZE);
    let filter = AccountFilter {
        role: query.role,
        department: query.department,
        is_active: query.is_active,
        search: query.search,
    };

    let accounts = state
        .services
        .accounts()
        .list(&user.actor(), filter, page)
        .await?;

    Ok(Json(accounts.map(AccountResponse::from)))
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = AccountResponse),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_account(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(payload): ValidatedJson<CreateAccountRequest>,
) -> AppResult<Created<AccountResponse>> {
    let draft = AccountDraft {
        name: payload.name,
        email: payload.email,
        password: payload.password,
        role: payload.role,
        department: payload.department,
        position: payload.position,
        joining_date: payload.joining_date,
        salary: payload.salary,
        bank_details: payload.bank_details,
    };

    let account = state
        .services
        .accounts()
        .create(&user.actor(), draft)
        .await?;

    Ok(Created(account.into()))
}

#[utoipa::path(
    get,
    path = "/api/users/employees",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Active employees", body = [EmployeeSummary]))
)]
pub async fn list_employees(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<EmployeeSummary>>>> {
    let employees = state.services.accounts().employees(&user.actor()).await?;
    Ok(Json(ApiResponse::success(employees)))
}

#[utoipa::path(
    get,
    path = "/api/users/stats/overview",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Directory statistics", body = AccountStats))
)]
pub async fn account_stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<AccountStats>>> {
    let stats = state.services.accounts().stats(&user.actor()).await?;
    Ok(Json(ApiResponse::success(stats)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account", body = AccountResponse),
        (status = 403, description = "Neither owner nor admin"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn get_account(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<AccountResponse>>> {
    let account = state.services.accounts().get(&user.actor(), id).await?;
    Ok(Json(ApiResponse::success(account.into())))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Account id")),
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Updated account", body = AccountResponse),
        (status = 409, description = "Email already taken")
    )
)]
pub async fn update_account(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateAccountRequest>,
) -> AppResult<Json<ApiResponse<AccountResponse>>> {
    let changes = AccountChanges {
        name: payload.name,
        email: payload.email,
        department: payload.department,
        position: payload.position,
        salary: payload.salary,
        bank_details: payload.bank_details,
    };

    let account = state
        .services
        .accounts()
        .update(&user.actor(), id, changes)
        .await?;

    Ok(Json(ApiResponse::with_message(
        account.into(),
        "User updated successfully",
    )))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account deactivated", body = AccountResponse),
        (status = 400, description = "Cannot deactivate own account")
    )
)]
pub async fn deactivate_account(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<AccountResponse>>> {
    let account = state
        .services
        .accounts()
        .deactivate(&user.actor(), id)
        .await?;

    Ok(Json(ApiResponse::with_message(
        account.into(),
        "User deactivated successfully",
    )))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}/activate",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Account id")),
    responses((status = 200, description = "Account activated", body = AccountResponse))
)]
pub async fn activate_account(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<AccountResponse>>> {
    let account = state
        .services
        .accounts()
        .activate(&user.actor(), id)
        .await?;

    Ok(Json(ApiResponse::with_message(
        account.into(),
        "User activated successfully",
    )))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}/role",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Account id")),
    request_body = ChangeRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = AccountResponse),
        (status = 400, description = "Cannot change own role")
    )
)]
pub async fn change_role(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<ChangeRoleRequest>,
) -> AppResult<Json<ApiResponse<AccountResponse>>> {
    let account = state
        .services
        .accounts()
        .change_role(&user.actor(), id, payload.role)
        .await?;

    Ok(Json(ApiResponse::with_message(
        account.into(),
        "User role updated successfully",
    )))
}
