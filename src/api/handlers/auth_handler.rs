//! Authentication handlers.

use axum::{
    extract::State,
    middleware,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{auth_middleware, CurrentUser};
use crate::api::AppState;
use crate::domain::AccountResponse;
use crate::errors::AppResult;
use crate::services::{AuthSession, Registration, TokenResponse};
use crate::types::{ApiResponse, Created};

/// Self-registration request; the account is always an employee
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Asha Verma")]
    pub name: String,
    #[validate(email(message = "Please provide a valid email"))]
    #[schema(example = "asha@example.com")]
    pub email: String,
    /// At least 6 characters with a lowercase letter, an uppercase letter and a digit
    #[schema(example = "Secret123", min_length = 6)]
    pub password: String,
    #[schema(example = "Engineering")]
    pub department: Option<String>,
    #[schema(example = "Developer")]
    pub position: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email"))]
    #[schema(example = "asha@example.com")]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "Secret123")]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    pub new_password: String,
}

/// `/auth` routes; everything except register and login needs a token
pub fn auth_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/change-password", put(change_password))
        .route("/refresh-token", post(refresh_token))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected)
}

/// Register a new employee account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account registered", body = AuthSession),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<Created<AuthSession>> {
    let session = state
        .services
        .auth()
        .register(Registration {
            name: payload.name,
            email: payload.email,
            password: payload.password,
            department: payload.department,
            position: payload.position,
        })
        .await?;

    Ok(Created(session))
}

/// Login and get a JWT token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthSession),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Invalid credentials or deactivated account")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthSession>>> {
    let session = state
        .services
        .auth()
        .login(payload.email, payload.password)
        .await?;

    Ok(Json(ApiResponse::with_message(session, "Login successful")))
}

/// Tokens are stateless; the client discards its copy
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Logged out"))
)]
pub async fn logout(user: CurrentUser) -> Json<ApiResponse<()>> {
    tracing::debug!(account_id = %user.account().id, "Logout");
    Json(ApiResponse::message("Logged out successfully"))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current account", body = AccountResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(user: CurrentUser) -> Json<ApiResponse<AccountResponse>> {
    Json(ApiResponse::success(user.into_account().into()))
}

#[utoipa::path(
    put,
    path = "/api/auth/change-password",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Current password incorrect or new password too weak")
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(payload): ValidatedJson<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    state
        .services
        .auth()
        .change_password(&user.actor(), payload.current_password, payload.new_password)
        .await?;

    Ok(Json(ApiResponse::message("Password changed successfully")))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh-token",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Fresh token", body = TokenResponse))
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<TokenResponse>>> {
    let token = state.services.auth().refresh(&user.actor())?;
    Ok(Json(ApiResponse::success(token)))
}
