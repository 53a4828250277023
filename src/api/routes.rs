//! Application route configuration.

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    account_routes, auth_routes, expense_routes, notification_routes, salary_routes,
};
use super::middleware::{auth_middleware, rate_limit_auth_middleware, rate_limit_middleware};
use super::openapi::ApiDoc;
use super::AppState;
use crate::config::Config;

/// Create the application router with all routes configured
pub fn create_router(state: AppState) -> Router {
    let authenticated = Router::new()
        .nest("/users", account_routes())
        .nest("/expenses", expense_routes(state.config.max_file_size))
        .nest("/salary-slips", salary_routes())
        .nest("/notifications", notification_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api = Router::new()
        .nest(
            "/auth",
            auth_routes(state.clone()).route_layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit_auth_middleware,
            )),
        )
        .merge(authenticated.route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        )));

    Router::new()
        // Health check endpoints (no rate limiting)
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api)
        // Global middleware
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Only `CLIENT_URL` may call the API from a browser; any origin when unset.
fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match config
        .client_url
        .as_deref()
        .and_then(|url| HeaderValue::from_str(url).ok())
    {
        Some(origin) => layer.allow_origin(origin).allow_credentials(true),
        None => layer.allow_origin(Any),
    }
}

/// Root endpoint
async fn root() -> &'static str {
    "Payroll API"
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    services: ServiceHealth,
}

#[derive(Serialize)]
struct ServiceHealth {
    database: ServiceStatus,
    redis: ServiceStatus,
}

#[derive(Serialize)]
struct ServiceStatus {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ServiceStatus {
    fn from_check<E: std::fmt::Display>(result: Option<Result<(), E>>) -> Self {
        match result {
            Some(Ok(())) => Self {
                status: "healthy",
                error: None,
            },
            Some(Err(e)) => Self {
                status: "unhealthy",
                error: Some(e.to_string()),
            },
            None => Self {
                status: "disabled",
                error: None,
            },
        }
    }

    fn is_unhealthy(&self) -> bool {
        self.status == "unhealthy"
    }
}

/// Database and Redis connectivity; 503 when a configured backend is down
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match &state.database {
        Some(db) => Some(db.ping().await),
        None => None,
    };
    let redis = match &state.cache {
        Some(cache) => Some(cache.ping().await),
        None => None,
    };

    let services = ServiceHealth {
        database: ServiceStatus::from_check(database),
        redis: ServiceStatus::from_check(redis),
    };
    let degraded = services.database.is_unhealthy() || services.redis.is_unhealthy();

    let status_code = if degraded {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        status_code,
        Json(HealthResponse {
            status: if degraded { "degraded" } else { "healthy" },
            services,
        }),
    )
}
