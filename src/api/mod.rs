//! HTTP surface of the payroll backend.
//!
//! Everything lives under `/api` except `/health` and the Swagger UI.
//! Handlers stay thin: they pull the [`Actor`](crate::domain::Actor) out of
//! the bearer token, call one service method and wrap the result.

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use routes::create_router;
pub use state::AppState;
