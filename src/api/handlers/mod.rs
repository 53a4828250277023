//! HTTP request handlers.

pub mod account_handler;
pub mod auth_handler;
pub mod expense_handler;
pub mod notification_handler;
pub mod salary_handler;

pub use account_handler::account_routes;
pub use auth_handler::auth_routes;
pub use expense_handler::expense_routes;
pub use notification_handler::notification_routes;
pub use salary_handler::salary_routes;

use axum::{
    body::Body,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

use crate::errors::{AppError, AppResult};

/// Binary body with its content type and a `Content-Disposition` carrying the
/// file name; `attachment` forces a download instead of inline display.
pub(crate) fn file_response(
    bytes: Vec<u8>,
    content_type: &str,
    file_name: &str,
    attachment: bool,
) -> AppResult<Response> {
    let safe_name: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    let disposition = format!(
        "{}; filename=\"{}\"",
        if attachment { "attachment" } else { "inline" },
        safe_name
    );

    let content_type = HeaderValue::from_str(content_type)
        .map_err(|_| AppError::internal(format!("Invalid content type '{}'", content_type)))?;
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|_| AppError::internal("Invalid content disposition"))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(bytes),
    )
        .into_response())
}
