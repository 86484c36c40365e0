//! HTTP API handlers
//!
//! One module per resource. Handlers stay thin: extract, call into the
//! pipeline or stores, shape the JSON response. Domain errors convert to
//! HTTP through [`ApiError`], so handlers use `?` throughout.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;
use versewright_common::Error;

pub mod billing;
pub mod entitlement;
pub mod generate;
pub mod health;
pub mod poems;

pub type ApiResult<T> = Result<T, ApiError>;

/// Domain error carried to the HTTP boundary
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError(error) = self;

        // Quota exhaustion is a paywall prompt, not an error banner; the
        // body carries enough for the client to render the upsell.
        if let Error::QuotaExceeded { used, quota } = error {
            let body = Json(json!({
                "error": "Free poem limit reached. Subscribe for unlimited poems.",
                "paywall": true,
                "used": used,
                "quota": quota,
            }));
            return (StatusCode::PAYMENT_REQUIRED, body).into_response();
        }

        let status = match &error {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::GenerationBackend(_) | Error::Billing(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", error);
        }

        (status, Json(json!({ "error": error.to_string() }))).into_response()
    }
}
