//! Billing endpoints
//!
//! Checkout needs an authenticated user and configured Stripe credentials.
//! The webhook authenticates by signature instead of bearer; nothing in its
//! body is trusted until the signature checks out.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Serialize;
use serde_json::json;
use tracing::warn;
use versewright_common::Error;

use crate::api::ApiError;
use crate::auth::Identity;
use crate::billing::{apply_event, verify_signature, WebhookEvent};
use crate::AppState;

/// Response for `POST /api/billing/checkout`
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    /// Hosted checkout page to redirect the user to
    pub url: String,
}

/// POST /api/billing/checkout
pub async fn create_checkout(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    headers: HeaderMap,
) -> Result<Json<CheckoutResponse>, BillingError> {
    let Some(checkout) = state.checkout.as_ref() else {
        return Err(BillingError::NotConfigured);
    };

    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
    let session = checkout
        .create_session(&identity.id, identity.email.as_deref(), origin)
        .await?;

    Ok(Json(CheckoutResponse { url: session.url }))
}

/// POST /api/billing/webhook
///
/// Entry point for payment provider events. Statuses: 503 until a signing
/// secret is configured, 400 for a missing or failed signature or an
/// unparseable payload, then whatever applying the event yields.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(secret) = state.webhook_secret.as_deref() else {
        warn!("Webhook received but no signing secret is configured");
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Webhook signing secret not configured",
        );
    };

    let Some(signature) = headers.get("stripe-signature").and_then(|v| v.to_str().ok()) else {
        return error_response(StatusCode::BAD_REQUEST, "Missing Stripe-Signature header");
    };

    if verify_signature(&body, signature, secret).is_err() {
        warn!("Webhook signature verification failed");
        return error_response(StatusCode::BAD_REQUEST, "Invalid webhook signature");
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Malformed webhook payload: {}", e),
            );
        }
    };

    match apply_event(&state.db, &event).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "received": true }))).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Billing endpoint errors
#[derive(Debug)]
pub enum BillingError {
    /// Stripe credentials absent from configuration
    NotConfigured,
    Api(ApiError),
}

impl From<Error> for BillingError {
    fn from(error: Error) -> Self {
        Self::Api(ApiError(error))
    }
}

impl IntoResponse for BillingError {
    fn into_response(self) -> Response {
        match self {
            BillingError::NotConfigured => error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Billing is not configured",
            ),
            BillingError::Api(error) => error.into_response(),
        }
    }
}
