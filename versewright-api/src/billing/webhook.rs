//! Stripe webhook verification and event application
//!
//! Every webhook is verified against the signing secret before anything is
//! parsed from it; an unverified payload never touches the entitlement
//! store. Verification is HMAC-SHA256 over `"{timestamp}.{body}"` compared
//! in constant time against the `v1` signature from the `Stripe-Signature`
//! header.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use sqlx::SqlitePool;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use versewright_common::db::entitlements::{activate_subscription, set_subscribed_by_customer};
use versewright_common::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Verify a `Stripe-Signature` header against the raw request body
///
/// Header format: `t=<timestamp>,v1=<signature>`. Any malformed header,
/// non-UTF-8 payload, or signature mismatch is the same error; callers
/// reject the request without distinguishing why.
pub fn verify_signature(payload: &[u8], signature_header: &str, webhook_secret: &str) -> Result<()> {
    let invalid = || Error::Billing("Invalid webhook signature".to_string());

    let parts: std::collections::HashMap<&str, &str> = signature_header
        .split(',')
        .filter_map(|part| {
            let mut kv = part.splitn(2, '=');
            Some((kv.next()?.trim(), kv.next()?))
        })
        .collect();

    let timestamp = parts.get("t").ok_or_else(invalid)?;
    let signature = parts.get("v1").ok_or_else(invalid)?;

    let body = std::str::from_utf8(payload).map_err(|_| invalid())?;
    let signed_payload = format!("{}.{}", timestamp, body);

    let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes()).map_err(|_| invalid())?;
    mac.update(signed_payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if expected.as_bytes().ct_eq(signature.as_bytes()).into() {
        Ok(())
    } else {
        Err(invalid())
    }
}

/// A webhook event, parsed only after signature verification
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: Value,
}

/// What an applied event did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    SubscriptionActivated,
    SubscriptionUpdated,
    Ignored,
}

/// Apply a verified event to the entitlement store
///
/// `checkout.session.completed` activates the subscription for the user
/// named in the session metadata. Subscription lifecycle events keyed by
/// customer follow the provider's status: `active` keeps the subscription
/// on, anything else turns it off.
///
/// Events that should have matched but did not (no user id in the session
/// metadata, no entitlement row for the customer) are errors; the provider
/// sees a failure status and retries. Event types this service does not
/// consume are acknowledged and ignored.
pub async fn apply_event(db: &SqlitePool, event: &WebhookEvent) -> Result<WebhookOutcome> {
    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let object = &event.data.object;
            let user_id = object.pointer("/metadata/user_id").and_then(Value::as_str);
            let customer = object.get("customer").and_then(Value::as_str);
            let subscription = object.get("subscription").and_then(Value::as_str);

            let Some(user_id) = user_id else {
                warn!("checkout.session.completed without user_id metadata");
                return Err(Error::Validation(
                    "Checkout session has no user_id metadata".to_string(),
                ));
            };

            activate_subscription(db, user_id, customer, subscription).await?;
            info!(user_id = %user_id, "Subscription activated via checkout");
            Ok(WebhookOutcome::SubscriptionActivated)
        }
        "customer.subscription.updated" | "customer.subscription.deleted" => {
            let object = &event.data.object;
            let customer = object.get("customer").and_then(Value::as_str);
            let status = object.get("status").and_then(Value::as_str).unwrap_or("");
            let active = status == "active";

            let Some(customer) = customer else {
                warn!(event_type = %event.event_type, "Subscription event without customer");
                return Err(Error::Validation(
                    "Subscription event has no customer".to_string(),
                ));
            };

            let rows = set_subscribed_by_customer(db, customer, active).await?;
            if rows == 0 {
                warn!(customer = %customer, "Subscription event for unknown customer");
                return Err(Error::NotFound(format!(
                    "No user for customer {}",
                    customer
                )));
            }

            info!(customer = %customer, active = active, "Subscription state updated");
            Ok(WebhookOutcome::SubscriptionUpdated)
        }
        _ => {
            debug!(event_type = %event.event_type, "Ignoring webhook event");
            Ok(WebhookOutcome::Ignored)
        }
    }
}
