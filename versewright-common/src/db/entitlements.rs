//! Entitlement store
//!
//! One row per user: free-tier usage counter plus subscription state. This
//! table is the single source of truth for gating; nothing else records
//! usage or subscription status.
//!
//! The counter is only ever moved by `increment_free_generations`, a single
//! atomic UPDATE. Application code never reads, adds one, and writes back.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

/// Per-user entitlement row
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct UserEntitlement {
    pub user_id: String,
    pub free_poems_generated: i64,
    pub is_subscribed: bool,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fetch a user's entitlement row, creating it on first access
///
/// INSERT OR IGNORE keeps concurrent first access safe: two racing callers
/// both end up reading the same single row, and an existing counter is never
/// reset.
pub async fn load_or_create(pool: &SqlitePool, user_id: &str) -> Result<UserEntitlement> {
    sqlx::query("INSERT OR IGNORE INTO entitlements (user_id) VALUES (?)")
        .bind(user_id)
        .execute(pool)
        .await?;

    let entitlement = sqlx::query_as::<_, UserEntitlement>(
        "SELECT user_id, free_poems_generated, is_subscribed,
                stripe_customer_id, stripe_subscription_id, created_at, updated_at
         FROM entitlements WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(entitlement)
}

/// Count one free-tier generation against a user
///
/// Atomic at the store level. A no-op for subscribed users, so callers may
/// invoke it unconditionally after a successful generation.
pub async fn increment_free_generations(pool: &SqlitePool, user_id: &str) -> Result<()> {
    sqlx::query(
        "UPDATE entitlements
         SET free_poems_generated = free_poems_generated + 1,
             updated_at = CURRENT_TIMESTAMP
         WHERE user_id = ? AND is_subscribed = 0",
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Activate a subscription after checkout completes
///
/// Sets the flag, records the payment provider references, and resets the
/// free counter. The row is created if the webhook arrives before the user's
/// first generation attempt.
pub async fn activate_subscription(
    pool: &SqlitePool,
    user_id: &str,
    customer_id: Option<&str>,
    subscription_id: Option<&str>,
) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO entitlements (user_id) VALUES (?)")
        .bind(user_id)
        .execute(pool)
        .await?;

    sqlx::query(
        "UPDATE entitlements
         SET is_subscribed = 1,
             free_poems_generated = 0,
             stripe_customer_id = COALESCE(?, stripe_customer_id),
             stripe_subscription_id = COALESCE(?, stripe_subscription_id),
             updated_at = CURRENT_TIMESTAMP
         WHERE user_id = ?",
    )
    .bind(customer_id)
    .bind(subscription_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Apply a subscription lifecycle change keyed by payment provider customer
///
/// Activation resets the free counter; deactivation leaves it as it was.
/// Returns the number of rows touched so the caller can treat an unknown
/// customer as a reportable error rather than silently dropping the event.
pub async fn set_subscribed_by_customer(
    pool: &SqlitePool,
    customer_id: &str,
    active: bool,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE entitlements
         SET is_subscribed = ?2,
             free_poems_generated = CASE WHEN ?2 THEN 0 ELSE free_poems_generated END,
             updated_at = CURRENT_TIMESTAMP
         WHERE stripe_customer_id = ?1",
    )
    .bind(customer_id)
    .bind(active)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
