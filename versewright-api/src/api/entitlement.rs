//! Entitlement status endpoint

use axum::extract::State;
use axum::{Extension, Json};
use serde::Serialize;
use versewright_common::db::entitlements::load_or_create;
use versewright_common::entitlement::{evaluate, remaining_free, GateDecision, FREE_QUOTA};

use crate::api::ApiResult;
use crate::auth::Identity;
use crate::AppState;

/// Response for `GET /api/entitlement`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementResponse {
    pub user_id: String,
    pub free_poems_generated: i64,
    pub free_quota: i64,
    pub remaining_free: i64,
    pub subscribed: bool,
    /// Whether a generation attempt would pass the gate right now
    pub can_generate: bool,
}

/// GET /api/entitlement
pub async fn get_entitlement(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<EntitlementResponse>> {
    let entitlement = load_or_create(&state.db, &identity.id).await?;
    let can_generate = matches!(evaluate(Some(&entitlement)), GateDecision::Allowed);

    Ok(Json(EntitlementResponse {
        user_id: entitlement.user_id.clone(),
        free_poems_generated: entitlement.free_poems_generated,
        free_quota: FREE_QUOTA,
        remaining_free: remaining_free(&entitlement),
        subscribed: entitlement.is_subscribed,
        can_generate,
    }))
}
