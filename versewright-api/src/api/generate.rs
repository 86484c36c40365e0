//! Poem generation and claim endpoints
//!
//! `POST /api/generate` serves both caller kinds. A valid bearer runs the
//! metered pipeline (gate, generate, save, count). No bearer at all runs an
//! unmetered preview whose result waits in the session store; a bearer that
//! fails to resolve is a 401, not a silent downgrade to preview.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::{Extension, Json};
use serde::Serialize;
use versewright_common::entitlement::remaining_free;
use versewright_common::forms::GenerationRequest;
use versewright_common::verify::LineCountCheck;
use versewright_common::Error;

use crate::api::{ApiError, ApiResult};
use crate::auth::{self, Identity};
use crate::pipeline::{self, MeteredGeneration, PoemDraft};
use crate::session::SESSION_HEADER;
use crate::AppState;

/// Response for `POST /api/generate`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub poem: String,
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poem_id: Option<String>,
    pub poem_type: String,
    pub rhyme_scheme: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_count: Option<u32>,
    pub line_length: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_count_check: Option<LineCountCheck>,
    /// Free generations left; absent for subscribed users and previews
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_free: Option<i64>,
    pub subscribed: bool,
    /// Session carrying the unsaved preview; anonymous responses only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// POST /api/generate
pub async fn generate_poem(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GenerationRequest>,
) -> ApiResult<Json<GenerateResponse>> {
    match auth::optional_identity(&state, &headers).await? {
        Some(identity) => generate_metered(&state, &identity, &request).await,
        None => generate_anonymous(&state, &headers, &request).await,
    }
}

async fn generate_metered(
    state: &AppState,
    identity: &Identity,
    request: &GenerationRequest,
) -> ApiResult<Json<GenerateResponse>> {
    let outcome =
        pipeline::generate_for_user(&state.db, state.generator.as_ref(), &identity.id, request)
            .await?;

    let MeteredGeneration {
        draft,
        record,
        saved,
        entitlement,
    } = outcome;
    let PoemDraft {
        instruction,
        text,
        line_count_check,
    } = draft;

    let remaining = if entitlement.is_subscribed {
        None
    } else {
        Some(remaining_free(&entitlement))
    };

    Ok(Json(GenerateResponse {
        poem: text,
        saved,
        poem_id: record.map(|r| r.id),
        poem_type: instruction.poem_type.display_name().to_string(),
        rhyme_scheme: instruction.rhyme_scheme,
        line_count: instruction.line_count,
        line_length: instruction.line_length.display_name().to_string(),
        line_count_check,
        remaining_free: remaining,
        subscribed: entitlement.is_subscribed,
        session_id: None,
    }))
}

async fn generate_anonymous(
    state: &AppState,
    headers: &HeaderMap,
    request: &GenerationRequest,
) -> ApiResult<Json<GenerateResponse>> {
    let session_id = state.sessions.ensure(session_header(headers)).await;

    let draft = pipeline::generate_preview(
        state.generator.as_ref(),
        &state.sessions,
        &session_id,
        request,
    )
    .await?;

    let PoemDraft {
        instruction,
        text,
        line_count_check,
    } = draft;

    Ok(Json(GenerateResponse {
        poem: text,
        saved: false,
        poem_id: None,
        poem_type: instruction.poem_type.display_name().to_string(),
        rhyme_scheme: instruction.rhyme_scheme,
        line_count: instruction.line_count,
        line_length: instruction.line_length.display_name().to_string(),
        line_count_check,
        remaining_free: None,
        subscribed: false,
        session_id: Some(session_id),
    }))
}

/// Response for `POST /api/session/claim`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poem: Option<versewright_common::db::poems::PoemRecord>,
}

/// POST /api/session/claim
///
/// Persist the session's pending preview for the signed-in caller. A
/// session with nothing pending (already claimed, expired, never existed)
/// reports `saved: false` rather than an error.
pub async fn claim_pending(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    headers: HeaderMap,
) -> ApiResult<Json<ClaimResponse>> {
    let session_id = session_header(&headers).ok_or_else(|| {
        ApiError(Error::Validation(format!(
            "Missing {} header",
            SESSION_HEADER
        )))
    })?;

    let record =
        pipeline::claim_pending(&state.db, &state.sessions, session_id, &identity.id).await?;

    Ok(Json(ClaimResponse {
        saved: record.is_some(),
        poem: record,
    }))
}

fn session_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}
