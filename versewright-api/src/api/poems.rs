//! Poem library endpoints
//!
//! All operations are scoped to the authenticated owner. A poem that exists
//! but belongs to someone else responds 404, identical to one that never
//! existed.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use versewright_common::db::poems::{self, PoemRecord};
use versewright_common::Error;

use crate::api::{ApiError, ApiResult};
use crate::auth::Identity;
use crate::AppState;

/// Response for `GET /api/poems`
#[derive(Debug, Serialize)]
pub struct PoemListResponse {
    pub poems: Vec<PoemRecord>,
    pub count: usize,
}

/// GET /api/poems
///
/// The caller's poems, newest first.
pub async fn list_poems(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<PoemListResponse>> {
    let poems = poems::list_poems(&state.db, &identity.id).await?;
    let count = poems.len();
    Ok(Json(PoemListResponse { poems, count }))
}

/// GET /api/poems/:id
pub async fn get_poem(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(poem_id): Path<String>,
) -> ApiResult<Json<PoemRecord>> {
    let record = poems::get_poem(&state.db, &identity.id, &poem_id)
        .await?
        .ok_or_else(poem_not_found)?;
    Ok(Json(record))
}

/// Body for `PATCH /api/poems/:id`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePoemRequest {
    pub generated_text: String,
}

/// PATCH /api/poems/:id
///
/// Replace the poem text, e.g. after a manual edit in the client.
pub async fn update_poem(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(poem_id): Path<String>,
    Json(update): Json<UpdatePoemRequest>,
) -> ApiResult<Json<PoemRecord>> {
    let text = update.generated_text.trim();
    if text.is_empty() {
        return Err(ApiError(Error::Validation(
            "Poem text must not be empty".to_string(),
        )));
    }

    let record = poems::update_poem_text(&state.db, &identity.id, &poem_id, text)
        .await?
        .ok_or_else(poem_not_found)?;
    Ok(Json(record))
}

/// DELETE /api/poems/:id
pub async fn delete_poem(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(poem_id): Path<String>,
) -> ApiResult<StatusCode> {
    let deleted = poems::delete_poem(&state.db, &identity.id, &poem_id).await?;
    if !deleted {
        return Err(poem_not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

fn poem_not_found() -> ApiError {
    ApiError(Error::NotFound("Poem not found".to_string()))
}
