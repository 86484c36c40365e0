//! Poem repository
//!
//! Owner-scoped persistence of generated poems. Every read, update, and
//! delete is filtered by `user_id`; a poem belonging to someone else is
//! indistinguishable from one that does not exist.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

/// A persisted poem
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoemRecord {
    pub id: String,
    pub user_id: String,
    pub poem_type: String,
    pub rhyme_pattern: String,
    pub description_input: String,
    pub generated_text: String,
    pub line_count_requested: Option<i64>,
    pub line_length_requested: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields required to persist a new poem
#[derive(Debug, Clone)]
pub struct NewPoem<'a> {
    pub user_id: &'a str,
    pub poem_type: &'a str,
    pub rhyme_pattern: &'a str,
    pub description_input: &'a str,
    pub generated_text: &'a str,
    pub line_count_requested: Option<u32>,
    pub line_length_requested: &'a str,
}

const POEM_COLUMNS: &str = "id, user_id, poem_type, rhyme_pattern, description_input,
    generated_text, line_count_requested, line_length_requested, created_at";

/// Insert a poem and return the stored record
pub async fn insert_poem(pool: &SqlitePool, new_poem: &NewPoem<'_>) -> Result<PoemRecord> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO poems (id, user_id, poem_type, rhyme_pattern, description_input,
                            generated_text, line_count_requested, line_length_requested)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(new_poem.user_id)
    .bind(new_poem.poem_type)
    .bind(new_poem.rhyme_pattern)
    .bind(new_poem.description_input)
    .bind(new_poem.generated_text)
    .bind(new_poem.line_count_requested.map(|n| n as i64))
    .bind(new_poem.line_length_requested)
    .execute(pool)
    .await?;

    let record = sqlx::query_as::<_, PoemRecord>(&format!(
        "SELECT {POEM_COLUMNS} FROM poems WHERE id = ?"
    ))
    .bind(&id)
    .fetch_one(pool)
    .await?;

    Ok(record)
}

/// List a user's poems, newest first
pub async fn list_poems(pool: &SqlitePool, user_id: &str) -> Result<Vec<PoemRecord>> {
    // rowid breaks ties between poems saved within the same second
    let records = sqlx::query_as::<_, PoemRecord>(&format!(
        "SELECT {POEM_COLUMNS} FROM poems
         WHERE user_id = ?
         ORDER BY created_at DESC, rowid DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Fetch one of a user's poems
pub async fn get_poem(
    pool: &SqlitePool,
    user_id: &str,
    poem_id: &str,
) -> Result<Option<PoemRecord>> {
    let record = sqlx::query_as::<_, PoemRecord>(&format!(
        "SELECT {POEM_COLUMNS} FROM poems WHERE id = ? AND user_id = ?"
    ))
    .bind(poem_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Replace the text of a user's poem, returning the updated record
pub async fn update_poem_text(
    pool: &SqlitePool,
    user_id: &str,
    poem_id: &str,
    generated_text: &str,
) -> Result<Option<PoemRecord>> {
    let result = sqlx::query(
        "UPDATE poems SET generated_text = ? WHERE id = ? AND user_id = ?",
    )
    .bind(generated_text)
    .bind(poem_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_poem(pool, user_id, poem_id).await
}

/// Delete a user's poem; false when no owned poem matched
pub async fn delete_poem(pool: &SqlitePool, user_id: &str, poem_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM poems WHERE id = ? AND user_id = ?")
        .bind(poem_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
