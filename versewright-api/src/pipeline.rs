//! Generation pipeline
//!
//! Orchestrates one poem generation end to end, in a fixed order: entitlement
//! gate, backend generation, persistence, metering. The order carries the
//! billing semantics:
//!
//! - A failed generation costs the user nothing; the gate ran but the counter
//!   never moves.
//! - A failed save does not withhold the poem. The user sees the text with
//!   `saved: false`, and a free generation is still counted.
//! - The counter moves through a single atomic UPDATE in the store, never a
//!   read-modify-write here.
//!
//! Anonymous visitors get the unmetered preview path: the poem is parked in
//! the session store and persisted only when a signed-in user claims it.

use sqlx::SqlitePool;
use tracing::{error, warn};
use versewright_common::db::entitlements::{
    increment_free_generations, load_or_create, UserEntitlement,
};
use versewright_common::db::poems::{insert_poem, NewPoem, PoemRecord};
use versewright_common::entitlement::{evaluate, GateDecision, FREE_QUOTA};
use versewright_common::forms::GenerationRequest;
use versewright_common::prompt::{compile, GenerationInstruction};
use versewright_common::verify::{check_line_count, LineCountCheck};
use versewright_common::{Error, Result};

use crate::generation::PoemGenerator;
use crate::session::{PendingPoem, SessionStore};

/// A generated poem before any persistence decision
#[derive(Debug, Clone)]
pub struct PoemDraft {
    pub instruction: GenerationInstruction,
    pub text: String,
    pub line_count_check: Option<LineCountCheck>,
}

/// Result of a metered generation for a signed-in user
#[derive(Debug)]
pub struct MeteredGeneration {
    pub draft: PoemDraft,
    pub record: Option<PoemRecord>,
    pub saved: bool,
    /// Entitlement snapshot taken after metering
    pub entitlement: UserEntitlement,
}

/// Compile a request and run the generation backend
///
/// Pure with respect to storage: no entitlement reads, no writes. The
/// line-count check is observational; a miss is logged and reported to the
/// caller, never retried or rejected.
pub async fn generate_draft(
    generator: &dyn PoemGenerator,
    request: &GenerationRequest,
) -> Result<PoemDraft> {
    let instruction = compile(request)?;
    let text = generator.generate(&instruction).await?;

    let line_count_check = check_line_count(&text, instruction.line_count);
    if let Some(check) = &line_count_check {
        if !check.ok {
            warn!(
                poem_type = %instruction.poem_type,
                requested = check.requested,
                actual = check.actual,
                "Generated poem missed the requested line count"
            );
        }
    }

    Ok(PoemDraft {
        instruction,
        text,
        line_count_check,
    })
}

/// Run the full metered pipeline for a signed-in user
pub async fn generate_for_user(
    db: &SqlitePool,
    generator: &dyn PoemGenerator,
    user_id: &str,
    request: &GenerationRequest,
) -> Result<MeteredGeneration> {
    let entitlement = load_or_create(db, user_id).await?;

    match evaluate(Some(&entitlement)) {
        GateDecision::Allowed => {}
        GateDecision::QuotaExhausted => {
            return Err(Error::QuotaExceeded {
                used: entitlement.free_poems_generated,
                quota: FREE_QUOTA,
            });
        }
        GateDecision::RequiresAuth => {
            return Err(Error::Unauthorized("Sign in to generate poems".to_string()));
        }
    }

    let draft = generate_draft(generator, request).await?;

    let (record, saved) = match insert_poem(db, &new_poem(user_id, &draft)).await {
        Ok(record) => (Some(record), true),
        Err(e) => {
            error!(user_id = %user_id, "Failed to save generated poem: {}", e);
            (None, false)
        }
    };

    let entitlement = meter(db, entitlement).await;

    Ok(MeteredGeneration {
        draft,
        record,
        saved,
        entitlement,
    })
}

/// Generate an unmetered preview for an anonymous visitor
///
/// The draft is parked in the session so it can be claimed after sign-in.
pub async fn generate_preview(
    generator: &dyn PoemGenerator,
    sessions: &SessionStore,
    session_id: &str,
    request: &GenerationRequest,
) -> Result<PoemDraft> {
    let draft = generate_draft(generator, request).await?;

    sessions
        .put_pending(
            session_id,
            PendingPoem {
                poem_type: draft.instruction.poem_type,
                rhyme_scheme: draft.instruction.rhyme_scheme.clone(),
                description: draft.instruction.theme.clone(),
                line_count: draft.instruction.line_count,
                line_length: draft.instruction.line_length,
                text: draft.text.clone(),
            },
        )
        .await;

    Ok(draft)
}

/// Persist a session's pending poem for a signed-in user
///
/// The pending poem is removed from the session before the insert is
/// awaited, so a duplicate claim racing this one persists nothing. On
/// insert failure the poem is put back for a later retry.
pub async fn claim_pending(
    db: &SqlitePool,
    sessions: &SessionStore,
    session_id: &str,
    user_id: &str,
) -> Result<Option<PoemRecord>> {
    let Some(pending) = sessions.take_pending(session_id).await else {
        return Ok(None);
    };

    let new_poem = NewPoem {
        user_id,
        poem_type: pending.poem_type.display_name(),
        rhyme_pattern: &pending.rhyme_scheme,
        description_input: &pending.description,
        generated_text: &pending.text,
        line_count_requested: pending.line_count,
        line_length_requested: pending.line_length.display_name(),
    };

    match insert_poem(db, &new_poem).await {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            error!(user_id = %user_id, "Failed to persist claimed poem: {}", e);
            sessions.put_pending(session_id, pending).await;
            Err(e)
        }
    }
}

fn new_poem<'a>(user_id: &'a str, draft: &'a PoemDraft) -> NewPoem<'a> {
    NewPoem {
        user_id,
        poem_type: draft.instruction.poem_type.display_name(),
        rhyme_pattern: &draft.instruction.rhyme_scheme,
        description_input: &draft.instruction.theme,
        generated_text: &draft.text,
        line_count_requested: draft.instruction.line_count,
        line_length_requested: draft.instruction.line_length.display_name(),
    }
}

/// Count the generation and return a fresh entitlement snapshot
///
/// Metering failures are logged and absorbed: the poem was already produced
/// and shown, so losing one counter tick is the lesser harm.
async fn meter(db: &SqlitePool, entitlement: UserEntitlement) -> UserEntitlement {
    if entitlement.is_subscribed {
        return entitlement;
    }

    if let Err(e) = increment_free_generations(db, &entitlement.user_id).await {
        error!(user_id = %entitlement.user_id, "Failed to record free generation: {}", e);
    }

    match load_or_create(db, &entitlement.user_id).await {
        Ok(fresh) => fresh,
        Err(e) => {
            error!(user_id = %entitlement.user_id, "Failed to reload entitlement: {}", e);
            entitlement
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::SampleGenerator;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use versewright_common::db::connect_memory;
    use versewright_common::forms::{LineLength, PoemType};

    struct FailingGenerator;

    #[async_trait]
    impl PoemGenerator for FailingGenerator {
        fn backend_id(&self) -> &'static str {
            "failing"
        }

        async fn generate(&self, _instruction: &GenerationInstruction) -> Result<String> {
            Err(Error::GenerationBackend("backend offline".to_string()))
        }
    }

    struct CountingGenerator {
        calls: AtomicUsize,
    }

    impl CountingGenerator {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PoemGenerator for CountingGenerator {
        fn backend_id(&self) -> &'static str {
            "counting"
        }

        async fn generate(&self, _instruction: &GenerationInstruction) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("one\ntwo\nthree".to_string())
        }
    }

    fn haiku_request() -> GenerationRequest {
        GenerationRequest {
            poem_type: PoemType::Haiku,
            rhyme_scheme: None,
            description: "autumn rain".to_string(),
            line_count: None,
            line_length: LineLength::Short,
        }
    }

    #[tokio::test]
    async fn test_free_generation_saves_and_meters() {
        let pool = connect_memory().await.unwrap();
        let generator = SampleGenerator::new();

        let outcome = generate_for_user(&pool, &generator, "alice", &haiku_request())
            .await
            .unwrap();

        assert!(outcome.saved);
        assert!(outcome.record.is_some());
        assert_eq!(outcome.entitlement.free_poems_generated, 1);
        assert_eq!(outcome.draft.line_count_check.unwrap().requested, 3);
    }

    #[tokio::test]
    async fn test_quota_exhausted_never_reaches_backend() {
        let pool = connect_memory().await.unwrap();
        load_or_create(&pool, "alice").await.unwrap();
        for _ in 0..3 {
            increment_free_generations(&pool, "alice").await.unwrap();
        }

        let generator = CountingGenerator::new();
        let err = generate_for_user(&pool, &generator, "alice", &haiku_request())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::QuotaExceeded { used: 3, quota: 3 }));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_subscribed_user_is_not_metered() {
        let pool = connect_memory().await.unwrap();
        versewright_common::db::entitlements::activate_subscription(
            &pool,
            "alice",
            Some("cus_1"),
            None,
        )
        .await
        .unwrap();

        let generator = SampleGenerator::new();
        for _ in 0..5 {
            let outcome = generate_for_user(&pool, &generator, "alice", &haiku_request())
                .await
                .unwrap();
            assert!(outcome.saved);
        }

        let entitlement = load_or_create(&pool, "alice").await.unwrap();
        assert_eq!(entitlement.free_poems_generated, 0);
    }

    #[tokio::test]
    async fn test_backend_failure_costs_nothing() {
        let pool = connect_memory().await.unwrap();

        let err = generate_for_user(&pool, &FailingGenerator, "alice", &haiku_request())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GenerationBackend(_)));

        let entitlement = load_or_create(&pool, "alice").await.unwrap();
        assert_eq!(entitlement.free_poems_generated, 0);

        let poems: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM poems")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(poems, 0);
    }

    #[tokio::test]
    async fn test_save_failure_still_shows_and_meters() {
        let pool = connect_memory().await.unwrap();
        sqlx::query("DROP TABLE poems").execute(&pool).await.unwrap();

        let generator = SampleGenerator::new();
        let outcome = generate_for_user(&pool, &generator, "alice", &haiku_request())
            .await
            .unwrap();

        assert!(!outcome.saved);
        assert!(outcome.record.is_none());
        assert!(!outcome.draft.text.is_empty());
        assert_eq!(outcome.entitlement.free_poems_generated, 1);
    }

    #[tokio::test]
    async fn test_preview_then_claim_persists_once() {
        let pool = connect_memory().await.unwrap();
        let sessions = SessionStore::new();
        let session_id = sessions.ensure(None).await;
        let generator = SampleGenerator::new();

        let draft = generate_preview(&generator, &sessions, &session_id, &haiku_request())
            .await
            .unwrap();
        assert!(!draft.text.is_empty());

        // Preview is not persisted and not metered
        let poems: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM poems")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(poems, 0);

        let record = claim_pending(&pool, &sessions, &session_id, "alice")
            .await
            .unwrap();
        assert_eq!(record.unwrap().generated_text, draft.text);

        let duplicate = claim_pending(&pool, &sessions, &session_id, "alice")
            .await
            .unwrap();
        assert!(duplicate.is_none());

        let poems: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM poems")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(poems, 1);
    }

    #[tokio::test]
    async fn test_failed_claim_keeps_pending_for_retry() {
        let pool = connect_memory().await.unwrap();
        sqlx::query("DROP TABLE poems").execute(&pool).await.unwrap();

        let sessions = SessionStore::new();
        let session_id = sessions.ensure(None).await;
        let generator = SampleGenerator::new();
        generate_preview(&generator, &sessions, &session_id, &haiku_request())
            .await
            .unwrap();

        let first = claim_pending(&pool, &sessions, &session_id, "alice").await;
        assert!(first.is_err());

        // The pending poem was put back: a retry attempts the insert again
        // instead of reporting nothing to claim
        let second = claim_pending(&pool, &sessions, &session_id, "alice").await;
        assert!(second.is_err());
    }
}
