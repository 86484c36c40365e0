//! In-memory visitor sessions
//!
//! Anonymous visitors may generate one preview poem before signing in. The
//! poem is held here, keyed by a session id the client echoes back, and is
//! persisted exactly once when the signed-in user claims it. Nothing in a
//! session survives a process restart; a lost preview costs the visitor a
//! retry, not data.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use uuid::Uuid;
use versewright_common::forms::{LineLength, PoemType};

/// Header carrying the session id on generate and claim requests
pub const SESSION_HEADER: &str = "x-session-id";

/// Sessions idle longer than this are dropped
const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A generated-but-unsaved poem awaiting sign-in
#[derive(Debug, Clone)]
pub struct PendingPoem {
    pub poem_type: PoemType,
    pub rhyme_scheme: String,
    pub description: String,
    pub line_count: Option<u32>,
    pub line_length: LineLength,
    pub text: String,
}

#[derive(Debug)]
struct Session {
    pending: Option<PendingPoem>,
    last_touched: Instant,
}

impl Session {
    fn fresh() -> Self {
        Self {
            pending: None,
            last_touched: Instant::now(),
        }
    }

    fn expired(&self) -> bool {
        self.last_touched.elapsed() > SESSION_TTL
    }
}

/// Store of live visitor sessions
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a live session id, reusing the supplied one when still valid
    ///
    /// Unknown or expired ids get a fresh session rather than an error; the
    /// client just continues under the new id.
    pub async fn ensure(&self, session_id: Option<&str>) -> String {
        let mut sessions = self.inner.lock().await;
        sessions.retain(|_, session| !session.expired());

        if let Some(id) = session_id {
            if let Some(session) = sessions.get_mut(id) {
                session.last_touched = Instant::now();
                return id.to_string();
            }
        }

        let id = Uuid::new_v4().to_string();
        sessions.insert(id.clone(), Session::fresh());
        id
    }

    /// Attach a pending poem to a session, replacing any earlier one
    pub async fn put_pending(&self, session_id: &str, pending: PendingPoem) {
        let mut sessions = self.inner.lock().await;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(Session::fresh);
        session.pending = Some(pending);
        session.last_touched = Instant::now();
    }

    /// Remove and return the session's pending poem
    ///
    /// The removal happens under the lock, before the caller awaits any
    /// save, so a duplicate claim finds nothing and saves nothing.
    pub async fn take_pending(&self, session_id: &str) -> Option<PendingPoem> {
        let mut sessions = self.inner.lock().await;
        let session = sessions.get_mut(session_id)?;
        session.last_touched = Instant::now();
        session.pending.take()
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(text: &str) -> PendingPoem {
        PendingPoem {
            poem_type: PoemType::FreeVerse,
            rhyme_scheme: "None (Free Verse)".to_string(),
            description: "rain".to_string(),
            line_count: None,
            line_length: LineLength::Medium,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_ensure_creates_and_reuses_ids() {
        let store = SessionStore::new();

        let id = store.ensure(None).await;
        assert!(!id.is_empty());

        let same = store.ensure(Some(&id)).await;
        assert_eq!(same, id);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_id_gets_fresh_session() {
        let store = SessionStore::new();
        let id = store.ensure(Some("not-a-real-session")).await;
        assert_ne!(id, "not-a-real-session");
    }

    #[tokio::test]
    async fn test_take_pending_is_exactly_once() {
        let store = SessionStore::new();
        let id = store.ensure(None).await;

        store.put_pending(&id, pending("the poem")).await;

        let first = store.take_pending(&id).await;
        assert_eq!(first.unwrap().text, "the poem");

        let second = store.take_pending(&id).await;
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_take_pending_unknown_session() {
        let store = SessionStore::new();
        assert!(store.take_pending("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_new_pending_replaces_old() {
        let store = SessionStore::new();
        let id = store.ensure(None).await;

        store.put_pending(&id, pending("first")).await;
        store.put_pending(&id, pending("second")).await;

        let taken = store.take_pending(&id).await.unwrap();
        assert_eq!(taken.text, "second");
        assert!(store.take_pending(&id).await.is_none());
    }
}
