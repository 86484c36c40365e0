//! Identity resolution
//!
//! The service does not run its own accounts. Bearer tokens are resolved to
//! an `Identity` by asking the external identity provider; handlers receive
//! the result through request extensions. A static in-memory provider backs
//! tests and doubles as the reject-everything fallback when no provider is
//! configured.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};
use versewright_common::{Error, Result};

use crate::AppState;

/// Default timeout for identity provider requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// An authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Opaque user id assigned by the identity provider
    pub id: String,
    pub email: Option<String>,
}

/// Resolves bearer tokens to identities
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token
    ///
    /// Returns `Unauthorized` for unknown or rejected tokens; other errors
    /// mean the provider itself could not be reached.
    async fn resolve(&self, token: &str) -> Result<Identity>;
}

/// Identity provider backed by an HTTP user-info endpoint
///
/// Sends `GET {base_url}/user` with the caller's bearer token and expects
/// `{"id": ..., "email": ...}` back.
pub struct HttpIdentityProvider {
    http_client: Client,
    base_url: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.into(),
        }
    }

    pub fn with_default_timeout(base_url: impl Into<String>) -> Self {
        Self::new(base_url, DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn resolve(&self, token: &str) -> Result<Identity> {
        let url = format!("{}/user", self.base_url.trim_end_matches('/'));

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::Internal(format!("Identity provider request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Unauthorized("Invalid or expired token".to_string()));
        }
        if !status.is_success() {
            return Err(Error::Internal(format!(
                "Identity provider returned {}",
                status
            )));
        }

        let user: ProviderUser = response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("Invalid identity provider response: {}", e)))?;

        debug!(user_id = %user.id, "Resolved bearer token");

        Ok(Identity {
            id: user.id,
            email: user.email,
        })
    }
}

/// Fixed token table; rejects everything it does not know
///
/// Used by tests, and by the binary when no identity provider is
/// configured (in which case it is empty and all bearers fail).
#[derive(Debug, Default)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, Identity>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn resolve(&self, token: &str) -> Result<Identity> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| Error::Unauthorized("Invalid or expired token".to_string()))
    }
}

/// Extract the token from an `Authorization: Bearer ...` header
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Resolve identity when a bearer header is present
///
/// No header means an anonymous caller, which is not an error here; a
/// present-but-invalid token is.
pub async fn optional_identity(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<Identity>> {
    match bearer_token(headers) {
        None => Ok(None),
        Some(token) => state.identity.resolve(&token).await.map(Some),
    }
}

/// Middleware for routes that require an authenticated user
///
/// On success the resolved `Identity` is inserted into request extensions
/// for handlers to extract.
pub async fn require_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(request.headers()) {
        Some(token) => token,
        None => return auth_error(StatusCode::UNAUTHORIZED, "Missing bearer token"),
    };

    match state.identity.resolve(&token).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(Error::Unauthorized(message)) => auth_error(StatusCode::UNAUTHORIZED, &message),
        Err(e) => {
            error!("Identity resolution failed: {}", e);
            auth_error(StatusCode::BAD_GATEWAY, "Identity provider unavailable")
        }
    }
}

fn auth_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

// ============================================================================
// Identity Provider Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
    email: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(
            bearer_token(&headers_with_auth("Bearer abc123")),
            Some("abc123".to_string())
        );
        assert_eq!(bearer_token(&headers_with_auth("Bearer ")), None);
        assert_eq!(bearer_token(&headers_with_auth("Basic abc123")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_static_provider_known_token() {
        let provider = StaticIdentityProvider::new().with_token(
            "tok-alice",
            Identity {
                id: "alice".to_string(),
                email: Some("alice@example.com".to_string()),
            },
        );

        let identity = provider.resolve("tok-alice").await.unwrap();
        assert_eq!(identity.id, "alice");
    }

    #[tokio::test]
    async fn test_static_provider_rejects_unknown_token() {
        let provider = StaticIdentityProvider::new();
        let result = provider.resolve("tok-nobody").await;
        assert!(matches!(result, Err(Error::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_http_provider_resolves_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "user-42",
                "email": "poet@example.com"
            })))
            .mount(&server)
            .await;

        let provider = HttpIdentityProvider::new(server.uri(), Duration::from_secs(2));
        let identity = provider.resolve("tok-1").await.unwrap();
        assert_eq!(identity.id, "user-42");
        assert_eq!(identity.email.as_deref(), Some("poet@example.com"));
    }

    #[tokio::test]
    async fn test_http_provider_maps_401_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let provider = HttpIdentityProvider::new(server.uri(), Duration::from_secs(2));
        let result = provider.resolve("tok-bad").await;
        assert!(matches!(result, Err(Error::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_http_provider_surfaces_server_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = HttpIdentityProvider::new(server.uri(), Duration::from_secs(2));
        let result = provider.resolve("tok-1").await;
        assert!(matches!(result, Err(Error::Internal(_))));
    }
}
