//! versewright-api library - HTTP service for the Versewright poem generator
//!
//! Exposes the generation pipeline, the poem library, entitlement status,
//! and billing endpoints. The binary in `main.rs` wires configuration into
//! `AppState` and serves `build_router`.

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use versewright_common::config::BillingConfig;

pub mod api;
pub mod auth;
pub mod billing;
pub mod generation;
pub mod pipeline;
pub mod session;

use auth::IdentityProvider;
use billing::checkout::CheckoutClient;
use generation::PoemGenerator;
use session::SessionStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// In-memory per-visitor sessions (pending poems for anonymous callers)
    pub sessions: SessionStore,
    /// Text generation backend
    pub generator: Arc<dyn PoemGenerator>,
    /// Bearer token resolution
    pub identity: Arc<dyn IdentityProvider>,
    /// Checkout session creation; absent when billing is not configured
    pub checkout: Option<Arc<CheckoutClient>>,
    /// Webhook signing secret; absent disables webhook processing
    pub webhook_secret: Option<String>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        db: SqlitePool,
        generator: Arc<dyn PoemGenerator>,
        identity: Arc<dyn IdentityProvider>,
        billing: &BillingConfig,
    ) -> Self {
        Self {
            db,
            sessions: SessionStore::new(),
            generator,
            identity,
            checkout: CheckoutClient::from_config(billing).map(Arc::new),
            webhook_secret: billing.webhook_secret.clone(),
        }
    }
}

/// Build application router
///
/// Protected routes resolve the bearer token up front and reject requests
/// without a valid one. The generate endpoint stays public because
/// anonymous callers may run unmetered preview generations; it resolves
/// identity itself. The webhook authenticates by signature, not bearer.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    // Protected routes (require an authenticated user)
    let protected = Router::new()
        .route("/api/session/claim", post(api::generate::claim_pending))
        .route("/api/entitlement", get(api::entitlement::get_entitlement))
        .route("/api/poems", get(api::poems::list_poems))
        .route(
            "/api/poems/:id",
            get(api::poems::get_poem)
                .patch(api::poems::update_poem)
                .delete(api::poems::delete_poem),
        )
        .route("/api/billing/checkout", post(api::billing::create_checkout))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_identity,
        ));

    // Public routes (no bearer requirement)
    let public = Router::new()
        .route("/api/generate", post(api::generate::generate_poem))
        .route("/api/billing/webhook", post(api::billing::stripe_webhook))
        .merge(api::health::health_routes());

    // Browser clients call from another origin; mirror headers they send
    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
