//! Poem generation backends
//!
//! Two backends implement [`PoemGenerator`]: the OpenAI chat-completion
//! client and a deterministic sample generator used when no API key is
//! configured. Both consume the compiled [`GenerationInstruction`] and
//! return raw poem text; everything after that (persistence, metering,
//! line-count checking) is backend-agnostic.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;
use versewright_common::config::{GenerationBackendKind, GenerationConfig};
use versewright_common::prompt::GenerationInstruction;
use versewright_common::Result;

pub mod openai;
pub mod sample;

pub use openai::OpenAiGenerator;
pub use sample::SampleGenerator;

/// Generator trait - all generation backends implement this
#[async_trait]
pub trait PoemGenerator: Send + Sync {
    /// Backend identifier (e.g., "openai", "sample")
    fn backend_id(&self) -> &'static str;

    /// Generate poem text for a compiled instruction
    ///
    /// # Returns
    /// * `Ok(String)` - Raw poem text, line-separated
    /// * `Err(Error::GenerationBackend)` - Backend unreachable or rejected the request
    async fn generate(&self, instruction: &GenerationInstruction) -> Result<String>;
}

/// Build the generator selected by configuration
///
/// An `openai` backend without an API key falls back to the sample
/// generator so the service stays usable in development.
pub fn from_config(config: &GenerationConfig) -> Arc<dyn PoemGenerator> {
    match config.backend {
        GenerationBackendKind::OpenAi => match &config.api_key {
            Some(key) => Arc::new(OpenAiGenerator::new(
                key.clone(),
                config.base_url.clone(),
                config.model.clone(),
                config.timeout_secs,
            )),
            None => {
                warn!("OpenAI backend selected but no API key configured, using sample generator");
                Arc::new(SampleGenerator::new())
            }
        },
        GenerationBackendKind::Sample => Arc::new(SampleGenerator::new()),
    }
}
