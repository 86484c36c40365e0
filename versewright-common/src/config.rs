//! Configuration loading
//!
//! Bootstrap configuration comes from a TOML file, with environment
//! variables layered on top and command-line flags applied last by the
//! binary. Precedence: CLI > environment > TOML > built-in default.
//!
//! Everything here is bootstrap-only; changing the file requires a restart.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5780;

/// Complete bootstrap configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub generation: GenerationConfig,
    pub identity: IdentityConfig,
    pub billing: BillingConfig,
}

/// HTTP server bind settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database location
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Per-user OS data directory, falling back to the working directory
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("versewright").join("versewright.db"))
        .unwrap_or_else(|| PathBuf::from("versewright.db"))
}

/// Which text generation backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerationBackendKind {
    /// Deterministic local generator, no network or credentials needed
    #[default]
    Sample,
    /// OpenAI-compatible chat completions API
    OpenAi,
}

/// Generation backend settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub backend: GenerationBackendKind,
    pub api_key: Option<String>,
    /// Override for self-hosted or proxied OpenAI-compatible endpoints
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: GenerationBackendKind::Sample,
            api_key: None,
            base_url: None,
            model: "gpt-3.5-turbo".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Identity provider settings
///
/// Bearer tokens are resolved by calling the provider's user endpoint. With
/// no base URL configured, every bearer token is rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 10,
        }
    }
}

/// Payment provider settings
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct BillingConfig {
    pub secret_key: Option<String>,
    pub price_id: Option<String>,
    pub webhook_secret: Option<String>,
    /// Fallback origin for checkout redirect URLs when the request has none
    pub checkout_origin: Option<String>,
}

impl Config {
    /// Load configuration
    ///
    /// An explicitly given path must exist. Otherwise the default location
    /// is tried and silently skipped when absent, leaving built-in defaults.
    /// Environment overrides are applied in both cases.
    pub fn load(explicit_path: Option<&Path>) -> Result<Config> {
        let mut config = match explicit_path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Layer environment variables over file/default values
    fn apply_env_overrides(&mut self) {
        if let Some(host) = env_string("VERSEWRIGHT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_string("VERSEWRIGHT_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Some(path) = env_string("VERSEWRIGHT_DATABASE") {
            self.database.path = PathBuf::from(path);
        }

        if let Some(key) = env_string("OPENAI_API_KEY") {
            self.generation.api_key = Some(key);
            // A key in the environment implies the live backend
            self.generation.backend = GenerationBackendKind::OpenAi;
        }
        if let Some(url) = env_string("OPENAI_BASE_URL") {
            self.generation.base_url = Some(url);
        }
        if let Some(model) = env_string("VERSEWRIGHT_GENERATION_MODEL") {
            self.generation.model = model;
        }

        if let Some(url) = env_string("VERSEWRIGHT_IDENTITY_URL") {
            self.identity.base_url = Some(url);
        }

        if let Some(key) = env_string("STRIPE_SECRET_KEY") {
            self.billing.secret_key = Some(key);
        }
        if let Some(price) = env_string("STRIPE_PRICE_ID") {
            self.billing.price_id = Some(price);
        }
        if let Some(secret) = env_string("STRIPE_WEBHOOK_SECRET") {
            self.billing.webhook_secret = Some(secret);
        }
        if let Some(origin) = env_string("VERSEWRIGHT_CHECKOUT_ORIGIN") {
            self.billing.checkout_origin = Some(origin);
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Default config file location alongside other per-user app data
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("versewright").join("versewright.toml"))
        .unwrap_or_else(|| PathBuf::from("versewright.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.generation.backend, GenerationBackendKind::Sample);
        assert_eq!(config.generation.model, "gpt-3.5-turbo");
        assert_eq!(config.billing.secret_key, None);
    }

    #[test]
    fn test_parse_full_file() {
        let toml = r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [database]
            path = "/tmp/verse.db"

            [generation]
            backend = "openai"
            api_key = "sk-test"
            model = "gpt-4o-mini"

            [identity]
            base_url = "https://id.example.com/auth/v1"

            [billing]
            secret_key = "sk_test_123"
            price_id = "price_123"
            webhook_secret = "whsec_123"
            checkout_origin = "https://versewright.example.com"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.path, PathBuf::from("/tmp/verse.db"));
        assert_eq!(config.generation.backend, GenerationBackendKind::OpenAi);
        assert_eq!(config.generation.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.billing.price_id.as_deref(), Some("price_123"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str("[server]\nport = 9000\n").unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.generation.backend, GenerationBackendKind::Sample);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let result = Config::load(Some(Path::new("/nonexistent/versewright.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_bind_addr() {
        let server = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 9999,
        };
        assert_eq!(server.bind_addr(), "0.0.0.0:9999");
    }
}
