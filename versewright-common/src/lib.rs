//! # Versewright Common Library
//!
//! Shared code for the Versewright poem generation service:
//! - Poem form vocabulary and generation request types
//! - Prompt compilation (pure, deterministic)
//! - Line count verification
//! - Entitlement gate decision logic
//! - Database models and queries (entitlements, poems)
//! - Configuration loading

pub mod config;
pub mod db;
pub mod entitlement;
pub mod error;
pub mod forms;
pub mod prompt;
pub mod verify;

pub use error::{Error, Result};
pub use forms::{GenerationRequest, LineLength, PoemType};
