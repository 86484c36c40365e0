//! Poem form vocabulary and generation request types
//!
//! A `GenerationRequest` is built exactly once at the HTTP boundary from the
//! wire payload. Form-level defaulting (rhyme scheme, line count) is applied
//! later by the prompt compiler, not during deserialization, so the request
//! still records what the caller actually asked for.

use serde::{Deserialize, Deserializer, Serialize};

/// Rhyme scheme sentinel: no rhyme enforcement
pub const RHYME_NONE: &str = "None (Free Verse)";

/// Rhyme scheme sentinel: backend picks its own rhyme
pub const RHYME_RANDOM: &str = "Random (AI Chooses)";

/// True when a scheme is a real letter pattern to enforce, not a sentinel
pub fn rhyme_enforced(scheme: &str) -> bool {
    scheme != RHYME_NONE && scheme != RHYME_RANDOM
}

/// Supported poem forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoemType {
    #[serde(rename = "Free Verse")]
    FreeVerse,
    Sonnet,
    Haiku,
    Limerick,
    Ballad,
    Acrostic,
    Cinquain,
    Villanelle,
    Couplet,
    Ode,
}

/// Per-form canonical defaults
///
/// `line_count_locked` forms have a fixed structure; the compiler ignores any
/// caller-supplied line count for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormDefaults {
    pub rhyme_scheme: &'static str,
    pub line_count: Option<u32>,
    pub line_count_locked: bool,
}

impl PoemType {
    /// All supported forms, in display order
    pub const ALL: [PoemType; 10] = [
        PoemType::FreeVerse,
        PoemType::Sonnet,
        PoemType::Haiku,
        PoemType::Limerick,
        PoemType::Ballad,
        PoemType::Acrostic,
        PoemType::Cinquain,
        PoemType::Villanelle,
        PoemType::Couplet,
        PoemType::Ode,
    ];

    /// Canonical display name (also the wire/database representation)
    pub fn display_name(&self) -> &'static str {
        match self {
            PoemType::FreeVerse => "Free Verse",
            PoemType::Sonnet => "Sonnet",
            PoemType::Haiku => "Haiku",
            PoemType::Limerick => "Limerick",
            PoemType::Ballad => "Ballad",
            PoemType::Acrostic => "Acrostic",
            PoemType::Cinquain => "Cinquain",
            PoemType::Villanelle => "Villanelle",
            PoemType::Couplet => "Couplet",
            PoemType::Ode => "Ode",
        }
    }

    /// Canonical defaults for this form
    ///
    /// Structured forms (Sonnet, Haiku, Limerick, Cinquain, Villanelle) lock
    /// their line count. Open forms leave it unset so the backend chooses a
    /// natural length.
    pub fn defaults(&self) -> FormDefaults {
        match self {
            PoemType::Sonnet => FormDefaults {
                rhyme_scheme: "ABABCDCDEFEFGG",
                line_count: Some(14),
                line_count_locked: true,
            },
            PoemType::Haiku => FormDefaults {
                rhyme_scheme: RHYME_NONE,
                line_count: Some(3),
                line_count_locked: true,
            },
            PoemType::Limerick => FormDefaults {
                rhyme_scheme: "AABBA",
                line_count: Some(5),
                line_count_locked: true,
            },
            PoemType::Cinquain => FormDefaults {
                rhyme_scheme: RHYME_NONE,
                line_count: Some(5),
                line_count_locked: true,
            },
            PoemType::Villanelle => FormDefaults {
                rhyme_scheme: "ABA",
                line_count: Some(19),
                line_count_locked: true,
            },
            PoemType::Couplet => FormDefaults {
                rhyme_scheme: "AABB (Couplet)",
                line_count: None,
                line_count_locked: false,
            },
            PoemType::FreeVerse
            | PoemType::Ballad
            | PoemType::Acrostic
            | PoemType::Ode => FormDefaults {
                rhyme_scheme: RHYME_NONE,
                line_count: None,
                line_count_locked: false,
            },
        }
    }
}

impl std::fmt::Display for PoemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Requested per-line length band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl LineLength {
    pub fn display_name(&self) -> &'static str {
        match self {
            LineLength::Short => "Short",
            LineLength::Medium => "Medium",
            LineLength::Long => "Long",
        }
    }

    /// Words-per-line band communicated to the generation backend
    pub fn word_band(&self) -> (u32, u32) {
        match self {
            LineLength::Short => (3, 6),
            LineLength::Medium => (7, 12),
            LineLength::Long => (13, 20),
        }
    }
}

impl std::fmt::Display for LineLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A poem generation request as received from the client
///
/// Wire tolerance: `lineCount` may arrive as a number, a numeric string, an
/// empty string, or the literal `"blank"` (the form's "AI decides" option).
/// All of the absent spellings normalize to `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    #[serde(default = "default_poem_type")]
    pub poem_type: PoemType,

    /// Raw caller-supplied scheme; `None` or empty means "use the form default"
    #[serde(default)]
    pub rhyme_scheme: Option<String>,

    /// Theme or description of the poem; required, validated by the compiler
    #[serde(default)]
    pub description: String,

    #[serde(default, deserialize_with = "deserialize_line_count")]
    pub line_count: Option<u32>,

    #[serde(default)]
    pub line_length: LineLength,
}

fn default_poem_type() -> PoemType {
    PoemType::FreeVerse
}

/// Accept `14`, `"14"`, `""`, `"blank"`, or null for the line count field
fn deserialize_line_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Count(u32),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Count(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("blank") {
                Ok(None)
            } else {
                trimmed
                    .parse::<u32>()
                    .map(Some)
                    .map_err(|_| serde::de::Error::custom("lineCount must be a positive integer"))
            }
        }
    }
}
