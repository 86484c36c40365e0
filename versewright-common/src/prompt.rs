//! Prompt compilation
//!
//! Turns a validated `GenerationRequest` into a `GenerationInstruction`: the
//! natural-language prompt sent to the generation backend plus the structured
//! constraints echoed alongside it for later verification.
//!
//! Compilation is pure and deterministic. All form-level defaulting happens
//! here, exactly once: callers upstream pass through what the user supplied,
//! callers downstream can rely on a normalized instruction (the rhyme scheme
//! is never empty, locked forms always carry their canonical line count).

use crate::error::{Error, Result};
use crate::forms::{rhyme_enforced, GenerationRequest, LineLength, PoemType, RHYME_NONE};
use serde::{Deserialize, Serialize};

/// A compiled generation instruction
///
/// `rhyme_pattern` holds the per-line rhyme-group letters (the scheme cycled
/// to the exact line count) when rhyme is enforced and a count is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationInstruction {
    pub prompt: String,
    pub poem_type: PoemType,
    pub rhyme_scheme: String,
    pub line_count: Option<u32>,
    pub line_length: LineLength,
    pub theme: String,
    pub rhyme_pattern: Option<String>,
}

/// Compile a request into a generation instruction
///
/// Defaulting rules:
/// - An absent or empty rhyme scheme falls back to the form default, so the
///   compiled scheme is never empty.
/// - Locked forms (Sonnet, Haiku, Limerick, Cinquain, Villanelle) force their
///   canonical line count regardless of caller input.
/// - Open forms use the caller's line count when given, otherwise the backend
///   chooses a natural length.
///
/// Returns a `Validation` error for an empty description or a zero line
/// count, before any network activity.
pub fn compile(request: &GenerationRequest) -> Result<GenerationInstruction> {
    let theme = request.description.trim();
    if theme.is_empty() {
        return Err(Error::Validation("Description is required".to_string()));
    }

    let defaults = request.poem_type.defaults();

    let rhyme_scheme = request
        .rhyme_scheme
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(defaults.rhyme_scheme)
        .to_string();

    let line_count = if defaults.line_count_locked {
        defaults.line_count
    } else {
        request.line_count.or(defaults.line_count)
    };

    if line_count == Some(0) {
        return Err(Error::Validation(
            "Line count must be at least 1".to_string(),
        ));
    }

    let enforce = rhyme_enforced(&rhyme_scheme);
    let rhyme_pattern = match (enforce, line_count) {
        (true, Some(count)) => {
            Some(expand_rhyme_pattern(&rhyme_scheme, count)).filter(|p| !p.is_empty())
        }
        _ => None,
    };

    let prompt = build_prompt(
        request.poem_type,
        &rhyme_scheme,
        line_count,
        request.line_length,
        theme,
        rhyme_pattern.as_deref(),
    );

    Ok(GenerationInstruction {
        prompt,
        poem_type: request.poem_type,
        rhyme_scheme,
        line_count,
        line_length: request.line_length,
        theme: theme.to_string(),
        rhyme_pattern,
    })
}

/// Expand a rhyme scheme to per-line rhyme-group letters
///
/// The scheme's letter pattern is applied sequentially and cycled or
/// truncated to exactly `line_count` letters. Display suffixes such as the
/// `" (Couplet)"` in `"AABB (Couplet)"` are not part of the pattern.
///
/// ```
/// use versewright_common::prompt::expand_rhyme_pattern;
///
/// assert_eq!(expand_rhyme_pattern("AABB", 5), "AABBA");
/// assert_eq!(expand_rhyme_pattern("AB", 5), "ABABA");
/// assert_eq!(expand_rhyme_pattern("AABB (Couplet)", 6), "AABBAA");
/// assert_eq!(expand_rhyme_pattern("ABABCDCDEFEFGG", 14), "ABABCDCDEFEFGG");
/// ```
pub fn expand_rhyme_pattern(scheme: &str, line_count: u32) -> String {
    let letters: Vec<char> = scheme
        .chars()
        .take_while(|c| c.is_ascii_uppercase())
        .collect();

    // Tolerate lowercase or oddly formatted caller input
    let letters: Vec<char> = if letters.is_empty() {
        scheme
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_uppercase())
            .collect()
    } else {
        letters
    };

    if letters.is_empty() {
        return String::new();
    }

    (0..line_count as usize)
        .map(|i| letters[i % letters.len()])
        .collect()
}

fn build_prompt(
    poem_type: PoemType,
    rhyme_scheme: &str,
    line_count: Option<u32>,
    line_length: LineLength,
    theme: &str,
    rhyme_pattern: Option<&str>,
) -> String {
    let enforce = rhyme_enforced(rhyme_scheme);
    let (min_words, max_words) = line_length.word_band();

    let mut prompt = format!("Write a {} poem", poem_type.display_name());

    if enforce {
        prompt.push_str(&format!(" with {} rhyme scheme", rhyme_scheme));
    }

    if let Some(count) = line_count {
        prompt.push_str(&format!(" with {} lines", count));
    }

    prompt.push_str(&format!(
        " using {} lines",
        line_length.display_name().to_lowercase()
    ));
    prompt.push_str(&format!(". Theme/Description: {}", theme));

    prompt.push_str(
        "\n\nPlease write a beautiful, creative poem that captures the essence of the \
         description. Make it emotionally resonant and well-crafted.",
    );

    match line_count {
        Some(count) => {
            prompt.push_str(&format!(
                "\n\n**THE POEM MUST CONTAIN EXACTLY {count} LINES. NO MORE, NO LESS. THIS IS A \
                 STRICT AND NON-NEGOTIABLE REQUIREMENT.**"
            ));
            prompt.push_str(&format!(
                "\nCount each line carefully. The final poem MUST have EXACTLY {count} lines."
            ));
            prompt.push_str(&format!(
                "\nIf needed, adjust the content, flow, or structure to fit precisely into \
                 {count} lines."
            ));
            prompt.push_str(&format!(
                "\nDO NOT include title, author name, or any other text that is not part of the \
                 {count} lines of the poem."
            ));
        }
        None => {
            prompt.push_str(&format!(
                "\n\nGenerate a poem with a natural length suitable for a {} with {} lines.",
                poem_type.display_name(),
                line_length.display_name()
            ));
        }
    }

    prompt.push_str(&format!(
        "\n\nEach line should contain roughly {min_words} to {max_words} words."
    ));

    if enforce {
        prompt.push_str(&format!(
            "\n\n**STRICTLY APPLY the \"{rhyme_scheme}\" rhyme pattern line-by-line, stopping \
             PRECISELY at the specified line count.** Apply the pattern sequentially: if the \
             rhyme pattern is AABB and the poem needs 5 lines, use AABBA."
        ));
        if let (Some(count), Some(pattern)) = (line_count, rhyme_pattern) {
            prompt.push_str(&format!(
                "\nThis poem needs {count} lines, so the line-by-line rhyme pattern is {pattern}."
            ));
        }
        prompt.push_str(
            "\n\n**IMPORTANT: DO NOT repeat the exact same word at the end of different rhyming \
             lines.** Each rhyme should use different words with similar sounds (e.g., \
             'light'/'bright', not 'light'/'light'). The only exception is if the poem's \
             structure (like a Villanelle) explicitly requires repeating entire lines as \
             refrains. Strive for diverse and creative rhyming words throughout the poem.",
        );
    }

    if let Some(count) = line_count {
        prompt.push_str(&format!(
            "\n\nBefore finalizing the poem, COUNT THE LINES ONE BY ONE and verify that the \
             total is EXACTLY {count} lines. If it's not exactly {count} lines, revise \
             immediately."
        ));
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::RHYME_RANDOM;

    fn request(poem_type: PoemType, description: &str) -> GenerationRequest {
        GenerationRequest {
            poem_type,
            rhyme_scheme: None,
            description: description.to_string(),
            line_count: None,
            line_length: LineLength::Medium,
        }
    }

    #[test]
    fn test_haiku_compiles_to_three_lines_without_rhyme() {
        let instruction = compile(&request(PoemType::Haiku, "autumn rain")).unwrap();

        assert_eq!(instruction.line_count, Some(3));
        assert_eq!(instruction.rhyme_scheme, RHYME_NONE);
        assert_eq!(instruction.rhyme_pattern, None);
        assert!(instruction.prompt.contains("EXACTLY 3 LINES"));
        assert!(!instruction.prompt.contains("rhyme scheme"));
        assert!(instruction.prompt.contains("autumn rain"));
    }

    #[test]
    fn test_sonnet_compiles_to_fourteen_lines_with_scheme() {
        let instruction = compile(&request(PoemType::Sonnet, "the sea")).unwrap();

        assert_eq!(instruction.line_count, Some(14));
        assert_eq!(instruction.rhyme_scheme, "ABABCDCDEFEFGG");
        assert_eq!(instruction.rhyme_pattern.as_deref(), Some("ABABCDCDEFEFGG"));
        assert!(instruction.prompt.contains("ABABCDCDEFEFGG"));
        assert!(instruction.prompt.contains("EXACTLY 14 LINES"));
    }

    #[test]
    fn test_empty_description_rejected() {
        let result = compile(&request(PoemType::FreeVerse, "   "));
        match result {
            Err(Error::Validation(message)) => assert_eq!(message, "Description is required"),
            other => panic!("expected validation error, got {:?}", other.map(|i| i.prompt)),
        }
    }

    #[test]
    fn test_locked_forms_ignore_caller_line_count() {
        let mut haiku = request(PoemType::Haiku, "snow");
        haiku.line_count = Some(10);
        assert_eq!(compile(&haiku).unwrap().line_count, Some(3));

        let mut villanelle = request(PoemType::Villanelle, "dawn");
        villanelle.line_count = Some(4);
        let compiled = compile(&villanelle).unwrap();
        assert_eq!(compiled.line_count, Some(19));
        assert_eq!(compiled.rhyme_pattern.as_deref(), Some("ABAABAABAABAABAABAA"));
    }

    #[test]
    fn test_open_forms_honor_caller_line_count() {
        let mut ballad = request(PoemType::Ballad, "the north road");
        ballad.line_count = Some(8);
        assert_eq!(compile(&ballad).unwrap().line_count, Some(8));
    }

    #[test]
    fn test_zero_line_count_rejected() {
        let mut bad = request(PoemType::FreeVerse, "dust");
        bad.line_count = Some(0);
        assert!(matches!(compile(&bad), Err(Error::Validation(_))));
    }

    #[test]
    fn test_caller_scheme_overrides_form_default() {
        let mut req = request(PoemType::FreeVerse, "embers");
        req.rhyme_scheme = Some("ABAB".to_string());
        req.line_count = Some(8);
        let instruction = compile(&req).unwrap();
        assert_eq!(instruction.rhyme_scheme, "ABAB");
        assert_eq!(instruction.rhyme_pattern.as_deref(), Some("ABABABAB"));
    }

    #[test]
    fn test_empty_scheme_falls_back_to_form_default() {
        let mut req = request(PoemType::Sonnet, "tides");
        req.rhyme_scheme = Some("  ".to_string());
        let instruction = compile(&req).unwrap();
        assert_eq!(instruction.rhyme_scheme, "ABABCDCDEFEFGG");
        assert!(!instruction.rhyme_scheme.is_empty());
    }

    #[test]
    fn test_scheme_is_never_empty_for_any_form() {
        for poem_type in PoemType::ALL {
            let instruction = compile(&request(poem_type, "a theme")).unwrap();
            assert!(!instruction.rhyme_scheme.is_empty(), "{poem_type}");
        }
    }

    #[test]
    fn test_random_sentinel_disables_enforcement() {
        let mut req = request(PoemType::FreeVerse, "storms");
        req.rhyme_scheme = Some(RHYME_RANDOM.to_string());
        req.line_count = Some(6);
        let instruction = compile(&req).unwrap();
        assert_eq!(instruction.rhyme_pattern, None);
        assert!(!instruction.prompt.contains("STRICTLY APPLY"));
    }

    #[test]
    fn test_couplet_default_scheme_expands_without_suffix() {
        let mut req = request(PoemType::Couplet, "two birds");
        req.line_count = Some(6);
        let instruction = compile(&req).unwrap();
        assert_eq!(instruction.rhyme_scheme, "AABB (Couplet)");
        assert_eq!(instruction.rhyme_pattern.as_deref(), Some("AABBAA"));
    }

    #[test]
    fn test_couplet_accepts_odd_line_count() {
        let mut req = request(PoemType::Couplet, "two birds");
        req.line_count = Some(5);
        let instruction = compile(&req).unwrap();
        assert_eq!(instruction.line_count, Some(5));
        assert_eq!(instruction.rhyme_pattern.as_deref(), Some("AABBA"));
    }

    #[test]
    fn test_expand_rhyme_pattern_cycles_and_truncates() {
        assert_eq!(expand_rhyme_pattern("AABB", 5), "AABBA");
        assert_eq!(expand_rhyme_pattern("AB", 5), "ABABA");
        assert_eq!(expand_rhyme_pattern("AABB", 2), "AA");
        assert_eq!(expand_rhyme_pattern("ABA", 19), "ABAABAABAABAABAABAA");
        assert_eq!(expand_rhyme_pattern("abab", 4), "ABAB");
        assert_eq!(expand_rhyme_pattern("1234", 4), "");
    }

    #[test]
    fn test_no_count_prompt_asks_for_natural_length() {
        let instruction = compile(&request(PoemType::FreeVerse, "a river at night")).unwrap();
        assert_eq!(instruction.line_count, None);
        assert!(instruction.prompt.contains("natural length"));
        assert!(!instruction.prompt.contains("NON-NEGOTIABLE"));
    }

    #[test]
    fn test_word_band_present_in_prompt() {
        let mut req = request(PoemType::FreeVerse, "glass");
        req.line_length = LineLength::Short;
        let instruction = compile(&req).unwrap();
        assert!(instruction.prompt.contains("3 to 6 words"));
    }

    #[test]
    fn test_theme_is_trimmed() {
        let instruction = compile(&request(PoemType::FreeVerse, "  the last train  ")).unwrap();
        assert_eq!(instruction.theme, "the last train");
    }
}
