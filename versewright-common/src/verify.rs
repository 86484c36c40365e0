//! Post-generation line count verification
//!
//! The generation backend is asked for an exact line count but cannot be
//! trusted to deliver one. This check observes the result and reports the
//! discrepancy; it never rejects or repairs the poem.

use serde::Serialize;

/// Outcome of comparing a generated poem against a requested line count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineCountCheck {
    pub requested: u32,
    pub actual: u32,
    pub ok: bool,
}

/// Count the lines of a poem
///
/// Blank lines are stanza separators, not lines of the poem, so they are
/// excluded. A 14-line sonnet printed as four stanzas still counts as 14.
pub fn count_poem_lines(text: &str) -> u32 {
    text.lines().filter(|line| !line.trim().is_empty()).count() as u32
}

/// Compare a poem against the requested line count, if one was set
pub fn check_line_count(text: &str, requested: Option<u32>) -> Option<LineCountCheck> {
    requested.map(|requested| {
        let actual = count_poem_lines(text);
        LineCountCheck {
            requested,
            actual,
            ok: actual == requested,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_simple_lines() {
        assert_eq!(count_poem_lines("one\ntwo\nthree"), 3);
    }

    #[test]
    fn test_blank_lines_are_stanza_breaks() {
        let poem = "first line\nsecond line\n\nthird line\nfourth line\n";
        assert_eq!(count_poem_lines(poem), 4);
    }

    #[test]
    fn test_whitespace_only_lines_excluded() {
        assert_eq!(count_poem_lines("a\n   \nb\n\t\nc"), 3);
    }

    #[test]
    fn test_empty_text_has_zero_lines() {
        assert_eq!(count_poem_lines(""), 0);
        assert_eq!(count_poem_lines("\n\n"), 0);
    }

    #[test]
    fn test_check_matches() {
        let check = check_line_count("a\nb\nc", Some(3)).unwrap();
        assert!(check.ok);
        assert_eq!(check.actual, 3);
        assert_eq!(check.requested, 3);
    }

    #[test]
    fn test_check_reports_mismatch() {
        let check = check_line_count("a\nb", Some(3)).unwrap();
        assert!(!check.ok);
        assert_eq!(check.actual, 2);
    }

    #[test]
    fn test_no_check_without_requested_count() {
        assert_eq!(check_line_count("a\nb", None), None);
    }

    #[test]
    fn test_stanza_form_counts_to_fourteen() {
        let sonnet = "\
When morning fills the quiet air,
And sunlight dances up above,
The world awakens bright and fair,
A testament to endless love.

Each moment holds a gift to see,
In simple things that pass unseen,
The stories told from tree to tree,
Of life's eternal changing scene.

So let us pause and breathe it in,
The morning that surrounds us here,
And find in every breeze and din,
A reason to hold life more dear.

For in these moments as they are,
We glimpse the light of one far star.";
        assert_eq!(count_poem_lines(sonnet), 14);
    }
}
