//! Programming-language hint extraction for code generation requests.
//!
//! A fixed, case-insensitive keyword match against a closed set of
//! languages. The first language in [`SUPPORTED_LANGUAGES`] order that is
//! mentioned wins; when none is mentioned the request falls back to
//! [`DEFAULT_LANGUAGE`].

use regex::Regex;
use std::sync::LazyLock;

/// Language used when the input names none of the supported ones.
pub const DEFAULT_LANGUAGE: &str = "javascript";

pub const SUPPORTED_LANGUAGES: [&str; 8] = [
    "python",
    "javascript",
    "typescript",
    "solidity",
    "c++",
    "rust",
    "java",
    "go",
];

// =============================================================================
// Compiled keyword patterns (compiled once, reused across calls)
// =============================================================================

static LANGUAGE_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    SUPPORTED_LANGUAGES
        .iter()
        .map(|lang| {
            // `\b` does not work after `+`, so bound keywords by non-word
            // characters explicitly.
            let pattern = format!(r"(?i)(?:^|\W){}(?:\W|$)", regex::escape(lang));
            (
                *lang,
                Regex::new(&pattern).expect("Invalid language regex"),
            )
        })
        .collect()
});

/// Pick the language a code request is asking for.
pub fn detect_language(input: &str) -> &'static str {
    LANGUAGE_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(input))
        .map(|(lang, _)| *lang)
        .unwrap_or(DEFAULT_LANGUAGE)
}
