//! Turning raw user input into a filesystem-safe name.

use std::sync::{Arc, OnceLock};

use chrono::Utc;
use regex::Regex;
use tracing::debug;

use relabel_core::RenameConfig;

/// Maps text to an ASCII approximation.
///
/// Implementations must be pure and total. Any `Fn(&str) -> String` closure
/// can be used as one.
pub trait Transliterator: Send + Sync {
    fn transliterate(&self, input: &str) -> String;
}

impl<F> Transliterator for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn transliterate(&self, input: &str) -> String {
        self(input)
    }
}

/// Transliterates with the `deunicode` tables (`Æneid` -> `AEneid`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiTransliterator;

impl Transliterator for AsciiTransliterator {
    fn transliterate(&self, input: &str) -> String {
        deunicode::deunicode(input)
    }
}

/// A name made only of word characters and dashes. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SanitizedName(String);

impl SanitizedName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for SanitizedName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SanitizedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

fn disallowed() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w-]+").expect("disallowed pattern is valid"))
}

fn dash_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-{2,}").expect("dash pattern is valid"))
}

/// Produces a [`SanitizedName`] from arbitrary input.
#[derive(Clone)]
pub struct NameSanitizer {
    transliterator: Arc<dyn Transliterator>,
    max_chars: usize,
}

impl std::fmt::Debug for NameSanitizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameSanitizer")
            .field("max_chars", &self.max_chars)
            .finish_non_exhaustive()
    }
}

impl Default for NameSanitizer {
    fn default() -> Self {
        Self::new(Arc::new(AsciiTransliterator), 50)
    }
}

impl NameSanitizer {
    /// Create a sanitizer keeping at most `max_chars` code points of input.
    pub fn new(transliterator: Arc<dyn Transliterator>, max_chars: usize) -> Self {
        Self {
            transliterator,
            max_chars: max_chars.max(1),
        }
    }

    /// Create a sanitizer using the configured input limit.
    pub fn from_config(config: &RenameConfig, transliterator: Arc<dyn Transliterator>) -> Self {
        Self::new(transliterator, config.max_name_chars)
    }

    /// Sanitize raw input.
    ///
    /// The input is cut to the configured number of code points and
    /// transliterated. Whitespace runs become single dashes, anything other
    /// than word characters and dashes is dropped, and dash runs are
    /// collapsed and trimmed. If nothing survives, the current Unix
    /// timestamp is used instead.
    pub fn sanitize(&self, raw: &str) -> SanitizedName {
        let truncated: String = raw.chars().take(self.max_chars).collect();
        let transliterated = self.transliterator.transliterate(&truncated);

        let dashed = whitespace().replace_all(transliterated.trim(), "-");
        let stripped = disallowed().replace_all(&dashed, "");
        let collapsed = dash_runs().replace_all(&stripped, "-");
        let name = collapsed.trim_matches('-');

        if name.is_empty() {
            let fallback = Utc::now().timestamp().to_string();
            debug!(raw, fallback = %fallback, "nothing left after sanitizing, using timestamp");
            return SanitizedName(fallback);
        }

        SanitizedName(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_clean(name: &str) -> bool {
        !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    }

    #[test]
    fn test_sanitize_spaces_and_symbols() {
        let sanitizer = NameSanitizer::default();
        assert_eq!(sanitizer.sanitize("  New  Report!!  ").as_str(), "New-Report");
        assert_eq!(sanitizer.sanitize("my file (final)").as_str(), "my-file-final");
        assert_eq!(sanitizer.sanitize("a/b\\c").as_str(), "abc");
        assert_eq!(sanitizer.sanitize("under_score").as_str(), "under_score");
    }

    #[test]
    fn test_sanitize_clean_input_unchanged() {
        let sanitizer = NameSanitizer::default();
        assert_eq!(sanitizer.sanitize("already-clean").as_str(), "already-clean");

        let once = sanitizer.sanitize("Grüße aus Köln");
        let twice = sanitizer.sanitize(once.as_str());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_sanitize_transliterates() {
        let sanitizer = NameSanitizer::default();
        assert_eq!(sanitizer.sanitize("Crème brûlée").as_str(), "Creme-brulee");
        assert_eq!(sanitizer.sanitize("Ærøskøbing").as_str(), "AEroskobing");
    }

    #[test]
    fn test_sanitize_empty_falls_back_to_timestamp() {
        let sanitizer = NameSanitizer::default();
        for raw in ["", "***", "   ", "---", "!@#$%^&*()"] {
            let name = sanitizer.sanitize(raw);
            assert!(!name.as_str().is_empty(), "{raw:?}");
            assert!(name.as_str().chars().all(|c| c.is_ascii_digit()), "{raw:?}");
        }
    }

    #[test]
    fn test_sanitize_truncates_code_points() {
        let sanitizer = NameSanitizer::default();
        let long = "a".repeat(120);
        assert_eq!(sanitizer.sanitize(&long).as_str().chars().count(), 50);

        // Truncation happens before transliteration, on code points.
        let accented = "é".repeat(60);
        assert_eq!(sanitizer.sanitize(&accented).as_str(), "e".repeat(50));
    }

    #[test]
    fn test_sanitize_is_total() {
        let sanitizer = NameSanitizer::default();
        let inputs = [
            "\u{0}\u{1}\u{7f}",
            "\t\n\r",
            "..",
            "../../etc/passwd",
            "名前 ファイル",
            "emoji 🎉 party",
            "x",
            "--a--b--",
        ];
        for raw in inputs {
            let name = sanitizer.sanitize(raw);
            assert!(is_clean(name.as_str()), "{raw:?} -> {name}");
        }
    }

    #[test]
    fn test_custom_transliterator() {
        let sanitizer = NameSanitizer::new(Arc::new(|s: &str| s.to_uppercase()), 10);
        assert_eq!(sanitizer.sanitize("hello world").as_str(), "HELLO-WORL");
    }

    #[test]
    fn test_unicode_word_characters_kept() {
        // Without transliteration the class is Unicode-aware.
        let sanitizer = NameSanitizer::new(Arc::new(|s: &str| s.to_string()), 50);
        assert_eq!(sanitizer.sanitize("Überblick 2024!").as_str(), "Überblick-2024");
    }
}
