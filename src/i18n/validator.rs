//! Translation quality validation module.
//!
//! Checks that translated content keeps the elements the renderer and the
//! reader rely on: URLs, bold spans, bullet lines, headings, and the number
//! of key points.

use regex::Regex;
use std::sync::OnceLock;

/// Validation report containing errors and warnings about a translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Critical errors that indicate translation issues
    pub errors: Vec<String>,

    /// Non-critical warnings about potential issues
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Create a new empty validation report
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Check if the report has any errors
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Check if the report has any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if the report is clean (no errors or warnings)
    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Validator for translation quality.
pub struct TranslationValidator;

// Regex patterns for extraction (cached for performance)
static URL_REGEX: OnceLock<Regex> = OnceLock::new();
static BOLD_REGEX: OnceLock<Regex> = OnceLock::new();

impl TranslationValidator {
    /// Validate that a translated text preserves markup from the original.
    ///
    /// Checks URLs, `**bold**` spans, bullet lines and `##` headings.
    /// Every mismatch is a warning: the translation is still usable.
    pub fn validate(original: &str, translated: &str) -> ValidationReport {
        let mut report = ValidationReport::new();

        let orig_urls = Self::extract_urls(original);
        let trans_urls = Self::extract_urls(translated);
        if orig_urls != trans_urls {
            report.warnings.push(format!(
                "URL mismatch: original has {} URLs, translation has {} URLs",
                orig_urls.len(),
                trans_urls.len()
            ));
        }

        let orig_bold = Self::count_bold_spans(original);
        let trans_bold = Self::count_bold_spans(translated);
        if orig_bold != trans_bold {
            report.warnings.push(format!(
                "Bold span count mismatch: original has {}, translation has {}",
                orig_bold, trans_bold
            ));
        }

        let orig_bullets = Self::count_bullet_lines(original);
        let trans_bullets = Self::count_bullet_lines(translated);
        if orig_bullets != trans_bullets {
            report.warnings.push(format!(
                "Bullet count mismatch: original has {}, translation has {}",
                orig_bullets, trans_bullets
            ));
        }

        let orig_headings = Self::count_headings(original);
        let trans_headings = Self::count_headings(translated);
        if orig_headings != trans_headings {
            report.warnings.push(format!(
                "Heading count mismatch: original has {}, translation has {}",
                orig_headings, trans_headings
            ));
        }

        report
    }

    /// Validate a translated list against its source list.
    ///
    /// A count mismatch is an error; an empty translated item is a warning.
    pub fn validate_items(original: &[String], translated: &[String]) -> ValidationReport {
        let mut report = ValidationReport::new();

        if original.len() != translated.len() {
            report.errors.push(format!(
                "Item count mismatch: original has {}, translation has {}",
                original.len(),
                translated.len()
            ));
        }

        for (index, item) in translated.iter().enumerate() {
            if item.trim().is_empty() {
                report
                    .warnings
                    .push(format!("Translated item {} is empty", index + 1));
            }
        }

        report
    }

    /// Extract all URLs from text
    fn extract_urls(text: &str) -> Vec<String> {
        let regex = URL_REGEX.get_or_init(|| Regex::new(r"https?://[^\s)\]]+").unwrap());

        regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Count `**bold**` spans
    fn count_bold_spans(text: &str) -> usize {
        let regex = BOLD_REGEX.get_or_init(|| Regex::new(r"\*\*[^*\n]+\*\*").unwrap());
        regex.find_iter(text).count()
    }

    fn count_bullet_lines(text: &str) -> usize {
        text.lines()
            .map(str::trim_start)
            .filter(|line| line.starts_with("* ") || line.starts_with("- "))
            .count()
    }

    fn count_headings(text: &str) -> usize {
        text.lines()
            .map(str::trim_start)
            .filter(|line| line.starts_with("## ") || line.starts_with("### "))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== URL Extraction Tests ====================

    #[test]
    fn test_extract_urls_multiple() {
        let text = "Check https://example.com and http://test.org";
        let urls = TranslationValidator::extract_urls(text);
        assert_eq!(urls, vec!["https://example.com", "http://test.org"]);
    }

    #[test]
    fn test_extract_urls_in_markdown() {
        let text = "[Click here](https://example.com)";
        let urls = TranslationValidator::extract_urls(text);
        assert_eq!(urls, vec!["https://example.com"]);
    }

    // ==================== Markup Counting Tests ====================

    #[test]
    fn test_count_bold_spans() {
        assert_eq!(
            TranslationValidator::count_bold_spans("**One** and **two** and **open"),
            2
        );
        assert_eq!(TranslationValidator::count_bold_spans("none"), 0);
    }

    #[test]
    fn test_count_bullets_and_headings() {
        let text = "## Title\n* one\n- two\n  * three\nplain\n### Sub";
        assert_eq!(TranslationValidator::count_bullet_lines(text), 3);
        assert_eq!(TranslationValidator::count_headings(text), 2);
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_validate_perfect_translation() {
        let original = "## News\n* **Rust** 2.0 is out: https://example.com";
        let translated = "## Noticias\n* **Rust** 2.0 ya salió: https://example.com";

        let report = TranslationValidator::validate(original, translated);
        assert!(report.is_clean());
    }

    #[test]
    fn test_validate_lost_url_and_bullet() {
        let original = "* See https://example.com\n* Second";
        let translated = "Ver el enlace. Segundo";

        let report = TranslationValidator::validate(original, translated);
        assert!(!report.has_errors());
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings[0].contains("URL mismatch"));
        assert!(report.warnings[1].contains("Bullet count mismatch"));
    }

    #[test]
    fn test_validate_items_count_mismatch() {
        let original = vec!["a".to_string(), "b".to_string()];
        let translated = vec!["x".to_string()];

        let report = TranslationValidator::validate_items(&original, &translated);
        assert!(report.has_errors());
        assert!(report.errors[0].contains("original has 2"));
    }

    #[test]
    fn test_validate_items_empty_item() {
        let original = vec!["a".to_string(), "b".to_string()];
        let translated = vec!["x".to_string(), "  ".to_string()];

        let report = TranslationValidator::validate_items(&original, &translated);
        assert!(!report.has_errors());
        assert_eq!(report.warnings, vec!["Translated item 2 is empty"]);
    }

    #[test]
    fn test_validation_report_default() {
        let report = ValidationReport::default();
        assert!(report.is_clean());
    }
}
