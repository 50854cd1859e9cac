//! Language type: Flexible, validated language representation.
//!
//! This module provides the `Language` type, a small copyable handle that can
//! only be constructed for languages present and enabled in the registry.

use crate::i18n::{LanguageConfig, LanguageRegistry, LanguageStrings};
use anyhow::{bail, Result};

/// A validated language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Language {
    /// ISO 639-1 language code (e.g., "en", "es")
    code: &'static str,
}

impl Language {
    pub const ENGLISH: Language = Language { code: "en" };

    pub const SPANISH: Language = Language { code: "es" };

    /// Create a Language from a language code string.
    ///
    /// # Arguments
    /// * `code` - The ISO 639-1 language code (e.g., "en", "es", "es-MX")
    ///
    /// # Returns
    /// * `Ok(Language)` if the code is valid and the language is enabled
    /// * `Err` if the code is not found or the language is disabled
    pub fn from_code(code: &str) -> Result<Language> {
        let registry = LanguageRegistry::get();

        match registry.get_by_code(code) {
            Some(config) if config.enabled => Ok(Language {
                code: config.code, // Use the static str from the registry
            }),
            Some(_) => bail!("Language '{}' is not enabled", code),
            None => bail!("Unknown language code: '{}'", code),
        }
    }

    /// Resolve a display selection.
    ///
    /// An empty selection means "no translation" and resolves to the
    /// canonical language.
    pub fn from_selection(selection: &str) -> Result<Language> {
        let trimmed = selection.trim();
        if trimmed.is_empty() {
            Ok(Language::canonical())
        } else {
            Language::from_code(trimmed)
        }
    }

    /// Get the canonical (source) language.
    ///
    /// This is the language every transform produces its output in, and
    /// from which all translations are derived.
    pub fn canonical() -> Language {
        let config = LanguageRegistry::get().canonical();
        Language { code: config.code }
    }

    /// Get the ISO 639-1 language code.
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the full language configuration from the registry.
    ///
    /// # Panics
    /// Panics if the language code is not found in the registry. This should
    /// never happen if the Language was constructed properly (via `from_code`
    /// or constants).
    pub fn config(&self) -> &'static LanguageConfig {
        LanguageRegistry::get()
            .get_by_code(self.code)
            .expect("Language code should always be valid")
    }

    /// Get the English name of the language.
    pub fn name(&self) -> &'static str {
        self.config().name
    }

    /// Get the native name of the language.
    pub fn native_name(&self) -> &'static str {
        self.config().native_name
    }

    /// Localized card labels for this language.
    pub fn strings(&self) -> &'static LanguageStrings {
        self.config().strings
    }

    /// Check if this is the canonical language.
    pub fn is_canonical(&self) -> bool {
        self.config().is_canonical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Constant Tests ====================

    #[test]
    fn test_english_constant() {
        let english = Language::ENGLISH;
        assert_eq!(english.code(), "en");
        assert_eq!(english.name(), "English");
        assert!(english.is_canonical());
    }

    #[test]
    fn test_spanish_constant() {
        let spanish = Language::SPANISH;
        assert_eq!(spanish.code(), "es");
        assert_eq!(spanish.native_name(), "Español");
        assert!(!spanish.is_canonical());
    }

    // ==================== from_code Tests ====================

    #[test]
    fn test_from_code_with_region() {
        let language = Language::from_code("ja-JP").expect("Should succeed");
        assert_eq!(language.code(), "ja");
        assert_eq!(language.name(), "Japanese");
    }

    #[test]
    fn test_from_code_invalid() {
        let result = Language::from_code("xx");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Unknown"));
    }

    #[test]
    fn test_from_code_empty() {
        assert!(Language::from_code("").is_err());
    }

    // ==================== from_selection Tests ====================

    #[test]
    fn test_empty_selection_is_canonical() {
        assert_eq!(Language::from_selection("").unwrap(), Language::ENGLISH);
        assert_eq!(Language::from_selection("  ").unwrap(), Language::ENGLISH);
    }

    #[test]
    fn test_selection_en_is_canonical() {
        assert!(Language::from_selection("en").unwrap().is_canonical());
    }

    #[test]
    fn test_selection_target() {
        assert_eq!(Language::from_selection("es").unwrap(), Language::SPANISH);
        assert!(Language::from_selection("klingon").is_err());
    }

    // ==================== Strings Tests ====================

    #[test]
    fn test_strings_access() {
        assert_eq!(Language::ENGLISH.strings().summary_heading, "Summary");
        assert_eq!(Language::SPANISH.strings().summary_heading, "Resumen");
    }
}
