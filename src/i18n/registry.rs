//! Language registry: Single source of truth for all supported languages.
//!
//! This module provides a centralized registry of all languages the digest can
//! be displayed in. It uses a singleton pattern with `OnceLock` to ensure
//! thread-safe initialization and access.

use crate::i18n::strings::{
    LanguageStrings, ENGLISH_STRINGS, FRENCH_STRINGS, GERMAN_STRINGS, JAPANESE_STRINGS,
    SPANISH_STRINGS,
};
use std::sync::OnceLock;

/// Configuration for a supported language.
///
/// Contains all metadata for a specific language, including its code, names,
/// enabled status, whether it's the canonical language, and its UI strings.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// ISO 639-1 language code (e.g., "en", "es", "fr")
    pub code: &'static str,

    /// English name of the language (e.g., "English", "Spanish", "French")
    pub name: &'static str,

    /// Native name of the language (e.g., "English", "Español", "Français")
    pub native_name: &'static str,

    /// Whether this is the canonical/source language (only one should be true)
    pub is_canonical: bool,

    /// Whether this language is enabled for use
    pub enabled: bool,

    /// Localized labels for the result card
    pub strings: &'static LanguageStrings,
}

/// Global language registry singleton.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

/// Global registry instance (initialized lazily)
static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Get a language configuration by its code.
    ///
    /// Matching ignores ASCII case and a region suffix, so `"es-MX"` and
    /// `"ES"` both resolve to Spanish.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        let primary = code.split(['-', '_']).next().unwrap_or(code);
        self.languages
            .iter()
            .find(|lang| lang.code.eq_ignore_ascii_case(primary))
    }

    /// Get all enabled languages.
    pub fn list_enabled(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().filter(|lang| lang.enabled).collect()
    }

    /// Get all languages (including disabled ones).
    pub fn list_all(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().collect()
    }

    /// Get the canonical language configuration.
    ///
    /// # Panics
    /// Panics if no canonical language is found or if multiple canonical
    /// languages are defined (this indicates a configuration error).
    pub fn canonical(&self) -> &LanguageConfig {
        let canonical_langs: Vec<_> = self
            .languages
            .iter()
            .filter(|lang| lang.is_canonical)
            .collect();

        match canonical_langs.len() {
            0 => panic!("No canonical language found in registry"),
            1 => canonical_langs[0],
            _ => panic!("Multiple canonical languages found in registry"),
        }
    }

    /// Check if a language code is supported and enabled.
    pub fn is_enabled(&self, code: &str) -> bool {
        self.get_by_code(code)
            .map(|lang| lang.enabled)
            .unwrap_or(false)
    }
}

/// Default language configurations: English (canonical) plus the
/// translation targets offered in the language picker.
fn default_languages() -> Vec<LanguageConfig> {
    vec![
        LanguageConfig {
            code: "en",
            name: "English",
            native_name: "English",
            is_canonical: true,
            enabled: true,
            strings: &ENGLISH_STRINGS,
        },
        LanguageConfig {
            code: "es",
            name: "Spanish",
            native_name: "Español",
            is_canonical: false,
            enabled: true,
            strings: &SPANISH_STRINGS,
        },
        LanguageConfig {
            code: "fr",
            name: "French",
            native_name: "Français",
            is_canonical: false,
            enabled: true,
            strings: &FRENCH_STRINGS,
        },
        LanguageConfig {
            code: "de",
            name: "German",
            native_name: "Deutsch",
            is_canonical: false,
            enabled: true,
            strings: &GERMAN_STRINGS,
        },
        LanguageConfig {
            code: "ja",
            name: "Japanese",
            native_name: "日本語",
            is_canonical: false,
            enabled: true,
            strings: &JAPANESE_STRINGS,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_get_returns_singleton() {
        let registry1 = LanguageRegistry::get();
        let registry2 = LanguageRegistry::get();

        // Should return the same instance (same memory address)
        assert!(std::ptr::eq(registry1, registry2));
    }

    #[test]
    fn test_get_by_code_english() {
        let registry = LanguageRegistry::get();
        let config = registry.get_by_code("en").expect("English should exist");

        assert_eq!(config.code, "en");
        assert_eq!(config.name, "English");
        assert!(config.is_canonical);
        assert!(config.enabled);
    }

    #[test]
    fn test_get_by_code_ignores_region_and_case() {
        let registry = LanguageRegistry::get();
        assert_eq!(registry.get_by_code("es-MX").map(|c| c.code), Some("es"));
        assert_eq!(registry.get_by_code("FR").map(|c| c.code), Some("fr"));
        assert_eq!(registry.get_by_code("en_US").map(|c| c.code), Some("en"));
    }

    #[test]
    fn test_get_by_code_nonexistent() {
        let registry = LanguageRegistry::get();
        assert!(registry.get_by_code("xx").is_none());
        assert!(registry.get_by_code("").is_none());
    }

    #[test]
    fn test_list_enabled() {
        let registry = LanguageRegistry::get();
        let codes: Vec<_> = registry.list_enabled().iter().map(|c| c.code).collect();
        assert_eq!(codes, vec!["en", "es", "fr", "de", "ja"]);
        assert_eq!(registry.list_all().len(), 5);
    }

    #[test]
    fn test_canonical_returns_english() {
        let canonical = LanguageRegistry::get().canonical();
        assert_eq!(canonical.code, "en");
        assert!(canonical.is_canonical);
    }

    #[test]
    fn test_is_enabled() {
        let registry = LanguageRegistry::get();
        assert!(registry.is_enabled("ja"));
        assert!(!registry.is_enabled("xx"));
    }

    #[test]
    fn test_every_language_has_headings() {
        for lang in LanguageRegistry::get().list_all() {
            assert!(!lang.strings.summary_heading.is_empty(), "{}", lang.code);
            assert!(!lang.strings.key_points_heading.is_empty(), "{}", lang.code);
            assert!(!lang.strings.source_label.is_empty(), "{}", lang.code);
        }
    }
}
