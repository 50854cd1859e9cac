//! Internationalization (i18n) module for multi-language display.
//!
//! All language-related logic, localized strings, and translation
//! infrastructure is contained here.
//!
//! # Architecture
//!
//! - `registry`: Single source of truth for all supported languages and their metadata
//! - `language`: Type-safe Language handle validated against the registry
//! - `strings`: Localized labels for the result card
//! - `validator`: Translation quality validation
//! - `metrics`: Translation cache and call counters
//!
//! # Example
//!
//! ```rust,ignore
//! use page_digest::i18n::{Language, LanguageRegistry};
//!
//! // Get canonical language (English)
//! let canonical = Language::canonical();
//!
//! // Create language from code
//! let spanish = Language::from_code("es")?;
//!
//! // List all enabled languages
//! let languages = LanguageRegistry::get().list_enabled();
//! ```

mod language;
mod metrics;
mod registry;
mod strings;
mod validator;

pub use language::Language;
pub use metrics::{MetricsReport, TranslationMetrics};
pub use registry::{LanguageConfig, LanguageRegistry};
pub use strings::LanguageStrings;
pub use validator::{TranslationValidator, ValidationReport};
