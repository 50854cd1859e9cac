//! Typed errors for the digest pipeline.
//!
//! Uses `thiserror` for library errors so the presentation boundary can match
//! on the failure kind. Capability backends report `anyhow::Error`, which is
//! wrapped here with the capability that produced it.

use crate::capability::CapabilityKind;
use thiserror::Error;

/// Errors that can occur while extracting, transforming or translating.
#[derive(Debug, Error)]
pub enum DigestError {
    /// The backing capability is absent or its probe reported it unusable
    #[error("{capability} is not available")]
    CapabilityUnavailable { capability: CapabilityKind },

    /// Required text (page content, prompt, question, title) is empty or too short
    #[error("insufficient input: {reason}")]
    InsufficientInput { reason: String },

    /// A capability call itself failed
    #[error("{capability} failed: {source}")]
    InvocationFailure {
        capability: CapabilityKind,
        #[source]
        source: anyhow::Error,
    },

    /// Translation failed; the English result is still valid and displayable
    #[error("translation to {language} failed: {reason}")]
    TranslationFailure { language: String, reason: String },

    /// The selected language code is not in the registry or is disabled
    #[error("unsupported language: '{code}'")]
    UnsupportedLanguage { code: String },

    /// The operation was cancelled or superseded by a newer one
    #[error("operation cancelled")]
    Cancelled,
}

impl DigestError {
    pub fn insufficient(reason: impl Into<String>) -> Self {
        Self::InsufficientInput {
            reason: reason.into(),
        }
    }

    /// Whether this error means the user simply started something newer.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type for pipeline operations.
pub type DigestResult<T> = std::result::Result<T, DigestError>;
