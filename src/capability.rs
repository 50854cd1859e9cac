//! Capability contracts for the text transforms.
//!
//! Every generative capability is a trait object with an explicit
//! availability probe. The [`CapabilityRegistry`] holds at most one backend
//! per kind and refuses to hand out a capability whose probe fails, so
//! `CapabilityUnavailable` is always raised before any invocation attempt.

use crate::error::{DigestError, DigestResult};
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

// =============================================================================
// Kinds and Availability
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Summarizer,
    Translator,
    Rewriter,
    Proofreader,
    Writer,
    Answerer,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 6] = [
        CapabilityKind::Summarizer,
        CapabilityKind::Translator,
        CapabilityKind::Rewriter,
        CapabilityKind::Proofreader,
        CapabilityKind::Writer,
        CapabilityKind::Answerer,
    ];
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CapabilityKind::Summarizer => "Summarizer",
            CapabilityKind::Translator => "Translator",
            CapabilityKind::Rewriter => "Rewriter",
            CapabilityKind::Proofreader => "Proofreader",
            CapabilityKind::Writer => "Writer",
            CapabilityKind::Answerer => "Answerer",
        };
        f.write_str(name)
    }
}

/// Result of probing a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable,
}

impl Availability {
    pub fn is_available(self) -> bool {
        self == Availability::Available
    }
}

// =============================================================================
// Request Options
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryMode {
    Tldr,
    KeyPoints,
}

impl SummaryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryMode::Tldr => "tldr",
            SummaryMode::KeyPoints => "key-points",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryLength {
    Short,
    Medium,
    Long,
}

impl SummaryLength {
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryLength::Short => "short",
            SummaryLength::Medium => "medium",
            SummaryLength::Long => "long",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizeOptions {
    pub mode: SummaryMode,
    pub length: SummaryLength,
    pub output_language: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteLength {
    Shorter,
    AsIs,
    Longer,
}

impl RewriteLength {
    pub fn as_str(self) -> &'static str {
        match self {
            RewriteLength::Shorter => "shorter",
            RewriteLength::AsIs => "as-is",
            RewriteLength::Longer => "longer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteTone {
    MoreFormal,
    AsIs,
    MoreCasual,
}

impl RewriteTone {
    pub fn as_str(self) -> &'static str {
        match self {
            RewriteTone::MoreFormal => "more-formal",
            RewriteTone::AsIs => "as-is",
            RewriteTone::MoreCasual => "more-casual",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOptions {
    pub length: Option<RewriteLength>,
    pub tone: Option<RewriteTone>,
    pub context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofreadOptions {
    pub expected_input_languages: Vec<String>,
}

impl Default for ProofreadOptions {
    fn default() -> Self {
        Self {
            expected_input_languages: vec!["en".to_string()],
        }
    }
}

// =============================================================================
// Capability Traits
// =============================================================================

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn availability(&self) -> Availability;
    async fn summarize(&self, text: &str, options: &SummarizeOptions) -> Result<String>;
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn availability(&self) -> Availability;
    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String>;
}

#[async_trait]
pub trait Rewriter: Send + Sync {
    async fn availability(&self) -> Availability;
    async fn rewrite(&self, text: &str, options: &RewriteOptions) -> Result<String>;
}

#[async_trait]
pub trait Proofreader: Send + Sync {
    async fn availability(&self) -> Availability;
    /// Returns `Ok(None)` when the backend has no correction to offer.
    async fn proofread(&self, text: &str, options: &ProofreadOptions) -> Result<Option<String>>;
}

#[async_trait]
pub trait Writer: Send + Sync {
    async fn availability(&self) -> Availability;
    async fn write(&self, prompt: &str, output_language: &str) -> Result<String>;
}

#[async_trait]
pub trait Answerer: Send + Sync {
    async fn availability(&self) -> Availability;
    async fn answer(&self, question: &str, grounding_context: &str) -> Result<String>;
}

// =============================================================================
// Registry
// =============================================================================

/// One optional backend per capability kind.
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    summarizer: Option<Arc<dyn Summarizer>>,
    translator: Option<Arc<dyn Translator>>,
    rewriter: Option<Arc<dyn Rewriter>>,
    proofreader: Option<Arc<dyn Proofreader>>,
    writer: Option<Arc<dyn Writer>>,
    answerer: Option<Arc<dyn Answerer>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one backend for all six capabilities.
    pub fn with_backend<B>(backend: Arc<B>) -> Self
    where
        B: Summarizer + Translator + Rewriter + Proofreader + Writer + Answerer + 'static,
    {
        Self {
            summarizer: Some(backend.clone()),
            translator: Some(backend.clone()),
            rewriter: Some(backend.clone()),
            proofreader: Some(backend.clone()),
            writer: Some(backend.clone()),
            answerer: Some(backend),
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn with_rewriter(mut self, rewriter: Arc<dyn Rewriter>) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    pub fn with_proofreader(mut self, proofreader: Arc<dyn Proofreader>) -> Self {
        self.proofreader = Some(proofreader);
        self
    }

    pub fn with_writer(mut self, writer: Arc<dyn Writer>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn with_answerer(mut self, answerer: Arc<dyn Answerer>) -> Self {
        self.answerer = Some(answerer);
        self
    }

    pub async fn summarizer(&self) -> DigestResult<Arc<dyn Summarizer>> {
        match &self.summarizer {
            Some(c) if c.availability().await.is_available() => Ok(c.clone()),
            _ => Err(unavailable(CapabilityKind::Summarizer)),
        }
    }

    pub async fn translator(&self) -> DigestResult<Arc<dyn Translator>> {
        match &self.translator {
            Some(c) if c.availability().await.is_available() => Ok(c.clone()),
            _ => Err(unavailable(CapabilityKind::Translator)),
        }
    }

    pub async fn rewriter(&self) -> DigestResult<Arc<dyn Rewriter>> {
        match &self.rewriter {
            Some(c) if c.availability().await.is_available() => Ok(c.clone()),
            _ => Err(unavailable(CapabilityKind::Rewriter)),
        }
    }

    pub async fn proofreader(&self) -> DigestResult<Arc<dyn Proofreader>> {
        match &self.proofreader {
            Some(c) if c.availability().await.is_available() => Ok(c.clone()),
            _ => Err(unavailable(CapabilityKind::Proofreader)),
        }
    }

    pub async fn writer(&self) -> DigestResult<Arc<dyn Writer>> {
        match &self.writer {
            Some(c) if c.availability().await.is_available() => Ok(c.clone()),
            _ => Err(unavailable(CapabilityKind::Writer)),
        }
    }

    pub async fn answerer(&self) -> DigestResult<Arc<dyn Answerer>> {
        match &self.answerer {
            Some(c) if c.availability().await.is_available() => Ok(c.clone()),
            _ => Err(unavailable(CapabilityKind::Answerer)),
        }
    }
}

fn unavailable(capability: CapabilityKind) -> DigestError {
    debug!("{} probe failed or no backend registered", capability);
    DigestError::CapabilityUnavailable { capability }
}
