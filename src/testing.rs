//! Testing utilities including a mock capability backend.
//!
//! [`MockBackend`] implements every capability with deterministic,
//! configurable responses and counts each invocation, so pipeline behavior
//! (dispatch, fallbacks, translation re-derivation) can be asserted without
//! making real AI calls.

use crate::capability::{
    Answerer, Availability, CapabilityKind, Proofreader, ProofreadOptions, Rewriter,
    RewriteOptions, SummarizeOptions, Summarizer, Translator, Writer,
};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// How the mock translator transforms its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslatorBehavior {
    /// Return the input unchanged
    Identity,
    /// Prefix every non-empty line with `[<target>] `
    TagLines,
    /// Like `TagLines`, but strip `N.` list numbering from each line
    DropNumbering,
    /// Uppercase the whole input, keeping any numbering intact
    Uppercase,
    /// Always fail
    Fail,
}

/// Record of a call made to the mock backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub capability: CapabilityKind,
    /// Primary text input (text, prompt or question)
    pub input: String,
    /// Secondary input: target language, grounding context, or options summary
    pub detail: String,
}

/// A mock backend for all six capabilities.
pub struct MockBackend {
    summary: RwLock<String>,
    rewrite: RwLock<Option<String>>,
    correction: RwLock<Option<String>>,
    written: RwLock<String>,
    answer: RwLock<String>,
    translator: RwLock<TranslatorBehavior>,
    unavailable: RwLock<HashSet<CapabilityKind>>,
    failing: RwLock<HashSet<CapabilityKind>>,
    delay: RwLock<Option<Duration>>,
    calls: Arc<RwLock<Vec<MockCall>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a mock with canned responses and an identity translator.
    pub fn new() -> Self {
        Self {
            summary: RwLock::new("A short summary of the page.".to_string()),
            rewrite: RwLock::new(None),
            correction: RwLock::new(None),
            written: RwLock::new("Generated text.".to_string()),
            answer: RwLock::new("The answer.".to_string()),
            translator: RwLock::new(TranslatorBehavior::Identity),
            unavailable: RwLock::new(HashSet::new()),
            failing: RwLock::new(HashSet::new()),
            delay: RwLock::new(None),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Set the summarizer's reply.
    pub fn with_summary(self, summary: impl Into<String>) -> Self {
        *self.summary.write().unwrap() = summary.into();
        self
    }

    /// Set the rewriter's reply. Without one, the rewriter echoes its input
    /// prefixed with the requested options.
    pub fn with_rewrite(self, rewrite: impl Into<String>) -> Self {
        *self.rewrite.write().unwrap() = Some(rewrite.into());
        self
    }

    /// Set the proofreader's correction. Without one, the proofreader
    /// returns no correction.
    pub fn with_correction(self, corrected: impl Into<String>) -> Self {
        *self.correction.write().unwrap() = Some(corrected.into());
        self
    }

    pub fn with_written(self, text: impl Into<String>) -> Self {
        *self.written.write().unwrap() = text.into();
        self
    }

    pub fn with_answer(self, text: impl Into<String>) -> Self {
        *self.answer.write().unwrap() = text.into();
        self
    }

    pub fn with_translator(self, behavior: TranslatorBehavior) -> Self {
        *self.translator.write().unwrap() = behavior;
        self
    }

    /// Make every capability call sleep before replying.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.write().unwrap() = Some(delay);
        self
    }

    /// Make the probe for `kind` report unavailable.
    pub fn unavailable(self, kind: CapabilityKind) -> Self {
        self.unavailable.write().unwrap().insert(kind);
        self
    }

    /// Make invocations of `kind` fail.
    pub fn failing(self, kind: CapabilityKind) -> Self {
        self.failing.write().unwrap().insert(kind);
        self
    }

    /// Change translator behavior after construction.
    pub fn set_translator(&self, behavior: TranslatorBehavior) {
        *self.translator.write().unwrap() = behavior;
    }

    /// Number of invocations of `kind` (probes are not counted).
    pub fn calls(&self, kind: CapabilityKind) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| c.capability == kind)
            .count()
    }

    /// All recorded calls of `kind`, in order.
    pub fn calls_of(&self, kind: CapabilityKind) -> Vec<MockCall> {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| c.capability == kind)
            .cloned()
            .collect()
    }

    /// Calls grouped by capability.
    pub fn call_counts(&self) -> HashMap<CapabilityKind, usize> {
        let mut counts = HashMap::new();
        for call in self.calls.read().unwrap().iter() {
            *counts.entry(call.capability).or_insert(0) += 1;
        }
        counts
    }

    fn probe(&self, kind: CapabilityKind) -> Availability {
        if self.unavailable.read().unwrap().contains(&kind) {
            Availability::Unavailable
        } else {
            Availability::Available
        }
    }

    async fn record(&self, capability: CapabilityKind, input: &str, detail: &str) -> Result<()> {
        self.calls.write().unwrap().push(MockCall {
            capability,
            input: input.to_string(),
            detail: detail.to_string(),
        });
        let delay = *self.delay.read().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.read().unwrap().contains(&capability) {
            bail!("mock {} failure", capability);
        }
        Ok(())
    }
}

fn tag_lines(text: &str, target: &str, strip_numbering: bool) -> String {
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                return line.to_string();
            }
            let line = if strip_numbering {
                strip_number(line)
            } else {
                line
            };
            format!("[{}] {}", target, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_number(line: &str) -> &str {
    let trimmed = line.trim_start();
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 && trimmed[digits..].starts_with('.') {
        trimmed[digits + 1..].trim_start()
    } else {
        line
    }
}

#[async_trait]
impl Summarizer for MockBackend {
    async fn availability(&self) -> Availability {
        self.probe(CapabilityKind::Summarizer)
    }

    async fn summarize(&self, text: &str, options: &SummarizeOptions) -> Result<String> {
        let detail = format!("{}/{}", options.mode.as_str(), options.length.as_str());
        self.record(CapabilityKind::Summarizer, text, &detail).await?;
        Ok(self.summary.read().unwrap().clone())
    }
}

#[async_trait]
impl Translator for MockBackend {
    async fn availability(&self) -> Availability {
        self.probe(CapabilityKind::Translator)
    }

    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String> {
        let detail = format!("{}->{}", source_lang, target_lang);
        self.record(CapabilityKind::Translator, text, &detail).await?;
        let behavior = self.translator.read().unwrap().clone();
        match behavior {
            TranslatorBehavior::Identity => Ok(text.to_string()),
            TranslatorBehavior::TagLines => Ok(tag_lines(text, target_lang, false)),
            TranslatorBehavior::DropNumbering => Ok(tag_lines(text, target_lang, true)),
            TranslatorBehavior::Uppercase => Ok(text.to_uppercase()),
            TranslatorBehavior::Fail => bail!("mock translation to {} failed", target_lang),
        }
    }
}

#[async_trait]
impl Rewriter for MockBackend {
    async fn availability(&self) -> Availability {
        self.probe(CapabilityKind::Rewriter)
    }

    async fn rewrite(&self, text: &str, options: &RewriteOptions) -> Result<String> {
        let detail = format!(
            "length={} tone={} context={}",
            options.length.map(|l| l.as_str()).unwrap_or("-"),
            options.tone.map(|t| t.as_str()).unwrap_or("-"),
            options.context.as_deref().unwrap_or("-")
        );
        self.record(CapabilityKind::Rewriter, text, &detail).await?;
        let canned = self.rewrite.read().unwrap().clone();
        Ok(canned.unwrap_or_else(|| format!("({}) {}", detail, text)))
    }
}

#[async_trait]
impl Proofreader for MockBackend {
    async fn availability(&self) -> Availability {
        self.probe(CapabilityKind::Proofreader)
    }

    async fn proofread(&self, text: &str, options: &ProofreadOptions) -> Result<Option<String>> {
        let detail = options.expected_input_languages.join(",");
        self.record(CapabilityKind::Proofreader, text, &detail).await?;
        Ok(self.correction.read().unwrap().clone())
    }
}

#[async_trait]
impl Writer for MockBackend {
    async fn availability(&self) -> Availability {
        self.probe(CapabilityKind::Writer)
    }

    async fn write(&self, prompt: &str, output_language: &str) -> Result<String> {
        self.record(CapabilityKind::Writer, prompt, output_language).await?;
        Ok(self.written.read().unwrap().clone())
    }
}

#[async_trait]
impl Answerer for MockBackend {
    async fn availability(&self) -> Availability {
        self.probe(CapabilityKind::Answerer)
    }

    async fn answer(&self, question: &str, grounding_context: &str) -> Result<String> {
        self.record(CapabilityKind::Answerer, question, grounding_context)
            .await?;
        Ok(self.answer.read().unwrap().clone())
    }
}
