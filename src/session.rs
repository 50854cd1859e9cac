//! Session controller: canonical state and transform dispatch.
//!
//! Every transform produces English text that becomes the session's
//! canonical result. Display in another language is always derived from that
//! canonical result through the translation adapter, so switching languages
//! never re-runs a transform.
//!
//! A new operation supersedes the previous one: the previous operation's
//! cancellation token is cancelled and its results are never committed.

use crate::capability::{
    CapabilityKind, CapabilityRegistry, ProofreadOptions, RewriteLength, RewriteOptions,
    RewriteTone, SummarizeOptions, SummaryLength, SummaryMode,
};
use crate::config::Config;
use crate::error::{DigestError, DigestResult};
use crate::extractor::{extract, source_name_from_url, truncate_chars, ExtractorConfig, PageExtraction};
use crate::i18n::{Language, LanguageStrings, MetricsReport, TranslationMetrics};
use crate::render::{render_card, render_notice, RenderedOutput};
use crate::translation::{LocalizedResult, TranslationAdapter, TranslationStrategy};
use anyhow::anyhow;
use std::collections::HashMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// =============================================================================
// Transform Kinds
// =============================================================================

/// Rewrite presets offered to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RewriteStyle {
    Simplify,
    Elaborate,
    Formal,
    Casual,
}

impl RewriteStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            RewriteStyle::Simplify => "simplify",
            RewriteStyle::Elaborate => "elaborate",
            RewriteStyle::Formal => "formal",
            RewriteStyle::Casual => "casual",
        }
    }

    /// Rewriter options for this preset.
    pub fn options(self) -> RewriteOptions {
        match self {
            RewriteStyle::Simplify => RewriteOptions {
                length: Some(RewriteLength::Shorter),
                tone: None,
                context: Some(
                    "Simplify the text so it is easy to understand for a general audience."
                        .to_string(),
                ),
            },
            RewriteStyle::Elaborate => RewriteOptions {
                length: Some(RewriteLength::Longer),
                tone: None,
                context: Some(
                    "Elaborate on the text, adding helpful detail and explanation.".to_string(),
                ),
            },
            RewriteStyle::Formal => RewriteOptions {
                tone: Some(RewriteTone::MoreFormal),
                ..RewriteOptions::default()
            },
            RewriteStyle::Casual => RewriteOptions {
                tone: Some(RewriteTone::MoreCasual),
                ..RewriteOptions::default()
            },
        }
    }
}

impl FromStr for RewriteStyle {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simplify" => Ok(RewriteStyle::Simplify),
            "elaborate" => Ok(RewriteStyle::Elaborate),
            "formal" => Ok(RewriteStyle::Formal),
            "casual" => Ok(RewriteStyle::Casual),
            other => Err(anyhow!(
                "Unknown rewrite style '{}' (expected simplify, elaborate, formal or casual)",
                other
            )),
        }
    }
}

/// Which transform produced a canonical result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    Summary(SummaryMode),
    Rewrite(RewriteStyle),
    Proofread,
    Write,
    Answer,
}

impl TransformKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransformKind::Summary(mode) => mode.as_str(),
            TransformKind::Rewrite(style) => style.as_str(),
            TransformKind::Proofread => "proofread",
            TransformKind::Write => "write",
            TransformKind::Answer => "answer",
        }
    }
}

// =============================================================================
// Session State
// =============================================================================

/// The most recent untranslated transform output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalResult {
    pub title: String,
    pub english_body: String,
    /// Fixed when the page is loaded
    pub source_name: String,
    pub produced_by: TransformKind,
    /// Structured list for key-point summaries
    pub key_points: Option<Vec<String>>,
}

/// The user's display-language choice. No language means English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    language: Option<Language>,
}

impl Selection {
    /// Validate a language code; `""` and the canonical code clear the
    /// selection.
    pub fn parse(code: &str) -> DigestResult<Self> {
        let language = Language::from_selection(code).map_err(|_| {
            DigestError::UnsupportedLanguage {
                code: code.trim().to_string(),
            }
        })?;
        Ok(Self {
            language: (!language.is_canonical()).then_some(language),
        })
    }

    /// Selected code, or `""` for no translation.
    pub fn target_language(&self) -> &'static str {
        self.language.map(|l| l.code()).unwrap_or("")
    }

    pub fn language(&self) -> Language {
        self.language.unwrap_or_else(Language::canonical)
    }

    pub fn needs_translation(&self) -> bool {
        self.language.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Init,
    Extracted,
    Generated,
    Translated,
    Rendered,
    Error(String),
}

/// Per-transform input caps, in characters. Pages are extracted at the
/// largest cap; answers are grounded in everything extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputCaps {
    pub summarize: usize,
    pub rewrite: usize,
    pub proofread: usize,
    pub answer: usize,
}

impl Default for InputCaps {
    fn default() -> Self {
        Self {
            summarize: 10_000,
            rewrite: 8_000,
            proofread: 5_000,
            answer: 30_000,
        }
    }
}

impl InputCaps {
    pub fn largest(&self) -> usize {
        self.summarize
            .max(self.rewrite)
            .max(self.proofread)
            .max(self.answer)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    pub caps: InputCaps,
    pub strategy: TranslationStrategy,
    pub extractor: ExtractorConfig,
    pub default_selection: Selection,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> DigestResult<Self> {
        Ok(Self {
            caps: InputCaps {
                summarize: config.summarize_input_cap,
                rewrite: config.rewrite_input_cap,
                proofread: config.proofread_input_cap,
                answer: config.answer_input_cap,
            },
            strategy: config.translation_strategy,
            extractor: ExtractorConfig::default(),
            default_selection: Selection::parse(&config.default_language)?,
        })
    }
}

struct Session {
    page: Option<PageExtraction>,
    source_name: String,
    canonical: Option<CanonicalResult>,
    selection: Selection,
    phase: SessionPhase,
    /// Localized results for the current canonical result
    cache: HashMap<Language, LocalizedResult>,
    op_id: u64,
    op_token: CancellationToken,
}

struct Ticket {
    id: u64,
    token: CancellationToken,
}

/// Clean raw key-point output into a list: blank lines dropped, one leading
/// `*`/`-` marker stripped (a leading `**` bold span is kept).
pub fn normalize_key_points(raw: &str) -> Vec<String> {
    raw.lines()
        .filter_map(|line| {
            let line = line.trim();
            let stripped = if line.starts_with("**") {
                line
            } else {
                line.strip_prefix(|c| c == '*' || c == '-').unwrap_or(line)
            };
            let stripped = stripped.trim();
            (!stripped.is_empty()).then(|| stripped.to_string())
        })
        .collect()
}

/// Run one capability call, racing it against the operation's token.
async fn invoke<T>(
    token: &CancellationToken,
    capability: CapabilityKind,
    call: impl Future<Output = anyhow::Result<T>>,
) -> DigestResult<T> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(DigestError::Cancelled),
        result = call => result.map_err(|source| DigestError::InvocationFailure { capability, source }),
    }
}

fn non_empty(capability: CapabilityKind, text: String) -> DigestResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DigestError::InvocationFailure {
            capability,
            source: anyhow!("empty response"),
        });
    }
    Ok(trimmed.to_string())
}

// =============================================================================
// Controller
// =============================================================================

pub struct SessionController {
    capabilities: CapabilityRegistry,
    settings: SessionSettings,
    adapter: TranslationAdapter,
    metrics: Arc<TranslationMetrics>,
    state: Mutex<Session>,
}

impl SessionController {
    pub fn new(capabilities: CapabilityRegistry, settings: SessionSettings) -> Self {
        let metrics = Arc::new(TranslationMetrics::new());
        let adapter = TranslationAdapter::new(settings.strategy, metrics.clone());
        let state = Session {
            page: None,
            source_name: String::new(),
            canonical: None,
            selection: settings.default_selection,
            phase: SessionPhase::Init,
            cache: HashMap::new(),
            op_id: 0,
            op_token: CancellationToken::new(),
        };
        Self {
            capabilities,
            settings,
            adapter,
            metrics,
            state: Mutex::new(state),
        }
    }

    // ==================== Accessors ====================

    pub fn phase(&self) -> SessionPhase {
        self.state().phase.clone()
    }

    pub fn canonical(&self) -> Option<CanonicalResult> {
        self.state().canonical.clone()
    }

    pub fn page(&self) -> Option<PageExtraction> {
        self.state().page.clone()
    }

    pub fn selection(&self) -> Selection {
        self.state().selection
    }

    pub fn metrics(&self) -> MetricsReport {
        self.metrics.report()
    }

    // ==================== Operations ====================

    /// Extract a page and make it the session's source. Clears any previous
    /// result.
    pub fn load_page(&self, html: &str, url: Option<&str>) -> DigestResult<PageExtraction> {
        let ticket = self.begin("load_page");
        let config = self
            .settings
            .extractor
            .clone()
            .with_content_cap(self.settings.caps.largest());
        let result = extract(html, &config).map(|extraction| {
            let source_name = url.map(source_name_from_url).unwrap_or_default();
            self.install_page(extraction.clone(), source_name);
            extraction
        });
        self.settle(&ticket, result)
    }

    /// Use an already extracted page as the session's source.
    pub fn load_extraction(&self, extraction: PageExtraction, source_name: impl Into<String>) {
        let _ticket = self.begin("load_extraction");
        self.install_page(extraction, source_name.into());
    }

    pub async fn summarize(
        &self,
        mode: SummaryMode,
        length: SummaryLength,
    ) -> DigestResult<RenderedOutput> {
        let ticket = self.begin("summarize");
        let result = self.run_summarize(&ticket, mode, length).await;
        self.settle(&ticket, result)
    }

    pub async fn rewrite(&self, style: RewriteStyle) -> DigestResult<RenderedOutput> {
        let ticket = self.begin("rewrite");
        let result = self.run_rewrite(&ticket, style).await;
        self.settle(&ticket, result)
    }

    /// Proofread the page content. A missing or failed correction keeps the
    /// original text and attaches a notice.
    pub async fn proofread(&self) -> DigestResult<RenderedOutput> {
        let ticket = self.begin("proofread");
        let result = self.run_proofread(&ticket).await;
        self.settle(&ticket, result)
    }

    /// Generate text from a prompt about the page title.
    pub async fn write(&self, prompt: &str) -> DigestResult<RenderedOutput> {
        let ticket = self.begin("write");
        let result = self.run_write(&ticket, prompt).await;
        self.settle(&ticket, result)
    }

    /// Answer a question grounded in the page content.
    pub async fn answer(&self, question: &str) -> DigestResult<RenderedOutput> {
        let ticket = self.begin("answer");
        let result = self.run_answer(&ticket, question).await;
        self.settle(&ticket, result)
    }

    /// Change the display language and re-render. Returns `None` when there
    /// is no result to show yet.
    pub async fn select_language(&self, code: &str) -> DigestResult<Option<RenderedOutput>> {
        let selection = Selection::parse(code)?;
        let ticket = self.begin("select_language");
        let has_result = {
            let mut state = self.state();
            state.selection = selection;
            state.canonical.is_some()
        };
        info!(
            "Display language set to '{}'",
            selection.language().name()
        );
        if !has_result {
            return Ok(None);
        }
        let result = self.render_current(&ticket, Vec::new()).await;
        self.settle(&ticket, result).map(Some)
    }

    /// Render the current result under the current selection.
    pub async fn render(&self) -> DigestResult<RenderedOutput> {
        let ticket = self.begin("render");
        let result = self.render_current(&ticket, Vec::new()).await;
        self.settle(&ticket, result)
    }

    /// Cancel the in-flight operation, if any.
    pub fn cancel(&self) {
        let state = self.state();
        if !state.op_token.is_cancelled() {
            info!("Cancelling operation {}", state.op_id);
            state.op_token.cancel();
        }
    }

    /// Turn any operation outcome into something displayable.
    ///
    /// Errors become a localized notice; when a canonical result exists its
    /// English card is shown below the notice.
    pub fn present(&self, result: DigestResult<RenderedOutput>) -> RenderedOutput {
        let err = match result {
            Ok(output) => return output,
            Err(e) => e,
        };

        let (canonical, language) = {
            let state = self.state();
            (state.canonical.clone(), state.selection.language())
        };
        let message = format!("{}: {}", language.strings().error_prefix, err);

        let mut html = render_notice(&message);
        let mut title = String::new();
        if let Some(canonical) = canonical {
            let localized = LocalizedResult::identity(&canonical);
            html.push_str(&render_card(&localized, Language::canonical().strings()));
            title = localized.title;
        }

        RenderedOutput {
            html,
            title,
            language_tag: Language::canonical().code().to_string(),
            notice: Some(message),
        }
    }

    // ==================== Transforms ====================

    async fn run_summarize(
        &self,
        ticket: &Ticket,
        mode: SummaryMode,
        length: SummaryLength,
    ) -> DigestResult<RenderedOutput> {
        let (title, content) = self.page_input(Some(self.settings.caps.summarize))?;
        let summarizer = self.capabilities.summarizer().await?;

        info!(
            "Summarizing {} chars ({}, {})",
            content.chars().count(),
            mode.as_str(),
            length.as_str()
        );
        let options = SummarizeOptions {
            mode,
            length,
            output_language: Language::canonical().code().to_string(),
        };
        let raw = invoke(
            &ticket.token,
            CapabilityKind::Summarizer,
            summarizer.summarize(&content, &options),
        )
        .await?;

        let (body, key_points) = match mode {
            SummaryMode::Tldr => (non_empty(CapabilityKind::Summarizer, raw)?, None),
            SummaryMode::KeyPoints => {
                let points = normalize_key_points(&raw);
                if points.is_empty() {
                    return Err(DigestError::InvocationFailure {
                        capability: CapabilityKind::Summarizer,
                        source: anyhow!("no key points in response"),
                    });
                }
                debug!("Parsed {} key points", points.len());
                (points.join(" "), Some(points))
            }
        };

        self.commit(ticket, TransformKind::Summary(mode), title, body, key_points)?;
        self.render_current(ticket, Vec::new()).await
    }

    async fn run_rewrite(&self, ticket: &Ticket, style: RewriteStyle) -> DigestResult<RenderedOutput> {
        let (title, content) = self.page_input(Some(self.settings.caps.rewrite))?;
        let rewriter = self.capabilities.rewriter().await?;

        info!("Rewriting {} chars ({})", content.chars().count(), style.as_str());
        let options = style.options();
        let raw = invoke(
            &ticket.token,
            CapabilityKind::Rewriter,
            rewriter.rewrite(&content, &options),
        )
        .await?;
        let body = non_empty(CapabilityKind::Rewriter, raw)?;

        self.commit(ticket, TransformKind::Rewrite(style), title, body, None)?;
        self.render_current(ticket, Vec::new()).await
    }

    async fn run_proofread(&self, ticket: &Ticket) -> DigestResult<RenderedOutput> {
        let (title, content) = self.page_input(Some(self.settings.caps.proofread))?;
        let proofreader = self.capabilities.proofreader().await?;
        let strings = self.display_strings();

        info!("Proofreading {} chars", content.chars().count());
        let outcome = invoke(
            &ticket.token,
            CapabilityKind::Proofreader,
            proofreader.proofread(&content, &ProofreadOptions::default()),
        )
        .await;

        let (body, notice) = match outcome {
            Ok(Some(corrected)) if !corrected.trim().is_empty() => {
                (corrected.trim().to_string(), None)
            }
            Ok(_) => {
                info!("Proofreader returned no correction, keeping original text");
                (content, Some(strings.proofread_fallback_notice.to_string()))
            }
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!("Proofreading failed, keeping original text: {}", e);
                (
                    content,
                    Some(format!("{} ({})", strings.proofread_fallback_notice, e)),
                )
            }
        };

        self.commit(ticket, TransformKind::Proofread, title, body, None)?;
        self.render_current(ticket, notice.into_iter().collect()).await
    }

    async fn run_write(&self, ticket: &Ticket, prompt: &str) -> DigestResult<RenderedOutput> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(DigestError::insufficient("prompt is empty"));
        }
        let title = self.page_title()?;
        if title.is_empty() {
            return Err(DigestError::insufficient("page has no title"));
        }
        let writer = self.capabilities.writer().await?;

        let (verified, notice) = self.verified_input(ticket, prompt, "prompt").await?;
        let request = format!("{}: {}", verified, title);
        info!("Writing from a {} char prompt", request.chars().count());
        let raw = invoke(
            &ticket.token,
            CapabilityKind::Writer,
            writer.write(&request, Language::canonical().code()),
        )
        .await?;
        let body = non_empty(CapabilityKind::Writer, raw)?;

        self.commit(ticket, TransformKind::Write, title, body, None)?;
        self.render_current(ticket, notice.into_iter().collect()).await
    }

    async fn run_answer(&self, ticket: &Ticket, question: &str) -> DigestResult<RenderedOutput> {
        let question = question.trim();
        if question.is_empty() {
            return Err(DigestError::insufficient("question is empty"));
        }
        let (title, grounding) = self.page_input(None)?;
        let answerer = self.capabilities.answerer().await?;

        let (verified, notice) = self.verified_input(ticket, question, "question").await?;
        info!(
            "Answering with {} chars of grounding context",
            grounding.chars().count()
        );
        let raw = invoke(
            &ticket.token,
            CapabilityKind::Answerer,
            answerer.answer(&verified, &grounding),
        )
        .await?;
        let body = non_empty(CapabilityKind::Answerer, raw)?;

        self.commit(ticket, TransformKind::Answer, title, body, None)?;
        self.render_current(ticket, notice.into_iter().collect()).await
    }

    /// Proofread a user prompt before use. The raw text is used whenever the
    /// proofreader is unavailable, has no correction, or fails; only a
    /// failure attaches a notice.
    async fn verified_input(
        &self,
        ticket: &Ticket,
        text: &str,
        label: &str,
    ) -> DigestResult<(String, Option<String>)> {
        let proofreader = match self.capabilities.proofreader().await {
            Ok(proofreader) => proofreader,
            Err(e) => {
                warn!("{}; using the {} as typed", e, label);
                return Ok((text.to_string(), None));
            }
        };

        let outcome = invoke(
            &ticket.token,
            CapabilityKind::Proofreader,
            proofreader.proofread(text, &ProofreadOptions::default()),
        )
        .await;

        match outcome {
            Ok(Some(corrected)) if !corrected.trim().is_empty() => {
                debug!("Using proofread {}", label);
                Ok((corrected.trim().to_string(), None))
            }
            Ok(_) => Ok((text.to_string(), None)),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                warn!("Proofreading the {} failed, using it as typed: {}", label, e);
                let notice = self.display_strings().prompt_unverified_notice;
                Ok((text.to_string(), Some(notice.to_string())))
            }
        }
    }

    // ==================== Rendering ====================

    async fn render_current(
        &self,
        ticket: &Ticket,
        mut notices: Vec<String>,
    ) -> DigestResult<RenderedOutput> {
        let (canonical, language) = {
            let state = self.state();
            let canonical = state
                .canonical
                .clone()
                .ok_or_else(|| DigestError::insufficient("there is no result to render yet"))?;
            (canonical, state.selection.language())
        };

        let localized = if language.is_canonical() {
            LocalizedResult::identity(&canonical)
        } else {
            match self.localize(ticket, &canonical, language).await {
                Ok(localized) => localized,
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!("Showing English after failed translation: {}", e);
                    notices.push(format!(
                        "{} ({})",
                        language.strings().translation_failure_notice,
                        e
                    ));
                    LocalizedResult::identity(&canonical)
                }
            }
        };

        let strings = localized.language.strings();
        let mut html: String = notices.iter().map(|n| render_notice(n)).collect();
        html.push_str(&render_card(&localized, strings));
        let output = RenderedOutput {
            html,
            title: localized.title.clone(),
            language_tag: localized.language.code().to_string(),
            notice: (!notices.is_empty()).then(|| notices.join(" ")),
        };

        let mut state = self.state();
        if state.op_id != ticket.id {
            return Err(DigestError::Cancelled);
        }
        state.phase = SessionPhase::Rendered;
        debug!(
            "Rendered {} result in {}",
            canonical.produced_by.as_str(),
            output.language_tag
        );
        Ok(output)
    }

    async fn localize(
        &self,
        ticket: &Ticket,
        canonical: &CanonicalResult,
        language: Language,
    ) -> DigestResult<LocalizedResult> {
        let cached = self.state().cache.get(&language).cloned();
        if let Some(hit) = cached {
            self.metrics.record_cache_hit();
            debug!("Translation cache hit for {}", language.code());
            return Ok(hit);
        }
        self.metrics.record_cache_miss();

        let translator = self
            .capabilities
            .translator()
            .await
            .map_err(|e| DigestError::TranslationFailure {
                language: language.name().to_string(),
                reason: e.to_string(),
            })?;

        let localized = self
            .adapter
            .localize(translator.as_ref(), canonical, language, &ticket.token)
            .await?;

        let mut state = self.state();
        if state.op_id != ticket.id {
            return Err(DigestError::Cancelled);
        }
        state.cache.insert(language, localized.clone());
        state.phase = SessionPhase::Translated;
        Ok(localized)
    }

    // ==================== Internals ====================

    fn state(&self) -> MutexGuard<'_, Session> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start an operation, superseding the one in flight.
    fn begin(&self, label: &str) -> Ticket {
        let mut state = self.state();
        state.op_token.cancel();
        state.op_id += 1;
        state.op_token = CancellationToken::new();
        debug!("Starting {} (operation {})", label, state.op_id);
        Ticket {
            id: state.op_id,
            token: state.op_token.clone(),
        }
    }

    fn settle<T>(&self, ticket: &Ticket, result: DigestResult<T>) -> DigestResult<T> {
        if let Err(e) = &result {
            if e.is_cancelled() {
                info!("Operation {} was cancelled or superseded", ticket.id);
            } else {
                warn!("Operation {} failed: {}", ticket.id, e);
                let mut state = self.state();
                if state.op_id == ticket.id {
                    state.phase = SessionPhase::Error(e.to_string());
                }
            }
        }
        result
    }

    fn install_page(&self, extraction: PageExtraction, source_name: String) {
        info!(
            "Loaded page '{}' ({} chars)",
            extraction.title,
            extraction.content.chars().count()
        );
        let mut state = self.state();
        state.page = Some(extraction);
        state.source_name = source_name;
        state.canonical = None;
        state.cache.clear();
        state.phase = SessionPhase::Extracted;
    }

    fn page_title(&self) -> DigestResult<String> {
        let state = self.state();
        state
            .page
            .as_ref()
            .map(|page| page.title.trim().to_string())
            .ok_or_else(|| DigestError::insufficient("no page has been loaded"))
    }

    /// Page title and content, capped for one transform when `cap` is set.
    fn page_input(&self, cap: Option<usize>) -> DigestResult<(String, String)> {
        let state = self.state();
        let page = state
            .page
            .as_ref()
            .ok_or_else(|| DigestError::insufficient("no page has been loaded"))?;
        let content = match cap {
            Some(cap) => truncate_chars(&page.content, cap),
            None => page.content.as_str(),
        }
        .trim();
        if content.is_empty() {
            return Err(DigestError::insufficient("page content is empty"));
        }
        Ok((page.title.clone(), content.to_string()))
    }

    fn display_strings(&self) -> &'static LanguageStrings {
        self.state().selection.language().strings()
    }

    fn commit(
        &self,
        ticket: &Ticket,
        produced_by: TransformKind,
        title: String,
        english_body: String,
        key_points: Option<Vec<String>>,
    ) -> DigestResult<()> {
        let mut state = self.state();
        if state.op_id != ticket.id || ticket.token.is_cancelled() {
            return Err(DigestError::Cancelled);
        }
        info!(
            "Committed {} result ({} chars)",
            produced_by.as_str(),
            english_body.chars().count()
        );
        state.canonical = Some(CanonicalResult {
            title,
            english_body,
            source_name: state.source_name.clone(),
            produced_by,
            key_points,
        });
        state.cache.clear();
        state.phase = SessionPhase::Generated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBackend, TranslatorBehavior};
    use std::time::Duration;

    fn paragraph(word: &str) -> String {
        format!("{} ", word).repeat(30).trim_end().to_string()
    }

    fn page_html() -> String {
        format!(
            "<html><head><title>Doc</title></head><body>\
             <h1>Rust News</h1><p>{}</p><p>{}</p><p>{}</p></body></html>",
            paragraph("alpha"),
            paragraph("bravo"),
            paragraph("charlie")
        )
    }

    fn controller(mock: &Arc<MockBackend>) -> SessionController {
        let controller = SessionController::new(
            CapabilityRegistry::with_backend(mock.clone()),
            SessionSettings::default(),
        );
        controller
            .load_page(&page_html(), Some("https://www.example.com/post"))
            .expect("page should extract");
        controller
    }

    // ==================== Selection Tests ====================

    #[test]
    fn test_selection_parse() {
        assert!(!Selection::parse("").unwrap().needs_translation());
        assert!(!Selection::parse("en").unwrap().needs_translation());
        let spanish = Selection::parse("es").unwrap();
        assert!(spanish.needs_translation());
        assert_eq!(spanish.target_language(), "es");
        assert!(matches!(
            Selection::parse("xx"),
            Err(DigestError::UnsupportedLanguage { .. })
        ));
    }

    // ==================== Key Points Tests ====================

    #[test]
    fn test_normalize_key_points() {
        let raw = "* First point\n\n- Second point\n   \n**Bold** third\nplain";
        assert_eq!(
            normalize_key_points(raw),
            vec!["First point", "Second point", "**Bold** third", "plain"]
        );
        assert!(normalize_key_points("\n - \n").is_empty());
    }

    #[test]
    fn test_rewrite_style_options() {
        let simplify = RewriteStyle::Simplify.options();
        assert_eq!(simplify.length, Some(RewriteLength::Shorter));
        assert!(simplify.context.is_some());
        assert_eq!(
            RewriteStyle::Elaborate.options().length,
            Some(RewriteLength::Longer)
        );
        assert_eq!(
            RewriteStyle::Formal.options().tone,
            Some(RewriteTone::MoreFormal)
        );
        assert_eq!(
            RewriteStyle::Casual.options().tone,
            Some(RewriteTone::MoreCasual)
        );
        assert_eq!("Casual".parse::<RewriteStyle>().unwrap(), RewriteStyle::Casual);
        assert!("shout".parse::<RewriteStyle>().is_err());
    }

    // ==================== Transform Tests ====================

    #[tokio::test]
    async fn test_load_page_sets_source_and_phase() {
        let mock = Arc::new(MockBackend::new());
        let controller = controller(&mock);
        let page = controller.page().unwrap();
        assert_eq!(page.title, "Rust News");
        assert_eq!(controller.phase(), SessionPhase::Extracted);
        assert!(controller.canonical().is_none());
    }

    #[tokio::test]
    async fn test_summarize_renders_english_card() {
        let mock = Arc::new(MockBackend::new().with_summary("Rust is **fast**."));
        let controller = controller(&mock);

        let output = controller
            .summarize(SummaryMode::Tldr, SummaryLength::Medium)
            .await
            .unwrap();

        assert_eq!(output.language_tag, "en");
        assert_eq!(output.title, "Rust News");
        assert!(output.notice.is_none());
        assert!(output.html.contains("<strong>fast</strong>"));
        assert!(output.html.contains("Source: example.com"));
        assert_eq!(controller.phase(), SessionPhase::Rendered);

        let canonical = controller.canonical().unwrap();
        assert_eq!(canonical.english_body, "Rust is **fast**.");
        assert_eq!(canonical.produced_by, TransformKind::Summary(SummaryMode::Tldr));
        assert_eq!(mock.calls_of(CapabilityKind::Summarizer)[0].detail, "tldr/medium");
    }

    #[tokio::test]
    async fn test_summarize_input_is_capped() {
        let mock = Arc::new(MockBackend::new());
        let settings = SessionSettings {
            caps: InputCaps {
                summarize: 50,
                ..InputCaps::default()
            },
            ..SessionSettings::default()
        };
        let controller =
            SessionController::new(CapabilityRegistry::with_backend(mock.clone()), settings);
        controller.load_page(&page_html(), None).unwrap();
        controller
            .summarize(SummaryMode::Tldr, SummaryLength::Short)
            .await
            .unwrap();
        let call = &mock.calls_of(CapabilityKind::Summarizer)[0];
        assert!(call.input.chars().count() <= 50);
    }

    #[tokio::test]
    async fn test_key_points_keep_structured_list() {
        let mock = Arc::new(MockBackend::new().with_summary("* One\n* Two\n\n- Three"));
        let controller = controller(&mock);
        let output = controller
            .summarize(SummaryMode::KeyPoints, SummaryLength::Short)
            .await
            .unwrap();

        let canonical = controller.canonical().unwrap();
        assert_eq!(canonical.english_body, "One Two Three");
        assert_eq!(
            canonical.key_points,
            Some(vec!["One".to_string(), "Two".to_string(), "Three".to_string()])
        );
        assert!(output
            .html
            .contains("<ul><li>One</li><li>Two</li><li>Three</li></ul>"));
    }

    #[tokio::test]
    async fn test_rewrite_passes_style_options() {
        let mock = Arc::new(MockBackend::new());
        let controller = controller(&mock);
        controller.rewrite(RewriteStyle::Simplify).await.unwrap();
        let call = &mock.calls_of(CapabilityKind::Rewriter)[0];
        assert!(call.detail.starts_with("length=shorter tone=-"));
        assert_eq!(
            controller.canonical().unwrap().produced_by,
            TransformKind::Rewrite(RewriteStyle::Simplify)
        );
    }

    #[tokio::test]
    async fn test_unavailable_capability_is_not_invoked() {
        let mock = Arc::new(MockBackend::new().unavailable(CapabilityKind::Summarizer));
        let controller = controller(&mock);
        let err = controller
            .summarize(SummaryMode::Tldr, SummaryLength::Short)
            .await
            .unwrap_err();
        assert!(matches!(err, DigestError::CapabilityUnavailable { .. }));
        assert_eq!(mock.calls(CapabilityKind::Summarizer), 0);
        assert!(matches!(controller.phase(), SessionPhase::Error(_)));
    }

    #[tokio::test]
    async fn test_invocation_failure_keeps_previous_result() {
        let mock = Arc::new(MockBackend::new().failing(CapabilityKind::Rewriter));
        let controller = controller(&mock);
        controller
            .summarize(SummaryMode::Tldr, SummaryLength::Short)
            .await
            .unwrap();
        let err = controller.rewrite(RewriteStyle::Formal).await.unwrap_err();
        assert!(matches!(err, DigestError::InvocationFailure { .. }));
        assert_eq!(
            controller.canonical().unwrap().english_body,
            "A short summary of the page."
        );
    }

    #[tokio::test]
    async fn test_summarize_without_page() {
        let mock = Arc::new(MockBackend::new());
        let controller = SessionController::new(
            CapabilityRegistry::with_backend(mock.clone()),
            SessionSettings::default(),
        );
        let err = controller
            .summarize(SummaryMode::Tldr, SummaryLength::Short)
            .await
            .unwrap_err();
        assert!(matches!(err, DigestError::InsufficientInput { .. }));
    }

    // ==================== Proofreading Tests ====================

    #[tokio::test]
    async fn test_proofread_without_correction_keeps_original() {
        let mock = Arc::new(MockBackend::new());
        let controller = controller(&mock);
        let output = controller.proofread().await.unwrap();

        let canonical = controller.canonical().unwrap();
        assert_eq!(canonical.english_body, controller.page().unwrap().content);
        assert!(output.notice.unwrap().contains("No corrections"));
        assert!(output.html.starts_with("<p class=\"notice\">"));
    }

    #[tokio::test]
    async fn test_proofread_failure_is_not_fatal() {
        let mock = Arc::new(MockBackend::new().failing(CapabilityKind::Proofreader));
        let controller = controller(&mock);
        let output = controller.proofread().await.unwrap();
        assert!(output.notice.is_some());
        assert_eq!(controller.phase(), SessionPhase::Rendered);
    }

    #[tokio::test]
    async fn test_proofread_uses_correction() {
        let mock = Arc::new(MockBackend::new().with_correction("Corrected text."));
        let controller = controller(&mock);
        let output = controller.proofread().await.unwrap();
        assert!(output.notice.is_none());
        assert_eq!(controller.canonical().unwrap().english_body, "Corrected text.");
    }

    #[tokio::test]
    async fn test_proofread_unavailable_is_an_error() {
        let mock = Arc::new(MockBackend::new().unavailable(CapabilityKind::Proofreader));
        let controller = controller(&mock);
        let err = controller.proofread().await.unwrap_err();
        assert!(matches!(
            err,
            DigestError::CapabilityUnavailable {
                capability: CapabilityKind::Proofreader
            }
        ));
    }

    // ==================== Write and Answer Tests ====================

    #[tokio::test]
    async fn test_write_uses_raw_prompt_without_correction() {
        let mock = Arc::new(MockBackend::new());
        let controller = controller(&mock);
        controller.write("  Write a poem  ").await.unwrap();

        let call = &mock.calls_of(CapabilityKind::Writer)[0];
        assert_eq!(call.input, "Write a poem: Rust News");
        assert_eq!(call.detail, "en");
        assert_eq!(mock.calls(CapabilityKind::Proofreader), 1);
    }

    #[tokio::test]
    async fn test_write_uses_corrected_prompt() {
        let mock = Arc::new(MockBackend::new().with_correction("Write a poem."));
        let controller = controller(&mock);
        controller.write("Wrte a poem").await.unwrap();
        assert_eq!(
            mock.calls_of(CapabilityKind::Writer)[0].input,
            "Write a poem.: Rust News"
        );
    }

    #[tokio::test]
    async fn test_write_with_unavailable_proofreader() {
        let mock = Arc::new(MockBackend::new().unavailable(CapabilityKind::Proofreader));
        let controller = controller(&mock);
        let output = controller.write("Write a poem").await.unwrap();
        assert!(output.notice.is_none());
        assert_eq!(mock.calls(CapabilityKind::Proofreader), 0);
        assert_eq!(mock.calls(CapabilityKind::Writer), 1);
    }

    #[tokio::test]
    async fn test_write_with_failing_proofreader_adds_notice() {
        let mock = Arc::new(MockBackend::new().failing(CapabilityKind::Proofreader));
        let controller = controller(&mock);
        let output = controller.write("Write a poem").await.unwrap();
        assert!(output.notice.unwrap().contains("used as typed"));
        assert_eq!(
            mock.calls_of(CapabilityKind::Writer)[0].input,
            "Write a poem: Rust News"
        );
    }

    #[tokio::test]
    async fn test_write_rejects_empty_prompt() {
        let mock = Arc::new(MockBackend::new());
        let controller = controller(&mock);
        let err = controller.write("   ").await.unwrap_err();
        assert!(matches!(err, DigestError::InsufficientInput { .. }));
        assert_eq!(mock.calls(CapabilityKind::Proofreader), 0);
        assert_eq!(mock.calls(CapabilityKind::Writer), 0);
    }

    #[tokio::test]
    async fn test_answer_is_grounded_in_page_content() {
        let mock = Arc::new(MockBackend::new().with_answer("Forty-two."));
        let controller = controller(&mock);
        let output = controller.answer("What is it?").await.unwrap();

        let call = &mock.calls_of(CapabilityKind::Answerer)[0];
        assert_eq!(call.input, "What is it?");
        assert_eq!(call.detail, controller.page().unwrap().content);
        assert!(output.html.contains("<h3>Answer</h3>"));
        assert!(output.html.contains("Forty-two."));
    }

    #[tokio::test]
    async fn test_answer_uses_full_content_when_other_caps_are_larger() {
        let mock = Arc::new(MockBackend::new());
        let settings = SessionSettings {
            caps: InputCaps {
                summarize: 40_000,
                answer: 100,
                ..InputCaps::default()
            },
            ..SessionSettings::default()
        };
        let controller =
            SessionController::new(CapabilityRegistry::with_backend(mock.clone()), settings);
        controller.load_page(&page_html(), None).unwrap();
        controller.answer("What is it?").await.unwrap();

        let content = controller.page().unwrap().content;
        assert!(content.chars().count() > 100);
        assert_eq!(mock.calls_of(CapabilityKind::Answerer)[0].detail, content);
    }

    // ==================== Language Tests ====================

    #[tokio::test]
    async fn test_language_switch_only_translates() {
        let mock = Arc::new(MockBackend::new().with_translator(TranslatorBehavior::TagLines));
        let controller = controller(&mock);
        controller
            .summarize(SummaryMode::Tldr, SummaryLength::Short)
            .await
            .unwrap();

        let spanish = controller.select_language("es").await.unwrap().unwrap();
        assert_eq!(spanish.language_tag, "es");
        assert!(spanish.html.contains("<h3>Resumen</h3>"));
        assert!(spanish.html.contains("[es] A short summary of the page."));
        let after_first = mock.calls(CapabilityKind::Translator);
        assert_eq!(after_first, 3);

        controller.select_language("fr").await.unwrap();
        let after_second = mock.calls(CapabilityKind::Translator);
        assert_eq!(after_second, 6);

        let again = controller.select_language("es").await.unwrap().unwrap();
        assert_eq!(again, spanish);
        assert_eq!(mock.calls(CapabilityKind::Translator), after_second);
        assert_eq!(mock.calls(CapabilityKind::Summarizer), 1);

        let english = controller.select_language("").await.unwrap().unwrap();
        assert_eq!(english.language_tag, "en");
        assert_eq!(controller.canonical().unwrap().english_body, "A short summary of the page.");

        let report = controller.metrics();
        assert_eq!(report.cache_hits, 1);
        assert_eq!(report.cache_misses, 2);
    }

    #[tokio::test]
    async fn test_new_transform_clears_translation_cache() {
        let mock = Arc::new(MockBackend::new());
        let controller = controller(&mock);
        controller.select_language("es").await.unwrap();
        controller
            .summarize(SummaryMode::Tldr, SummaryLength::Short)
            .await
            .unwrap();
        controller.rewrite(RewriteStyle::Casual).await.unwrap();
        // title, body and source for each of the two results
        assert_eq!(mock.calls(CapabilityKind::Translator), 6);
    }

    #[tokio::test]
    async fn test_translation_failure_shows_english_with_notice() {
        let mock = Arc::new(MockBackend::new().with_translator(TranslatorBehavior::Fail));
        let controller = controller(&mock);
        controller.select_language("es").await.unwrap();
        let output = controller
            .summarize(SummaryMode::Tldr, SummaryLength::Short)
            .await
            .unwrap();

        assert_eq!(output.language_tag, "en");
        assert!(output.html.contains("A short summary of the page."));
        assert!(output.notice.unwrap().contains("inglés"));
        assert!(controller.canonical().is_some());
    }

    #[tokio::test]
    async fn test_unavailable_translator_shows_english() {
        let mock = Arc::new(MockBackend::new().unavailable(CapabilityKind::Translator));
        let controller = controller(&mock);
        controller
            .summarize(SummaryMode::Tldr, SummaryLength::Short)
            .await
            .unwrap();
        let output = controller.select_language("de").await.unwrap().unwrap();
        assert_eq!(output.language_tag, "en");
        assert!(output.notice.is_some());
    }

    #[tokio::test]
    async fn test_select_language_before_result() {
        let mock = Arc::new(MockBackend::new());
        let controller = controller(&mock);
        assert!(controller.select_language("ja").await.unwrap().is_none());
        assert_eq!(controller.selection().target_language(), "ja");
        assert!(matches!(
            controller.select_language("tlh").await,
            Err(DigestError::UnsupportedLanguage { .. })
        ));
        assert_eq!(controller.selection().target_language(), "ja");
    }

    // ==================== Concurrency Tests ====================

    #[tokio::test]
    async fn test_superseded_operation_never_commits() {
        let mock = Arc::new(
            MockBackend::new()
                .with_summary("stale summary")
                .with_rewrite("fresh rewrite")
                .with_delay(Duration::from_millis(100)),
        );
        let controller = controller(&mock);

        let (first, second) = tokio::join!(
            controller.summarize(SummaryMode::Tldr, SummaryLength::Short),
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                controller.rewrite(RewriteStyle::Formal).await
            }
        );

        assert!(first.unwrap_err().is_cancelled());
        assert!(second.is_ok());
        let canonical = controller.canonical().unwrap();
        assert_eq!(canonical.english_body, "fresh rewrite");
        assert_eq!(controller.phase(), SessionPhase::Rendered);
    }

    #[tokio::test]
    async fn test_cancel_stops_in_flight_operation() {
        let mock = Arc::new(MockBackend::new().with_delay(Duration::from_millis(100)));
        let controller = controller(&mock);

        let (result, _) = tokio::join!(
            controller.summarize(SummaryMode::Tldr, SummaryLength::Short),
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                controller.cancel();
            }
        );

        assert!(result.unwrap_err().is_cancelled());
        assert!(controller.canonical().is_none());
    }

    // ==================== Present Tests ====================

    #[tokio::test]
    async fn test_present_error_keeps_canonical_visible() {
        let mock = Arc::new(MockBackend::new().failing(CapabilityKind::Writer));
        let controller = controller(&mock);
        controller
            .summarize(SummaryMode::Tldr, SummaryLength::Short)
            .await
            .unwrap();

        let result = controller.write("Write a poem").await;
        let output = controller.present(result);
        assert!(output.notice.as_deref().unwrap().starts_with("Error: Writer failed"));
        assert!(output.html.contains("A short summary of the page."));
        assert_eq!(output.title, "Rust News");
    }

    #[tokio::test]
    async fn test_present_error_without_result() {
        let mock = Arc::new(MockBackend::new());
        let controller = SessionController::new(
            CapabilityRegistry::with_backend(mock.clone()),
            SessionSettings::default(),
        );
        let result = controller.render().await;
        let output = controller.present(result);
        assert!(output.html.contains("class=\"notice\""));
        assert!(output.title.is_empty());
    }
}
