use crate::capability::Translator;
use crate::error::{DigestError, DigestResult};
use crate::i18n::{Language, TranslationMetrics, TranslationValidator};
use crate::session::{CanonicalResult, TransformKind};
use anyhow::bail;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A canonical result as displayed in one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedResult {
    pub language: Language,
    pub title: String,
    pub body: String,
    pub source_name: String,
    pub key_points: Option<Vec<String>>,
    pub produced_by: TransformKind,
}

impl LocalizedResult {
    /// The canonical result shown as-is, in English.
    pub fn identity(canonical: &CanonicalResult) -> Self {
        Self {
            language: Language::canonical(),
            title: canonical.title.clone(),
            body: canonical.english_body.clone(),
            source_name: canonical.source_name.clone(),
            key_points: canonical.key_points.clone(),
            produced_by: canonical.produced_by,
        }
    }
}

/// How list-valued fields are sent to the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslationStrategy {
    /// One translator call per item
    #[default]
    PerItem,
    /// All items in one numbered block, split back afterwards
    NumberedBlock,
}

impl TranslationStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            TranslationStrategy::PerItem => "per-item",
            TranslationStrategy::NumberedBlock => "numbered-block",
        }
    }
}

impl FromStr for TranslationStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-item" | "per_item" => Ok(TranslationStrategy::PerItem),
            "numbered-block" | "numbered_block" => Ok(TranslationStrategy::NumberedBlock),
            other => bail!(
                "Unknown translation strategy '{}' (expected per-item or numbered-block)",
                other
            ),
        }
    }
}

/// Join items into a `1. ...` numbered block, one item per line.
pub fn number_items(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split a translated numbered block back into `expected` items.
///
/// Markers are `1.`, `2.`, ... in order, followed by whitespace or the end of
/// the text. Markers at the start of a line are tried first. A block the
/// translator reflowed onto one line is then scanned for markers after any
/// whitespace, which is rejected when it passes over another `N.` in
/// `1..=expected`, since that text could be split more than one way.
/// Text before the first marker counts as an item. Returns `None` unless
/// exactly `expected` items come out.
pub fn split_numbered_block(text: &str, expected: usize) -> Option<Vec<String>> {
    for line_anchored in [true, false] {
        let (markers, candidates) = scan_markers(text, line_anchored, expected);
        if candidates != markers.len() {
            continue;
        }
        let items = items_at(text, &markers);
        if items.len() == expected {
            return Some(items);
        }
    }
    None
}

/// Sequential markers as `(marker start, content start)`, and the number of
/// `N.` markers with `N` in `1..=expected` seen at a boundary.
fn scan_markers(text: &str, line_anchored: bool, expected: usize) -> (Vec<(usize, usize)>, usize) {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut markers: Vec<(usize, usize)> = Vec::new();
    let mut candidates = 0;
    let mut next: usize = 1;
    let mut line_start = true;
    let mut k = 0;

    while k < chars.len() {
        let (pos, c) = chars[k];
        let at_boundary = if line_anchored {
            line_start
        } else {
            k == 0 || chars[k - 1].1.is_whitespace()
        };
        if !(at_boundary && c.is_ascii_digit()) {
            line_start = c == '\n' || (line_start && (c == ' ' || c == '\t'));
            k += 1;
            continue;
        }
        line_start = false;

        let mut j = k;
        while j < chars.len() && chars[j].1.is_ascii_digit() {
            j += 1;
        }
        let has_dot = chars.get(j).map(|&(_, c)| c) == Some('.');
        let spaced = chars.get(j + 1).map_or(true, |&(_, c)| c.is_whitespace());
        if has_dot && spaced {
            let number = text[pos..chars[j].0].parse::<usize>().ok();
            if number.is_some_and(|n| (1..=expected).contains(&n)) {
                candidates += 1;
            }
            if number == Some(next) {
                let content_start = chars.get(j + 1).map_or(text.len(), |&(p, _)| p);
                markers.push((pos, content_start));
                next += 1;
                k = j + 1;
                continue;
            }
        }
        k = j;
    }
    (markers, candidates)
}

fn items_at(text: &str, markers: &[(usize, usize)]) -> Vec<String> {
    let Some(&(first, _)) = markers.first() else {
        let trimmed = text.trim();
        return if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        };
    };

    let mut items = Vec::with_capacity(markers.len() + 1);
    let preamble = text[..first].trim();
    if !preamble.is_empty() {
        items.push(preamble.to_string());
    }
    for (idx, &(_, content_start)) in markers.iter().enumerate() {
        let end = markers.get(idx + 1).map_or(text.len(), |&(start, _)| start);
        items.push(text[content_start..end].trim().to_string());
    }
    items
}

/// Derives localized results from canonical ones through a translator.
///
/// Every field is translated independently from the English source, so a
/// result in one language never depends on another translation.
pub struct TranslationAdapter {
    strategy: TranslationStrategy,
    metrics: Arc<TranslationMetrics>,
}

impl TranslationAdapter {
    pub fn new(strategy: TranslationStrategy, metrics: Arc<TranslationMetrics>) -> Self {
        Self { strategy, metrics }
    }

    pub fn strategy(&self) -> TranslationStrategy {
        self.strategy
    }

    /// Translate every displayable field of `canonical` into `target`.
    ///
    /// A canonical target returns the identity result without any call.
    /// Any failed field fails the whole result; partial translations are
    /// never returned.
    pub async fn localize(
        &self,
        translator: &dyn Translator,
        canonical: &CanonicalResult,
        target: Language,
        cancel: &CancellationToken,
    ) -> DigestResult<LocalizedResult> {
        if target.is_canonical() {
            return Ok(LocalizedResult::identity(canonical));
        }

        debug!(
            "Translating {} result to {} ({})",
            canonical.produced_by.as_str(),
            target.name(),
            target.code()
        );

        let title = self.translate_text(translator, &canonical.title, target, cancel).await?;
        let body = self
            .translate_text(translator, &canonical.english_body, target, cancel)
            .await?;
        let source_name = self
            .translate_text(translator, &canonical.source_name, target, cancel)
            .await?;

        let key_points = match &canonical.key_points {
            Some(points) => Some(self.translate_items(translator, points, target, cancel).await?),
            None => None,
        };

        Ok(LocalizedResult {
            language: target,
            title,
            body,
            source_name,
            key_points,
            produced_by: canonical.produced_by,
        })
    }

    async fn translate_items(
        &self,
        translator: &dyn Translator,
        items: &[String],
        target: Language,
        cancel: &CancellationToken,
    ) -> DigestResult<Vec<String>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        if self.strategy == TranslationStrategy::NumberedBlock {
            let block = number_items(items);
            let translated = self.translate_text(translator, &block, target, cancel).await?;
            match split_numbered_block(&translated, items.len()) {
                Some(split) => {
                    let report = TranslationValidator::validate_items(items, &split);
                    if report.errors.is_empty() {
                        if !report.warnings.is_empty() {
                            warn!(
                                "Item translation warnings for {} ({}): {:?}",
                                target.name(),
                                target.code(),
                                report.warnings
                            );
                        }
                        return Ok(split);
                    }
                    warn!(
                        "Numbered block for {} failed validation ({:?}), translating items one by one",
                        target.name(),
                        report.errors
                    );
                }
                None => warn!(
                    "Numbered block for {} did not split into {} items, translating items one by one",
                    target.name(),
                    items.len()
                ),
            }
        }

        let mut translated = Vec::with_capacity(items.len());
        for item in items {
            translated.push(self.translate_text(translator, item, target, cancel).await?);
        }
        Ok(translated)
    }

    /// One translator call, raced against cancellation. Empty input is
    /// returned as-is without a call.
    async fn translate_text(
        &self,
        translator: &dyn Translator,
        text: &str,
        target: Language,
        cancel: &CancellationToken,
    ) -> DigestResult<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        self.metrics.record_api_call();
        let source = Language::canonical();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DigestError::Cancelled),
            result = translator.translate(text, source.code(), target.code()) => result,
        };

        let translated = match result {
            Ok(translated) => translated,
            Err(e) => {
                self.metrics.record_api_failure();
                return Err(DigestError::TranslationFailure {
                    language: target.name().to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let validation = TranslationValidator::validate(text, &translated);
        if !validation.warnings.is_empty() {
            warn!(
                "Translation validation warnings for {} ({}): {:?}",
                target.name(),
                target.code(),
                validation.warnings
            );
        }

        Ok(translated)
    }
}
