//! Heuristic page extraction.
//!
//! Produces a title and a handful of readable paragraphs from an HTML page.
//! The primary strategy reads the paragraphs that directly follow the first
//! `<h1>`; when that yields too little text the content root (`<main>`, then
//! `<article>`, then `<body>`) is scanned for long paragraphs instead.

use crate::error::{DigestError, DigestResult};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;

/// Extracted page title and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageExtraction {
    pub title: String,
    /// Paragraph text joined by blank lines, already length-capped
    pub content: String,
}

/// Thresholds and caps for one extraction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Post-heading siblings must be longer than this (in characters)
    pub primary_min_chars: usize,
    /// Maximum paragraphs taken by the post-heading walk
    pub primary_max_paragraphs: usize,
    /// Content-root paragraphs must be longer than this (in characters)
    pub fallback_min_chars: usize,
    /// Maximum paragraphs overall
    pub max_paragraphs: usize,
    /// Below this many characters the page is considered empty
    pub min_content_chars: usize,
    /// Maximum characters of content returned
    pub content_cap: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            primary_min_chars: 100,
            primary_max_paragraphs: 4,
            fallback_min_chars: 150,
            max_paragraphs: 5,
            min_content_chars: 100,
            content_cap: 10_000,
        }
    }
}

impl ExtractorConfig {
    /// Set the content cap (summarization uses a small cap, grounded
    /// answering a large one).
    pub fn with_content_cap(mut self, cap: usize) -> Self {
        self.content_cap = cap;
        self
    }
}

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

/// Element text with runs of whitespace collapsed, roughly what a browser
/// reports as rendered text.
fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncate to at most `cap` characters without splitting a character.
pub fn truncate_chars(text: &str, cap: usize) -> &str {
    match text.char_indices().nth(cap) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Extract `{title, content}` from an HTML document.
///
/// # Returns
/// * `Ok(PageExtraction)` with content capped at `config.content_cap`
/// * `Err(DigestError::InsufficientInput)` if fewer than
///   `config.min_content_chars` characters of paragraph text were found
pub fn extract(html: &str, config: &ExtractorConfig) -> DigestResult<PageExtraction> {
    let document = Html::parse_document(html);

    let heading = document.select(&selector("h1")).next();
    let title = heading
        .as_ref()
        .map(element_text)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| document_title(&document));

    let mut taken = HashSet::new();
    let mut paragraphs: Vec<String> = Vec::new();

    // Primary: paragraphs immediately following the first heading
    if let Some(h1) = heading {
        for sibling in h1.next_siblings().filter_map(ElementRef::wrap) {
            if paragraphs.len() >= config.primary_max_paragraphs {
                break;
            }
            if sibling.value().name() != "p" {
                continue;
            }
            let text = element_text(&sibling);
            if text.chars().count() > config.primary_min_chars {
                taken.insert(sibling.id());
                paragraphs.push(text);
            }
        }
    }

    debug!(
        "Primary extraction took {} paragraphs after heading",
        paragraphs.len()
    );

    // Fallback: long paragraphs anywhere under the content root
    if joined_len(&paragraphs) < config.min_content_chars {
        let root = content_root(&document);
        for p in root.select(&selector("p")) {
            if paragraphs.len() >= config.max_paragraphs {
                break;
            }
            if taken.contains(&p.id()) {
                continue;
            }
            let text = element_text(&p);
            if text.chars().count() > config.fallback_min_chars {
                taken.insert(p.id());
                paragraphs.push(text);
            }
        }
        debug!(
            "Fallback extraction raised total to {} paragraphs",
            paragraphs.len()
        );
    }

    let joined = paragraphs.join("\n\n");
    if joined.trim().chars().count() < config.min_content_chars {
        return Err(DigestError::insufficient(
            "could not extract enough meaningful content",
        ));
    }

    Ok(PageExtraction {
        title,
        content: truncate_chars(&joined, config.content_cap).to_string(),
    })
}

/// Character count of paragraphs joined by blank lines.
fn joined_len(paragraphs: &[String]) -> usize {
    let text: usize = paragraphs.iter().map(|p| p.chars().count()).sum();
    text + paragraphs.len().saturating_sub(1) * 2
}

fn document_title(document: &Html) -> String {
    document
        .select(&selector("title"))
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_default()
}

fn content_root(document: &Html) -> ElementRef<'_> {
    ["main", "article", "body"]
        .into_iter()
        .find_map(|css| document.select(&selector(css)).next())
        .unwrap_or_else(|| document.root_element())
}

/// Display name for the page's origin: the URL host without a leading `www.`.
///
/// Returns an empty string if the URL cannot be parsed or has no host.
pub fn source_name_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .map(|host| host.strip_prefix("www.").unwrap_or(&host).to_string())
        .unwrap_or_default()
}
