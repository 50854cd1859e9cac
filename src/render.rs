//! Markdown-subset renderer.
//!
//! Understands exactly three markers: `##`/`###` headings, `**bold**` spans
//! and `* `/`- ` bullet lines. Everything else is passed through untouched
//! apart from newlines, which become `<br>` outside list and heading blocks.
//! Unmatched markers are emitted literally.
//!
//! The renderer never escapes HTML: text without markers must come out
//! unchanged except for its newlines.

use crate::capability::SummaryMode;
use crate::i18n::LanguageStrings;
use crate::session::TransformKind;
use crate::translation::LocalizedResult;

/// Display-ready output for one (canonical result, selection) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOutput {
    pub html: String,
    pub title: String,
    /// Language the content is actually displayed in
    pub language_tag: String,
    /// Visible annotation (translation failure, proofreading fallback, error)
    pub notice: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line<'a> {
    Heading(u8, &'a str),
    Bullet(&'a str),
    Text(&'a str),
}

fn classify(line: &str) -> Line<'_> {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix("### ") {
        return Line::Heading(3, rest.trim());
    }
    if let Some(rest) = trimmed.strip_prefix("## ") {
        return Line::Heading(2, rest.trim());
    }
    if let Some(rest) = trimmed
        .strip_prefix("* ")
        .or_else(|| trimmed.strip_prefix("- "))
    {
        return Line::Bullet(rest.trim());
    }
    Line::Text(line)
}

/// Render `**bold**` spans; an opening marker without a non-empty closing
/// span is kept as literal text.
fn push_inline(out: &mut String, text: &str) {
    let mut rest = text;
    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        match after.find("**") {
            Some(end) if end > 0 => {
                out.push_str(&rest[..start]);
                out.push_str("<strong>");
                out.push_str(&after[..end]);
                out.push_str("</strong>");
                rest = &after[end + 2..];
            }
            _ => {
                out.push_str(&rest[..start + 2]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
}

/// Convert the markdown subset to a markup fragment.
///
/// Consecutive bullet lines form one `<ul>`; a line that is not a bullet
/// closes the list. Newlines between text lines become `<br>`.
pub fn render_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut in_list = false;
    let mut after_text = false;

    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        match classify(line) {
            Line::Bullet(item) => {
                if !in_list {
                    out.push_str("<ul>");
                    in_list = true;
                }
                out.push_str("<li>");
                push_inline(&mut out, item);
                out.push_str("</li>");
                after_text = false;
            }
            Line::Heading(level, heading) => {
                if in_list {
                    out.push_str("</ul>");
                    in_list = false;
                }
                out.push_str(&format!("<h{}>", level));
                push_inline(&mut out, heading);
                out.push_str(&format!("</h{}>", level));
                after_text = false;
            }
            Line::Text(line) => {
                if in_list {
                    out.push_str("</ul>");
                    in_list = false;
                }
                if after_text {
                    out.push_str("<br>");
                }
                push_inline(&mut out, line);
                after_text = true;
            }
        }
    }

    if in_list {
        out.push_str("</ul>");
    }
    out
}

/// Render a structured list as one `<ul>`.
pub fn render_list(items: &[String]) -> String {
    let mut out = String::from("<ul>");
    for item in items {
        out.push_str("<li>");
        push_inline(&mut out, item);
        out.push_str("</li>");
    }
    out.push_str("</ul>");
    out
}

fn heading_for(kind: TransformKind, strings: &LanguageStrings) -> &'static str {
    match kind {
        TransformKind::Summary(_) => strings.summary_heading,
        TransformKind::Rewrite(_) => strings.rewrite_heading,
        TransformKind::Proofread => strings.proofread_heading,
        TransformKind::Write => strings.write_heading,
        TransformKind::Answer => strings.answer_heading,
    }
}

/// Compose the result card for a localized result.
///
/// Key-point summaries show the joined points as a lead paragraph followed by
/// the list; every other transform renders its body through
/// [`render_markdown`].
pub fn render_card(result: &LocalizedResult, strings: &LanguageStrings) -> String {
    let mut html = format!("<h3>{}</h3>", heading_for(result.produced_by, strings));

    let lead = if result.title.is_empty() {
        String::new()
    } else {
        format!("<b>{}:</b> ", html_escape(&result.title))
    };

    match (&result.produced_by, &result.key_points) {
        (TransformKind::Summary(SummaryMode::KeyPoints), Some(points)) => {
            html.push_str("<p>");
            html.push_str(&lead);
            push_inline(&mut html, &result.body);
            html.push_str("</p>");
            html.push_str(&format!("<h3>{}</h3>", strings.key_points_heading));
            html.push_str(&render_list(points));
        }
        _ => {
            if !lead.is_empty() {
                html.push_str(&format!("<p>{}</p>", lead.trim_end()));
            }
            html.push_str("<div class=\"digest-body\">");
            html.push_str(&render_markdown(&result.body));
            html.push_str("</div>");
        }
    }

    if !result.source_name.is_empty() {
        html.push_str(&format!(
            "<footer><small>{}: {}</small></footer>",
            strings.source_label,
            html_escape(&result.source_name)
        ));
    }
    html
}

/// Escape text taken from the page itself (title, source name).
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// A visible annotation placed ahead of the card.
pub fn render_notice(text: &str) -> String {
    format!("<p class=\"notice\">{}</p>", text)
}
