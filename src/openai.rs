use crate::capability::{
    Answerer, Availability, Proofreader, ProofreadOptions, RewriteOptions, Rewriter,
    SummarizeOptions, Summarizer, SummaryLength, SummaryMode, Translator, Writer,
};
use crate::config::Config;
use crate::i18n::Language;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Proofreader reply meaning the text needs no correction
const NO_CHANGES: &str = "NO_CHANGES";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
}

/// Check if a model is a reasoning model that doesn't support temperature
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

fn language_name(code: &str) -> String {
    Language::from_code(code)
        .map(|l| l.name().to_string())
        .unwrap_or_else(|_| code.to_string())
}

// ==================== Prompts ====================

fn build_summary_system_prompt(options: &SummarizeOptions) -> String {
    let length = match (options.mode, options.length) {
        (SummaryMode::Tldr, SummaryLength::Short) => "one sentence",
        (SummaryMode::Tldr, SummaryLength::Medium) => "three sentences",
        (SummaryMode::Tldr, SummaryLength::Long) => "five sentences",
        (SummaryMode::KeyPoints, SummaryLength::Short) => "three bullet points",
        (SummaryMode::KeyPoints, SummaryLength::Medium) => "five bullet points",
        (SummaryMode::KeyPoints, SummaryLength::Long) => "seven bullet points",
    };
    let format = match options.mode {
        SummaryMode::Tldr => "Write a short, plain paragraph a busy reader can skim.",
        SummaryMode::KeyPoints => {
            "Write one key point per line, each line starting with \"* \". No intro or closing text."
        }
    };
    format!(
        r#"You summarize web pages.

## Output
- Length: {}
- {}
- Write in {}
- Use only facts stated in the page; do not speculate"#,
        length,
        format,
        language_name(&options.output_language)
    )
}

/// Build the system prompt for translation
fn build_translation_system_prompt(source_language: &str, target_language: &str) -> String {
    format!(
        r#"You are a professional translator. Translate the user's text from {} to {}.

## Translation Rules

### DO NOT translate:
- URLs and links
- Proper names of people, companies, and products
- Code snippets or technical identifiers
- Acronyms (AI, ML, LLM, GPU, etc.)

### Formatting:
- Preserve all markdown formatting (bold, headers, bullet points)
- Keep list numbering exactly as given ("1.", "2.", ...)
- Maintain the same structure and layout as the original

Reply with the translation only."#,
        source_language, target_language
    )
}

fn build_rewrite_system_prompt(options: &RewriteOptions) -> String {
    let mut rules = Vec::new();
    if let Some(length) = options.length {
        rules.push(format!("- Length: {}", length.as_str()));
    }
    if let Some(tone) = options.tone {
        rules.push(format!("- Tone: {}", tone.as_str()));
    }
    if let Some(context) = &options.context {
        rules.push(format!("- {}", context));
    }
    if rules.is_empty() {
        rules.push("- Improve clarity without changing the meaning".to_string());
    }
    format!(
        "You rewrite text while keeping its meaning.\n\n## Rules\n{}\n\nReply with the rewritten text only.",
        rules.join("\n")
    )
}

fn build_proofread_system_prompt(options: &ProofreadOptions) -> String {
    format!(
        r#"You are a proofreader. Fix spelling, grammar and punctuation in the user's text.
The text is expected to be in: {}.
Do not rephrase or change the meaning.
Reply with the corrected text only. If nothing needs correcting, reply with exactly {}."#,
        options
            .expected_input_languages
            .iter()
            .map(|code| language_name(code))
            .collect::<Vec<_>>()
            .join(", "),
        NO_CHANGES
    )
}

fn build_write_system_prompt(output_language: &str) -> String {
    format!(
        "You are a helpful writer. Follow the user's request and write in {}. Reply with the text only.",
        language_name(output_language)
    )
}

const ANSWER_SYSTEM_PROMPT: &str = r#"You answer questions about a web page.
Use only the page content provided. If the page does not contain the answer, say so plainly."#;

fn build_answer_user_prompt(question: &str, grounding_context: &str) -> String {
    format!(
        "Page content:\n\n{}\n\nQuestion: {}",
        grounding_context, question
    )
}

// ==================== Backend ====================

/// Chat-completions client implementing every text capability.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
    temperature: f32,
    max_completion_tokens: u32,
}

impl OpenAiBackend {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: config.openai_api_key.clone(),
            api_url: config.openai_api_url.clone(),
            model: config.openai_model.clone(),
            temperature: config.openai_temperature,
            max_completion_tokens: config.max_completion_tokens,
        })
    }

    fn probe(&self) -> Availability {
        if self.api_key.trim().is_empty() {
            Availability::Unavailable
        } else {
            Availability::Available
        }
    }

    fn build_request(&self, system: String, user: String, temperature: Option<f32>) -> ChatRequest {
        // Reasoning models need higher token limits and don't support temperature
        let is_reasoning = is_reasoning_model(&self.model);
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system,
                },
                Message {
                    role: "user".to_string(),
                    content: user,
                },
            ],
            max_completion_tokens: if is_reasoning {
                16000
            } else {
                self.max_completion_tokens
            },
            temperature: if is_reasoning {
                None
            } else {
                Some(temperature.unwrap_or(self.temperature))
            },
            reasoning_effort: if is_reasoning {
                Some("low".to_string())
            } else {
                None
            },
        }
    }

    async fn complete(
        &self,
        task: &str,
        system: String,
        user: String,
        temperature: Option<f32>,
    ) -> Result<String> {
        let request = self.build_request(system, user, temperature);
        debug!("Sending {} request to {} ({})", task, self.api_url, self.model);

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request to OpenAI API", task))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            anyhow::bail!("OpenAI API error during {} ({}): {}", task, status, body);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse OpenAI {} response", task))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .with_context(|| format!("OpenAI {} response contained no choices", task))
    }
}

#[async_trait]
impl Summarizer for OpenAiBackend {
    async fn availability(&self) -> Availability {
        self.probe()
    }

    async fn summarize(&self, text: &str, options: &SummarizeOptions) -> Result<String> {
        self.complete(
            "summarization",
            build_summary_system_prompt(options),
            text.to_string(),
            None,
        )
        .await
    }
}

#[async_trait]
impl Translator for OpenAiBackend {
    async fn availability(&self) -> Availability {
        self.probe()
    }

    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String> {
        self.complete(
            "translation",
            build_translation_system_prompt(&language_name(source_lang), &language_name(target_lang)),
            text.to_string(),
            Some(0.3),
        )
        .await
    }
}

#[async_trait]
impl Rewriter for OpenAiBackend {
    async fn availability(&self) -> Availability {
        self.probe()
    }

    async fn rewrite(&self, text: &str, options: &RewriteOptions) -> Result<String> {
        self.complete(
            "rewrite",
            build_rewrite_system_prompt(options),
            text.to_string(),
            None,
        )
        .await
    }
}

#[async_trait]
impl Proofreader for OpenAiBackend {
    async fn availability(&self) -> Availability {
        self.probe()
    }

    async fn proofread(&self, text: &str, options: &ProofreadOptions) -> Result<Option<String>> {
        let reply = self
            .complete(
                "proofreading",
                build_proofread_system_prompt(options),
                text.to_string(),
                Some(0.0),
            )
            .await?;
        let reply = reply.trim();
        if reply.is_empty() || reply == NO_CHANGES {
            Ok(None)
        } else {
            Ok(Some(reply.to_string()))
        }
    }
}

#[async_trait]
impl Writer for OpenAiBackend {
    async fn availability(&self) -> Availability {
        self.probe()
    }

    async fn write(&self, prompt: &str, output_language: &str) -> Result<String> {
        self.complete(
            "writing",
            build_write_system_prompt(output_language),
            prompt.to_string(),
            None,
        )
        .await
    }
}

#[async_trait]
impl Answerer for OpenAiBackend {
    async fn availability(&self) -> Availability {
        self.probe()
    }

    async fn answer(&self, question: &str, grounding_context: &str) -> Result<String> {
        self.complete(
            "answer",
            ANSWER_SYSTEM_PROMPT.to_string(),
            build_answer_user_prompt(question, grounding_context),
            Some(0.2),
        )
        .await
    }
}
