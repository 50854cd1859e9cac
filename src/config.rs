use crate::i18n::Language;
use crate::translation::TranslationStrategy;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone)]
pub struct Config {
    // OpenAI
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_api_url: String,
    pub openai_temperature: f32,
    pub max_completion_tokens: u32,
    pub request_timeout_secs: u64,

    // Input caps (characters)
    pub summarize_input_cap: usize,
    pub rewrite_input_cap: usize,
    pub proofread_input_cap: usize,
    pub answer_input_cap: usize,

    // Translation
    pub translation_strategy: TranslationStrategy,
    /// Initial display language; empty means English
    pub default_language: String,

    // Export
    pub export_dir: PathBuf,
}

/// Parse an optional variable, falling back to `default` when unset or invalid.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let translation_strategy = match std::env::var("TRANSLATION_STRATEGY") {
            Ok(value) => value
                .parse()
                .context("TRANSLATION_STRATEGY is invalid")?,
            Err(_) => TranslationStrategy::default(),
        };

        let default_language = std::env::var("DEFAULT_LANGUAGE").unwrap_or_default();
        Language::from_selection(&default_language).context("DEFAULT_LANGUAGE is invalid")?;

        Ok(Self {
            // OpenAI
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY not set")?,
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_API_URL.to_string()),
            openai_temperature: env_or("OPENAI_TEMPERATURE", 0.7),
            max_completion_tokens: env_or("MAX_COMPLETION_TOKENS", 2500),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 60),

            // Input caps
            summarize_input_cap: env_or("SUMMARIZE_INPUT_CAP", 10_000),
            rewrite_input_cap: env_or("REWRITE_INPUT_CAP", 8_000),
            proofread_input_cap: env_or("PROOFREAD_INPUT_CAP", 5_000),
            answer_input_cap: env_or("ANSWER_INPUT_CAP", 30_000),

            // Translation
            translation_strategy,
            default_language: default_language.trim().to_string(),

            // Export
            export_dir: std::env::var("EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
        })
    }
}
