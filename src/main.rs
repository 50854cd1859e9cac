use anyhow::{bail, Context, Result};
use page_digest::capability::{CapabilityRegistry, SummaryLength, SummaryMode};
use page_digest::config::Config;
use page_digest::export::export;
use page_digest::i18n::LanguageRegistry;
use page_digest::openai::OpenAiBackend;
use page_digest::session::{RewriteStyle, SessionController, SessionSettings};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Tldr,
    KeyPoints,
    Rewrite(RewriteStyle),
    Proofread,
    Write(String),
    Ask(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Invocation {
    command: Command,
    source: String,
    lang: Option<String>,
    export: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cli {
    Help,
    Languages,
    Run(Invocation),
}

fn print_usage() {
    println!(
        r#"
Summarize, rewrite and question web pages with OpenAI

USAGE:
    page-digest <COMMAND> <SOURCE> [ARGS...] [--lang CODE] [--export]

SOURCE:
    A local HTML file or an http(s) URL

COMMANDS:
    tldr                  Short summary paragraph
    key-points            Bullet list of key points
    rewrite <STYLE>       Rewrite the page (simplify, elaborate, formal, casual)
    proofread             Fix spelling and grammar in the page text
    write <PROMPT>        Generate text from a prompt about the page title
    ask <QUESTION>        Answer a question using the page content
    languages             List display languages
    help                  Show this message

OPTIONS:
    --lang CODE           Display language (default: DEFAULT_LANGUAGE or English)
    --export              Save the English result to EXPORT_DIR/page-digest-YYYYMMDD.txt

ENVIRONMENT VARIABLES:
    OPENAI_API_KEY        Required
    OPENAI_MODEL          Model to use (default: gpt-4o-mini)
    TRANSLATION_STRATEGY  per-item or numbered-block (default: per-item)

EXAMPLES:
    page-digest tldr https://example.com/post --lang es
    page-digest ask article.html "Who wrote this?"
"#
    );
}

fn parse_args(args: &[String]) -> Result<Cli> {
    let mut positionals = Vec::new();
    let mut lang = None;
    let mut export = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--export" => export = true,
            "--lang" => {
                let code = iter.next().context("--lang needs a language code")?;
                lang = Some(code.clone());
            }
            other if other.starts_with("--lang=") => {
                lang = Some(other.trim_start_matches("--lang=").to_string());
            }
            _ => positionals.push(arg.clone()),
        }
    }

    let Some(command) = positionals.first() else {
        return Ok(Cli::Help);
    };
    match command.as_str() {
        "help" | "--help" | "-h" => return Ok(Cli::Help),
        "languages" => return Ok(Cli::Languages),
        _ => {}
    }

    let source = positionals
        .get(1)
        .cloned()
        .with_context(|| format!("'{}' needs a SOURCE file or URL", command))?;
    let rest = positionals[2..].join(" ");

    let command = match command.as_str() {
        "tldr" => Command::Tldr,
        "key-points" => Command::KeyPoints,
        "rewrite" => Command::Rewrite(rest.parse()?),
        "proofread" => Command::Proofread,
        "write" if !rest.trim().is_empty() => Command::Write(rest),
        "ask" if !rest.trim().is_empty() => Command::Ask(rest),
        "write" => bail!("'write' needs a PROMPT"),
        "ask" => bail!("'ask' needs a QUESTION"),
        other => bail!("Unknown command: {}", other),
    };

    Ok(Cli::Run(Invocation {
        command,
        source,
        lang,
        export,
    }))
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

async fn load_source(source: &str, timeout: Duration) -> Result<String> {
    if !is_url(source) {
        return std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read {}", source));
    }

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let response = client
        .get(source)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", source))?;
    if !response.status().is_success() {
        bail!("Fetching {} returned {}", source, response.status());
    }
    response
        .text()
        .await
        .with_context(|| format!("Failed to read body of {}", source))
}

fn print_languages() {
    for language in LanguageRegistry::get().list_enabled() {
        let marker = if language.is_canonical { " (canonical)" } else { "" };
        println!(
            "{:<4} {} / {}{}",
            language.code, language.name, language.native_name, marker
        );
    }
}

async fn run(invocation: Invocation) -> Result<()> {
    let config = Config::from_env()?;
    let backend = Arc::new(OpenAiBackend::new(&config)?);
    let settings = SessionSettings::from_config(&config)?;
    let controller = SessionController::new(CapabilityRegistry::with_backend(backend), settings);

    info!("Loading {}", invocation.source);
    let html = load_source(
        &invocation.source,
        Duration::from_secs(config.request_timeout_secs),
    )
    .await?;
    let url = is_url(&invocation.source).then_some(invocation.source.as_str());
    controller.load_page(&html, url)?;

    if let Some(code) = &invocation.lang {
        controller.select_language(code).await?;
    }

    let result = match &invocation.command {
        Command::Tldr => controller.summarize(SummaryMode::Tldr, SummaryLength::Medium).await,
        Command::KeyPoints => {
            controller
                .summarize(SummaryMode::KeyPoints, SummaryLength::Medium)
                .await
        }
        Command::Rewrite(style) => controller.rewrite(*style).await,
        Command::Proofread => controller.proofread().await,
        Command::Write(prompt) => controller.write(prompt).await,
        Command::Ask(question) => controller.answer(question).await,
    };
    let failed = result.is_err();

    let output = controller.present(result);
    println!("{}", output.html);

    if invocation.export {
        match controller.canonical() {
            Some(canonical) => {
                let path = export(&canonical, &config.export_dir)?;
                eprintln!("Exported to {}", path.display());
            }
            None => eprintln!("Nothing to export"),
        }
    }

    debug!(
        "Translation metrics: {}",
        serde_json::to_string(&controller.metrics())?
    );

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when the variables are already set)
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout carries the rendered fragment
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("page_digest=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{}", e);
            print_usage();
            std::process::exit(2);
        }
    };

    match cli {
        Cli::Help => {
            print_usage();
            Ok(())
        }
        Cli::Languages => {
            print_languages();
            Ok(())
        }
        Cli::Run(invocation) => run(invocation).await,
    }
}
