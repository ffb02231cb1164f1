//! News summarizer CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: load the provider TOML file (or the built-in
//!    defaults) and read the API key from the environment.
//! 2. **Wire observability**: configure `tracing-subscriber` and, when
//!    requested, an OpenTelemetry OTLP exporter. All `tracing` events emitted
//!    by every crate in the workspace flow through this layer.
//! 3. **Construct infrastructure**: create the [`llm::HttpTransport`] and
//!    inject it into a [`dispatch::Dispatcher`] and [`summarizer::Summarizer`].
//! 4. **Run the command**: `summarize` one article, `batch` a JSON file of
//!    articles, or list the configured `providers`.

mod telemetry;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use dispatch::Dispatcher;
use llm::{HttpTransport, ProviderConfig};
use summarizer::{Article, Language, RateLimiter, Summarizer, SummaryReport};
use tracing::info;

use crate::telemetry::LogFormat;

#[derive(Debug, Parser)]
#[command(name = "news-summarizer", version, about = "Summarize news articles with LLM provider fallback")]
struct Cli {
    /// Provider configuration file (TOML). Built-in providers are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format (logs go to stderr).
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Summarize a single article.
    Summarize(SummarizeArgs),
    /// Summarize a JSON array of `{ "title"?, "text" }` articles.
    Batch(BatchArgs),
    /// List the configured providers in the order they are tried.
    Providers,
}

#[derive(Debug, Args)]
struct SummarizeArgs {
    /// Article text.
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    text: Option<String>,

    /// Read the article text from a file.
    #[arg(long)]
    file: Option<PathBuf>,

    #[arg(long)]
    title: Option<String>,

    /// Summary language: `ne` or `en`.
    #[arg(long, default_value = "ne")]
    language: Language,

    /// Print the full report as JSON instead of just the summary.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct BatchArgs {
    /// JSON file containing an array of articles.
    #[arg(long)]
    input: PathBuf,

    /// Where to write the reports; stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Summary language: `ne` or `en`.
    #[arg(long, default_value = "ne")]
    language: Language,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let _telemetry = telemetry::init(cli.log_format)?;

    let config = match &cli.config {
        Some(path) => ProviderConfig::load(path)
            .with_context(|| format!("failed to load configuration from '{}'", path.display()))?,
        None => ProviderConfig::default(),
    };

    match cli.command {
        Command::Providers => {
            list_providers(&config);
            Ok(ExitCode::SUCCESS)
        }
        Command::Summarize(args) => summarize(&config, args).await,
        Command::Batch(args) => batch(&config, args).await,
    }
}

fn build_summarizer(config: &ProviderConfig) -> anyhow::Result<Summarizer<HttpTransport>> {
    let api_key = config.api_key_from_env()?;
    let candidates = config.candidates(&api_key)?;
    let transport = HttpTransport::new(config.request_timeout())?;

    info!(
        candidates = candidates.len(),
        max_attempts = config.max_attempts_per_candidate,
        "Summarizer ready"
    );
    Ok(Summarizer::new(
        Dispatcher::new(transport, config.backoff_policy()?),
        candidates,
        config.max_attempts_per_candidate,
        RateLimiter::per_minute(config.calls_per_minute),
    ))
}

fn list_providers(config: &ProviderConfig) {
    for (index, candidate) in config.candidates.iter().enumerate() {
        println!(
            "{}. {} ({} @ {})",
            index + 1,
            candidate.name,
            candidate.model,
            candidate.endpoint
        );
    }
    println!(
        "max attempts per provider: {}, credential: ${}",
        config.max_attempts_per_candidate, config.api_key_env
    );
}

async fn summarize(config: &ProviderConfig, args: SummarizeArgs) -> anyhow::Result<ExitCode> {
    let text = match (args.text, &args.file) {
        (Some(text), _) => text,
        (None, Some(path)) => read(path)?,
        (None, None) => anyhow::bail!("either --text or --file is required"),
    };
    let article = Article {
        title: args.title,
        text,
    };

    let summarizer = build_summarizer(config)?;
    let report = summarizer.summarize(&article, args.language).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.success {
        println!("{}", report.summary);
    } else {
        eprintln!(
            "Could not summarize: {}",
            report.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn batch(config: &ProviderConfig, args: BatchArgs) -> anyhow::Result<ExitCode> {
    let articles: Vec<Article> = serde_json::from_str(&read(&args.input)?)
        .with_context(|| format!("'{}' is not a JSON array of articles", args.input.display()))?;

    let summarizer = build_summarizer(config)?;
    let reports = summarizer.summarize_batch(&articles, args.language).await;
    write_reports(&reports, args.output.as_deref())?;

    let succeeded = reports.iter().filter(|r| r.success).count();
    eprintln!("Summarized {succeeded}/{} articles", reports.len());
    Ok(ExitCode::SUCCESS)
}

fn write_reports(reports: &[SummaryReport], output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(reports)?;
    match output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("failed to write '{}'", path.display())),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path.display()))
}
