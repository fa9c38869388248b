//! media-monitor: scrape a page or take Darija text, run it through the
//! generation service, and print a JSON result.
//!
//! Usage:
//!   media-monitor run --url https://example.com/article --mode sentiment
//!   media-monitor text --mode both
//!   media-monitor extract --file response.txt
//!   media-monitor batch --file urls.txt --concurrency 4

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use media_monitor::config::{config_path, Config};
use media_monitor::extractor;
use media_monitor::pipeline::{analyze_text, run_pipeline, OutputMode, PipelineRequest, ResultEnvelope};
use media_monitor::plugins::builtin::{text_registry, web_registry};
use media_monitor::registry::{self, PluginRegistry};

#[derive(Parser)]
#[command(name = "media-monitor")]
#[command(about = "Scrape, translate and analyse media content", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a URL and run one generation pass over it
    Run {
        #[arg(long)]
        url: String,
        /// "sentiment" or anything starting with "trans"
        #[arg(long, default_value = "sentiment")]
        mode: String,
        #[arg(long)]
        target_language: Option<String>,
        /// Extra scraper options as key=value (values parsed as JSON when possible)
        #[arg(long = "opt", value_parser = parse_key_value)]
        opts: Vec<(String, Value)>,
    },
    /// Translate and/or analyse Darija text (defaults to DARIJA_TEXT or a built-in sample)
    Text {
        #[arg(long)]
        text: Option<String>,
        /// sentiment, translation or both (defaults to DARIJA_OUTPUT_MODE)
        #[arg(long)]
        mode: Option<String>,
    },
    /// Run structured extraction over a saved generation response (stdin if no file)
    Extract {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Run the URL pipeline over every line of a file
    Batch {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value = "sentiment")]
        mode: String,
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },
}

fn parse_key_value(raw: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("media_monitor=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    init_tracing(&config);
    match &config.source {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => warn!(
            "Config file {} not found, using defaults",
            config_path().display()
        ),
    }

    match cli.command {
        Commands::Run {
            url,
            mode,
            target_language,
            opts,
        } => {
            let registry = registry::install_global(web_registry(&config)?);
            let mut request = PipelineRequest::for_url(url).with_option("mode", mode);
            if let Some(language) = target_language {
                request = request.with_option("target_language", language);
            }
            for (key, value) in opts {
                request = request.with_option(key, value);
            }
            let envelope = run_pipeline(&registry, request);
            print_json(&envelope)?;
            if !envelope.is_success() {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Text { text, mode } => {
            let registry = text_registry(&config)?;
            let text = text.unwrap_or_else(|| config.pipeline.default_input_text.clone());
            let mode = OutputMode::parse(mode.as_deref().unwrap_or(&config.pipeline.default_mode));
            info!("Analysing {} chars of text (mode {:?})", text.chars().count(), mode);
            print_json(&analyze_text(&registry, &text, mode))
        }
        Commands::Extract { file } => {
            let raw = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            print_json(&extractor::extract(&raw))
        }
        Commands::Batch {
            file,
            mode,
            concurrency,
        } => {
            let urls = read_urls(&file)?;
            let registry = registry::install_global(web_registry(&config)?);
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("building tokio runtime")?;
            let envelopes = runtime.block_on(run_batch(registry, urls, mode, concurrency))?;
            for envelope in envelopes {
                println!("{}", serde_json::to_string(&envelope)?);
            }
            Ok(())
        }
    }
}

fn read_urls(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect();
    if urls.is_empty() {
        bail!("no URLs found in {}", path.display());
    }
    Ok(urls)
}

/// Pipeline runs are blocking; each goes to the blocking pool, bounded by a semaphore.
/// Results come back in input order.
async fn run_batch(
    registry: Arc<PluginRegistry>,
    urls: Vec<String>,
    mode: String,
    concurrency: usize,
) -> Result<Vec<ResultEnvelope>> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(urls.len());

    for url in urls {
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        let registry = Arc::clone(&registry);
        let request = PipelineRequest::for_url(url.clone()).with_option("mode", mode.clone());
        handles.push((
            url,
            tokio::task::spawn_blocking(move || {
                let envelope = run_pipeline(&registry, request);
                drop(permit);
                envelope
            }),
        ));
    }

    let mut envelopes = Vec::with_capacity(handles.len());
    for (url, handle) in handles {
        match handle.await {
            Ok(envelope) => envelopes.push(envelope),
            Err(e) => {
                warn!("Worker for {} panicked: {}", url, e);
                envelopes.push(ResultEnvelope::failure(None, format!("Internal error: {}", e)));
            }
        }
    }
    info!("Batch finished: {} runs", envelopes.len());
    Ok(envelopes)
}
