//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest crawl-and-extract
//! pipeline.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use sumi_harvest::config::{load_config_with_hash, Config};
use sumi_harvest::crawler::{Coordinator, EnqueueOutcome, Frontier};
use sumi_harvest::filter::build_filter;
use sumi_harvest::output::{generate_markdown_summary, ExportFormat};
use sumi_harvest::url::normalize_url;
use tracing_subscriber::EnvFilter;

/// Sumi-Harvest: a polite crawl-and-extract pipeline
///
/// Sumi-Harvest crawls from a seed page within depth and page limits,
/// respects robots.txt, asks a language model to extract the fields described
/// in the configuration, and exports the records.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A polite crawl-and-extract pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Page to start crawling from
    #[arg(value_name = "SEED_URL")]
    seed_url: String,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Export format, overriding the config (json, csv, xlsx, text, html)
    #[arg(long, value_name = "FORMAT")]
    format: Option<ExportFormat>,

    /// Export path, overriding the config
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Validate config and seed without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let format = cli.format.unwrap_or(config.output.format);
    let export_path = export_path(&config, cli.format, cli.output.as_deref());

    if cli.dry_run {
        handle_dry_run(&config, &cli.seed_url, format, &export_path)
    } else {
        handle_crawl(config, config_hash, &cli.seed_url, format, &export_path).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Where the export goes: `--output`, else the config path
///
/// A `--format` override without `--output` swaps the config path's extension.
fn export_path(config: &Config, format: Option<ExportFormat>, output: Option<&Path>) -> PathBuf {
    match (output, format) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(format)) => {
            Path::new(&config.output.path).with_extension(format.extension())
        }
        (None, None) => PathBuf::from(&config.output.path),
    }
}

/// Handles the --dry-run mode: validates everything a crawl needs up front
fn handle_dry_run(
    config: &Config,
    seed: &str,
    format: ExportFormat,
    export_path: &Path,
) -> anyhow::Result<()> {
    println!("=== Sumi-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Crawl delay: {}ms", config.crawler.crawl_delay);
    println!("  Follow links: {}", config.crawler.follow_links);
    println!("  Same domain only: {}", config.crawler.same_domain_only);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots);
    println!("  Include patterns: {:?}", config.crawler.include_patterns);
    println!("  Exclude patterns: {:?}", config.crawler.exclude_patterns);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nExtractor:");
    println!("  Kind: {:?}", config.extractor.kind);
    if let Some(selector) = &config.extractor.selector {
        println!("  Selector: {}", selector);
    }
    println!("  Images: {}", config.extractor.extract_images);

    println!("\nModel:");
    match &config.model {
        Some(model) => {
            println!("  Model: {} ({:?})", model.model, model.provider_kind());
            println!("  API key variable: {}", model.api_key_var());
            println!("  Prompt: {}", model.prompt);
            println!("  Chunking: {}", model.chunking);
        }
        None => println!("  None (records hold page title and text)"),
    }

    println!("\nOutput:");
    println!("  Format: {}", format);
    println!("  Path: {}", export_path.display());
    if config.extractor.extract_images {
        println!("  Media: {}", config.output.media_dir);
    }
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary);
    }

    build_filter(config).context("Model configuration is not usable")?;

    let seed = seed.trim();
    normalize_url(seed).with_context(|| format!("Invalid seed URL {}", seed))?;
    let mut frontier = Frontier::new(&config.crawler)?;
    match frontier.enqueue(seed, 0) {
        EnqueueOutcome::Queued => {}
        outcome => anyhow::bail!("Seed {} would be rejected: {:?}", seed, outcome),
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling at {}", seed);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: String,
    seed: &str,
    format: ExportFormat,
    export_path: &Path,
) -> anyhow::Result<()> {
    let config = Arc::new(config);
    let mut coordinator =
        Coordinator::from_config(Arc::clone(&config))?.with_config_hash(config_hash);

    // Ctrl-C stops the loop between pages; whatever was collected is exported
    let stop = coordinator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            stop.store(true, Ordering::SeqCst);
        }
    });

    let outcome = coordinator.run(seed).await;
    let sink = coordinator.into_sink();

    let report = match outcome {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            if !sink.is_empty() {
                sink.export(format, export_path)?;
                tracing::info!(
                    "{} record(s) collected before the failure were exported",
                    sink.len()
                );
            }
            return Err(e.into());
        }
    };

    let written = sink
        .export(format, export_path)
        .with_context(|| format!("Failed to export records to {}", export_path.display()))?;

    report.log_summary();
    tracing::info!("Records written to {}", written.display());

    if let Some(summary_path) = &config.output.summary_path {
        generate_markdown_summary(&report, Path::new(summary_path))
            .with_context(|| format!("Failed to write summary to {}", summary_path))?;
        tracing::info!("Summary written to {}", summary_path);
    }

    Ok(())
}
