//! QnAEval - RAG chat evaluation helper
//!
//! A CLI tool that collects chat answers for QnA files and summarizes
//! scored evaluation files into per-metric percentiles and correlations.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, unreadable directory, etc.)

mod analysis;
mod chat;
mod cli;
mod config;
mod models;
mod records;
mod report;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat, Stage};
use config::{Config, CONFIG_FILE};
use models::{Report, ReportMetadata};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    if let Err(e) = init_logging(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    info!("QnAEval v{}", env!("CARGO_PKG_VERSION"));
    debug!("Stage: {:?}, format: {:?}", args.stage, args.format);

    let result = match load_config(&args) {
        Ok(config) => match args.stage {
            Stage::Summary => run_summary(&args, &config),
            Stage::Answers => run_answers(&args, &config).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        error!("Run failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .qnaeval.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Keep API credentials in the environment (X_API_KEY, X_API_SECRET).");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so summaries on stdout stay clean.
fn init_logging(args: &Args) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Load configuration from file or use defaults, then apply arguments.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        Config::load(config_path)?
    } else {
        match Config::load_default() {
            Ok(Some(config)) => {
                info!("Loaded default config from {}", CONFIG_FILE);
                config
            }
            Ok(None) => {
                debug!("No config file found, using defaults");
                Config::default()
            }
            Err(e) => {
                warn!("Failed to load config: {:#}", e);
                Config::default()
            }
        }
    };

    config.merge_with_args(args);
    Ok(config)
}

/// Summarize scored files and emit the report.
fn run_summary(args: &Args, config: &Config) -> Result<()> {
    let start_time = Instant::now();
    let dir = &config.general.qna_dir;
    let metrics = &config.metrics.names;

    info!("Reading scored files from {}", dir.display());
    let loaded =
        records::load_evaluation_records(dir, &config.general.eval_prefix, metrics)?;

    if loaded.files_skipped > 0 {
        warn!("{} file(s) could not be read", loaded.files_skipped);
    }
    info!(
        "Loaded {} records from {} file(s)",
        loaded.records.len(),
        loaded.files_read
    );

    let pool = analysis::collect(&loaded.records, metrics);
    for (metric, values) in &pool {
        debug!("{}: {} valid values", metric, values.len());
    }

    let report = Report {
        metadata: ReportMetadata {
            source_dir: dir.display().to_string(),
            generated_at: Utc::now(),
            files_read: loaded.files_read,
            records_read: loaded.records.len(),
            metrics: metrics.clone(),
        },
        statistics: analysis::summarize(&pool),
        correlations: analysis::correlate(&loaded.records, metrics),
    };

    let output = match args.format {
        OutputFormat::Text => report::generate_text_report(&report),
        OutputFormat::Markdown => report::generate_markdown_report(&report),
        OutputFormat::Json => report::generate_json_report(&report)?,
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write summary to {}", path.display()))?;
            info!("Summary saved to {}", path.display());
        }
        None => println!("{}", output),
    }

    debug!("Summary took {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(())
}

/// Collect chat answers for every question file.
async fn run_answers(args: &Args, config: &Config) -> Result<()> {
    let start_time = Instant::now();

    config.validate_api().map_err(anyhow::Error::msg)?;

    let client = chat::ChatClient::new(&config.api)?;
    let policy = config.retry.policy();
    let collector = chat::AnswerCollector::new(&client, policy, !args.quiet);

    println!("💬 Collecting answers from {}", config.api.base_url);
    println!(
        "   Retry: {} attempts, {}ms apart",
        policy.max_attempts,
        policy.interval.as_millis()
    );

    let summary = collector
        .run(&config.general.qna_dir, &config.general.eval_prefix)
        .await?;

    println!("\n📊 Answer Collection Summary:");
    println!("   Files written: {}", summary.files_written.len());
    println!("   Answered: {}", summary.answered);
    println!("   Unanswered: {}", summary.unanswered);
    if summary.files_skipped > 0 {
        println!("   Files skipped: {}", summary.files_skipped);
    }
    if summary.submit_failures > 0 {
        println!("   Submit failures: {}", summary.submit_failures);
    }
    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());

    Ok(())
}
