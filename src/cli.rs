//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// QnAEval - answer collection and score summaries for RAG evaluation runs
///
/// Works on a directory of QnA JSON files. The `answers` stage sends each
/// question to the chat API and writes `file_ans_<n>.json`; the `summary`
/// stage reads the scored `file_eval*.json` files and reports per-metric
/// percentiles and correlations.
///
/// Examples:
///   qnaeval
///   qnaeval --qna-dir runs/latest --format markdown --output summary.md
///   qnaeval --metrics answer_correctness,faithfulness --format json
///   qnaeval --stage answers --project-id 89d232 --chat-id 51aa0c
///   qnaeval --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Pipeline stage to run
    #[arg(long, default_value = "summary", value_name = "STAGE")]
    pub stage: Stage,

    /// Directory holding the QnA files
    ///
    /// Defaults to `QnA` or the value in .qnaeval.toml.
    #[arg(short = 'd', long, value_name = "DIR")]
    pub qna_dir: Option<PathBuf>,

    /// Filename prefix of scored files
    #[arg(long, value_name = "PREFIX")]
    pub eval_prefix: Option<String>,

    /// Metric names to summarize (comma-separated)
    ///
    /// Example: --metrics answer_relevancy,answer_correctness
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub metrics: Option<Vec<String>>,

    /// Output format for the summary
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the summary to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Chat API base URL
    #[arg(long, env = "QNAEVAL_API_URL", value_name = "URL")]
    pub api_url: Option<String>,

    /// Chat API key
    #[arg(long, env = "X_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Chat API secret
    #[arg(long, env = "X_API_SECRET", hide_env_values = true)]
    pub api_secret: Option<String>,

    /// Project that owns the chat
    #[arg(long, env = "PROJECT_ID", value_name = "ID")]
    pub project_id: Option<String>,

    /// Chat to send questions to
    #[arg(long, env = "CHAT_ID", value_name = "ID")]
    pub chat_id: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Attempts to fetch each answer before giving up
    #[arg(long, value_name = "COUNT")]
    pub max_attempts: Option<usize>,

    /// Pause between answer fetch attempts in milliseconds
    #[arg(long, value_name = "MS")]
    pub retry_interval_ms: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .qnaeval.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .qnaeval.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Stage {
    /// Submit questions to the chat API and store the answers
    Answers,
    /// Summarize scored files (default)
    #[default]
    Summary,
}

/// Output format for the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain console text (default)
    #[default]
    Text,
    /// Markdown format
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref names) = self.metrics {
            if names.iter().any(|n| n.trim().is_empty()) {
                return Err("Metric names must not be empty".to_string());
            }
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.max_attempts == Some(0) {
            return Err("Max attempts must be at least 1".to_string());
        }

        if let Some(ref dir) = self.qna_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(format!("QnA path is not a directory: {}", dir.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
