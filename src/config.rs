//! Configuration file handling.
//!
//! This module handles loading `.qnaeval.toml` and merging it with
//! command-line arguments and environment variables. The resulting
//! [`Config`] is built once in `main` and handed to each stage.

use crate::analysis::unique_names;
use crate::chat::RetryPolicy;
use crate::models::DEFAULT_METRICS;
use crate::records::EVAL_PREFIX;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up in the current directory.
pub const CONFIG_FILE: &str = ".qnaeval.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Chat API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Answer polling settings.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Tracked metrics.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Working directory holding the QnA files.
    #[serde(default = "default_qna_dir")]
    pub qna_dir: PathBuf,

    /// Filename prefix of scored files.
    #[serde(default = "default_eval_prefix")]
    pub eval_prefix: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            qna_dir: default_qna_dir(),
            eval_prefix: default_eval_prefix(),
        }
    }
}

fn default_qna_dir() -> PathBuf {
    PathBuf::from("QnA")
}

fn default_eval_prefix() -> String {
    EVAL_PREFIX.to_string()
}

/// Chat API settings.
///
/// Credentials normally come from the environment rather than the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the chat service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub api_secret: String,

    #[serde(default)]
    pub project_id: String,

    #[serde(default)]
    pub chat_id: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            api_secret: String::new(),
            project_id: String::new(),
            chat_id: String::new(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_timeout() -> u64 {
    120
}

/// Answer polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts to fetch an answer before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Pause between attempts in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
        }
    }
}

fn default_max_attempts() -> usize {
    5
}

fn default_interval_ms() -> u64 {
    1000
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.interval_ms))
    }
}

/// Tracked metric names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metric_names")]
    pub names: Vec<String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            names: default_metric_names(),
        }
    }
}

fn default_metric_names() -> Vec<String> {
    DEFAULT_METRICS.iter().map(|s| s.to_string()).collect()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Arguments (and the environment variables clap reads for them) take
    /// precedence, but only when actually provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.qna_dir {
            self.general.qna_dir = dir.clone();
        }
        if let Some(ref prefix) = args.eval_prefix {
            self.general.eval_prefix = prefix.clone();
        }
        if let Some(ref names) = args.metrics {
            self.metrics.names = names.clone();
        }
        self.metrics.names = unique_names(&self.metrics.names);

        if let Some(ref url) = args.api_url {
            self.api.base_url = url.clone();
        }
        if let Some(ref key) = args.api_key {
            self.api.api_key = key.clone();
        }
        if let Some(ref secret) = args.api_secret {
            self.api.api_secret = secret.clone();
        }
        if let Some(ref project) = args.project_id {
            self.api.project_id = project.clone();
        }
        if let Some(ref chat) = args.chat_id {
            self.api.chat_id = chat.clone();
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }

        if let Some(attempts) = args.max_attempts {
            self.retry.max_attempts = attempts;
        }
        if let Some(interval) = args.retry_interval_ms {
            self.retry.interval_ms = interval;
        }
    }

    /// Check the settings the answer stage needs.
    pub fn validate_api(&self) -> Result<(), String> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err("API URL must start with 'http://' or 'https://'".to_string());
        }

        let missing: Vec<&str> = [
            ("api key (X_API_KEY)", &self.api.api_key),
            ("api secret (X_API_SECRET)", &self.api.api_secret),
            ("project id (PROJECT_ID)", &self.api.project_id),
            ("chat id (CHAT_ID)", &self.api.chat_id),
        ]
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| *name)
        .collect();

        if !missing.is_empty() {
            return Err(format!("Missing chat API settings: {}", missing.join(", ")));
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn api_ready() -> Config {
        let mut config = Config::default();
        config.api.api_key = "k".to_string();
        config.api.api_secret = "s".to_string();
        config.api.project_id = "p".to_string();
        config.api.chat_id = "c".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.qna_dir, PathBuf::from("QnA"));
        assert_eq!(config.general.eval_prefix, "file_eval");
        assert_eq!(config.api.base_url, "http://localhost:8001");
        assert_eq!(config.metrics.names.len(), 3);
        assert!(config
            .metrics
            .names
            .contains(&"semantic_similarity".to_string()));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
qna_dir = "runs/2024-06"

[api]
base_url = "http://chat.internal:9000"
project_id = "89d232"

[retry]
max_attempts = 8
interval_ms = 250

[metrics]
names = ["answer_correctness", "faithfulness"]
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.qna_dir, PathBuf::from("runs/2024-06"));
        assert_eq!(config.general.eval_prefix, "file_eval");
        assert_eq!(config.api.base_url, "http://chat.internal:9000");
        assert_eq!(config.api.project_id, "89d232");
        assert_eq!(config.api.timeout_seconds, 120);
        assert_eq!(config.metrics.names, vec!["answer_correctness", "faithfulness"]);

        let policy = config.retry.policy();
        assert_eq!(policy.max_attempts, 8);
        assert_eq!(policy.interval, Duration::from_millis(250));
    }

    #[test]
    fn test_merge_cleans_metric_names() {
        let args = crate::cli::Args::try_parse_from([
            "qnaeval",
            "--metrics",
            "answer_relevancy, answer_correctness,answer_relevancy",
        ])
        .unwrap();

        let mut config = Config::default();
        config.merge_with_args(&args);
        assert_eq!(
            config.metrics.names,
            vec!["answer_relevancy", "answer_correctness"]
        );
    }

    #[test]
    fn test_merge_dedupes_file_metric_names() {
        let mut config: Config = toml::from_str(
            r#"
[metrics]
names = ["faithfulness", "faithfulness ", "answer_correctness"]
"#,
        )
        .unwrap();
        let args = crate::cli::Args::try_parse_from(["qnaeval"]).unwrap();

        config.merge_with_args(&args);
        assert_eq!(config.metrics.names, vec!["faithfulness", "answer_correctness"]);
    }

    #[test]
    fn test_verbose_is_not_a_file_setting() {
        assert!(!Config::default_toml().contains("verbose"));
    }

    #[test]
    fn test_validate_api() {
        assert!(api_ready().validate_api().is_ok());

        let mut config = api_ready();
        config.api.chat_id.clear();
        config.api.api_secret.clear();
        let err = config.validate_api().unwrap_err();
        assert!(err.contains("CHAT_ID"));
        assert!(err.contains("X_API_SECRET"));
        assert!(!err.contains("PROJECT_ID"));

        let mut config = api_ready();
        config.api.base_url = "localhost:8001".to_string();
        assert!(config.validate_api().is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[retry]"));
        assert!(toml_str.contains("[metrics]"));
    }
}
