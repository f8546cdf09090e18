//! Data models for evaluation runs.
//!
//! This module contains the records read from scored QnA files, the
//! statistics derived from them, and the report that wraps both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Metric names tracked when nothing else is configured.
pub const DEFAULT_METRICS: [&str; 3] = [
    "answer_relevancy",
    "answer_correctness",
    "semantic_similarity",
];

/// One question's scored outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// The question that was asked.
    #[serde(default)]
    pub question: String,
    /// The chat system's answer.
    #[serde(default)]
    pub response: Option<String>,
    /// Reference answer.
    #[serde(default)]
    pub ground_truth: Option<String>,
    /// Metric name to score. `None` means the scorer produced nothing usable.
    pub scores: BTreeMap<String, Option<f64>>,
}

impl EvaluationRecord {
    /// Build a record from a JSON object, keeping only the tracked metrics.
    ///
    /// Anything that is not a JSON number (null, strings, nested values)
    /// becomes `None`. Returns `None` when `value` is not an object.
    pub fn from_json(value: &Value, metric_names: &[String]) -> Option<Self> {
        let object = value.as_object()?;

        let scores = metric_names
            .iter()
            .filter_map(|name| {
                object
                    .get(name)
                    .map(|v| (name.clone(), v.as_f64()))
            })
            .collect();

        Some(Self {
            question: string_field(object, "question").unwrap_or_default(),
            response: string_field(object, "response"),
            ground_truth: string_field(object, "ground_truth"),
            scores,
        })
    }

    /// Returns the score for a metric if it is present and a real number.
    pub fn score(&self, metric: &str) -> Option<f64> {
        self.scores
            .get(metric)
            .copied()
            .flatten()
            .filter(|v| !v.is_nan())
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(String::from)
}

/// A question as it appears in a QnA file.
///
/// Fields the pipeline does not know about (chunk ids, scores) are kept in
/// `extra` so rewriting a file never drops data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QnaItem {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_truth: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Derived statistics for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStatistics {
    /// Number of valid values in the pool.
    pub count: usize,
    /// Arithmetic mean.
    pub average: f64,
    /// 50th percentile.
    pub median: f64,
    /// Threshold that 90% of values are at or above.
    pub top90: f64,
    /// Threshold that 95% of values are at or above.
    pub top95: f64,
    /// Threshold that 99% of values are at or above.
    pub top99: f64,
}

/// Metric name to statistics. Metrics with no valid values are absent.
pub type StatisticsSummary = BTreeMap<String, MetricStatistics>;

/// Pearson correlation between two metrics over records scoring both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricCorrelation {
    pub first: String,
    pub second: String,
    /// Number of records that carried a valid value for both metrics.
    pub samples: usize,
    /// `None` when there are fewer than two samples or no variance.
    pub coefficient: Option<f64>,
}

/// Metadata about a summary run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Directory the records were read from.
    pub source_dir: String,
    /// When the summary was produced.
    pub generated_at: DateTime<Utc>,
    /// Number of files that contributed records.
    pub files_read: usize,
    /// Total number of records read.
    pub records_read: usize,
    /// Metrics that were tracked.
    pub metrics: Vec<String>,
}

/// The complete summary report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub statistics: StatisticsSummary,
    pub correlations: Vec<MetricCorrelation>,
}
