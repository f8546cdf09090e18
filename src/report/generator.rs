//! Summary rendering.
//!
//! This module turns a statistics report into console text, Markdown,
//! or JSON.

use crate::models::{MetricCorrelation, Report, ReportMetadata, StatisticsSummary};
use anyhow::Result;

/// Console layout: one block per metric, three decimals.
pub fn generate_console_summary(summary: &StatisticsSummary) -> String {
    let mut output = String::new();

    output.push_str("\nPercentile Analysis (in decreasing order - higher values are better):\n");

    if summary.is_empty() {
        output.push_str("\nNo valid scores found.\n");
        return output;
    }

    for (metric, stats) in summary {
        output.push_str(&format!("\n{}:\n", metric));
        output.push_str(&format!("Top 90% (P90): {:.3}\n", stats.top90));
        output.push_str(&format!("Top 95% (P95): {:.3}\n", stats.top95));
        output.push_str(&format!("Top 99% (P99): {:.3}\n", stats.top99));
        output.push_str(&format!("Average: {:.3}\n", stats.average));
    }

    output
}

/// Console text for the full report, correlations included.
pub fn generate_text_report(report: &Report) -> String {
    let mut output = generate_console_summary(&report.statistics);

    let known: Vec<_> = report
        .correlations
        .iter()
        .filter(|c| c.coefficient.is_some())
        .collect();

    if !known.is_empty() {
        output.push_str("\nCorrelations (Pearson):\n");
        for c in known {
            output.push_str(&format!(
                "{} ~ {}: {} (n={})\n",
                c.first,
                c.second,
                format_coefficient(c),
                c.samples
            ));
        }
    }

    output
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# QnA Evaluation Summary\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_statistics_section(&report.statistics));
    output.push_str(&generate_correlation_section(&report.correlations));

    output
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** `{}`\n", metadata.source_dir));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Files Read:** {}\n", metadata.files_read));
    section.push_str(&format!("- **Records:** {}\n", metadata.records_read));
    section.push_str(&format!("- **Metrics:** {}\n\n", metadata.metrics.join(", ")));

    section
}

fn generate_statistics_section(summary: &StatisticsSummary) -> String {
    let mut section = String::new();

    section.push_str("## Statistics\n\n");

    if summary.is_empty() {
        section.push_str("No valid scores were found.\n\n");
        return section;
    }

    section.push_str("Top X% columns are the thresholds that X% of scores meet or exceed.\n\n");
    section.push_str("| Metric | Count | Average | Median | Top 90% | Top 95% | Top 99% |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|:---:|\n");

    for (metric, s) in summary {
        section.push_str(&format!(
            "| {} | {} | {:.3} | {:.3} | {:.3} | {:.3} | {:.3} |\n",
            metric, s.count, s.average, s.median, s.top90, s.top95, s.top99
        ));
    }
    section.push('\n');

    section
}

fn generate_correlation_section(correlations: &[MetricCorrelation]) -> String {
    if correlations.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Correlations\n\n");
    section.push_str("| Metric A | Metric B | Pearson r | Samples |\n");
    section.push_str("|:---|:---|:---:|:---:|\n");

    for c in correlations {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            c.first,
            c.second,
            format_coefficient(c),
            c.samples
        ));
    }
    section.push('\n');

    section
}

fn format_coefficient(correlation: &MetricCorrelation) -> String {
    correlation
        .coefficient
        .map(|r| format!("{:.3}", r))
        .unwrap_or_else(|| "n/a".to_string())
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricStatistics;
    use chrono::Utc;

    fn create_test_report() -> Report {
        let mut statistics = StatisticsSummary::new();
        statistics.insert(
            "answer_relevancy".to_string(),
            MetricStatistics {
                count: 5,
                average: 0.7,
                median: 0.7,
                top90: 0.54,
                top95: 0.52,
                top99: 0.504,
            },
        );

        Report {
            metadata: ReportMetadata {
                source_dir: "QnA".to_string(),
                generated_at: Utc::now(),
                files_read: 2,
                records_read: 5,
                metrics: vec![
                    "answer_relevancy".to_string(),
                    "answer_correctness".to_string(),
                ],
            },
            statistics,
            correlations: vec![MetricCorrelation {
                first: "answer_relevancy".to_string(),
                second: "answer_correctness".to_string(),
                samples: 1,
                coefficient: None,
            }],
        }
    }

    #[test]
    fn test_console_summary_layout() {
        let report = create_test_report();
        let text = generate_console_summary(&report.statistics);

        assert!(text.contains("answer_relevancy:\n"));
        assert!(text.contains("Top 90% (P90): 0.540\n"));
        assert!(text.contains("Top 95% (P95): 0.520\n"));
        assert!(text.contains("Top 99% (P99): 0.504\n"));
        assert!(text.contains("Average: 0.700\n"));
    }

    #[test]
    fn test_console_summary_empty() {
        let text = generate_console_summary(&StatisticsSummary::new());
        assert!(text.contains("No valid scores found."));
    }

    #[test]
    fn test_text_report_hides_unknown_correlations() {
        let report = create_test_report();
        let text = generate_text_report(&report);
        assert!(!text.contains("Correlations"));
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# QnA Evaluation Summary"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("| answer_relevancy | 5 | 0.700 | 0.700 | 0.540 | 0.520 | 0.504 |"));
        assert!(markdown.contains("| answer_relevancy | answer_correctness | n/a | 1 |"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["statistics"]["answer_relevancy"]["top90"], 0.54);
        assert_eq!(value["metadata"]["records_read"], 5);
        assert!(value["correlations"][0]["coefficient"].is_null());
    }
}
