//! Metric pooling and statistics.
//!
//! Scores are pooled per metric across every record, then reduced to a
//! mean and a handful of inverted percentiles. Percentiles use linear
//! interpolation between the closest ranks, matching the default of the
//! common numeric libraries.

use crate::models::{EvaluationRecord, MetricCorrelation, MetricStatistics, StatisticsSummary};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

/// Valid values per tracked metric.
///
/// Every tracked metric has an entry, possibly empty.
pub type MetricPool = BTreeMap<String, Vec<f64>>;

/// Pool the valid scores of each tracked metric across all records.
///
/// Missing and NaN scores are skipped. Zero is a real score and is kept.
pub fn collect(records: &[EvaluationRecord], metric_names: &[String]) -> MetricPool {
    let metric_names = unique_names(metric_names);
    let mut pool: MetricPool = metric_names
        .iter()
        .map(|name| (name.clone(), Vec::new()))
        .collect();

    for record in records {
        for name in &metric_names {
            if let Some(value) = record.score(name) {
                if let Some(values) = pool.get_mut(name) {
                    values.push(value);
                }
            }
        }
    }

    pool
}

/// Trimmed, non-empty metric names with repeats removed, first occurrence kept.
pub fn unique_names(metric_names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    metric_names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty() && seen.insert(*name))
        .map(String::from)
        .collect()
}

/// Reduce each non-empty pool to its statistics.
pub fn summarize(pool: &MetricPool) -> StatisticsSummary {
    pool.iter()
        .filter_map(|(name, values)| summarize_values(values).map(|s| (name.clone(), s)))
        .collect()
}

/// Statistics for a single pool. `None` when the pool is empty.
pub fn summarize_values(values: &[f64]) -> Option<MetricStatistics> {
    let sorted = sorted_copy(values);
    // Summing in sorted order keeps the mean independent of record order.
    let average = mean(&sorted)?;

    Some(MetricStatistics {
        count: sorted.len(),
        average,
        median: interpolate(&sorted, 50.0),
        top90: interpolate(&sorted, 100.0 - 90.0),
        top95: interpolate(&sorted, 100.0 - 95.0),
        top99: interpolate(&sorted, 100.0 - 99.0),
    })
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Linear-interpolation percentile, `p` in `[0, 100]`.
#[allow(dead_code)]
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(interpolate(&sorted_copy(values), p))
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

/// `sorted` must be non-empty and ascending.
fn interpolate(sorted: &[f64], p: f64) -> f64 {
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        return sorted[lower];
    }

    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Pearson correlation for every pair of tracked metrics.
///
/// Values are paired per record, so only records scoring both metrics
/// contribute.
pub fn correlate(records: &[EvaluationRecord], metric_names: &[String]) -> Vec<MetricCorrelation> {
    let metric_names = unique_names(metric_names);
    let mut correlations = Vec::new();

    for (i, first) in metric_names.iter().enumerate() {
        for second in &metric_names[i + 1..] {
            let (xs, ys): (Vec<f64>, Vec<f64>) = records
                .iter()
                .filter_map(|r| Some((r.score(first)?, r.score(second)?)))
                .unzip();

            correlations.push(MetricCorrelation {
                first: first.clone(),
                second: second.clone(),
                samples: xs.len(),
                coefficient: pearson(&xs, &ys),
            });
        }
    }

    correlations
}

/// Pearson coefficient of two equally long series.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 {
        return None;
    }

    Some((covariance / denominator).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn record(scores: &[(&str, Option<f64>)]) -> EvaluationRecord {
        EvaluationRecord {
            scores: scores.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_reference_pool() {
        let stats = summarize_values(&[0.5, 0.6, 0.7, 0.8, 0.9]).unwrap();

        assert_eq!(stats.count, 5);
        assert!((stats.average - 0.7).abs() < EPS);
        assert!((stats.top90 - 0.54).abs() < EPS);
        assert!((stats.top95 - 0.52).abs() < EPS);
        assert!((stats.top99 - 0.504).abs() < EPS);
        assert!((stats.median - 0.7).abs() < EPS);
    }

    #[test]
    fn test_average_is_exact_mean() {
        let values = [0.25, 0.5, 1.0, 0.0];
        let stats = summarize_values(&values).unwrap();
        assert_eq!(stats.average, (0.25 + 0.5 + 1.0 + 0.0) / 4.0);
    }

    #[test]
    fn test_single_value_pool() {
        let stats = summarize_values(&[0.42]).unwrap();
        assert_eq!(stats.average, 0.42);
        assert_eq!(stats.top90, 0.42);
        assert_eq!(stats.top99, 0.42);
    }

    #[test]
    fn test_percentile_monotonic_in_tail() {
        let values = [0.93, 0.12, 0.55, 0.78, 0.31, 0.99, 0.64, 0.02, 0.47];
        let p1 = percentile(&values, 1.0).unwrap();
        let p5 = percentile(&values, 5.0).unwrap();
        let p10 = percentile(&values, 10.0).unwrap();
        assert!(p1 <= p5);
        assert!(p5 <= p10);
    }

    #[test]
    fn test_percentile_bounds() {
        let values = [3.0, 1.0, 2.0];
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 100.0), Some(3.0));
        assert_eq!(percentile(&values, 150.0), Some(3.0));
        assert_eq!(percentile(&values, -5.0), Some(1.0));
        assert_eq!(percentile(&[], 50.0), None);
    }

    #[test]
    fn test_collect_skips_missing_and_nan() {
        let tracked = names(&["answer_relevancy", "answer_correctness"]);
        let records = vec![
            record(&[("answer_relevancy", Some(0.8)), ("answer_correctness", Some(f64::NAN))]),
            record(&[("answer_relevancy", None)]),
            record(&[("answer_correctness", Some(0.6))]),
        ];

        let pool = collect(&records, &tracked);
        assert_eq!(pool["answer_relevancy"], vec![0.8]);
        assert_eq!(pool["answer_correctness"], vec![0.6]);
    }

    #[test]
    fn test_repeated_metric_names_count_once() {
        let tracked = names(&["a", "a"]);
        let records: Vec<_> = [0.5, 0.6, 0.7, 0.8, 0.9]
            .iter()
            .map(|v| record(&[("a", Some(*v))]))
            .collect();

        let pool = collect(&records, &tracked);
        assert_eq!(pool["a"].len(), 5);

        let stats = &summarize(&pool)["a"];
        assert_eq!(stats.count, 5);
        assert!((stats.top90 - 0.54).abs() < EPS);

        assert!(correlate(&records, &tracked).is_empty());
    }

    #[test]
    fn test_unique_names_keeps_order() {
        let tracked = names(&["b", " a", "b", "", "c", "a "]);
        assert_eq!(unique_names(&tracked), names(&["b", "a", "c"]));
    }

    #[test]
    fn test_collect_keeps_zero() {
        let tracked = names(&["semantic_similarity"]);
        let records = vec![
            record(&[("semantic_similarity", Some(0.0))]),
            record(&[("semantic_similarity", Some(0.5))]),
        ];

        let pool = collect(&records, &tracked);
        assert_eq!(pool["semantic_similarity"], vec![0.0, 0.5]);
    }

    #[test]
    fn test_collect_ignores_untracked_metrics() {
        let tracked = names(&["answer_relevancy"]);
        let records = vec![record(&[("faithfulness", Some(0.3))])];

        let pool = collect(&records, &tracked);
        assert_eq!(pool.len(), 1);
        assert!(pool["answer_relevancy"].is_empty());
    }

    #[test]
    fn test_empty_input_gives_empty_summary() {
        let tracked = names(&["answer_relevancy", "answer_correctness"]);
        let summary = summarize(&collect(&[], &tracked));
        assert!(summary.is_empty());
    }

    #[test]
    fn test_metric_without_values_is_omitted() {
        let tracked = names(&["answer_relevancy", "answer_correctness"]);
        let records = vec![record(&[("answer_relevancy", Some(0.9))])];

        let summary = summarize(&collect(&records, &tracked));
        assert!(summary.contains_key("answer_relevancy"));
        assert!(!summary.contains_key("answer_correctness"));
    }

    #[test]
    fn test_order_independence() {
        let tracked = names(&["a", "b"]);
        let records = vec![
            record(&[("a", Some(0.1)), ("b", Some(0.9))]),
            record(&[("a", Some(0.7))]),
            record(&[("a", Some(0.4)), ("b", Some(0.2))]),
            record(&[("b", Some(0.6))]),
        ];
        let mut reversed = records.clone();
        reversed.reverse();
        let mut rotated = records.clone();
        rotated.rotate_left(2);

        let expected = summarize(&collect(&records, &tracked));
        assert_eq!(summarize(&collect(&reversed, &tracked)), expected);
        assert_eq!(summarize(&collect(&rotated, &tracked)), expected);
    }

    #[test]
    fn test_pearson_linear() {
        let xs = [0.1, 0.2, 0.3, 0.4];
        let ys = [0.2, 0.4, 0.6, 0.8];
        assert!((pearson(&xs, &ys).unwrap() - 1.0).abs() < EPS);

        let inverse = [0.8, 0.6, 0.4, 0.2];
        assert!((pearson(&xs, &inverse).unwrap() + 1.0).abs() < EPS);
    }

    #[test]
    fn test_pearson_degenerate() {
        assert_eq!(pearson(&[0.5], &[0.5]), None);
        assert_eq!(pearson(&[0.5, 0.5, 0.5], &[0.1, 0.2, 0.3]), None);
        assert_eq!(pearson(&[0.1, 0.2], &[0.1]), None);
    }

    #[test]
    fn test_correlate_pairs_by_record() {
        let tracked = names(&["a", "b", "c"]);
        let records = vec![
            record(&[("a", Some(0.1)), ("b", Some(0.2))]),
            record(&[("a", Some(0.2)), ("b", Some(0.4)), ("c", Some(0.9))]),
            record(&[("a", Some(0.3)), ("b", Some(0.6))]),
            record(&[("b", Some(0.1)), ("c", Some(0.3))]),
        ];

        let correlations = correlate(&records, &tracked);
        assert_eq!(correlations.len(), 3);

        let ab = &correlations[0];
        assert_eq!((ab.first.as_str(), ab.second.as_str()), ("a", "b"));
        assert_eq!(ab.samples, 3);
        assert!((ab.coefficient.unwrap() - 1.0).abs() < EPS);

        let ac = &correlations[1];
        assert_eq!(ac.samples, 1);
        assert_eq!(ac.coefficient, None);

        let bc = &correlations[2];
        assert_eq!(bc.samples, 2);
        assert!((bc.coefficient.unwrap() - 1.0).abs() < EPS);
    }
}
