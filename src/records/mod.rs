//! QnA file discovery, parsing, and writing.
//!
//! Stages hand data to each other through JSON files in one working
//! directory: question files, `file_ans_<n>.json` after answers are
//! collected, and `file_eval*.json` once scored.

pub mod sanitize;

use crate::models::{EvaluationRecord, QnaItem};
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub use sanitize::sanitize_json;

/// Filename prefix of answered question files.
pub const ANSWER_PREFIX: &str = "file_ans";

/// Default filename prefix of scored files.
pub const EVAL_PREFIX: &str = "file_eval";

/// Records loaded from a directory.
#[derive(Debug, Clone, Default)]
pub struct LoadedRecords {
    pub records: Vec<EvaluationRecord>,
    /// Files that parsed and contributed records.
    pub files_read: usize,
    /// Files that could not be read or parsed.
    pub files_skipped: usize,
}

/// List `*.json` files in `dir` whose name starts with `prefix`, sorted by name.
///
/// Only the top level of `dir` is searched.
pub fn scan(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_json_with_prefix(path, prefix))
        .collect();

    files.sort();
    debug!("Found {} files with prefix '{}' in {}", files.len(), prefix, dir.display());
    Ok(files)
}

/// List question files: JSON files that are neither answered nor scored.
pub fn scan_question_files(dir: &Path, eval_prefix: &str) -> Result<Vec<PathBuf>> {
    let files = scan(dir, "")?
        .into_iter()
        .filter(|path| {
            let name = file_name(path);
            !name.starts_with(ANSWER_PREFIX) && !name.starts_with(eval_prefix)
        })
        .collect();
    Ok(files)
}

fn is_json_with_prefix(path: &Path, prefix: &str) -> bool {
    let name = file_name(path);
    name.starts_with(prefix) && name.ends_with(".json")
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// Parse JSON text that may contain bare `NaN`/`Infinity` tokens.
pub fn parse_lenient(text: &str) -> Result<Value> {
    serde_json::from_str(&sanitize_json(text)).context("Invalid JSON")
}

/// Parse one scored file into records.
///
/// The file must hold a JSON array. Elements that are not objects are skipped.
pub fn parse_evaluation_file(path: &Path, metric_names: &[String]) -> Result<Vec<EvaluationRecord>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value = parse_lenient(&text).with_context(|| format!("Failed to parse {}", path.display()))?;

    let entries = value
        .as_array()
        .with_context(|| format!("Expected a JSON array in {}", path.display()))?;

    Ok(entries
        .iter()
        .filter_map(|entry| EvaluationRecord::from_json(entry, metric_names))
        .collect())
}

/// Load every scored file in `dir`.
///
/// Unreadable files are logged and skipped so one bad file does not sink
/// a whole run.
pub fn load_evaluation_records(
    dir: &Path,
    prefix: &str,
    metric_names: &[String],
) -> Result<LoadedRecords> {
    let mut loaded = LoadedRecords::default();

    for path in scan(dir, prefix)? {
        match parse_evaluation_file(&path, metric_names) {
            Ok(records) => {
                debug!("Read {} records from {}", records.len(), path.display());
                loaded.records.extend(records);
                loaded.files_read += 1;
            }
            Err(e) => {
                warn!("Skipping {}: {:#}", path.display(), e);
                loaded.files_skipped += 1;
            }
        }
    }

    Ok(loaded)
}

/// Read a question file.
pub fn load_qna_items(path: &Path) -> Result<Vec<QnaItem>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value = parse_lenient(&text).with_context(|| format!("Failed to parse {}", path.display()))?;
    serde_json::from_value(value)
        .with_context(|| format!("Unexpected question format in {}", path.display()))
}

/// Write a question file as pretty-printed JSON.
pub fn write_qna_items(path: &Path, items: &[QnaItem]) -> Result<()> {
    let content = serde_json::to_string_pretty(items)?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Path of the answered file for the `index`-th (1-based) question file.
pub fn answer_file_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("{}_{}.json", ANSWER_PREFIX, index))
}
