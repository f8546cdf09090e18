//! Answer collection stage.
//!
//! Sends every question in every question file to the chat and stores the
//! answers in `file_ans_<n>.json`.

use crate::chat::client::ChatClient;
use crate::chat::retry::{RetryOutcome, RetryPolicy};
use crate::models::QnaItem;
use crate::records;
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Counters for one collection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionSummary {
    pub files_written: Vec<PathBuf>,
    pub answered: usize,
    pub unanswered: usize,
    pub submit_failures: usize,
    /// Question files that could not be read or parsed.
    pub files_skipped: usize,
}

/// Drives the chat client over question files.
pub struct AnswerCollector<'a> {
    client: &'a ChatClient,
    policy: RetryPolicy,
    show_progress: bool,
}

impl<'a> AnswerCollector<'a> {
    pub fn new(client: &'a ChatClient, policy: RetryPolicy, show_progress: bool) -> Self {
        Self {
            client,
            policy,
            show_progress,
        }
    }

    /// Answer every question file in `dir`.
    pub async fn run(&self, dir: &Path, eval_prefix: &str) -> Result<CollectionSummary> {
        let files = records::scan_question_files(dir, eval_prefix)?;
        info!("Found {} question files in {}", files.len(), dir.display());

        let mut summary = CollectionSummary::default();

        for path in &files {
            let mut items = match records::load_qna_items(path) {
                Ok(items) => items,
                Err(e) => {
                    warn!("Skipping {}: {:#}", path.display(), e);
                    summary.files_skipped += 1;
                    continue;
                }
            };
            info!("Processing {} ({} questions)", path.display(), items.len());

            self.answer_items(&mut items, &mut summary).await?;

            let target = records::answer_file_path(dir, summary.files_written.len() + 1);
            records::write_qna_items(&target, &items)?;
            info!("Wrote {}", target.display());
            summary.files_written.push(target);
        }

        Ok(summary)
    }

    async fn answer_items(
        &self,
        items: &mut [QnaItem],
        summary: &mut CollectionSummary,
    ) -> Result<()> {
        let progress = self.progress_bar(items.len() as u64)?;

        for item in items.iter_mut() {
            if let Err(e) = self.client.submit_question(&item.question).await {
                warn!("Failed to submit question: {}", e);
                summary.submit_failures += 1;
            }

            match self.client.wait_for_answer(&item.question, &self.policy).await {
                RetryOutcome::Success { value, attempts } => {
                    info!("Answer received after {} attempt(s)", attempts);
                    item.response = Some(value);
                    summary.answered += 1;
                }
                RetryOutcome::Exhausted {
                    attempts,
                    last_error,
                } => {
                    warn!("Gave up after {} attempts: {}", attempts, last_error);
                    item.response = None;
                    summary.unanswered += 1;
                }
            }

            if let Some(ref pb) = progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_with_message("Answers collected");
        }

        Ok(())
    }

    fn progress_bar(&self, len: u64) -> Result<Option<ProgressBar>> {
        if !self.show_progress {
            return Ok(None);
        }

        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
                .progress_chars("#>-"),
        );
        Ok(Some(pb))
    }
}
