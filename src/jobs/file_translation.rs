/*!
 * Translate-all-remaining runner for one file and one target language.
 *
 * The working set is fetched once at start, CONFIRMED units dropped, and
 * processed in fixed-size batches in sequence order. Before each batch the job
 * record and the file's `is_translating` flag are read fresh; either a STOPPED
 * job or a cleared flag ends the run. A failed batch call falls back to
 * single-item calls. The file flag is released on every exit path.
 */

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::sync::Arc;

use crate::database::models::{FileStatus, JobStatus, UnitRecord};
use crate::language_utils;
use crate::notifications::{Notification, Notifier};
use crate::translation::Translator;

use super::runner::{catch_failure, file_link, notify_best_effort, pause, RunSummary, RunnerSettings, Tally};
use super::store::{ContentStore, JobStore};

/// One scheduled file translation
#[derive(Debug, Clone, PartialEq)]
pub struct FileTranslationJob {
    pub job_id: String,
    pub user_id: String,
    pub file_id: String,
    pub target_language: String,
    /// Translate at most this many units
    pub limit: Option<usize>,
}

/// Runner for `FileTranslationJob`
#[derive(Clone)]
pub struct FileTranslationRunner {
    jobs: Arc<dyn JobStore>,
    content: Arc<dyn ContentStore>,
    translator: Arc<dyn Translator>,
    notifier: Arc<dyn Notifier>,
    settings: RunnerSettings,
}

impl FileTranslationRunner {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        content: Arc<dyn ContentStore>,
        translator: Arc<dyn Translator>,
        notifier: Arc<dyn Notifier>,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            jobs,
            content,
            translator,
            notifier,
            settings,
        }
    }

    /// Run the job to a terminal state
    ///
    /// Never returns an error: failures end up in the job record and in an
    /// ERROR notification.
    pub async fn run(&self, job: FileTranslationJob) -> RunSummary {
        let mut tally = Tally::default();
        let outcome = catch_failure(self.process(&job, &mut tally)).await;

        let summary = match outcome {
            Ok(status) => tally.summary(&job.job_id, status, None),
            Err(detail) => {
                error!("Job {} failed: {}", job.job_id, detail);
                if let Err(e) = self.jobs.set_status(&job.job_id, JobStatus::Failed, Some(detail.clone())).await {
                    error!("Could not mark job {} as failed: {:#}", job.job_id, e);
                }
                let notification = Notification::error(
                    "Translation failed",
                    format!("Translation into {} stopped with an error: {}", job.target_language, detail),
                )
                .with_link(file_link(&job.file_id, &job.target_language));
                notify_best_effort(self.notifier.as_ref(), &job.user_id, notification).await;
                tally.summary(&job.job_id, JobStatus::Failed, Some(detail))
            }
        };

        if let Err(e) = self.content.end_file_translation(&job.file_id).await {
            error!("Could not release translation flag on file {}: {:#}", job.file_id, e);
        }
        summary
    }

    async fn process(&self, job: &FileTranslationJob, tally: &mut Tally) -> Result<JobStatus> {
        let link = file_link(&job.file_id, &job.target_language);
        let language_name = language_utils::display_name(&job.target_language);

        let file = self
            .content
            .get_file(&job.file_id)
            .await?
            .with_context(|| format!("File {} not found", job.file_id))?;

        if !self.jobs.set_status(&job.job_id, JobStatus::Processing, None).await? {
            debug!("Job {} was no longer pending when the runner started", job.job_id);
        }
        notify_best_effort(
            self.notifier.as_ref(),
            &job.user_id,
            Notification::info(
                "Translation started",
                format!("Translating \"{}\" into {}", file.name, language_name),
            )
            .with_link(link.clone()),
        )
        .await;

        let working_set = self.working_set(job).await?;
        let batches: Vec<&[UnitRecord]> = working_set.chunks(self.settings.batch_size).collect();
        info!(
            "Job {}: {} units to translate into {} in {} batches",
            job.job_id,
            working_set.len(),
            job.target_language,
            batches.len()
        );

        for (index, batch) in batches.iter().enumerate() {
            if self.stop_requested(job).await? {
                info!("Job {}: stop requested after {} units", job.job_id, tally.processed);
                self.jobs.set_status(&job.job_id, JobStatus::Stopped, None).await?;
                self.notify_stopped(job, tally.processed).await;
                return Ok(JobStatus::Stopped);
            }

            let updated = self.translate_batch(job, batch).await?;
            tally.processed += batch.len();
            tally.updated += updated;
            debug!(
                "Job {}: batch {}/{} done, {} of {} units updated",
                job.job_id,
                index + 1,
                batches.len(),
                updated,
                batch.len()
            );

            if let Err(e) = self.jobs.increment_progress(&job.job_id, batch.len()).await {
                warn!("Job {}: progress checkpoint failed: {:#}", job.job_id, e);
            }
            if let Err(e) = self.jobs.increment_updated(&job.job_id, updated).await {
                warn!("Job {}: updated-count checkpoint failed: {:#}", job.job_id, e);
            }

            if index + 1 < batches.len() {
                pause(self.settings.inter_batch_delay).await;
            }
        }

        if tally.updated > 0 {
            match self
                .content
                .transition_file_status(&job.file_id, FileStatus::Draft, FileStatus::InProgress)
                .await
            {
                Ok(true) => debug!("File {} moved to {}", job.file_id, FileStatus::InProgress),
                Ok(false) => {}
                Err(e) => warn!("Could not update status of file {}: {:#}", job.file_id, e),
            }
        }

        if !self.jobs.set_status(&job.job_id, JobStatus::Completed, None).await? {
            info!("Job {} was stopped during its last batch", job.job_id);
            self.notify_stopped(job, tally.processed).await;
            return Ok(JobStatus::Stopped);
        }
        info!(
            "Job {} completed: {} processed, {} updated",
            job.job_id, tally.processed, tally.updated
        );

        let notification = if tally.updated > 0 {
            Notification::success(
                "Translation completed",
                format!("{} segments translated into {}", tally.updated, language_name),
            )
        } else {
            Notification::warning(
                "Translation finished without changes",
                format!(
                    "No segments were updated ({} attempted). Check the AI provider configuration or quota.",
                    tally.processed
                ),
            )
        };
        notify_best_effort(self.notifier.as_ref(), &job.user_id, notification.with_link(link)).await;

        Ok(JobStatus::Completed)
    }

    async fn notify_stopped(&self, job: &FileTranslationJob, processed: usize) {
        let notification = Notification::warning(
            "Translation stopped",
            format!("Translation stopped after {} segments were processed", processed),
        )
        .with_link(file_link(&job.file_id, &job.target_language));
        notify_best_effort(self.notifier.as_ref(), &job.user_id, notification).await;
    }

    /// Units to translate, in sequence order, without CONFIRMED ones
    async fn working_set(&self, job: &FileTranslationJob) -> Result<Vec<UnitRecord>> {
        let units = self
            .content
            .get_units(&job.file_id, &job.target_language)
            .await
            .context("Failed to load translation units")?;

        let pending = units.into_iter().filter(|unit| !unit.is_confirmed());
        Ok(match job.limit {
            Some(limit) => pending.take(limit).collect(),
            None => pending.collect(),
        })
    }

    async fn stop_requested(&self, job: &FileTranslationJob) -> Result<bool> {
        let record = self.jobs.get(&job.job_id).await?;
        match record {
            Some(record) if record.status == JobStatus::Stopped => return Ok(true),
            Some(record) if record.status.is_terminal() => {
                warn!("Job {} is already {}, leaving the loop", job.job_id, record.status);
                return Ok(true);
            }
            Some(_) => {}
            None => anyhow::bail!("Job {} disappeared from the store", job.job_id),
        }

        if !self.content.is_file_translating(&job.file_id).await? {
            info!("Translation flag of file {} was cleared externally", job.file_id);
            return Ok(true);
        }
        Ok(false)
    }

    /// Translate one batch, falling back to single calls; returns units written
    async fn translate_batch(&self, job: &FileTranslationJob, batch: &[UnitRecord]) -> Result<usize> {
        let texts: Vec<String> = batch.iter().map(|unit| unit.source_text.clone()).collect();

        match self.translator.translate_batch(&texts, &job.target_language).await {
            Ok(translations) if translations.len() != batch.len() => {
                warn!(
                    "Job {}: batch answer has {} items for {} units, falling back to single translations",
                    job.job_id,
                    translations.len(),
                    batch.len()
                );
                self.translate_individually(job, batch).await
            }
            Ok(translations) => {
                let mut updated = 0;
                for (unit, translation) in batch.iter().zip(translations.iter()) {
                    if self.save(unit, translation).await? {
                        updated += 1;
                    }
                }
                Ok(updated)
            }
            Err(e) => {
                warn!(
                    "Job {}: batch of {} failed ({}), falling back to single translations",
                    job.job_id,
                    batch.len(),
                    e
                );
                self.translate_individually(job, batch).await
            }
        }
    }

    async fn translate_individually(&self, job: &FileTranslationJob, batch: &[UnitRecord]) -> Result<usize> {
        let mut updated = 0;
        for (index, unit) in batch.iter().enumerate() {
            if index > 0 {
                pause(self.settings.inter_item_delay).await;
            }
            match self.translator.translate_one(&unit.source_text, &job.target_language).await {
                Ok(translation) => {
                    if self.save(unit, &translation).await? {
                        updated += 1;
                    }
                }
                Err(e) => warn!("Job {}: unit {} left untranslated: {}", job.job_id, unit.seq_num, e),
            }
        }
        Ok(updated)
    }

    async fn save(&self, unit: &UnitRecord, translation: &str) -> Result<bool> {
        let written = self
            .content
            .save_unit_translation(unit.id, translation)
            .await
            .with_context(|| format!("Failed to save translation of unit {}", unit.id))?;
        if !written {
            debug!("Unit {} was confirmed meanwhile, translation discarded", unit.id);
        }
        Ok(written)
    }
}
