/*!
 * Bulk glossary generation runner.
 *
 * Asks the generator for batches of candidate terms until `count` terms have
 * been requested, inserting only terms that do not exist yet for the language
 * pair. Progress counts requested terms, so a provider that keeps returning
 * duplicates still lets the loop end. An empty answer ends the run early.
 */

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::Arc;

use crate::database::models::{GlossaryTermRecord, JobStatus};
use crate::language_utils;
use crate::notifications::{Notification, Notifier};
use crate::translation::{GlossaryGenerator, GlossaryRequest};

use super::runner::{catch_failure, glossary_link, notify_best_effort, pause, RunSummary, RunnerSettings, Tally};
use super::store::{ContentStore, JobStore};

/// Existing terms passed to the generator so it can avoid repeating them
const EXISTING_TERMS_SAMPLE: usize = 50;

/// One scheduled glossary generation
#[derive(Debug, Clone, PartialEq)]
pub struct GlossaryGenerationJob {
    pub job_id: String,
    pub user_id: String,
    pub source_language: String,
    pub target_language: String,
    /// Number of terms to request in total
    pub count: usize,
    pub domain: Option<String>,
}

/// Runner for `GlossaryGenerationJob`
#[derive(Clone)]
pub struct GlossaryGenerationRunner {
    jobs: Arc<dyn JobStore>,
    content: Arc<dyn ContentStore>,
    generator: Arc<dyn GlossaryGenerator>,
    notifier: Arc<dyn Notifier>,
    settings: RunnerSettings,
}

impl GlossaryGenerationRunner {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        content: Arc<dyn ContentStore>,
        generator: Arc<dyn GlossaryGenerator>,
        notifier: Arc<dyn Notifier>,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            jobs,
            content,
            generator,
            notifier,
            settings,
        }
    }

    /// Run the job to a terminal state
    pub async fn run(&self, job: GlossaryGenerationJob) -> RunSummary {
        let mut tally = Tally::default();
        match catch_failure(self.process(&job, &mut tally)).await {
            Ok(status) => tally.summary(&job.job_id, status, None),
            Err(detail) => {
                error!("Glossary job {} failed: {}", job.job_id, detail);
                if let Err(e) = self.jobs.set_status(&job.job_id, JobStatus::Failed, Some(detail.clone())).await {
                    error!("Could not mark job {} as failed: {:#}", job.job_id, e);
                }
                let notification = Notification::error(
                    "Glossary generation failed",
                    format!("Glossary generation stopped with an error: {}", detail),
                )
                .with_link(glossary_link(&job.source_language, &job.target_language));
                notify_best_effort(self.notifier.as_ref(), &job.user_id, notification).await;
                tally.summary(&job.job_id, JobStatus::Failed, Some(detail))
            }
        }
    }

    async fn process(&self, job: &GlossaryGenerationJob, tally: &mut Tally) -> Result<JobStatus> {
        let link = glossary_link(&job.source_language, &job.target_language);

        if !self.jobs.set_status(&job.job_id, JobStatus::Processing, None).await? {
            debug!("Glossary job {} was no longer pending when the runner started", job.job_id);
        }
        notify_best_effort(
            self.notifier.as_ref(),
            &job.user_id,
            Notification::info(
                "Glossary generation started",
                format!(
                    "Generating {} terms from {} to {}",
                    job.count,
                    language_utils::display_name(&job.source_language),
                    language_utils::display_name(&job.target_language)
                ),
            )
            .with_link(link.clone()),
        )
        .await;

        while tally.processed < job.count {
            if self.stop_requested(job).await? {
                info!("Glossary job {}: stop requested after {} terms", job.job_id, tally.processed);
                self.notify_stopped(job, tally).await;
                return Ok(JobStatus::Stopped);
            }

            let requested = self.settings.glossary_batch_size.min(job.count - tally.processed);
            let existing = self
                .content
                .recent_glossary_terms(&job.source_language, &job.target_language, EXISTING_TERMS_SAMPLE)
                .await?;
            let request = GlossaryRequest::new(&job.source_language, &job.target_language, requested)
                .with_domain(job.domain.clone())
                .with_existing_terms(existing);

            let candidates = self
                .generator
                .generate_terms(&request)
                .await
                .context("Glossary generation request failed")?;
            if candidates.is_empty() {
                info!(
                    "Glossary job {}: provider returned no terms, finishing early after {}",
                    job.job_id, tally.processed
                );
                break;
            }

            let mut seen = HashSet::new();
            let mut inserted = 0;
            for candidate in candidates {
                if !seen.insert(candidate.term.clone()) {
                    continue;
                }
                if self
                    .content
                    .glossary_term_exists(&candidate.term, &job.source_language, &job.target_language)
                    .await?
                {
                    debug!("Glossary job {}: skipping existing term '{}'", job.job_id, candidate.term);
                    continue;
                }

                let mut record = GlossaryTermRecord::new(
                    candidate.term,
                    candidate.translation,
                    job.source_language.clone(),
                    job.target_language.clone(),
                    job.user_id.clone(),
                );
                record.definition = candidate.definition;
                record.domain = job.domain.clone();
                if self.content.insert_glossary_term(&record).await? {
                    inserted += 1;
                }
            }

            tally.processed += requested;
            tally.updated += inserted;
            debug!(
                "Glossary job {}: {} of {} requested terms were new",
                job.job_id, inserted, requested
            );

            // Short answers still count as the full request
            if let Err(e) = self.jobs.increment_progress(&job.job_id, requested).await {
                warn!("Glossary job {}: progress checkpoint failed: {:#}", job.job_id, e);
            }
            if let Err(e) = self.jobs.increment_updated(&job.job_id, inserted).await {
                warn!("Glossary job {}: updated-count checkpoint failed: {:#}", job.job_id, e);
            }

            if tally.processed < job.count {
                pause(self.settings.inter_batch_delay).await;
            }
        }

        if !self.jobs.set_status(&job.job_id, JobStatus::Completed, None).await? {
            info!("Glossary job {} was stopped during its last batch", job.job_id);
            self.notify_stopped(job, tally).await;
            return Ok(JobStatus::Stopped);
        }
        info!(
            "Glossary job {} completed: {} requested, {} added",
            job.job_id, tally.processed, tally.updated
        );

        let notification = if tally.updated > 0 {
            Notification::success(
                "Glossary generation completed",
                format!("{} new glossary terms added", tally.updated),
            )
        } else {
            Notification::warning(
                "Glossary generation finished without new terms",
                "No new terms were added. The provider may have run out of suggestions.",
            )
        };
        notify_best_effort(self.notifier.as_ref(), &job.user_id, notification.with_link(link)).await;

        Ok(JobStatus::Completed)
    }

    async fn stop_requested(&self, job: &GlossaryGenerationJob) -> Result<bool> {
        match self.jobs.get(&job.job_id).await? {
            Some(record) => Ok(record.status.is_terminal()),
            None => anyhow::bail!("Job {} disappeared from the store", job.job_id),
        }
    }

    async fn notify_stopped(&self, job: &GlossaryGenerationJob, tally: &Tally) {
        let notification = Notification::warning(
            "Glossary generation stopped",
            format!(
                "Glossary generation stopped after {} terms were requested, {} added",
                tally.processed, tally.updated
            ),
        )
        .with_link(glossary_link(&job.source_language, &job.target_language));
        notify_best_effort(self.notifier.as_ref(), &job.user_id, notification).await;
    }
}
