use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::database::models::{FileRecord, JobRecord, NotificationRecord, UnitRecord};
use crate::database::{DatabaseConnection, DatabaseStats, Repository};
use crate::file_utils::FileManager;
use crate::jobs::{GlossaryGenerationOptions, JobManager, RunSummary, StartedJob, TranslateFileOptions};
use crate::language_utils;
use crate::notifications::{FanoutNotifier, LogNotifier, RepositoryNotifier};
use crate::translation::TranslationService;

// @module: Application controller wiring configuration, storage and jobs

/// How often the CLI polls a running job
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Result of importing a text file
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub file: FileRecord,
    /// Segments read from the text
    pub segment_count: usize,
    /// Units created, one per segment and target language
    pub unit_count: usize,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    repository: Repository,
    translator: Arc<TranslationService>,
    manager: JobManager,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let db_path = config.database_file()?;
        let repository = Repository::new(DatabaseConnection::new(&db_path)?);
        let translator = Arc::new(TranslationService::new(&config.translation, &config.source_language));
        Ok(Self::with_parts(config, repository, translator))
    }

    /// Build a controller around an existing repository and translation service
    pub fn with_parts(config: Config, repository: Repository, translator: Arc<TranslationService>) -> Self {
        let notifier = Arc::new(FanoutNotifier::new(vec![
            Arc::new(RepositoryNotifier::new(repository.clone())),
            Arc::new(LogNotifier),
        ]));
        let store = Arc::new(repository.clone());
        let manager = JobManager::new(
            store.clone(),
            store,
            translator.clone(),
            translator.clone(),
            notifier,
            &config.jobs,
        )
        .with_default_target_language(config.default_target_languages.first().cloned());

        Self {
            config,
            repository,
            translator,
            manager,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn manager(&self) -> &JobManager {
        &self.manager
    }

    /// Import a plain-text file as a new file with one unit per paragraph and target language
    pub async fn import_file(
        &self,
        path: &Path,
        name: Option<&str>,
        source_language: Option<&str>,
        target_languages: Option<Vec<String>>,
        user_id: &str,
    ) -> Result<ImportSummary> {
        let segments = FileManager::read_segments(path)?;

        let source_language = source_language.unwrap_or(&self.config.source_language).to_string();
        language_utils::normalize_to_part2t(&source_language)?;
        let target_languages = target_languages.unwrap_or_else(|| self.config.default_target_languages.clone());
        if target_languages.is_empty() {
            return Err(anyhow!("At least one target language is required"));
        }
        for language in &target_languages {
            language_utils::normalize_to_part2t(language)?;
        }

        let name = match name {
            Some(name) => name.to_string(),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "untitled".to_string()),
        };

        let file = FileRecord::new(user_id.to_string(), name, source_language, target_languages.clone());
        self.repository.create_file(&file).await?;

        let units: Vec<UnitRecord> = target_languages
            .iter()
            .flat_map(|language| {
                segments.iter().enumerate().map(|(index, text)| {
                    UnitRecord::new(file.id.clone(), index as i64 + 1, text.clone(), language.clone())
                })
            })
            .collect();
        let unit_count = self.repository.insert_units(units).await?.len();

        info!(
            "Imported {} ({} segments, {} units) as file {}",
            file.name,
            segments.len(),
            unit_count,
            file.id
        );
        Ok(ImportSummary {
            file,
            segment_count: segments.len(),
            unit_count,
        })
    }

    /// Translate the remaining units of a file and wait for the job to end
    pub async fn translate_file(
        &self,
        user_id: &str,
        file_id: &str,
        options: TranslateFileOptions,
        show_progress: bool,
    ) -> Result<RunSummary> {
        info!(
            "Translating with {} - {}",
            self.config.translation.provider.display_name(),
            self.config.translation.get_model()
        );
        let limit = options.limit;
        let started = self.manager.start_file_translation(user_id, file_id, options).await?;

        // The job record has no total when every remaining unit is requested
        let expected = match self.repository.get_job(&started.job_id).await? {
            Some(job) => {
                let remaining = self
                    .repository
                    .get_units(file_id, job.scope.target_language())
                    .await?
                    .iter()
                    .filter(|unit| !unit.is_confirmed())
                    .count();
                Some(limit.map_or(remaining, |limit| limit.min(remaining)) as u64)
            }
            None => None,
        };

        self.wait_for_job(started, expected, "segments", show_progress).await
    }

    /// Generate glossary terms and wait for the job to end
    pub async fn generate_glossary(
        &self,
        user_id: &str,
        options: GlossaryGenerationOptions,
        show_progress: bool,
    ) -> Result<RunSummary> {
        let expected = options.count as u64;
        let started = self.manager.start_glossary_generation(user_id, options).await?;
        self.wait_for_job(started, Some(expected), "terms", show_progress).await
    }

    /// Poll a running job until its runner ends; Ctrl-C requests a stop
    async fn wait_for_job(
        &self,
        started: StartedJob,
        expected: Option<u64>,
        unit_label: &str,
        show_progress: bool,
    ) -> Result<RunSummary> {
        let start_time = Instant::now();
        let StartedJob { job_id, mut handle } = started;
        info!("Job {} started", job_id);

        let progress_bar = if show_progress {
            ProgressBar::new(expected.unwrap_or(0))
        } else {
            ProgressBar::hidden()
        };
        let template = format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}}",
            unit_label
        );
        let style = ProgressStyle::default_bar()
            .template(&template)
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.set_message("Working");

        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        let mut stop_sent = false;

        let summary = loop {
            tokio::select! {
                result = &mut handle => {
                    break result.map_err(|e| anyhow!("Runner of job {} crashed: {}", job_id, e))?;
                }
                signal = tokio::signal::ctrl_c(), if !stop_sent => {
                    stop_sent = true;
                    if let Err(e) = signal {
                        warn!("Could not listen for Ctrl-C: {}", e);
                        continue;
                    }
                    progress_bar.set_message("Stopping after the current batch");
                    match self.manager.request_stop(&job_id).await {
                        Ok(true) => info!("Stop requested, waiting for job {} to reach a poll point", job_id),
                        Ok(false) => info!("Job {} already finished", job_id),
                        Err(e) => warn!("Could not request stop of job {}: {}", job_id, e),
                    }
                }
                _ = ticker.tick() => {
                    if let Ok(record) = self.manager.status(&job_id).await {
                        if let Some(total) = record.target_count {
                            progress_bar.set_length(total.max(0) as u64);
                        }
                        progress_bar.set_position(record.progress.max(0) as u64);
                    }
                }
            }
        };

        progress_bar.finish_and_clear();
        info!(
            "Job {} {} in {}: {} processed, {} updated",
            summary.job_id,
            summary.status,
            Self::format_duration(start_time.elapsed()),
            summary.processed,
            summary.updated
        );
        let usage = self.translator.usage();
        if usage.requests > 0 {
            info!("{}", usage.summary());
        }
        Ok(summary)
    }

    /// Request a stop; with `release` also clear the file flag of a file job
    pub async fn stop_job(&self, job_id: &str, release: bool) -> Result<bool> {
        let accepted = self.manager.request_stop(job_id).await?;
        if release {
            let job = self.manager.status(job_id).await?;
            match job.scope.file_id() {
                Some(file_id) => self.manager.release_file(file_id).await?,
                None => warn!("Job {} is not a file translation, nothing to release", job_id),
            }
        }
        Ok(accepted)
    }

    pub async fn job_status(&self, job_id: &str) -> Result<JobRecord> {
        Ok(self.manager.status(job_id).await?)
    }

    pub async fn list_jobs(&self, user_id: Option<&str>, limit: usize) -> Result<Vec<JobRecord>> {
        Ok(self.manager.list(user_id, limit).await?)
    }

    /// Notifications of a user, newest first; optionally marks them read
    pub async fn notifications(&self, user_id: &str, limit: usize, mark_read: bool) -> Result<Vec<NotificationRecord>> {
        let notifications = self.repository.list_notifications(user_id, limit).await?;
        if mark_read {
            self.repository
                .mark_notifications_read(user_id)
                .await
                .context("Failed to mark notifications as read")?;
        }
        Ok(notifications)
    }

    pub fn stats(&self) -> Result<DatabaseStats> {
        self.repository.connection().stats()
    }

    /// Format a duration in a human-readable format
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
