/*!
 * Trigger and stop interface for background jobs.
 *
 * Starting a job validates the request, claims the scope, writes a PENDING
 * record and spawns the runner on the tokio runtime. The call returns as soon
 * as the runner is scheduled. Everything the runner needs later lives in the
 * stores, so the returned handle is only a convenience for callers that own
 * the process.
 */

use log::{info, warn};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::app_config::JobConfig;
use crate::database::models::{JobRecord, JobScope};
use crate::errors::JobError;
use crate::language_utils;
use crate::notifications::Notifier;
use crate::translation::{GlossaryGenerator, Translator};

use super::file_translation::{FileTranslationJob, FileTranslationRunner};
use super::glossary_generation::{GlossaryGenerationJob, GlossaryGenerationRunner};
use super::runner::{RunSummary, RunnerSettings};
use super::store::{ContentStore, JobStore};

/// Options of a file translation request
#[derive(Debug, Clone, Default)]
pub struct TranslateFileOptions {
    /// Defaults to the file's first target language, then to the configured one
    pub target_language: Option<String>,
    /// Translate at most this many remaining units
    pub limit: Option<usize>,
}

impl TranslateFileOptions {
    pub fn with_target_language(mut self, target_language: impl Into<String>) -> Self {
        self.target_language = Some(target_language.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Options of a glossary generation request
#[derive(Debug, Clone)]
pub struct GlossaryGenerationOptions {
    pub source_language: String,
    pub target_language: String,
    pub count: usize,
    pub domain: Option<String>,
}

impl GlossaryGenerationOptions {
    pub fn new(source_language: &str, target_language: &str, count: usize) -> Self {
        Self {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            count,
            domain: None,
        }
    }

    pub fn with_domain(mut self, domain: Option<String>) -> Self {
        self.domain = domain;
        self
    }
}

/// A scheduled job
#[derive(Debug)]
pub struct StartedJob {
    pub job_id: String,
    /// Resolves when the runner reaches a terminal state
    pub handle: JoinHandle<RunSummary>,
}

/// Starts, stops and reports background jobs
#[derive(Clone)]
pub struct JobManager {
    jobs: Arc<dyn JobStore>,
    content: Arc<dyn ContentStore>,
    translator: Arc<dyn Translator>,
    generator: Arc<dyn GlossaryGenerator>,
    notifier: Arc<dyn Notifier>,
    settings: RunnerSettings,
    glossary_max_terms: usize,
    default_target_language: Option<String>,
}

impl JobManager {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        content: Arc<dyn ContentStore>,
        translator: Arc<dyn Translator>,
        generator: Arc<dyn GlossaryGenerator>,
        notifier: Arc<dyn Notifier>,
        config: &JobConfig,
    ) -> Self {
        Self {
            jobs,
            content,
            translator,
            generator,
            notifier,
            settings: RunnerSettings::from(config),
            glossary_max_terms: config.glossary_max_terms,
            default_target_language: None,
        }
    }

    /// Fallback target language when neither the request nor the file names one
    pub fn with_default_target_language(mut self, language: Option<String>) -> Self {
        self.default_target_language = language;
        self
    }

    /// Override the runner tuning, mostly to drop delays in tests
    pub fn with_settings(mut self, settings: RunnerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Start translating the remaining units of a file
    pub async fn start_file_translation(
        &self,
        user_id: &str,
        file_id: &str,
        options: TranslateFileOptions,
    ) -> Result<StartedJob, JobError> {
        let file = self
            .content
            .get_file(file_id)
            .await?
            .ok_or_else(|| JobError::NotFound(format!("file {}", file_id)))?;

        let target_language = options
            .target_language
            .or_else(|| file.default_target_language().map(str::to_string))
            .or_else(|| self.default_target_language.clone())
            .ok_or_else(|| JobError::NoTargetLanguage(file_id.to_string()))?;
        language_utils::normalize_to_part2t(&target_language)
            .map_err(|e| JobError::InvalidRequest(e.to_string()))?;

        // Units are stored under the file's own spelling of the code
        let target_language = if file.target_languages.is_empty() {
            target_language
        } else {
            file.target_languages
                .iter()
                .find(|code| language_utils::language_codes_match(code, &target_language))
                .cloned()
                .ok_or_else(|| {
                    JobError::InvalidRequest(format!(
                        "file {} has no target language {} (configured: {})",
                        file_id,
                        target_language,
                        file.target_languages.join(", ")
                    ))
                })?
        };

        let target_count = match options.limit {
            Some(0) => return Err(JobError::InvalidRequest("limit must be greater than zero".to_string())),
            Some(limit) => Some(
                i64::try_from(limit).map_err(|_| JobError::InvalidRequest(format!("limit {} is too large", limit)))?,
            ),
            None => None,
        };

        if !self.content.try_begin_file_translation(file_id).await? {
            return Err(JobError::AlreadyRunning(format!("file {}", file_id)));
        }

        let scope = JobScope::File {
            file_id: file_id.to_string(),
            target_language: target_language.clone(),
        };
        let job_id = match self.jobs.create(user_id, scope, target_count).await {
            Ok(job_id) => job_id,
            Err(e) => {
                if let Err(release) = self.content.end_file_translation(file_id).await {
                    warn!("Could not release translation flag on file {}: {:#}", file_id, release);
                }
                return Err(JobError::Store(e));
            }
        };

        info!("Scheduled job {} translating file {} into {}", job_id, file_id, target_language);
        let runner = FileTranslationRunner::new(
            self.jobs.clone(),
            self.content.clone(),
            self.translator.clone(),
            self.notifier.clone(),
            self.settings.clone(),
        );
        let job = FileTranslationJob {
            job_id: job_id.clone(),
            user_id: user_id.to_string(),
            file_id: file_id.to_string(),
            target_language,
            limit: options.limit,
        };
        let handle = tokio::spawn(async move { runner.run(job).await });

        Ok(StartedJob { job_id, handle })
    }

    /// Start generating glossary terms for a language pair
    pub async fn start_glossary_generation(
        &self,
        user_id: &str,
        options: GlossaryGenerationOptions,
    ) -> Result<StartedJob, JobError> {
        if options.count == 0 || options.count > self.glossary_max_terms {
            return Err(JobError::InvalidRequest(format!(
                "count must be between 1 and {}",
                self.glossary_max_terms
            )));
        }
        for code in [&options.source_language, &options.target_language] {
            language_utils::normalize_to_part2t(code).map_err(|e| JobError::InvalidRequest(e.to_string()))?;
        }
        if language_utils::language_codes_match(&options.source_language, &options.target_language) {
            return Err(JobError::InvalidRequest(
                "source and target language must differ".to_string(),
            ));
        }

        let scope = JobScope::LanguagePair {
            source_language: options.source_language.clone(),
            target_language: options.target_language.clone(),
            domain: options.domain.clone(),
        };
        if let Some(active) = self.jobs.find_active(&scope).await? {
            return Err(JobError::AlreadyRunning(format!("{} (job {})", scope, active.id)));
        }

        let target_count = i64::try_from(options.count)
            .map_err(|_| JobError::InvalidRequest(format!("count {} is too large", options.count)))?;
        let job_id = self.jobs.create(user_id, scope, Some(target_count)).await?;

        info!(
            "Scheduled job {} generating {} glossary terms {} -> {}",
            job_id, options.count, options.source_language, options.target_language
        );
        let runner = GlossaryGenerationRunner::new(
            self.jobs.clone(),
            self.content.clone(),
            self.generator.clone(),
            self.notifier.clone(),
            self.settings.clone(),
        );
        let job = GlossaryGenerationJob {
            job_id: job_id.clone(),
            user_id: user_id.to_string(),
            source_language: options.source_language,
            target_language: options.target_language,
            count: options.count,
            domain: options.domain,
        };
        let handle = tokio::spawn(async move { runner.run(job).await });

        Ok(StartedJob { job_id, handle })
    }

    /// Ask a job to stop at its next poll point; false if it already ended
    pub async fn request_stop(&self, job_id: &str) -> Result<bool, JobError> {
        if self.jobs.get(job_id).await?.is_none() {
            return Err(JobError::NotFound(format!("job {}", job_id)));
        }
        let accepted = self.jobs.request_stop(job_id).await?;
        if accepted {
            info!("Stop requested for job {}", job_id);
        }
        Ok(accepted)
    }

    /// Fresh read of a job
    pub async fn status(&self, job_id: &str) -> Result<JobRecord, JobError> {
        self.jobs
            .get(job_id)
            .await?
            .ok_or_else(|| JobError::NotFound(format!("job {}", job_id)))
    }

    /// Most recent jobs, optionally for one user
    pub async fn list(&self, user_id: Option<&str>, limit: usize) -> Result<Vec<JobRecord>, JobError> {
        Ok(self.jobs.list(user_id, limit).await?)
    }

    /// Clear a file's translation flag left behind by a runner that died
    ///
    /// A live runner sees the cleared flag at its next poll point and stops.
    pub async fn release_file(&self, file_id: &str) -> Result<(), JobError> {
        if self.content.get_file(file_id).await?.is_none() {
            return Err(JobError::NotFound(format!("file {}", file_id)));
        }
        self.content.end_file_translation(file_id).await?;
        warn!("Translation flag of file {} released manually", file_id);
        Ok(())
    }
}
