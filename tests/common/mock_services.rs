/*!
 * Scripted collaborators for runner tests
 *
 * Translators, generators, notifiers and store wrappers with predetermined
 * behaviour, so runner tests never reach a real provider and can inject
 * failures at exact points of a run.
 */

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use linguabatch::database::Repository;
use linguabatch::database::models::{
    FileRecord, FileStatus, GlossaryTermRecord, JobRecord, JobScope, JobStatus, NotificationKind, UnitRecord,
};
use linguabatch::errors::{ProviderError, TranslationError};
use linguabatch::jobs::{ContentStore, JobStore};
use linguabatch::notifications::{Notification, Notifier};
use linguabatch::translation::{GeneratedTerm, GlossaryGenerator, GlossaryRequest, Translator};

/// Text the scripted translator produces for `text`
pub fn expected_translation(text: &str, target_language: &str) -> String {
    format!("[{}] {}", target_language, text)
}

/// How `translate_batch` behaves
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatchMode {
    Succeed,
    /// Fails as if retries were exhausted on a rate limit
    Fail,
    /// Returns one item less than requested
    WrongLength,
    /// Answers `Ok` with the first item missing
    ShortAnswer,
}

/// Deterministic translator recording every call
pub struct ScriptedTranslator {
    batch_mode: BatchMode,
    failing_texts: HashSet<String>,
    panic_on_batch: Option<usize>,
    batch_calls: Mutex<Vec<Vec<String>>>,
    single_calls: Mutex<Vec<String>>,
}

impl ScriptedTranslator {
    pub fn new(batch_mode: BatchMode) -> Self {
        Self {
            batch_mode,
            failing_texts: HashSet::new(),
            panic_on_batch: None,
            batch_calls: Mutex::new(Vec::new()),
            single_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn working() -> Self {
        Self::new(BatchMode::Succeed)
    }

    /// `translate_one` fails for these source texts
    pub fn failing_for(mut self, texts: &[String]) -> Self {
        self.failing_texts = texts.iter().cloned().collect();
        self
    }

    /// Panic inside the n-th batch call (1-based)
    pub fn panicking_on_batch(mut self, call: usize) -> Self {
        self.panic_on_batch = Some(call);
        self
    }

    pub fn batch_calls(&self) -> Vec<Vec<String>> {
        self.batch_calls.lock().clone()
    }

    pub fn single_calls(&self) -> Vec<String> {
        self.single_calls.lock().clone()
    }
}

#[async_trait]
impl Translator for ScriptedTranslator {
    async fn translate_one(&self, text: &str, target_language: &str) -> Result<String, TranslationError> {
        self.single_calls.lock().push(text.to_string());
        if self.failing_texts.contains(text) {
            return Err(TranslationError::Provider(ProviderError::ApiError {
                status_code: 500,
                message: "upstream failure".to_string(),
            }));
        }
        Ok(expected_translation(text, target_language))
    }

    async fn translate_batch(&self, texts: &[String], target_language: &str) -> Result<Vec<String>, TranslationError> {
        let call = {
            let mut calls = self.batch_calls.lock();
            calls.push(texts.to_vec());
            calls.len()
        };
        if self.panic_on_batch == Some(call) {
            panic!("translator exploded on batch {}", call);
        }

        let translations: Vec<String> = texts.iter().map(|t| expected_translation(t, target_language)).collect();
        match self.batch_mode {
            BatchMode::Succeed => Ok(translations),
            BatchMode::Fail => Err(TranslationError::RateLimited("quota exhausted".to_string())),
            // Mirrors the capability's length check on a short answer
            BatchMode::WrongLength => Err(TranslationError::BatchLengthMismatch {
                expected: texts.len(),
                actual: texts.len().saturating_sub(1),
            }),
            BatchMode::ShortAnswer => Ok(translations.into_iter().skip(1).collect()),
        }
    }
}

/// Side effect run by `HookedTranslator` after a batch call
#[derive(Debug, Clone)]
pub enum BatchHook {
    /// External stop request on the job
    StopJob(String),
    /// External reset of the file's translating flag
    ClearFileFlag(String),
    /// Manual confirmation of a unit
    ConfirmUnit(i64, String),
}

/// Runs a hook once the n-th batch call has returned from the inner translator
pub struct HookedTranslator {
    inner: ScriptedTranslator,
    repo: Repository,
    hook: BatchHook,
    after_calls: usize,
    calls: AtomicUsize,
}

impl HookedTranslator {
    pub fn new(inner: ScriptedTranslator, repo: Repository, hook: BatchHook, after_calls: usize) -> Self {
        Self {
            inner,
            repo,
            hook,
            after_calls,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &ScriptedTranslator {
        &self.inner
    }
}

#[async_trait]
impl Translator for HookedTranslator {
    async fn translate_one(&self, text: &str, target_language: &str) -> Result<String, TranslationError> {
        self.inner.translate_one(text, target_language).await
    }

    async fn translate_batch(&self, texts: &[String], target_language: &str) -> Result<Vec<String>, TranslationError> {
        let result = self.inner.translate_batch(texts, target_language).await;
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.after_calls {
            let applied = match &self.hook {
                BatchHook::StopJob(job_id) => self.repo.request_job_stop(job_id).await.map(|_| ()),
                BatchHook::ClearFileFlag(file_id) => self.repo.end_file_translation(file_id).await,
                BatchHook::ConfirmUnit(unit_id, text) => self.repo.confirm_unit(*unit_id, text).await,
            };
            applied.expect("hook should apply");
        }
        result
    }
}

/// Collects notifications in memory
#[derive(Default)]
pub struct RecordingNotifier {
    received: Mutex<Vec<(String, Notification)>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<(String, Notification)> {
        self.received.lock().clone()
    }

    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.received.lock().iter().map(|(_, n)| n.kind).collect()
    }

    pub fn last(&self) -> Option<Notification> {
        self.received.lock().last().map(|(_, n)| n.clone())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user_id: &str, notification: Notification) -> Result<()> {
        self.received.lock().push((user_id.to_string(), notification));
        Ok(())
    }
}

/// Notification transport that is always down
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _user_id: &str, _notification: Notification) -> Result<()> {
        Err(anyhow!("notification transport unavailable"))
    }
}

/// Content store over a repository with injectable unit-write failures
pub struct FlakyContentStore {
    repo: Repository,
    /// Saves allowed before every further save fails
    fail_saves_after: Option<usize>,
    saves: AtomicUsize,
}

impl FlakyContentStore {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            fail_saves_after: None,
            saves: AtomicUsize::new(0),
        }
    }

    pub fn failing_saves_after(mut self, saves: usize) -> Self {
        self.fail_saves_after = Some(saves);
        self
    }
}

#[async_trait]
impl ContentStore for FlakyContentStore {
    async fn get_file(&self, file_id: &str) -> Result<Option<FileRecord>> {
        self.repo.get_file(file_id).await
    }

    async fn try_begin_file_translation(&self, file_id: &str) -> Result<bool> {
        self.repo.try_begin_file_translation(file_id).await
    }

    async fn is_file_translating(&self, file_id: &str) -> Result<bool> {
        self.repo.is_file_translating(file_id).await
    }

    async fn end_file_translation(&self, file_id: &str) -> Result<()> {
        self.repo.end_file_translation(file_id).await
    }

    async fn transition_file_status(&self, file_id: &str, from: FileStatus, to: FileStatus) -> Result<bool> {
        self.repo.transition_file_status(file_id, from, to).await
    }

    async fn get_units(&self, file_id: &str, target_language: &str) -> Result<Vec<UnitRecord>> {
        self.repo.get_units(file_id, target_language).await
    }

    async fn save_unit_translation(&self, unit_id: i64, target_text: &str) -> Result<bool> {
        let done = self.saves.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_saves_after {
            if done >= limit {
                return Err(anyhow!("disk I/O error"));
            }
        }
        self.repo.save_unit_translation(unit_id, target_text).await
    }

    async fn glossary_term_exists(&self, term: &str, source_language: &str, target_language: &str) -> Result<bool> {
        self.repo.glossary_term_exists(term, source_language, target_language).await
    }

    async fn insert_glossary_term(&self, record: &GlossaryTermRecord) -> Result<bool> {
        self.repo.insert_glossary_term(record).await
    }

    async fn recent_glossary_terms(&self, source_language: &str, target_language: &str, limit: usize) -> Result<Vec<String>> {
        let terms = self.repo.list_glossary_terms(source_language, target_language, limit).await?;
        Ok(terms.into_iter().map(|t| t.term).collect())
    }
}

/// Job store whose progress checkpoints always fail
pub struct BrokenCheckpointStore {
    repo: Repository,
}

impl BrokenCheckpointStore {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl JobStore for BrokenCheckpointStore {
    async fn create(&self, user_id: &str, scope: JobScope, target_count: Option<i64>) -> Result<String> {
        JobStore::create(&self.repo, user_id, scope, target_count).await
    }

    async fn set_status(&self, job_id: &str, status: JobStatus, error_detail: Option<String>) -> Result<bool> {
        self.repo.update_job_status(job_id, status, error_detail).await
    }

    async fn increment_progress(&self, _job_id: &str, _delta: usize) -> Result<bool> {
        Err(anyhow!("database is locked"))
    }

    async fn increment_updated(&self, _job_id: &str, _delta: usize) -> Result<()> {
        Err(anyhow!("database is locked"))
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>> {
        self.repo.get_job(job_id).await
    }

    async fn request_stop(&self, job_id: &str) -> Result<bool> {
        self.repo.request_job_stop(job_id).await
    }

    async fn list(&self, user_id: Option<&str>, limit: usize) -> Result<Vec<JobRecord>> {
        self.repo.list_jobs(user_id, limit).await
    }

    async fn find_active(&self, scope: &JobScope) -> Result<Option<JobRecord>> {
        self.repo.find_active_job(scope).await
    }
}

/// Job store that requests a stop once the n-th batch has been checkpointed
pub struct StopAfterCheckpoints {
    repo: Repository,
    after_checkpoints: usize,
    checkpoints: AtomicUsize,
}

impl StopAfterCheckpoints {
    pub fn new(repo: Repository, after_checkpoints: usize) -> Self {
        Self {
            repo,
            after_checkpoints,
            checkpoints: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl JobStore for StopAfterCheckpoints {
    async fn create(&self, user_id: &str, scope: JobScope, target_count: Option<i64>) -> Result<String> {
        JobStore::create(&self.repo, user_id, scope, target_count).await
    }

    async fn set_status(&self, job_id: &str, status: JobStatus, error_detail: Option<String>) -> Result<bool> {
        self.repo.update_job_status(job_id, status, error_detail).await
    }

    async fn increment_progress(&self, job_id: &str, delta: usize) -> Result<bool> {
        self.repo.increment_job_progress(job_id, delta).await
    }

    // Last write of a batch, so the stop lands between two batches
    async fn increment_updated(&self, job_id: &str, delta: usize) -> Result<()> {
        self.repo.increment_job_updated_count(job_id, delta).await?;
        let done = self.checkpoints.fetch_add(1, Ordering::SeqCst) + 1;
        if done == self.after_checkpoints {
            self.repo.request_job_stop(job_id).await?;
        }
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>> {
        self.repo.get_job(job_id).await
    }

    async fn request_stop(&self, job_id: &str) -> Result<bool> {
        self.repo.request_job_stop(job_id).await
    }

    async fn list(&self, user_id: Option<&str>, limit: usize) -> Result<Vec<JobRecord>> {
        self.repo.list_jobs(user_id, limit).await
    }

    async fn find_active(&self, scope: &JobScope) -> Result<Option<JobRecord>> {
        self.repo.find_active_job(scope).await
    }
}

/// Shorthand for a generated term without definition
pub fn term(term: &str, translation: &str) -> GeneratedTerm {
    GeneratedTerm {
        term: term.to_string(),
        translation: translation.to_string(),
        definition: None,
    }
}

/// Glossary generator answering from a queue of prepared batches
///
/// Once the queue is empty every call returns no terms.
#[derive(Default)]
pub struct ScriptedGenerator {
    batches: Mutex<VecDeque<Vec<GeneratedTerm>>>,
    requests: Mutex<Vec<GlossaryRequest>>,
    fail: bool,
}

impl ScriptedGenerator {
    pub fn with_batches(batches: Vec<Vec<GeneratedTerm>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<GlossaryRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl GlossaryGenerator for ScriptedGenerator {
    async fn generate_terms(&self, request: &GlossaryRequest) -> Result<Vec<GeneratedTerm>, TranslationError> {
        self.requests.lock().push(request.clone());
        if self.fail {
            return Err(TranslationError::Provider(ProviderError::AuthenticationError(
                "invalid api key".to_string(),
            )));
        }
        Ok(self.batches.lock().pop_front().unwrap_or_default())
    }
}
