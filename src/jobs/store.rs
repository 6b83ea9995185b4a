/*!
 * Store contracts used by the background runners.
 *
 * - `JobStore`: the job record store. It holds status, progress and the
 *   externally writable stop request.
 * - `ContentStore`: the files, translation units and glossary terms a runner
 *   reads and writes.
 *
 * Runners only see these traits; `Repository` implements both on SQLite.
 * Every read is a fresh read, never a cached copy.
 */

use anyhow::Result;
use async_trait::async_trait;

use crate::database::models::{
    FileRecord, FileStatus, GlossaryTermRecord, JobRecord, JobScope, JobStatus, UnitRecord,
};
use crate::database::Repository;

/// Persisted, externally visible state of batch jobs
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a PENDING job and return its id
    async fn create(&self, user_id: &str, scope: JobScope, target_count: Option<i64>) -> Result<String>;

    /// Set the status unless the job is already terminal; returns whether it changed
    async fn set_status(&self, job_id: &str, status: JobStatus, error_detail: Option<String>) -> Result<bool>;

    /// Add attempted items; never decreases, clamped to the target count
    async fn increment_progress(&self, job_id: &str, delta: usize) -> Result<bool>;

    /// Add items actually written
    async fn increment_updated(&self, job_id: &str, delta: usize) -> Result<()>;

    /// Fresh read of a job
    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>>;

    /// Move a PENDING or PROCESSING job to STOPPED; false otherwise
    async fn request_stop(&self, job_id: &str) -> Result<bool>;

    /// Newest jobs first
    async fn list(&self, user_id: Option<&str>, limit: usize) -> Result<Vec<JobRecord>>;

    /// A pending or processing job with the same scope, if any
    async fn find_active(&self, scope: &JobScope) -> Result<Option<JobRecord>>;
}

/// Files, units and glossary terms as seen by the runners
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn get_file(&self, file_id: &str) -> Result<Option<FileRecord>>;

    /// Atomically claim the file's `is_translating` flag
    async fn try_begin_file_translation(&self, file_id: &str) -> Result<bool>;

    /// Fresh read of the file's `is_translating` flag
    async fn is_file_translating(&self, file_id: &str) -> Result<bool>;

    /// Unconditionally release the file's `is_translating` flag
    async fn end_file_translation(&self, file_id: &str) -> Result<()>;

    /// Conditional file status transition
    async fn transition_file_status(&self, file_id: &str, from: FileStatus, to: FileStatus) -> Result<bool>;

    /// Units of a file in one target language, in sequence order
    async fn get_units(&self, file_id: &str, target_language: &str) -> Result<Vec<UnitRecord>>;

    /// Write a translation unless the unit is CONFIRMED; returns whether it was written
    async fn save_unit_translation(&self, unit_id: i64, target_text: &str) -> Result<bool>;

    async fn glossary_term_exists(&self, term: &str, source_language: &str, target_language: &str) -> Result<bool>;

    /// Insert a term; false when it already exists
    async fn insert_glossary_term(&self, record: &GlossaryTermRecord) -> Result<bool>;

    /// Most recent terms of a language pair
    async fn recent_glossary_terms(&self, source_language: &str, target_language: &str, limit: usize) -> Result<Vec<String>>;
}

#[async_trait]
impl JobStore for Repository {
    async fn create(&self, user_id: &str, scope: JobScope, target_count: Option<i64>) -> Result<String> {
        let job = JobRecord::new(user_id.to_string(), scope, target_count);
        self.create_job(&job).await?;
        Ok(job.id)
    }

    async fn set_status(&self, job_id: &str, status: JobStatus, error_detail: Option<String>) -> Result<bool> {
        self.update_job_status(job_id, status, error_detail).await
    }

    async fn increment_progress(&self, job_id: &str, delta: usize) -> Result<bool> {
        self.increment_job_progress(job_id, delta).await
    }

    async fn increment_updated(&self, job_id: &str, delta: usize) -> Result<()> {
        self.increment_job_updated_count(job_id, delta).await
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>> {
        self.get_job(job_id).await
    }

    async fn request_stop(&self, job_id: &str) -> Result<bool> {
        self.request_job_stop(job_id).await
    }

    async fn list(&self, user_id: Option<&str>, limit: usize) -> Result<Vec<JobRecord>> {
        self.list_jobs(user_id, limit).await
    }

    async fn find_active(&self, scope: &JobScope) -> Result<Option<JobRecord>> {
        self.find_active_job(scope).await
    }
}

#[async_trait]
impl ContentStore for Repository {
    async fn get_file(&self, file_id: &str) -> Result<Option<FileRecord>> {
        Repository::get_file(self, file_id).await
    }

    async fn try_begin_file_translation(&self, file_id: &str) -> Result<bool> {
        Repository::try_begin_file_translation(self, file_id).await
    }

    async fn is_file_translating(&self, file_id: &str) -> Result<bool> {
        Repository::is_file_translating(self, file_id).await
    }

    async fn end_file_translation(&self, file_id: &str) -> Result<()> {
        Repository::end_file_translation(self, file_id).await
    }

    async fn transition_file_status(&self, file_id: &str, from: FileStatus, to: FileStatus) -> Result<bool> {
        Repository::transition_file_status(self, file_id, from, to).await
    }

    async fn get_units(&self, file_id: &str, target_language: &str) -> Result<Vec<UnitRecord>> {
        Repository::get_units(self, file_id, target_language).await
    }

    async fn save_unit_translation(&self, unit_id: i64, target_text: &str) -> Result<bool> {
        Repository::save_unit_translation(self, unit_id, target_text).await
    }

    async fn glossary_term_exists(&self, term: &str, source_language: &str, target_language: &str) -> Result<bool> {
        Repository::glossary_term_exists(self, term, source_language, target_language).await
    }

    async fn insert_glossary_term(&self, record: &GlossaryTermRecord) -> Result<bool> {
        Repository::insert_glossary_term(self, record).await
    }

    async fn recent_glossary_terms(&self, source_language: &str, target_language: &str, limit: usize) -> Result<Vec<String>> {
        let terms = self.list_glossary_terms(source_language, target_language, limit).await?;
        Ok(terms.into_iter().map(|t| t.term).collect())
    }
}
