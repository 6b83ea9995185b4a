/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for all database operations,
 * abstracting away the SQL details and providing type-safe access.
 *
 * Every write that a background runner and an external actor may race on is a
 * single conditional UPDATE, so SQLite's own atomicity is the only lock.
 */

use anyhow::{anyhow, Context, Result};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

use super::connection::DatabaseConnection;
use super::models::{
    FileRecord, FileStatus, GlossaryTermRecord, JobKind, JobRecord, JobScope, JobStatus,
    NotificationKind, NotificationRecord, UnitRecord, UnitStatus,
};

/// Statuses a job can still leave; used in every conditional job update
const ACTIVE_JOB_STATUSES: &str = "('pending', 'processing')";

const JOB_COLUMNS: &str = "id, user_id, kind, file_id, source_language, target_language, domain, \
     status, progress, target_count, updated_count, error_detail, created_at, updated_at";

const FILE_COLUMNS: &str =
    "id, user_id, name, source_language, target_languages, status, is_translating, created_at, updated_at";

const UNIT_COLUMNS: &str =
    "id, file_id, seq_num, source_text, target_text, target_language, status, ai_suggestion, updated_at";

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

fn parse_job_row(row: &rusqlite::Row) -> rusqlite::Result<JobRecord> {
    let kind: JobKind = row
        .get::<_, String>(2)?
        .parse()
        .unwrap_or(JobKind::FileTranslation);
    let file_id: Option<String> = row.get(3)?;
    let source_language: Option<String> = row.get(4)?;
    let target_language: String = row.get(5)?;
    let domain: Option<String> = row.get(6)?;

    let scope = match kind {
        JobKind::FileTranslation => JobScope::File {
            file_id: file_id.unwrap_or_default(),
            target_language,
        },
        JobKind::GlossaryGeneration => JobScope::LanguagePair {
            source_language: source_language.unwrap_or_default(),
            target_language,
            domain,
        },
    };

    Ok(JobRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        scope,
        status: row.get::<_, String>(7)?.parse().unwrap_or(JobStatus::Failed),
        progress: row.get(8)?,
        target_count: row.get(9)?,
        updated_count: row.get(10)?,
        error_detail: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn parse_file_row(row: &rusqlite::Row) -> rusqlite::Result<FileRecord> {
    let target_languages: String = row.get(4)?;
    Ok(FileRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        source_language: row.get(3)?,
        target_languages: serde_json::from_str(&target_languages).unwrap_or_default(),
        status: row.get::<_, String>(5)?.parse().unwrap_or(FileStatus::Draft),
        is_translating: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn parse_unit_row(row: &rusqlite::Row) -> rusqlite::Result<UnitRecord> {
    Ok(UnitRecord {
        id: row.get(0)?,
        file_id: row.get(1)?,
        seq_num: row.get(2)?,
        source_text: row.get(3)?,
        target_text: row.get(4)?,
        target_language: row.get(5)?,
        // Unknown statuses are treated as confirmed so a job never overwrites them
        status: row.get::<_, String>(6)?.parse().unwrap_or(UnitStatus::Confirmed),
        ai_suggestion: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn parse_notification_row(row: &rusqlite::Row) -> rusqlite::Result<NotificationRecord> {
    Ok(NotificationRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: row.get::<_, String>(2)?.parse().unwrap_or(NotificationKind::Info),
        title: row.get(3)?,
        message: row.get(4)?,
        link: row.get(5)?,
        is_read: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn to_sql_count(value: usize) -> Result<i64> {
    i64::try_from(value).context("Count does not fit in a database integer")
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // File Operations
    // =========================================================================

    /// Insert a new file record
    pub async fn create_file(&self, file: &FileRecord) -> Result<()> {
        let file = file.clone();
        let target_languages = serde_json::to_string(&file.target_languages)?;

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO files (
                        id, user_id, name, source_language, target_languages, status,
                        is_translating, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    "#,
                    params![
                        file.id,
                        file.user_id,
                        file.name,
                        file.source_language,
                        target_languages,
                        file.status.to_string(),
                        file.is_translating,
                        file.created_at,
                        file.updated_at,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Get a file by ID
    pub async fn get_file(&self, file_id: &str) -> Result<Option<FileRecord>> {
        let file_id = file_id.to_string();

        self.db
            .execute_async(move |conn| Self::get_file_sync(conn, &file_id))
            .await
    }

    /// Get a file by ID (synchronous version for use within transactions)
    fn get_file_sync(conn: &Connection, file_id: &str) -> Result<Option<FileRecord>> {
        let sql = format!("SELECT {} FROM files WHERE id = ?1", FILE_COLUMNS);
        let result = conn.query_row(&sql, [file_id], parse_file_row).optional()?;
        Ok(result)
    }

    /// List files, newest first
    pub async fn list_files(&self, user_id: Option<&str>) -> Result<Vec<FileRecord>> {
        let user_id = user_id.map(str::to_string);

        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {} FROM files WHERE (?1 IS NULL OR user_id = ?1) ORDER BY created_at DESC",
                    FILE_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let files: Vec<FileRecord> = stmt
                    .query_map(params![user_id], parse_file_row)?
                    .filter_map(|r| r.ok())
                    .collect();
                Ok(files)
            })
            .await
    }

    /// Atomically set `is_translating` from false to true.
    ///
    /// Returns false when a runner already holds the flag or the file is missing.
    pub async fn try_begin_file_translation(&self, file_id: &str) -> Result<bool> {
        let file_id = file_id.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                let changed = conn.execute(
                    "UPDATE files SET is_translating = 1, updated_at = ?1 WHERE id = ?2 AND is_translating = 0",
                    params![now, file_id],
                )?;
                Ok(changed > 0)
            })
            .await
    }

    /// Fresh read of the file's `is_translating` flag
    pub async fn is_file_translating(&self, file_id: &str) -> Result<bool> {
        let file_id = file_id.to_string();

        self.db
            .execute_async(move |conn| {
                let flag: Option<bool> = conn
                    .query_row(
                        "SELECT is_translating FROM files WHERE id = ?1",
                        [&file_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(flag.unwrap_or(false))
            })
            .await
    }

    /// Unconditionally clear the file's `is_translating` flag
    pub async fn end_file_translation(&self, file_id: &str) -> Result<()> {
        let file_id = file_id.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "UPDATE files SET is_translating = 0, updated_at = ?1 WHERE id = ?2",
                    params![now, file_id],
                )?;
                Ok(())
            })
            .await
    }

    /// Move a file from one workflow status to another; no-op if it is not in `from`
    pub async fn transition_file_status(&self, file_id: &str, from: FileStatus, to: FileStatus) -> Result<bool> {
        let file_id = file_id.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                let changed = conn.execute(
                    "UPDATE files SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
                    params![to.to_string(), now, file_id, from.to_string()],
                )?;
                Ok(changed > 0)
            })
            .await
    }

    // =========================================================================
    // Translation Unit Operations
    // =========================================================================

    /// Insert units for a file (batch insert)
    pub async fn insert_units(&self, units: Vec<UnitRecord>) -> Result<Vec<i64>> {
        self.db
            .transaction_async(move |tx| {
                let mut ids = Vec::with_capacity(units.len());
                for unit in units {
                    tx.execute(
                        r#"
                        INSERT INTO translation_units (
                            file_id, seq_num, source_text, target_text, target_language,
                            status, ai_suggestion, updated_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                        "#,
                        params![
                            unit.file_id,
                            unit.seq_num,
                            unit.source_text,
                            unit.target_text,
                            unit.target_language,
                            unit.status.to_string(),
                            unit.ai_suggestion,
                            unit.updated_at,
                        ],
                    )?;
                    ids.push(tx.last_insert_rowid());
                }
                Ok(ids)
            })
            .await
    }

    /// Get all units of a file in one target language, in sequence order
    pub async fn get_units(&self, file_id: &str, target_language: &str) -> Result<Vec<UnitRecord>> {
        let file_id = file_id.to_string();
        let target_language = target_language.to_string();

        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {} FROM translation_units WHERE file_id = ?1 AND target_language = ?2 ORDER BY seq_num",
                    UNIT_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let units = stmt
                    .query_map(params![file_id, target_language], parse_unit_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(units)
            })
            .await
    }

    /// Get one unit by ID
    pub async fn get_unit(&self, unit_id: i64) -> Result<Option<UnitRecord>> {
        self.db
            .execute_async(move |conn| {
                let sql = format!("SELECT {} FROM translation_units WHERE id = ?1", UNIT_COLUMNS);
                Ok(conn.query_row(&sql, [unit_id], parse_unit_row).optional()?)
            })
            .await
    }

    /// Store a machine translation for a unit.
    ///
    /// The write is guarded on the unit not being CONFIRMED, so a unit confirmed
    /// after the working set was fetched is left untouched. Returns whether the
    /// unit was written.
    pub async fn save_unit_translation(&self, unit_id: i64, target_text: &str) -> Result<bool> {
        let target_text = target_text.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                let changed = conn.execute(
                    r#"
                    UPDATE translation_units
                    SET target_text = ?1, ai_suggestion = ?1, status = 'translated', updated_at = ?2
                    WHERE id = ?3 AND status != 'confirmed'
                    "#,
                    params![target_text, now, unit_id],
                )?;
                Ok(changed > 0)
            })
            .await
    }

    /// Confirm a unit with its final text (manual edit path)
    pub async fn confirm_unit(&self, unit_id: i64, target_text: &str) -> Result<()> {
        let target_text = target_text.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                let changed = conn.execute(
                    "UPDATE translation_units SET target_text = ?1, status = 'confirmed', updated_at = ?2 WHERE id = ?3",
                    params![target_text, now, unit_id],
                )?;
                if changed == 0 {
                    return Err(anyhow!("Unit {} not found", unit_id));
                }
                Ok(())
            })
            .await
    }

    /// Count units per status for a file and language
    pub async fn count_units_by_status(&self, file_id: &str, target_language: &str) -> Result<Vec<(UnitStatus, i64)>> {
        let file_id = file_id.to_string();
        let target_language = target_language.to_string();

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT status, COUNT(*) FROM translation_units
                    WHERE file_id = ?1 AND target_language = ?2
                    GROUP BY status ORDER BY status
                    "#,
                )?;
                let counts: Vec<(UnitStatus, i64)> = stmt
                    .query_map(params![file_id, target_language], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                    })?
                    .filter_map(|r| r.ok())
                    .filter_map(|(status, count)| status.parse().ok().map(|s| (s, count)))
                    .collect();
                Ok(counts)
            })
            .await
    }

    // =========================================================================
    // Batch Job Operations
    // =========================================================================

    /// Insert a new job record
    pub async fn create_job(&self, job: &JobRecord) -> Result<()> {
        let job = job.clone();

        self.db
            .execute_async(move |conn| {
                let (file_id, source_language, domain) = match &job.scope {
                    JobScope::File { file_id, .. } => (Some(file_id.clone()), None, None),
                    JobScope::LanguagePair {
                        source_language,
                        domain,
                        ..
                    } => (None, Some(source_language.clone()), domain.clone()),
                };

                conn.execute(
                    r#"
                    INSERT INTO batch_jobs (
                        id, user_id, kind, file_id, source_language, target_language, domain,
                        status, progress, target_count, updated_count, error_detail,
                        created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                    "#,
                    params![
                        job.id,
                        job.user_id,
                        job.kind().to_string(),
                        file_id,
                        source_language,
                        job.scope.target_language(),
                        domain,
                        job.status.to_string(),
                        job.progress,
                        job.target_count,
                        job.updated_count,
                        job.error_detail,
                        job.created_at,
                        job.updated_at,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Get a job by ID
    pub async fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>> {
        let job_id = job_id.to_string();

        self.db
            .execute_async(move |conn| {
                let sql = format!("SELECT {} FROM batch_jobs WHERE id = ?1", JOB_COLUMNS);
                Ok(conn.query_row(&sql, [&job_id], parse_job_row).optional()?)
            })
            .await
    }

    /// Set a job status unless the job is already terminal.
    ///
    /// Returns whether the row changed.
    pub async fn update_job_status(&self, job_id: &str, status: JobStatus, error_detail: Option<String>) -> Result<bool> {
        let job_id = job_id.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    r#"
                    UPDATE batch_jobs
                    SET status = ?1, error_detail = COALESCE(?2, error_detail), updated_at = ?3
                    WHERE id = ?4 AND status IN {}
                    "#,
                    ACTIVE_JOB_STATUSES
                );
                let changed = conn.execute(&sql, params![status.to_string(), error_detail, now, job_id])?;
                Ok(changed > 0)
            })
            .await
    }

    /// Add `delta` attempted items, clamped to `target_count`; no-op on terminal jobs
    pub async fn increment_job_progress(&self, job_id: &str, delta: usize) -> Result<bool> {
        let job_id = job_id.to_string();
        let delta = to_sql_count(delta)?;
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    r#"
                    UPDATE batch_jobs
                    SET progress = CASE
                            WHEN target_count IS NULL THEN progress + ?1
                            ELSE MIN(progress + ?1, target_count)
                        END,
                        updated_at = ?2
                    WHERE id = ?3 AND status IN {}
                    "#,
                    ACTIVE_JOB_STATUSES
                );
                let changed = conn.execute(&sql, params![delta, now, job_id])?;
                Ok(changed > 0)
            })
            .await
    }

    /// Add `delta` written items; no-op on terminal jobs
    pub async fn increment_job_updated_count(&self, job_id: &str, delta: usize) -> Result<()> {
        let job_id = job_id.to_string();
        let delta = to_sql_count(delta)?;

        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "UPDATE batch_jobs SET updated_count = updated_count + ?1 WHERE id = ?2 AND status IN {}",
                    ACTIVE_JOB_STATUSES
                );
                conn.execute(&sql, params![delta, job_id])?;
                Ok(())
            })
            .await
    }

    /// Request cancellation: STOPPED if the job is still pending or processing
    pub async fn request_job_stop(&self, job_id: &str) -> Result<bool> {
        debug!("Stop requested for job {}", job_id);
        self.update_job_status(job_id, JobStatus::Stopped, None).await
    }

    /// List jobs, newest first
    pub async fn list_jobs(&self, user_id: Option<&str>, limit: usize) -> Result<Vec<JobRecord>> {
        let user_id = user_id.map(str::to_string);
        let limit = to_sql_count(limit)?;

        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {} FROM batch_jobs WHERE (?1 IS NULL OR user_id = ?1) ORDER BY created_at DESC LIMIT ?2",
                    JOB_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let jobs: Vec<JobRecord> = stmt
                    .query_map(params![user_id, limit], parse_job_row)?
                    .filter_map(|r| r.ok())
                    .collect();
                Ok(jobs)
            })
            .await
    }

    /// Find a pending or processing job with the same scope
    pub async fn find_active_job(&self, scope: &JobScope) -> Result<Option<JobRecord>> {
        let scope = scope.clone();

        self.db
            .execute_async(move |conn| {
                let result = match &scope {
                    JobScope::File { file_id, target_language } => {
                        let sql = format!(
                            "SELECT {} FROM batch_jobs WHERE kind = ?1 AND file_id = ?2 AND target_language = ?3 \
                             AND status IN {} ORDER BY created_at DESC LIMIT 1",
                            JOB_COLUMNS, ACTIVE_JOB_STATUSES
                        );
                        conn.query_row(
                            &sql,
                            params![JobKind::FileTranslation.to_string(), file_id, target_language],
                            parse_job_row,
                        )
                        .optional()?
                    }
                    JobScope::LanguagePair {
                        source_language,
                        target_language,
                        ..
                    } => {
                        let sql = format!(
                            "SELECT {} FROM batch_jobs WHERE kind = ?1 AND source_language = ?2 AND target_language = ?3 \
                             AND status IN {} ORDER BY created_at DESC LIMIT 1",
                            JOB_COLUMNS, ACTIVE_JOB_STATUSES
                        );
                        conn.query_row(
                            &sql,
                            params![JobKind::GlossaryGeneration.to_string(), source_language, target_language],
                            parse_job_row,
                        )
                        .optional()?
                    }
                };
                Ok(result)
            })
            .await
    }

    // =========================================================================
    // Glossary Operations
    // =========================================================================

    /// Whether an exact (term, source, target) entry exists
    pub async fn glossary_term_exists(&self, term: &str, source_language: &str, target_language: &str) -> Result<bool> {
        let term = term.to_string();
        let source_language = source_language.to_string();
        let target_language = target_language.to_string();

        self.db
            .execute_async(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM glossary_terms WHERE term = ?1 AND source_language = ?2 AND target_language = ?3",
                    params![term, source_language, target_language],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await
    }

    /// Insert a term; returns false when it already exists
    pub async fn insert_glossary_term(&self, record: &GlossaryTermRecord) -> Result<bool> {
        let record = record.clone();

        self.db
            .execute_async(move |conn| {
                let changed = conn.execute(
                    r#"
                    INSERT OR IGNORE INTO glossary_terms (
                        term, translation, source_language, target_language,
                        definition, domain, created_by, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                    params![
                        record.term,
                        record.translation,
                        record.source_language,
                        record.target_language,
                        record.definition,
                        record.domain,
                        record.created_by,
                        record.created_at,
                    ],
                )?;
                Ok(changed > 0)
            })
            .await
    }

    /// List terms for a language pair, most recent first
    pub async fn list_glossary_terms(
        &self,
        source_language: &str,
        target_language: &str,
        limit: usize,
    ) -> Result<Vec<GlossaryTermRecord>> {
        let source_language = source_language.to_string();
        let target_language = target_language.to_string();
        let limit = to_sql_count(limit)?;

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, term, translation, source_language, target_language,
                           definition, domain, created_by, created_at
                    FROM glossary_terms
                    WHERE source_language = ?1 AND target_language = ?2
                    ORDER BY id DESC
                    LIMIT ?3
                    "#,
                )?;
                let terms: Vec<GlossaryTermRecord> = stmt
                    .query_map(params![source_language, target_language, limit], |row| {
                        Ok(GlossaryTermRecord {
                            id: row.get(0)?,
                            term: row.get(1)?,
                            translation: row.get(2)?,
                            source_language: row.get(3)?,
                            target_language: row.get(4)?,
                            definition: row.get(5)?,
                            domain: row.get(6)?,
                            created_by: row.get(7)?,
                            created_at: row.get(8)?,
                        })
                    })?
                    .filter_map(|r| r.ok())
                    .collect();
                Ok(terms)
            })
            .await
    }

    // =========================================================================
    // Notification Operations
    // =========================================================================

    /// Store a notification for a user
    pub async fn insert_notification(
        &self,
        user_id: &str,
        kind: NotificationKind,
        title: &str,
        message: &str,
        link: Option<&str>,
    ) -> Result<i64> {
        let user_id = user_id.to_string();
        let title = title.to_string();
        let message = message.to_string();
        let link = link.map(str::to_string);
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO notifications (user_id, kind, title, message, link, is_read, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
                    "#,
                    params![user_id, kind.to_string(), title, message, link, now],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    /// List a user's notifications, newest first
    pub async fn list_notifications(&self, user_id: &str, limit: usize) -> Result<Vec<NotificationRecord>> {
        let user_id = user_id.to_string();
        let limit = to_sql_count(limit)?;

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, user_id, kind, title, message, link, is_read, created_at
                    FROM notifications
                    WHERE user_id = ?1
                    ORDER BY id DESC
                    LIMIT ?2
                    "#,
                )?;
                let notifications: Vec<NotificationRecord> = stmt
                    .query_map(params![user_id, limit], parse_notification_row)?
                    .filter_map(|r| r.ok())
                    .collect();
                Ok(notifications)
            })
            .await
    }

    /// Mark every notification of a user as read
    pub async fn mark_notifications_read(&self, user_id: &str) -> Result<usize> {
        let user_id = user_id.to_string();

        self.db
            .execute_async(move |conn| {
                let changed = conn.execute(
                    "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
                    [&user_id],
                )?;
                Ok(changed)
            })
            .await
    }
}
