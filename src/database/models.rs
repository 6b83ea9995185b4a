/*!
 * Database entity models and DTOs.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data. Status enums are stored as their
 * snake_case `Display` form.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Workflow status of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Freshly imported, nothing translated yet
    Draft,
    /// Translation work has started
    InProgress,
    /// Waiting for review
    Review,
    /// Finished
    Completed,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Draft => write!(f, "draft"),
            FileStatus::InProgress => write!(f, "in_progress"),
            FileStatus::Review => write!(f, "review"),
            FileStatus::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for FileStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(FileStatus::Draft),
            "in_progress" => Ok(FileStatus::InProgress),
            "review" => Ok(FileStatus::Review),
            "completed" => Ok(FileStatus::Completed),
            _ => Err(anyhow::anyhow!("Invalid file status: {}", s)),
        }
    }
}

/// Status of a translation unit
///
/// Only DRAFT -> TRANSLATED -> CONFIRMED or DRAFT -> CONFIRMED are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    /// Awaiting translation
    Draft,
    /// Translated, not yet confirmed by a person
    Translated,
    /// Confirmed by a person; never overwritten by a job
    Confirmed,
}

impl UnitStatus {
    /// Whether moving to `next` is an allowed transition
    pub fn can_transition_to(self, next: UnitStatus) -> bool {
        matches!(
            (self, next),
            (UnitStatus::Draft, UnitStatus::Translated)
                | (UnitStatus::Draft, UnitStatus::Confirmed)
                | (UnitStatus::Translated, UnitStatus::Confirmed)
                | (UnitStatus::Translated, UnitStatus::Translated)
        )
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitStatus::Draft => write!(f, "draft"),
            UnitStatus::Translated => write!(f, "translated"),
            UnitStatus::Confirmed => write!(f, "confirmed"),
        }
    }
}

impl std::str::FromStr for UnitStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(UnitStatus::Draft),
            "translated" => Ok(UnitStatus::Translated),
            "confirmed" => Ok(UnitStatus::Confirmed),
            _ => Err(anyhow::anyhow!("Invalid unit status: {}", s)),
        }
    }
}

/// Batch job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, runner not started yet
    Pending,
    /// Runner is working
    Processing,
    /// All work done
    Completed,
    /// Aborted by an unexpected error
    Failed,
    /// Cancelled on request
    Stopped,
}

impl JobStatus {
    /// Terminal states accept no further writes
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Stopped)
    }

    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Stopped => write!(f, "stopped"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "stopped" => Ok(JobStatus::Stopped),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// Kind of background job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Translate the remaining units of one file
    FileTranslation,
    /// Generate new glossary terms for a language pair
    GlossaryGeneration,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::FileTranslation => write!(f, "file_translation"),
            JobKind::GlossaryGeneration => write!(f, "glossary_generation"),
        }
    }
}

impl std::str::FromStr for JobKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file_translation" => Ok(JobKind::FileTranslation),
            "glossary_generation" => Ok(JobKind::GlossaryGeneration),
            _ => Err(anyhow::anyhow!("Invalid job kind: {}", s)),
        }
    }
}

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Info => write!(f, "info"),
            NotificationKind::Success => write!(f, "success"),
            NotificationKind::Warning => write!(f, "warning"),
            NotificationKind::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(NotificationKind::Info),
            "success" => Ok(NotificationKind::Success),
            "warning" => Ok(NotificationKind::Warning),
            "error" => Ok(NotificationKind::Error),
            _ => Err(anyhow::anyhow!("Invalid notification kind: {}", s)),
        }
    }
}

/// File record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Unique file identifier (UUID)
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Source language code
    pub source_language: String,
    /// Configured target languages; the first one is the default
    pub target_languages: Vec<String>,
    /// Workflow status
    pub status: FileStatus,
    /// Whether a translation runner is active on this file
    pub is_translating: bool,
    /// Creation timestamp (ISO 8601)
    pub created_at: String,
    /// Last update timestamp (ISO 8601)
    pub updated_at: String,
}

impl FileRecord {
    /// Create a new draft file record
    pub fn new(user_id: String, name: String, source_language: String, target_languages: Vec<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            name,
            source_language,
            target_languages,
            status: FileStatus::Draft,
            is_translating: false,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// First configured target language, if any
    pub fn default_target_language(&self) -> Option<&str> {
        self.target_languages.first().map(String::as_str)
    }
}

/// Translation unit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitRecord {
    /// Database ID
    pub id: i64,
    /// File this unit belongs to
    pub file_id: String,
    /// Position within the file
    pub seq_num: i64,
    /// Source text, immutable
    pub source_text: String,
    /// Target text, empty until translated
    pub target_text: String,
    /// Target language code
    pub target_language: String,
    /// Unit status
    pub status: UnitStatus,
    /// Last AI suggestion
    pub ai_suggestion: Option<String>,
    /// Last update timestamp
    pub updated_at: String,
}

impl UnitRecord {
    /// Create a new draft unit (without database ID)
    pub fn new(file_id: String, seq_num: i64, source_text: String, target_language: String) -> Self {
        Self {
            id: 0, // Will be assigned by database
            file_id,
            seq_num,
            source_text,
            target_text: String::new(),
            target_language,
            status: UnitStatus::Draft,
            ai_suggestion: None,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == UnitStatus::Confirmed
    }
}

/// What a job operates on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobScope {
    /// Units of one file in one target language
    File { file_id: String, target_language: String },
    /// New glossary terms for a language pair
    LanguagePair {
        source_language: String,
        target_language: String,
        domain: Option<String>,
    },
}

impl JobScope {
    pub fn kind(&self) -> JobKind {
        match self {
            JobScope::File { .. } => JobKind::FileTranslation,
            JobScope::LanguagePair { .. } => JobKind::GlossaryGeneration,
        }
    }

    pub fn target_language(&self) -> &str {
        match self {
            JobScope::File { target_language, .. } | JobScope::LanguagePair { target_language, .. } => {
                target_language
            }
        }
    }

    pub fn file_id(&self) -> Option<&str> {
        match self {
            JobScope::File { file_id, .. } => Some(file_id),
            JobScope::LanguagePair { .. } => None,
        }
    }
}

impl fmt::Display for JobScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobScope::File { file_id, target_language } => write!(f, "file {} -> {}", file_id, target_language),
            JobScope::LanguagePair {
                source_language,
                target_language,
                ..
            } => write!(f, "glossary {} -> {}", source_language, target_language),
        }
    }
}

/// Batch job record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique job identifier (UUID)
    pub id: String,
    /// User who started the job
    pub user_id: String,
    /// What the job operates on
    pub scope: JobScope,
    /// Current status
    pub status: JobStatus,
    /// Items attempted so far
    pub progress: i64,
    /// Items requested, `None` for "everything remaining"
    pub target_count: Option<i64>,
    /// Items actually written
    pub updated_count: i64,
    /// Error text for failed jobs
    pub error_detail: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl JobRecord {
    /// Create a new pending job record
    pub fn new(user_id: String, scope: JobScope, target_count: Option<i64>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            scope,
            status: JobStatus::Pending,
            progress: 0,
            target_count,
            updated_count: 0,
            error_detail: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn kind(&self) -> JobKind {
        self.scope.kind()
    }

    /// Calculate completion percentage, when the target is known
    pub fn completion_percentage(&self) -> Option<f64> {
        match self.target_count {
            Some(0) => Some(100.0),
            Some(total) => Some((self.progress as f64 / total as f64) * 100.0),
            None => None,
        }
    }
}

/// Glossary term record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlossaryTermRecord {
    /// Database ID
    pub id: i64,
    pub term: String,
    pub translation: String,
    pub source_language: String,
    pub target_language: String,
    pub definition: Option<String>,
    pub domain: Option<String>,
    /// User on whose behalf the term was created
    pub created_by: String,
    pub created_at: String,
}

impl GlossaryTermRecord {
    /// Create a new glossary term record (without database ID)
    pub fn new(
        term: String,
        translation: String,
        source_language: String,
        target_language: String,
        created_by: String,
    ) -> Self {
        Self {
            id: 0, // Will be assigned by database
            term,
            translation,
            source_language,
            target_language,
            definition: None,
            domain: None,
            created_by,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Stored notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Database ID
    pub id: i64,
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}
