/*!
 * Error types for the linguabatch application.
 *
 * This module contains custom error types for the provider clients, the
 * translation capability and the job trigger interface, using the thiserror
 * crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::RateLimitExceeded(_) | ProviderError::ConnectionError(_) => true,
            ProviderError::RequestFailed(_) => true,
            ProviderError::ApiError { status_code, .. } => *status_code >= 500,
            ProviderError::ParseError(_) | ProviderError::AuthenticationError(_) => false,
        }
    }

    /// Map a non-success HTTP status and body to the matching error variant
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            429 => ProviderError::RateLimitExceeded(message),
            401 | 403 => ProviderError::AuthenticationError(message),
            _ => ProviderError::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            ProviderError::ConnectionError(error.to_string())
        } else if error.is_decode() {
            ProviderError::ParseError(error.to_string())
        } else {
            ProviderError::RequestFailed(error.to_string())
        }
    }
}

/// Errors surfaced by the translation and glossary generation capabilities
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The provider throttled us and retries were exhausted
    #[error("Rate limited by provider: {0}")]
    RateLimited(String),

    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(ProviderError),

    /// No usable provider credentials or settings
    #[error("Translation is not configured: {0}")]
    Config(String),

    /// Batch response item count differs from the request
    #[error("Batch response has {actual} items, expected {expected}")]
    BatchLengthMismatch {
        /// Number of texts sent
        expected: usize,
        /// Number of texts received
        actual: usize,
    },

    /// Provider answered with something that is not the requested shape
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl TranslationError {
    /// Whether the capability should retry the call
    pub fn is_transient(&self) -> bool {
        match self {
            TranslationError::RateLimited(_) => true,
            TranslationError::Provider(e) => e.is_transient(),
            TranslationError::Config(_)
            | TranslationError::BatchLengthMismatch { .. }
            | TranslationError::MalformedResponse(_) => false,
        }
    }
}

impl From<ProviderError> for TranslationError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::RateLimitExceeded(message) => TranslationError::RateLimited(message),
            other => TranslationError::Provider(other),
        }
    }
}

/// Errors returned by the job trigger and stop interface
#[derive(Error, Debug)]
pub enum JobError {
    /// The referenced file or job does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A runner is already active for the same scope
    #[error("A job is already running for {0}")]
    AlreadyRunning(String),

    /// Neither the request, the file nor the config names a target language
    #[error("No target language configured for file {0}")]
    NoTargetLanguage(String),

    /// The request parameters are unusable
    #[error("Invalid job request: {0}")]
    InvalidRequest(String),

    /// Persistence failure while setting up the job
    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from the job layer
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
