/*!
 * # linguabatch
 *
 * Cancellable background jobs for bulk AI translation of segmented files and
 * bulk glossary-term generation.
 *
 * ## Features
 *
 * - Translate every remaining segment of a file in fixed-size batches
 * - Fall back from batch to single-segment calls when a batch fails
 * - Never overwrite a confirmed segment
 * - Checkpoint progress in SQLite so a job can be inspected or stopped mid-flight
 * - Generate novel glossary terms for a language pair
 * - Notify the initiating user of start, stop, success and failure
 * - Translate using various AI providers:
 *   - Ollama (local LLM)
 *   - OpenAI API and LM Studio
 *   - Anthropic API
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `translation`: the translate-one / translate-batch capability and glossary generation:
 *   - `translation::core`: `Translator` and `TranslationService`
 *   - `translation::batch`: Batch response parsing
 *   - `translation::retry`: Retry policy for transient provider errors
 * - `database`: SQLite persistence of files, units, jobs, glossary terms and notifications
 * - `jobs`: Job store contracts, the two runners and the `JobManager`
 * - `notifications`: Notification sinks
 * - `file_utils`: File system operations and plain-text segmenting
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `providers`: Client implementations for various LLM providers
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod database;
pub mod errors;
pub mod file_utils;
pub mod jobs;
pub mod language_utils;
pub mod notifications;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, JobError, ProviderError, TranslationError};
pub use jobs::{JobManager, RunSummary};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use translation::{TranslationService, Translator};
