/*!
 * Cancellable background batch jobs.
 *
 * - `store`: job record and content store contracts
 * - `runner`: settings and plumbing shared by the runners
 * - `file_translation`: translate the remaining units of a file
 * - `glossary_generation`: generate novel glossary terms for a language pair
 * - `manager`: trigger, stop and status interface
 */

pub mod file_translation;
pub mod glossary_generation;
pub mod manager;
pub mod runner;
pub mod store;

pub use file_translation::{FileTranslationJob, FileTranslationRunner};
pub use glossary_generation::{GlossaryGenerationJob, GlossaryGenerationRunner};
pub use manager::{GlossaryGenerationOptions, JobManager, StartedJob, TranslateFileOptions};
pub use runner::{RunSummary, RunnerSettings};
pub use store::{ContentStore, JobStore};
