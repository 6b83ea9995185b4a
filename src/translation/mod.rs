/*!
 * Translation capability on top of the AI providers.
 *
 * It is split into several submodules:
 *
 * - `core`: the `Translator` capability and `TranslationService`
 * - `batch`: batch answer parsing and length validation
 * - `glossary`: the `GlossaryGenerator` capability
 * - `prompts`: prompt templates and payload builders
 * - `retry`: linear-backoff retry policy for transient failures
 */

// Re-export main types for easier usage
pub use self::core::{TokenUsageStats, TranslationService, Translator};
pub use self::glossary::{GeneratedTerm, GlossaryGenerator, GlossaryRequest};
pub use self::retry::RetryPolicy;

// Submodules
pub mod batch;
pub mod core;
pub mod glossary;
pub mod prompts;
pub mod retry;
