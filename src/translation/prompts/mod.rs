/*!
 * Prompt engineering for segment translation and glossary generation.
 *
 * This module provides:
 * - System prompt templates for single, batch and glossary calls
 * - JSON payload builders for the user message
 */

pub mod templates;

// Re-export main types
pub use templates::{batch_payload, glossary_payload, PromptTemplate, PromptVars};
