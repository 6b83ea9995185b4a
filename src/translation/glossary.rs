/*!
 * Glossary term generation capability.
 *
 * The provider is asked for a JSON array of `{term, translation, definition}`
 * objects. Entries missing a term or a translation are dropped; an answer that
 * is not an array at all is a malformed response.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::TranslationError;
use super::batch::{extract_json_array, preview};

/// Parameters of one generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GlossaryRequest {
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Number of terms wanted
    pub count: usize,
    /// Optional subject-matter hint
    pub domain: Option<String>,
    /// Terms that already exist and should not be proposed again
    pub existing_terms: Vec<String>,
}

impl GlossaryRequest {
    pub fn new(source_language: &str, target_language: &str, count: usize) -> Self {
        Self {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            count,
            domain: None,
            existing_terms: Vec::new(),
        }
    }

    pub fn with_domain(mut self, domain: Option<String>) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_existing_terms(mut self, existing_terms: Vec<String>) -> Self {
        self.existing_terms = existing_terms;
        self
    }
}

/// A term proposed by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedTerm {
    pub term: String,
    pub translation: String,
    #[serde(default)]
    pub definition: Option<String>,
}

/// Capability producing candidate glossary terms
#[async_trait]
pub trait GlossaryGenerator: Send + Sync {
    /// Ask for up to `request.count` candidate terms
    async fn generate_terms(&self, request: &GlossaryRequest) -> Result<Vec<GeneratedTerm>, TranslationError>;
}

/// Parse a glossary generation answer.
pub fn parse_glossary_response(text: &str) -> Result<Vec<GeneratedTerm>, TranslationError> {
    let array = extract_json_array(text).ok_or_else(|| {
        TranslationError::MalformedResponse(format!("expected a JSON array of terms, got: {}", preview(text)))
    })?;

    let values: Vec<serde_json::Value> = serde_json::from_str(array)
        .map_err(|e| TranslationError::MalformedResponse(format!("invalid JSON array: {}", e)))?;

    let terms = values
        .into_iter()
        .filter_map(|value| serde_json::from_value::<GeneratedTerm>(value).ok())
        .map(|term| GeneratedTerm {
            term: term.term.trim().to_string(),
            translation: term.translation.trim().to_string(),
            definition: term
                .definition
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        })
        .filter(|term| !term.term.is_empty() && !term.translation.is_empty())
        .collect();

    Ok(terms)
}
