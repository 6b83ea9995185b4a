/*!
 * Prompt templates for segment translation and glossary generation.
 *
 * Batch prompts carry their payload as a JSON array in the user message so the
 * answer can be correlated by array position only.
 */

use crate::language_utils;

/// System prompt template with `{placeholder}` variables.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// Single segment translation.
    pub const SEGMENT_TRANSLATOR: &'static str = r#"You are a professional translator working from {source_language} into {target_language}.{domain_hint}

- Preserve meaning, tone, formatting, line breaks and placeholders
- Keep numbers, URLs and product names unchanged
- Respond with the translated text only, without quotes, notes or explanations"#;

    /// Batch translation over a JSON array of segments.
    pub const BATCH_TRANSLATOR: &'static str = r#"You are a professional translator working from {source_language} into {target_language}.{domain_hint}

The user message is a JSON array of {count} source segments.
- Translate every segment independently, preserving formatting and placeholders
- Respond with ONLY a JSON array of exactly {count} strings
- Item N of your array must be the translation of item N of the input
- Never merge, split, skip or reorder segments"#;

    /// Glossary term generation.
    pub const GLOSSARY_GENERATOR: &'static str = r#"You are a terminologist building a bilingual glossary from {source_language} to {target_language}.{domain_hint}

Propose {count} useful terms that a translator would need to keep consistent.
Respond with ONLY a JSON array of objects with the fields:
  "term": the {source_language} term
  "translation": its {target_language} equivalent
  "definition": a one-sentence definition in {source_language}
Do not propose any of the terms listed in the user message."#;

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Render the template with the given variables.
    pub fn render(&self, vars: &PromptVars) -> String {
        let domain_hint = match vars.domain.as_deref().map(str::trim) {
            Some(domain) if !domain.is_empty() => format!(" The subject domain is {}.", domain),
            _ => String::new(),
        };

        self.template
            .replace("{source_language}", &language_utils::display_name(&vars.source_language))
            .replace("{target_language}", &language_utils::display_name(&vars.target_language))
            .replace("{count}", &vars.count.to_string())
            .replace("{domain_hint}", &domain_hint)
    }
}

/// Variables substituted into a [`PromptTemplate`].
#[derive(Debug, Clone, Default)]
pub struct PromptVars {
    pub source_language: String,
    pub target_language: String,
    pub count: usize,
    pub domain: Option<String>,
}

impl PromptVars {
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            ..Default::default()
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_domain(mut self, domain: Option<&str>) -> Self {
        self.domain = domain.map(str::to_string);
        self
    }
}

/// Build the user message of a batch call: the segments as a JSON array.
pub fn batch_payload(texts: &[String]) -> String {
    serde_json::to_string(texts).unwrap_or_else(|_| "[]".to_string())
}

/// Build the user message of a glossary call listing terms to avoid.
pub fn glossary_payload(existing_terms: &[String]) -> String {
    if existing_terms.is_empty() {
        "Existing terms: none".to_string()
    } else {
        format!("Existing terms: {}", existing_terms.join(", "))
    }
}
