/*!
 * Core translation service implementation.
 *
 * This module contains the `Translator` capability used by the batch runners
 * and `TranslationService`, its production implementation on top of the
 * configured AI provider. The service retries transient provider failures and
 * never touches persistence.
 */

use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::{TranslationCommonConfig, TranslationConfig, TranslationProvider};
use crate::errors::TranslationError;
use crate::providers::anthropic::Anthropic;
use crate::providers::ollama::Ollama;
use crate::providers::openai::OpenAI;
use crate::providers::{CompletionRequest, CompletionResponse, Provider};

use super::batch::{clean_single_response, parse_batch_response};
use super::glossary::{parse_glossary_response, GeneratedTerm, GlossaryGenerator, GlossaryRequest};
use super::prompts::{batch_payload, glossary_payload, PromptTemplate, PromptVars};
use super::retry::RetryPolicy;

/// Translate-one / translate-batch capability
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate a single text into `target_language`
    async fn translate_one(&self, text: &str, target_language: &str) -> Result<String, TranslationError>;

    /// Translate texts into `target_language`, preserving length and order
    async fn translate_batch(&self, texts: &[String], target_language: &str) -> Result<Vec<String>, TranslationError>;
}

/// Token usage statistics for tracking API consumption
#[derive(Debug, Clone)]
pub struct TokenUsageStats {
    /// Number of prompt tokens
    pub prompt_tokens: u64,

    /// Number of completion tokens
    pub completion_tokens: u64,

    /// Number of successful provider calls
    pub requests: u64,

    /// Total time spent on API requests
    pub api_duration: Duration,

    /// Provider name
    pub provider: String,

    /// Model name
    pub model: String,
}

impl TokenUsageStats {
    /// Create new token usage stats with provider info
    pub fn with_provider_info(provider: String, model: String) -> Self {
        Self {
            prompt_tokens: 0,
            completion_tokens: 0,
            requests: 0,
            api_duration: Duration::ZERO,
            provider,
            model,
        }
    }

    /// Add the usage reported by one provider call
    pub fn record(&mut self, response: &CompletionResponse, elapsed: Duration) {
        self.prompt_tokens += response.prompt_tokens.unwrap_or(0);
        self.completion_tokens += response.completion_tokens.unwrap_or(0);
        self.requests += 1;
        self.api_duration += elapsed;
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    /// Generate a summary of token usage
    pub fn summary(&self) -> String {
        format!(
            "Token Usage Summary:\n\
             Provider: {}\n\
             Model: {}\n\
             Requests: {}\n\
             Prompt tokens: {}\n\
             Completion tokens: {}\n\
             Total tokens: {}\n\
             API request time: {:.2} minutes",
            self.provider,
            self.model,
            self.requests,
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens(),
            self.api_duration.as_secs_f64() / 60.0
        )
    }
}

/// Translation service backed by one AI provider
pub struct TranslationService {
    /// Provider client, `None` when the configuration is unusable
    provider: Option<Arc<dyn Provider>>,

    /// Why no provider could be built
    config_error: Option<String>,

    /// Source language of every text sent
    source_language: String,

    /// Sampling temperature
    temperature: f32,

    /// Optional subject-matter hint
    domain: Option<String>,

    /// Retry policy applied around every provider call
    retry: RetryPolicy,

    /// Accumulated token usage
    usage: Mutex<TokenUsageStats>,
}

impl TranslationService {
    /// Create a new translation service with the given configuration.
    ///
    /// A provider that needs an API key and has none yields a service whose
    /// every call fails with `TranslationError::Config`.
    pub fn new(config: &TranslationConfig, source_language: &str) -> Self {
        let model = config.get_model();
        let endpoint = config.get_endpoint();
        let timeout = config.get_timeout();
        let api_key = config.get_api_key();

        let (provider, config_error): (Option<Arc<dyn Provider>>, Option<String>) =
            if config.provider.requires_api_key() && api_key.trim().is_empty() {
                (
                    None,
                    Some(format!("no API key configured for {}", config.provider.display_name())),
                )
            } else {
                let provider: Arc<dyn Provider> = match config.provider {
                    TranslationProvider::Ollama => Arc::new(Ollama::new(endpoint, model.clone(), timeout)),
                    TranslationProvider::OpenAI => Arc::new(OpenAI::new(api_key, endpoint, model.clone(), timeout)),
                    TranslationProvider::LMStudio => {
                        // LM Studio accepts any key
                        let api_key = if api_key.is_empty() { "lm-studio".to_string() } else { api_key };
                        Arc::new(OpenAI::new(api_key, endpoint, model.clone(), timeout).with_label("LM Studio"))
                    }
                    TranslationProvider::Anthropic => {
                        Arc::new(Anthropic::new(api_key, endpoint, model.clone(), timeout))
                    }
                };
                (Some(provider), None)
            };

        Self {
            provider,
            config_error,
            source_language: source_language.to_string(),
            temperature: config.common.temperature,
            domain: config.common.domain.clone(),
            retry: RetryPolicy::from_config(&config.common),
            usage: Mutex::new(TokenUsageStats::with_provider_info(
                config.provider.display_name().to_string(),
                model,
            )),
        }
    }

    /// Create a service around an already built provider
    pub fn with_provider(provider: Arc<dyn Provider>, common: &TranslationCommonConfig, source_language: &str) -> Self {
        let usage = TokenUsageStats::with_provider_info(provider.name().to_string(), String::new());
        Self {
            provider: Some(provider),
            config_error: None,
            source_language: source_language.to_string(),
            temperature: common.temperature,
            domain: common.domain.clone(),
            retry: RetryPolicy::from_config(common),
            usage: Mutex::new(usage),
        }
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Snapshot of the token usage so far
    pub fn usage(&self) -> TokenUsageStats {
        self.usage.lock().clone()
    }

    /// Test the connection to the translation provider
    pub async fn test_connection(&self) -> Result<(), TranslationError> {
        let provider = self.provider()?;
        provider.test_connection().await.map_err(TranslationError::from)
    }

    fn provider(&self) -> Result<&Arc<dyn Provider>, TranslationError> {
        self.provider.as_ref().ok_or_else(|| {
            TranslationError::Config(
                self.config_error
                    .clone()
                    .unwrap_or_else(|| "no translation provider configured".to_string()),
            )
        })
    }

    fn prompt_vars(&self, target_language: &str) -> PromptVars {
        PromptVars::new(&self.source_language, target_language).with_domain(self.domain.as_deref())
    }

    /// One provider call with retries, returning the raw answer text
    async fn complete_with_retry(&self, label: &str, request: CompletionRequest) -> Result<String, TranslationError> {
        let provider = self.provider()?;
        let response = self
            .retry
            .run(label, || {
                let request = request.clone();
                let provider = Arc::clone(provider);
                async move {
                    let start = Instant::now();
                    let response = provider.complete(request).await?;
                    Ok::<_, TranslationError>((response, start.elapsed()))
                }
            })
            .await?;

        let (response, elapsed) = response;
        self.usage.lock().record(&response, elapsed);
        Ok(response.text)
    }
}

#[async_trait]
impl Translator for TranslationService {
    async fn translate_one(&self, text: &str, target_language: &str) -> Result<String, TranslationError> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let system = PromptTemplate::new(PromptTemplate::SEGMENT_TRANSLATOR).render(&self.prompt_vars(target_language));
        let request = CompletionRequest::new(system, text).temperature(self.temperature);

        let answer = self.complete_with_retry("translate_one", request).await?;
        let translated = clean_single_response(&answer);
        if translated.is_empty() {
            return Err(TranslationError::MalformedResponse("empty translation".to_string()));
        }
        Ok(translated)
    }

    async fn translate_batch(&self, texts: &[String], target_language: &str) -> Result<Vec<String>, TranslationError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let system = PromptTemplate::new(PromptTemplate::BATCH_TRANSLATOR)
            .render(&self.prompt_vars(target_language).with_count(texts.len()));
        let request = CompletionRequest::new(system, batch_payload(texts)).temperature(self.temperature);

        debug!("Sending batch of {} segments to {}", texts.len(), target_language);
        let answer = self.complete_with_retry("translate_batch", request).await?;
        parse_batch_response(&answer, texts.len())
    }
}

#[async_trait]
impl GlossaryGenerator for TranslationService {
    async fn generate_terms(&self, request: &GlossaryRequest) -> Result<Vec<GeneratedTerm>, TranslationError> {
        if request.count == 0 {
            return Ok(Vec::new());
        }

        let domain = request.domain.as_deref().or(self.domain.as_deref());
        let vars = PromptVars::new(&request.source_language, &request.target_language)
            .with_count(request.count)
            .with_domain(domain);
        let system = PromptTemplate::new(PromptTemplate::GLOSSARY_GENERATOR).render(&vars);
        let completion = CompletionRequest::new(system, glossary_payload(&request.existing_terms))
            .temperature(self.temperature);

        let answer = self.complete_with_retry("generate_terms", completion).await?;
        let mut terms = parse_glossary_response(&answer)?;
        terms.truncate(request.count);
        Ok(terms)
    }
}
