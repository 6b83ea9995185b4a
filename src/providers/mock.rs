/*!
 * Mock provider implementation for testing.
 *
 * `MockProvider` answers completion requests without any network access:
 * - `MockProvider::working()` - echoes every text with a `[TRANSLATED]` prefix,
 *   keeping JSON array prompts as JSON arrays of the same length
 * - `MockProvider::wrong_batch_length()` - drops the last item of array answers
 * - `MockProvider::rate_limited(n)` - answers 429 for the first `n` calls
 * - `MockProvider::failing()` - always fails with a server error
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, CompletionResponse, Provider};

/// Prefix added by the working mock to every translated text
pub const MOCK_PREFIX: &str = "[TRANSLATED] ";

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Array answers are one item short
    WrongBatchLength,
    /// The first `failures` calls are throttled, later calls work
    RateLimited { failures: usize },
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with a server error
    Failing,
    /// Always fails with an authentication error
    Unauthorized,
    /// Returns empty response
    Empty,
    /// Simulates slow response
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Every request received, shared between clones
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&CompletionRequest) -> String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn wrong_batch_length() -> Self {
        Self::new(MockBehavior::WrongBatchLength)
    }

    pub fn rate_limited(failures: usize) -> Self {
        Self::new(MockBehavior::RateLimited { failures })
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn unauthorized() -> Self {
        Self::new(MockBehavior::Unauthorized)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Set a custom response generator used on successful calls
    pub fn with_custom_response(mut self, generator: fn(&CompletionRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Snapshot of the requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    /// Translate the prompt the way the working mock does
    pub fn translate_prompt(prompt: &str, drop_last: bool) -> String {
        match serde_json::from_str::<Vec<String>>(prompt) {
            Ok(mut items) => {
                if drop_last {
                    items.pop();
                }
                let translated: Vec<String> = items
                    .iter()
                    .map(|item| format!("{}{}", MOCK_PREFIX, item))
                    .collect();
                serde_json::to_string(&translated).unwrap_or_default()
            }
            Err(_) => format!("{}{}", MOCK_PREFIX, prompt),
        }
    }

    fn success(&self, request: &CompletionRequest, drop_last: bool) -> CompletionResponse {
        let text = match self.custom_response {
            Some(generator) => generator(request),
            None => Self::translate_prompt(&request.prompt, drop_last),
        };
        CompletionResponse {
            prompt_tokens: Some(request.prompt.len() as u64),
            completion_tokens: Some(text.len() as u64),
            text,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        match self.behavior {
            MockBehavior::Working => Ok(self.success(&request, false)),

            MockBehavior::WrongBatchLength => Ok(self.success(&request, true)),

            MockBehavior::RateLimited { failures } => {
                if count < failures {
                    Err(ProviderError::RateLimitExceeded(format!(
                        "Simulated throttling (request #{})",
                        count + 1
                    )))
                } else {
                    Ok(self.success(&request, false))
                }
            }

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.success(&request, false))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Unauthorized => Err(ProviderError::AuthenticationError(
                "Simulated invalid API key".to_string(),
            )),

            MockBehavior::Empty => Ok(CompletionResponse::default()),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                Ok(self.success(&request, false))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing | MockBehavior::Unauthorized => {
                Err(ProviderError::ConnectionError("Mock provider is offline".to_string()))
            }
            _ => Ok(()),
        }
    }
}
