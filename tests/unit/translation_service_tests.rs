/*!
 * Tests for the translation capability backed by the mock provider
 */

use std::sync::Arc;
use std::time::Duration;
use linguabatch::app_config::TranslationCommonConfig;
use linguabatch::errors::TranslationError;
use linguabatch::providers::mock::{MockProvider, MOCK_PREFIX};
use linguabatch::providers::CompletionRequest;
use linguabatch::translation::{GlossaryGenerator, GlossaryRequest, RetryPolicy, TranslationService, Translator};

/// Service around a shared mock, retrying up to three times without waiting
fn service_with(provider: &MockProvider) -> TranslationService {
    TranslationService::with_provider(Arc::new(provider.clone()), &TranslationCommonConfig::default(), "en")
        .with_retry_policy(RetryPolicy::new(3, Duration::ZERO))
}

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_translate_batch_withWorkingProvider_shouldKeepOrderAndLength() {
    let provider = MockProvider::working();
    let service = service_with(&provider);

    let result = service.translate_batch(&texts(&["one", "two", "three"]), "fr").await.unwrap();

    assert_eq!(result, vec![
        format!("{}one", MOCK_PREFIX),
        format!("{}two", MOCK_PREFIX),
        format!("{}three", MOCK_PREFIX),
    ]);
    assert_eq!(provider.call_count(), 1);
    assert_eq!(service.usage().requests, 1);
}

#[tokio::test]
async fn test_translate_batch_withShortAnswer_shouldFailWithLengthMismatch() {
    let provider = MockProvider::wrong_batch_length();
    let service = service_with(&provider);

    let result = service.translate_batch(&texts(&["a", "b", "c"]), "de").await;

    assert!(matches!(result, Err(TranslationError::BatchLengthMismatch { expected: 3, actual: 2 })));
    // A length mismatch is permanent, the call is not repeated
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_translate_one_withThrottling_shouldRetryThenSucceed() {
    let provider = MockProvider::rate_limited(2);
    let service = service_with(&provider);

    let result = service.translate_one("Good morning", "es").await.unwrap();

    assert_eq!(result, format!("{}Good morning", MOCK_PREFIX));
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn test_translate_one_withPersistentThrottling_shouldReturnRateLimited() {
    let provider = MockProvider::rate_limited(10);
    let service = service_with(&provider);

    let result = service.translate_one("Good morning", "es").await;

    assert!(matches!(result, Err(TranslationError::RateLimited(_))));
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn test_translate_one_withUnauthorizedProvider_shouldNotRetry() {
    let provider = MockProvider::unauthorized();
    let service = service_with(&provider);

    let result = service.translate_one("Hello", "it").await;

    assert!(matches!(result, Err(TranslationError::Provider(_))));
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_translate_one_withEmptyAnswer_shouldBeMalformed() {
    let provider = MockProvider::empty();
    let service = service_with(&provider);

    let result = service.translate_one("Hello", "it").await;
    assert!(matches!(result, Err(TranslationError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_translate_one_withBlankText_shouldSkipProvider() {
    let provider = MockProvider::working();
    let service = service_with(&provider);

    assert_eq!(service.translate_one("   ", "fr").await.unwrap(), "   ");
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_translate_batch_withIntermittentFailures_shouldRecover() {
    let provider = MockProvider::intermittent(2);
    let service = service_with(&provider);

    // Second call fails with a 503 and is retried
    service.translate_batch(&texts(&["a"]), "fr").await.unwrap();
    let second = service.translate_batch(&texts(&["b"]), "fr").await.unwrap();

    assert_eq!(second, vec![format!("{}b", MOCK_PREFIX)]);
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn test_batch_prompt_shouldCarryTargetLanguageAndJsonPayload() {
    let provider = MockProvider::working();
    let service = service_with(&provider);

    service.translate_batch(&texts(&["Hello", "World"]), "fr").await.unwrap();

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].system.contains("French"));
    let payload: Vec<String> = serde_json::from_str(&requests[0].prompt).unwrap();
    assert_eq!(payload, texts(&["Hello", "World"]));
}

fn glossary_answer(_request: &CompletionRequest) -> String {
    r#"[
        {"term": "invoice", "translation": "facture", "definition": "A bill for goods."},
        {"term": "ledger", "translation": "grand livre"},
        {"term": "refund", "translation": "remboursement"}
    ]"#
    .to_string()
}

#[tokio::test]
async fn test_generate_terms_shouldParseAndTruncateToCount() {
    let provider = MockProvider::working().with_custom_response(glossary_answer);
    let service = service_with(&provider);

    let request = GlossaryRequest::new("en", "fr", 2)
        .with_domain(Some("accounting".to_string()))
        .with_existing_terms(texts(&["balance"]));
    let terms = service.generate_terms(&request).await.unwrap();

    assert_eq!(terms.len(), 2);
    assert_eq!(terms[0].term, "invoice");
    assert_eq!(terms[0].definition.as_deref(), Some("A bill for goods."));
    assert_eq!(terms[1].translation, "grand livre");

    let sent = &provider.requests()[0];
    assert!(sent.system.contains("accounting"));
    assert!(sent.prompt.contains("balance"));
}

#[tokio::test]
async fn test_generate_terms_withZeroCount_shouldSkipProvider() {
    let provider = MockProvider::working();
    let service = service_with(&provider);

    let terms = service.generate_terms(&GlossaryRequest::new("en", "fr", 0)).await.unwrap();
    assert!(terms.is_empty());
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_test_connection_shouldReflectProviderState() {
    assert!(service_with(&MockProvider::working()).test_connection().await.is_ok());
    assert!(service_with(&MockProvider::failing()).test_connection().await.is_err());
}
