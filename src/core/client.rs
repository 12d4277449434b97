//! Chat completion client with retry logic

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};

/// A single chat completion call, no retries
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send `system_prompt` and `content` as a two-message conversation and
    /// return the first choice's text
    async fn complete(&self, system_prompt: &str, content: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible HTTP backend
#[derive(Debug, Clone)]
pub struct HttpChatBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpChatBackend {
    /// Create a backend from configuration
    pub fn new(config: &TranslatorConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(config.max_concurrent.max(1));

        if config.timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(config.timeout_ms));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.api_endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn complete(&self, system_prompt: &str, content: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: system_prompt,
                },
                Message {
                    role: "user",
                    content,
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| TranslationError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranslationError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| TranslationError::InvalidResponseError {
                    message: e.to_string(),
                })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| TranslationError::InvalidResponseError {
                message: "No choices in response".to_string(),
            })?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

/// Translator that retries failed calls with linear backoff
#[derive(Clone)]
pub struct AsyncTranslator {
    backend: Arc<dyn ChatBackend>,
    max_retries: u32,
    retry_delay: Duration,
}

impl std::fmt::Debug for AsyncTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncTranslator")
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

impl AsyncTranslator {
    /// Create a translator talking HTTP to the configured endpoint
    pub fn new(config: &TranslatorConfig) -> Result<Self> {
        let backend = HttpChatBackend::new(config)?;
        Ok(Self::with_backend(
            Arc::new(backend),
            config.max_retries,
            Duration::from_millis(config.retry_delay_ms),
        ))
    }

    /// Create a translator over any backend
    pub fn with_backend(backend: Arc<dyn ChatBackend>, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            backend,
            max_retries,
            retry_delay,
        }
    }

    /// Retries after the first attempt
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry number `attempt + 1` (0-indexed failed attempt)
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.retry_delay * (attempt + 1)
    }

    /// Translate `content` using `system_prompt`.
    ///
    /// Makes at most `max_retries + 1` calls. Any failure is retried after
    /// `retry_delay * (attempt + 1)`; once retries run out the last error
    /// message is returned as [`TranslationError::RetriesExhausted`].
    pub async fn translate_with_retry(&self, content: &str, system_prompt: &str) -> Result<String> {
        let mut attempt = 0;

        loop {
            match self.backend.complete(system_prompt, content).await {
                Ok(text) => {
                    if attempt > 0 {
                        info!("Successfully translated after {} retries", attempt);
                    }
                    return Ok(text);
                }
                Err(e) if attempt < self.max_retries => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        "Attempt {}/{} failed ({}), retrying in {:?}",
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                    debug!("Retry attempt {}", attempt);
                }
                Err(e) => {
                    warn!("All {} attempts failed. Last error: {}", attempt + 1, e);
                    return Err(TranslationError::RetriesExhausted {
                        attempts: attempt + 1,
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use std::sync::atomic::{AtomicU32, Ordering};
    use wiremock::{
        matchers::{header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    /// Fails the first `failures` calls, then echoes the content
    struct FlakyBackend {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl ChatBackend for FlakyBackend {
        async fn complete(&self, _system_prompt: &str, content: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(TranslationError::NetworkError {
                    message: format!("connection reset #{}", call),
                })
            } else {
                Ok(content.to_string())
            }
        }
    }

    fn flaky(failures: u32) -> Arc<FlakyBackend> {
        Arc::new(FlakyBackend {
            failures,
            calls: AtomicU32::new(0),
        })
    }

    fn test_config(server: &MockServer) -> TranslatorConfig {
        TranslatorConfig {
            api_key: "test-key".to_string(),
            api_endpoint: format!("{}/chat/completions", server.uri()),
            max_retries: 2,
            retry_delay_ms: 1,
            ..Default::default()
        }
    }

    fn completion(content: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        })
    }

    #[tokio::test]
    async fn test_succeeds_after_max_retries_failures() {
        let backend = flaky(3);
        let translator = AsyncTranslator::with_backend(backend.clone(), 3, Duration::from_millis(1));

        let result = translator.translate_with_retry("hello", "prompt").await;

        assert_eq!(result.unwrap(), "hello");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_always_failing_stops_after_max_retries() {
        let backend = flaky(u32::MAX);
        let translator = AsyncTranslator::with_backend(backend.clone(), 2, Duration::from_millis(1));

        let err = translator.translate_with_retry("hello", "prompt").await.unwrap_err();

        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        match err {
            TranslationError::RetriesExhausted { attempts, message } => {
                assert_eq!(attempts, 3);
                assert!(message.contains("connection reset #2"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_zero_retries_makes_one_call() {
        let backend = flaky(1);
        let translator = AsyncTranslator::with_backend(backend.clone(), 0, Duration::from_millis(1));

        assert!(translator.translate_with_retry("x", "p").await.is_err());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_linear_backoff() {
        let translator = AsyncTranslator::with_backend(flaky(0), 3, Duration::from_millis(1000));

        assert_eq!(translator.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(translator.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(translator.delay_for_attempt(2), Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_http_backend_request_shape() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Hello".into())))
            .expect(1)
            .mount(&server)
            .await;

        let backend = HttpChatBackend::new(&test_config(&server)).unwrap();
        let text = backend.complete("be a translator", "你好").await.unwrap();
        assert_eq!(text, "Hello");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_json_eq!(
            body,
            serde_json::json!({
                "model": "deepseek-chat",
                "messages": [
                    { "role": "system", "content": "be a translator" },
                    { "role": "user", "content": "你好" }
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_http_backend_null_content_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(serde_json::Value::Null)))
            .mount(&server)
            .await;

        let backend = HttpChatBackend::new(&test_config(&server)).unwrap();
        assert_eq!(backend.complete("p", "c").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_http_backend_no_choices_is_invalid() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
            .mount(&server)
            .await;

        let backend = HttpChatBackend::new(&test_config(&server)).unwrap();
        let err = backend.complete("p", "c").await.unwrap_err();
        assert!(matches!(err, TranslationError::InvalidResponseError { .. }));
    }

    #[tokio::test]
    async fn test_retries_server_errors_then_succeeds() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .up_to_n_times(2)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("done".into())))
            .mount(&server)
            .await;

        let translator = AsyncTranslator::new(&test_config(&server)).unwrap();
        let text = translator.translate_with_retry("内容", "prompt").await.unwrap();

        assert_eq!(text, "done");
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_auth_failure_is_reported_after_retries() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let translator = AsyncTranslator::new(&test_config(&server)).unwrap();
        let err = translator.translate_with_retry("内容", "prompt").await.unwrap_err();

        assert!(err.to_string().contains("invalid api key"));
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }
}
