//! Model-backed strategy: asks a chat-completion service for the chunks

use super::error::{ChunkingError, Result};
use super::strategy::ChunkStrategy;
use super::types::{ChunkRequest, ChunkResult};
use crate::llm::{CompletionBackend, Message, OpenAiClient, OpenAiConfig};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum number of attempts for one request (first try included)
pub const MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry
pub const INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Factor applied to the delay after every failed attempt
pub const BACKOFF_MULTIPLIER: u32 = 2;

/// Retry schedule for recoverable failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            initial_delay: INITIAL_DELAY,
            multiplier: BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the `attempt`-th (1-based) failed attempt
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor)
    }
}

/// Expected JSON shape of the model's answer
#[derive(Debug, Deserialize)]
struct ChunksPayload {
    chunks: Vec<String>,
}

/// Instruction sent as the system message for one request
pub fn system_prompt(chunk_qty: u32, chunk_size: u32) -> String {
    format!(
        r#"
The user will provide some text. Split the text provided by the user into chunks.
Requirements:
1. Split the text into {chunk_qty} chunks, each chunk no longer than {chunk_size} characters, with no empty chunks.
2. Do not add any analysis, return the chunking result directly.
3. Return the result as a JSON string, for example: {{"chunks":["hello","world"]}}
"#
    )
}

/// Validate the model's answer: a JSON object with at least one non-blank
/// string in `chunks`. Blank entries are dropped.
pub fn parse_chunks(content: &str) -> Result<Vec<String>> {
    let payload: ChunksPayload = serde_json::from_str(content).map_err(|e| {
        ChunkingError::validation(format!("response is not a chunks object: {e}"))
    })?;
    let chunks: Vec<String> = payload
        .chunks
        .into_iter()
        .filter(|c| !c.trim().is_empty())
        .collect();
    if chunks.is_empty() {
        return Err(ChunkingError::validation(
            "response does not contain 'chunks' or 'chunks' is empty",
        ));
    }
    Ok(chunks)
}

/// Delegates chunking to an OpenAI-compatible service.
///
/// Size and count are only requested, not enforced on the answer.
pub struct ModelBackedStrategy {
    config: Option<OpenAiConfig>,
    backend: Option<Arc<dyn CompletionBackend>>,
    retry: RetryPolicy,
}

impl ModelBackedStrategy {
    pub const NAME: &'static str = "openai";

    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            config: Some(config),
            backend: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Use an already built backend (initialize does nothing)
    pub fn with_backend(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            config: None,
            backend: Some(backend),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn backend(&self) -> Result<&dyn CompletionBackend> {
        self.backend
            .as_deref()
            .ok_or_else(|| ChunkingError::configuration("model backend is not initialized"))
    }

    async fn attempt(
        &self,
        backend: &dyn CompletionBackend,
        messages: Vec<Message>,
    ) -> Result<Vec<String>> {
        let content = backend.complete_json(messages).await?;
        debug!("model response: {}", content);
        parse_chunks(&content)
    }
}

#[async_trait]
impl ChunkStrategy for ModelBackedStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn initialize(&mut self) -> Result<()> {
        if self.backend.is_some() {
            return Ok(());
        }
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| ChunkingError::configuration("no model configuration"))?;
        let client = OpenAiClient::new(config)?;
        debug!("using model {} at {}", client.model(), config.api_base());
        self.backend = Some(Arc::new(client));
        Ok(())
    }

    async fn process(&self, request: &ChunkRequest) -> Result<ChunkResult> {
        request.validate()?;
        let backend = self.backend()?;
        let messages = vec![
            Message::system(system_prompt(request.chunk_qty, request.chunk_size)),
            Message::user(request.document.clone()),
        ];

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(backend, messages.clone()).await {
                Ok(chunks) => return ChunkResult::new(request, chunks),
                Err(e) if !e.is_recoverable() => return Err(e),
                Err(e) if attempt >= self.retry.max_attempts => {
                    warn!(
                        attempt = attempt,
                        category = e.category(),
                        "model chunking failed, giving up: {}",
                        e
                    );
                    return Err(ChunkingError::terminal(attempt, e));
                }
                Err(e) => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        attempt = attempt,
                        category = e.category(),
                        delay_ms = delay.as_millis() as u64,
                        "model chunking failed, will retry: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays scripted answers, then keeps answering `{"chunks": []}`
    struct ScriptedBackend {
        answers: Mutex<VecDeque<std::result::Result<String, LlmError>>>,
        calls: AtomicUsize,
        last_messages: Mutex<Vec<Message>>,
    }

    impl ScriptedBackend {
        fn new(answers: Vec<std::result::Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.into()),
                calls: AtomicUsize::new(0),
                last_messages: Mutex::new(vec![]),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete_json(
            &self,
            messages: Vec<Message>,
        ) -> std::result::Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_messages.lock().unwrap() = messages;
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(r#"{"chunks": []}"#.to_string()))
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(5),
            ..RetryPolicy::default()
        }
    }

    fn strategy(backend: Arc<ScriptedBackend>) -> ModelBackedStrategy {
        crate::util::tracing::tracing_init_test(tracing::Level::DEBUG);
        ModelBackedStrategy::with_backend(backend).with_retry_policy(fast_retry())
    }

    #[test]
    fn test_default_retry_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
    }

    #[test]
    fn test_parse_chunks() {
        assert_eq!(
            parse_chunks(r#"{"chunks":["hello","world"]}"#).unwrap(),
            vec!["hello".to_string(), "world".to_string()]
        );
        assert_eq!(
            parse_chunks(r#"{"chunks":["hello", "", "  "]}"#).unwrap(),
            vec!["hello".to_string()]
        );
        for bad in [
            r#"{"chunks": []}"#,
            r#"{"chunks": ["", " "]}"#,
            r#"{"pieces": ["a"]}"#,
            r#"{"chunks": null}"#,
            r#"{"chunks": "a"}"#,
            "not json at all",
        ] {
            assert!(
                matches!(parse_chunks(bad), Err(ChunkingError::Validation(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_system_prompt() {
        let prompt = system_prompt(4, 250);
        assert!(prompt.contains("into 4 chunks"));
        assert!(prompt.contains("no longer than 250 characters"));
        assert!(prompt.contains(r#"{"chunks":["hello","world"]}"#));
    }

    #[tokio::test]
    async fn test_process_success() {
        let backend = ScriptedBackend::new(vec![Ok(r#"{"chunks":["Hi.","Bye."]}"#.to_string())]);
        let strategy = strategy(backend.clone());

        let request = ChunkRequest::new("Hi. Bye.", 100, 2);
        let result = strategy.process(&request).await.unwrap();
        assert_eq!(result.chunks(), &["Hi.".to_string(), "Bye.".to_string()]);
        assert_eq!(backend.calls(), 1);

        let messages = backend.last_messages.lock().unwrap().clone();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], Message::system(system_prompt(2, 100)));
        assert_eq!(messages[1], Message::user("Hi. Bye."));
    }

    #[tokio::test]
    async fn test_empty_chunks_exhaust_retries() {
        let backend = ScriptedBackend::new(vec![]);
        let strategy = strategy(backend.clone());

        let started = tokio::time::Instant::now();
        let err = strategy
            .process(&ChunkRequest::new("Hi. Bye.", 100, 2))
            .await
            .unwrap_err();
        assert_eq!(backend.calls(), 3);
        // slept 5ms then 10ms between the three attempts
        assert!(started.elapsed() >= Duration::from_millis(15));
        match err {
            ChunkingError::Terminal { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, ChunkingError::Validation(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let backend = ScriptedBackend::new(vec![
            Err(LlmError::Api {
                status: 502,
                body: "bad gateway".to_string(),
            }),
            Ok("```json\n{}\n```".to_string()),
            Ok(r#"{"chunks":["done"]}"#.to_string()),
        ]);
        let strategy = strategy(backend.clone());

        let result = strategy
            .process(&ChunkRequest::new("done", 10, 1))
            .await
            .unwrap();
        assert_eq!(result.chunks(), &["done".to_string()]);
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_rejected_credentials_are_retried() {
        let rejected = || {
            Err(LlmError::Unauthorized {
                status: 401,
                body: "invalid api key".to_string(),
            })
        };
        let backend = ScriptedBackend::new(vec![rejected(), rejected(), rejected()]);
        let strategy = strategy(backend.clone());

        let err = strategy
            .process(&ChunkRequest::new("text", 10, 1))
            .await
            .unwrap_err();
        assert_eq!(backend.calls(), 3);
        match err {
            ChunkingError::Terminal { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, ChunkingError::Transport(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_request_is_not_sent() {
        let backend = ScriptedBackend::new(vec![]);
        let strategy = strategy(backend.clone());
        let err = strategy
            .process(&ChunkRequest::new("text", 10, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ChunkingError::Validation(_)));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_initialize() {
        let config = OpenAiConfig {
            openai_api_key: String::new(),
            openai_api_base: None,
            openai_model_name: None,
            openai_timeout_secs: None,
        };
        let mut strategy = ModelBackedStrategy::new(config.clone());
        let err = strategy
            .process(&ChunkRequest::new("text", 10, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ChunkingError::Configuration(_)));

        assert!(matches!(
            strategy.initialize().await,
            Err(ChunkingError::Configuration(_))
        ));

        let mut strategy = ModelBackedStrategy::new(OpenAiConfig {
            openai_api_key: "sk-test".to_string(),
            ..config
        });
        strategy.initialize().await.unwrap();
        assert!(strategy.backend().is_ok());
        assert_eq!(strategy.name(), "openai");
    }
}
