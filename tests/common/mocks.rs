//! Mock implementations shared by the integration tests.
//!
//! The mocks count their calls so tests can assert that a backend was (or
//! was not) reached.

use async_trait::async_trait;
use parking_lot::Mutex;
use ragbot::llm::LLMClient;
use ragbot::rag::embeddings::EmbeddingClient;
use ragbot::types::{AppError, Embedding, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock LLM client with a canned reply.
///
/// ```ignore
/// let client = MockLLMClient::new("普氏野马是野马。");
/// let failing = MockLLMClient::failing();
/// ```
#[derive(Clone, Default)]
pub struct MockLLMClient {
    response: String,
    should_fail: bool,
    calls: Arc<AtomicUsize>,
    last_exchange: Arc<Mutex<Option<(String, String)>>>,
    last_history: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockLLMClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(system, user)` of the most recent call.
    pub fn last_exchange(&self) -> Option<(String, String)> {
        self.last_exchange.lock().clone()
    }

    /// Messages of the most recent multi-turn call.
    pub fn last_history(&self) -> Vec<(String, String)> {
        self.last_history.lock().clone()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_system("", prompt).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_exchange.lock() = Some((system.to_string(), prompt.to_string()));
        if self.should_fail {
            return Err(AppError::ModelInvocation("Mock LLM failure".to_string()));
        }
        Ok(self.response.clone())
    }

    async fn generate_with_history(&self, messages: &[(String, String)]) -> Result<String> {
        *self.last_history.lock() = messages.to_vec();
        let (system, prompt) = match messages {
            [(role, system), .., (_, prompt)] if role == "system" => (system.as_str(), prompt.as_str()),
            [.., (_, prompt)] => ("", prompt.as_str()),
            [] => ("", ""),
        };
        self.generate_with_system(system, prompt).await
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Words the mock embedder counts, one dimension each.
pub const VOCABULARY: [&str; 4] = ["horse", "zebra", "donkey", "grass"];

/// Deterministic bag-of-words embedder over [`VOCABULARY`].
#[derive(Clone, Default)]
pub struct MockEmbeddingClient {
    calls: Arc<AtomicUsize>,
    texts: Arc<AtomicUsize>,
}

impl MockEmbeddingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `embed` calls made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of texts embedded across all calls.
    pub fn texts_embedded(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }

    pub fn vector(text: &str) -> Embedding {
        let lower = text.to_lowercase();
        let mut vector: Embedding = VOCABULARY
            .iter()
            .map(|word| lower.matches(word).count() as f32)
            .collect();
        // Keeps every vector non-zero.
        vector.push(0.01);
        vector
    }
}

#[async_trait]
impl EmbeddingClient for MockEmbeddingClient {
    fn provider_name(&self) -> &'static str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "bag-of-words"
    }

    async fn embed(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}
