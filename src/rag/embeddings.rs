//! Embedding providers.
//!
//! Two backends sit behind [`EmbeddingClient`]: a locally hosted Ollama server
//! and the hosted OpenAI embeddings API. [`EmbeddingProvider`] is chosen once
//! from configuration and turned into a shared client, so nothing downstream
//! branches on provider names.

use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::embeddings::{CreateEmbeddingRequestArgs, EmbeddingInput},
};
use async_trait::async_trait;
use ollama_rs::{
    Ollama,
    error::OllamaError,
    generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::types::{AppError, Embedding, ProviderFailureKind, Result};
use crate::utils::config::EmbeddingConfig;

/// Texts sent per request.
pub const EMBED_BATCH_SIZE: usize = 64;

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Short provider identifier, e.g. `ollama`.
    fn provider_name(&self) -> &'static str;

    fn model_name(&self) -> &str;

    /// One vector per input text, in input order. Failures are not retried.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Embedding>>;

    async fn embed_query(&self, text: &str) -> Result<Embedding> {
        self.embed(&[text]).await?.pop().ok_or_else(|| {
            AppError::provider(
                self.provider_name(),
                ProviderFailureKind::MalformedResponse,
                "no embedding returned for query",
            )
        })
    }
}

/// Embedding backend selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingProvider {
    Ollama {
        base_url: String,
        model: String,
    },
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
    },
}

impl EmbeddingProvider {
    /// Resolves the configured provider. Unknown names and missing credentials
    /// fail here, before any network call.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        match config.provider.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama {
                base_url: config.ollama_base_url.clone(),
                model: config.ollama_model.clone(),
            }),
            "openai" => {
                let api_key = config
                    .openai_api_key
                    .clone()
                    .filter(|k| !k.trim().is_empty())
                    .ok_or_else(|| {
                        AppError::Config(
                            "OPENAI_API_KEY is required when EMBEDDING_PROVIDER=openai".into(),
                        )
                    })?;
                Ok(Self::OpenAI {
                    api_key,
                    api_base: config.openai_base_url.clone(),
                    model: config.openai_model.clone(),
                })
            }
            other => Err(AppError::Config(format!(
                "Unsupported EMBEDDING_PROVIDER '{}'. Use 'ollama' or 'openai'.",
                other
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ollama { .. } => "ollama",
            Self::OpenAI { .. } => "openai",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::Ollama { model, .. } | Self::OpenAI { model, .. } => model,
        }
    }

    pub fn create_client(&self, timeout: Duration) -> Result<Arc<dyn EmbeddingClient>> {
        Ok(match self {
            Self::Ollama { base_url, model } => {
                Arc::new(OllamaEmbeddings::new(base_url, model.clone(), timeout)?)
            }
            Self::OpenAI {
                api_key,
                api_base,
                model,
            } => Arc::new(OpenAIEmbeddings::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                timeout,
            )),
        })
    }
}

fn timed_out(provider: &str, timeout: Duration) -> AppError {
    AppError::provider(
        provider,
        ProviderFailureKind::Timeout,
        format!("no response within {:.1}s", timeout.as_secs_f32()),
    )
}

fn transport_error(provider: &str, err: reqwest::Error) -> AppError {
    let kind = if err.is_timeout() {
        ProviderFailureKind::Timeout
    } else if err.is_decode() {
        ProviderFailureKind::MalformedResponse
    } else {
        ProviderFailureKind::Unavailable
    };
    AppError::provider(provider, kind, err.to_string())
}

fn check_count(provider: &str, expected: usize, vectors: &[Embedding]) -> Result<()> {
    if vectors.len() != expected {
        return Err(AppError::provider(
            provider,
            ProviderFailureKind::MalformedResponse,
            format!("expected {} embeddings, got {}", expected, vectors.len()),
        ));
    }
    if vectors.iter().any(|v| v.is_empty()) {
        return Err(AppError::provider(
            provider,
            ProviderFailureKind::MalformedResponse,
            "received an empty embedding vector",
        ));
    }
    Ok(())
}

// ============= Ollama =============

pub struct OllamaEmbeddings {
    client: Ollama,
    model: String,
    timeout: Duration,
}

impl OllamaEmbeddings {
    pub fn new(base_url: &str, model: String, timeout: Duration) -> Result<Self> {
        let url = reqwest::Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("Invalid Ollama URL '{}': {}", base_url, e)))?;

        Ok(Self {
            client: Ollama::from_url(url),
            model,
            timeout,
        })
    }

    async fn embed_batch(&self, batch: &[&str]) -> Result<Vec<Embedding>> {
        let input: Vec<String> = batch.iter().map(|t| t.to_string()).collect();
        let request =
            GenerateEmbeddingsRequest::new(self.model.clone(), EmbeddingsInput::Multiple(input));

        let response = tokio::time::timeout(self.timeout, self.client.generate_embeddings(request))
            .await
            .map_err(|_| timed_out("ollama", self.timeout))?
            .map_err(|e| ollama_error(&self.model, e))?;

        check_count("ollama", batch.len(), &response.embeddings)?;
        Ok(response.embeddings)
    }
}

/// Ollama answers an unknown model with a 404 whose body reads
/// `model "..." not found, try pulling it first`.
fn ollama_error(model: &str, err: OllamaError) -> AppError {
    match err {
        OllamaError::ReqwestError(e) => transport_error("ollama", e),
        OllamaError::JsonError(e) => AppError::provider(
            "ollama",
            ProviderFailureKind::MalformedResponse,
            e.to_string(),
        ),
        OllamaError::Other(body) if body.contains("not found") => AppError::provider(
            "ollama",
            ProviderFailureKind::ModelNotFound,
            format!("model '{}' not found: {}", model, body.trim()),
        ),
        other => AppError::provider("ollama", ProviderFailureKind::Rejected, other.to_string()),
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddings {
    fn provider_name(&self) -> &'static str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            debug!(provider = "ollama", model = %self.model, batch_size = batch.len(), "Embedding batch");
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }
}

// ============= OpenAI =============

pub struct OpenAIEmbeddings {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAIEmbeddings {
    pub fn new(api_key: String, api_base: String, model: String, timeout: Duration) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base.trim_end_matches('/'));

        Self {
            client: Client::with_config(config),
            model,
            timeout,
        }
    }

    async fn embed_batch(&self, batch: &[&str]) -> Result<Vec<Embedding>> {
        let input: Vec<String> = batch.iter().map(|t| t.to_string()).collect();
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(input))
            .build()
            .map_err(|e| {
                AppError::provider("openai", ProviderFailureKind::Rejected, e.to_string())
            })?;

        let mut response =
            tokio::time::timeout(self.timeout, self.client.embeddings().create(request))
                .await
                .map_err(|_| timed_out("openai", self.timeout))?
                .map_err(openai_error)?;
        response.data.sort_by_key(|d| d.index);

        let vectors: Vec<Embedding> = response.data.into_iter().map(|d| d.embedding).collect();
        check_count("openai", batch.len(), &vectors)?;
        Ok(vectors)
    }
}

fn openai_error(err: OpenAIError) -> AppError {
    match err {
        OpenAIError::Reqwest(e) => transport_error("openai", e),
        OpenAIError::ApiError(api) => {
            let kind = if api.code.as_deref() == Some("model_not_found")
                || api.message.contains("does not exist")
            {
                ProviderFailureKind::ModelNotFound
            } else {
                ProviderFailureKind::Rejected
            };
            AppError::provider("openai", kind, api.message)
        }
        other @ OpenAIError::JSONDeserialize(..) => AppError::provider(
            "openai",
            ProviderFailureKind::MalformedResponse,
            other.to_string(),
        ),
        other => AppError::provider("openai", ProviderFailureKind::Rejected, other.to_string()),
    }
}

#[async_trait]
impl EmbeddingClient for OpenAIEmbeddings {
    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            debug!(provider = "openai", model = %self.model, batch_size = batch.len(), "Embedding batch");
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str, key: Option<&str>) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: provider.to_string(),
            openai_api_key: key.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_provider_is_ollama() {
        let provider = EmbeddingProvider::from_config(&EmbeddingConfig::default()).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model(), "nomic-embed-text");
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let err = EmbeddingProvider::from_config(&config("foo", None)).unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("foo")));
    }

    #[test]
    fn test_openai_requires_key() {
        assert!(matches!(
            EmbeddingProvider::from_config(&config("openai", None)),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            EmbeddingProvider::from_config(&config("OpenAI", Some("  "))),
            Err(AppError::Config(_))
        ));

        let provider = EmbeddingProvider::from_config(&config("openai", Some("sk-test"))).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_request() {
        // Nothing listens on port 9; any request would fail.
        let provider = EmbeddingProvider::Ollama {
            base_url: "http://127.0.0.1:9".into(),
            model: "m".into(),
        };
        let client = provider.create_client(Duration::from_secs(1)).unwrap();
        assert!(client.embed(&[]).await.unwrap().is_empty());
    }
}
