//! Online question answering and the process-wide runtime handle.
//!
//! [`RagRuntime`] validates configuration up front, then builds the embedding
//! client, index client and model client once, on first use, and shares them
//! read-only across requests. A failed build is retried by the next caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::OnceCell;
use tracing::info;

use crate::db::client::{SearchMode, VectorIndexClient};
use crate::db::vectorstore::{VectorStore, VectorStoreProvider};
use crate::llm::{LLMClient, Provider, ReportGenerator, Translator};
use crate::rag::answer::AnswerComposer;
use crate::rag::embeddings::{EmbeddingClient, EmbeddingProvider};
use crate::rag::prompts::PromptComposer;
use crate::rag::retriever::Retriever;
use crate::types::{AnswerResponse, AppError, Result};
use crate::utils::config::Config;

/// Sampling temperature for grounded answers.
pub const ANSWER_TEMPERATURE: f32 = 0.0;

/// Sampling temperature for translations.
pub const TRANSLATE_TEMPERATURE: f32 = 0.3;

/// Sampling temperature for weekly reports.
pub const REPORT_TEMPERATURE: f32 = 0.4;

/// retrieve → compose → answer.
pub struct RagService {
    retriever: Retriever,
    prompts: PromptComposer,
    answers: AnswerComposer,
}

impl RagService {
    pub fn new(retriever: Retriever, prompts: PromptComposer, answers: AnswerComposer) -> Self {
        Self {
            retriever,
            prompts,
            answers,
        }
    }

    /// Answers `question`; the sources are previews of exactly the chunks the
    /// prompt was grounded on.
    pub async fn ask(&self, question: &str) -> Result<AnswerResponse> {
        if question.trim().is_empty() {
            return Err(AppError::InvalidInput("请提供问题".to_string()));
        }

        let started = Instant::now();
        let retrieved = self.retriever.retrieve(question).await?;
        let system_prompt = self.prompts.compose(&retrieved);
        let response = self.answers.answer(question, &system_prompt, &retrieved).await?;

        info!(
            collection = self.retriever.collection(),
            template = self.prompts.template_key(),
            model = self.answers.model_name(),
            sources = response.sources.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Question answered"
        );

        Ok(response)
    }
}

/// Providers resolved from configuration; no clients exist yet.
struct Blueprint {
    embedding: EmbeddingProvider,
    llm: Provider,
    store: VectorStoreProvider,
    mode: SearchMode,
}

/// Lazily initialised, shared handle to the online pipeline.
pub struct RagRuntime {
    config: Arc<Config>,
    blueprint: Option<Blueprint>,
    store: OnceCell<Arc<dyn VectorStore>>,
    embedder: OnceCell<Arc<dyn EmbeddingClient>>,
    service: OnceCell<Arc<RagService>>,
    translator: OnceCell<Translator>,
    reporter: OnceCell<ReportGenerator>,
    closed: AtomicBool,
}

impl RagRuntime {
    /// Validates configuration and resolves every provider. Nothing touches
    /// the network until the first request.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        config.validate()?;

        let blueprint = Blueprint {
            embedding: EmbeddingProvider::from_config(&config.embedding)?,
            llm: Provider::from_config(&config)?,
            store: VectorStoreProvider::from_config(&config.index)?,
            mode: config.retriever.search_type.parse()?,
        };

        Ok(Self {
            config,
            blueprint: Some(blueprint),
            store: OnceCell::new(),
            embedder: OnceCell::new(),
            service: OnceCell::new(),
            translator: OnceCell::new(),
            reporter: OnceCell::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// A runtime around already-built parts, e.g. mocks in tests.
    pub fn from_parts(config: Arc<Config>, service: RagService, translator: Translator) -> Self {
        Self {
            config,
            blueprint: None,
            store: OnceCell::new(),
            embedder: OnceCell::new(),
            service: OnceCell::from(Arc::new(service)),
            translator: OnceCell::from(translator),
            reporter: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Supplies a ready-made report generator, e.g. around a mock.
    pub fn with_report_generator(mut self, reporter: ReportGenerator) -> Self {
        self.reporter = OnceCell::from(reporter);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.service.initialized()
    }

    fn blueprint(&self) -> Result<&Blueprint> {
        if self.closed.load(Ordering::Acquire) {
            return Err(AppError::Internal("RAG runtime has been shut down".into()));
        }
        self.blueprint
            .as_ref()
            .ok_or_else(|| AppError::Internal("RAG runtime has no provider configuration".into()))
    }

    async fn store(&self) -> Result<Arc<dyn VectorStore>> {
        self.store
            .get_or_try_init(|| async {
                let blueprint = self.blueprint()?;
                blueprint.store.create_store(self.config.request_timeout())
            })
            .await
            .cloned()
    }

    async fn embedder(&self) -> Result<Arc<dyn EmbeddingClient>> {
        self.embedder
            .get_or_try_init(|| async {
                let blueprint = self.blueprint()?;
                blueprint
                    .embedding
                    .create_client(self.config.request_timeout())
            })
            .await
            .cloned()
    }

    /// The shared online pipeline, built on first call.
    pub async fn service(&self) -> Result<Arc<RagService>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(AppError::Internal("RAG runtime has been shut down".into()));
        }

        self.service
            .get_or_try_init(|| async {
                let started = Instant::now();
                let blueprint = self.blueprint()?;
                let store = self.store().await?;
                store.heartbeat().await?;

                let embedder = self.embedder().await?;
                let llm = blueprint
                    .llm
                    .create_client(self.config.request_timeout(), ANSWER_TEMPERATURE)?;

                let retriever = Retriever::new(
                    VectorIndexClient::new(store.clone()),
                    embedder.clone(),
                    self.config.index.collection.clone(),
                    self.config.retriever.top_k,
                    blueprint.mode,
                );
                let answers = AnswerComposer::new(llm)
                    .with_preview_chars(self.config.retriever.source_preview_chars);
                let service = RagService::new(
                    retriever,
                    PromptComposer::new(&self.config.retriever.prompt_template),
                    answers,
                );

                info!(
                    backend = store.provider_name(),
                    embedding = embedder.provider_name(),
                    llm = blueprint.llm.name(),
                    collection = %self.config.index.collection,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "RAG runtime initialised"
                );

                Ok::<_, AppError>(Arc::new(service))
            })
            .await
            .cloned()
    }

    pub async fn translator(&self) -> Result<Translator> {
        if self.closed.load(Ordering::Acquire) {
            return Err(AppError::Internal("RAG runtime has been shut down".into()));
        }

        self.translator
            .get_or_try_init(|| async {
                let blueprint = self.blueprint()?;
                let llm: Arc<dyn LLMClient> = blueprint
                    .llm
                    .create_client(self.config.request_timeout(), TRANSLATE_TEMPERATURE)?;
                Ok::<_, AppError>(Translator::new(llm))
            })
            .await
            .cloned()
    }

    pub async fn report_generator(&self) -> Result<ReportGenerator> {
        if self.closed.load(Ordering::Acquire) {
            return Err(AppError::Internal("RAG runtime has been shut down".into()));
        }

        self.reporter
            .get_or_try_init(|| async {
                let blueprint = self.blueprint()?;
                let llm: Arc<dyn LLMClient> = blueprint
                    .llm
                    .create_client(self.config.request_timeout(), REPORT_TEMPERATURE)?;
                Ok::<_, AppError>(ReportGenerator::new(llm))
            })
            .await
            .cloned()
    }

    pub async fn ask(&self, question: &str) -> Result<AnswerResponse> {
        self.service().await?.ask(question).await
    }

    /// Stops handing out the pipeline. In-flight requests keep their handle
    /// and finish normally.
    pub fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(initialized = self.is_initialized(), "RAG runtime shut down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Arc<Config> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        Arc::new(
            Config::default()
                .with_overrides(|k| map.get(k).map(|v| v.to_string()))
                .unwrap(),
        )
    }

    #[test]
    fn test_unknown_embedding_provider_fails_eagerly() {
        let result = RagRuntime::new(config(&[
            ("EMBEDDING_PROVIDER", "foo"),
            ("DEEPSEEK_API_KEY", "sk-x"),
        ]));
        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("foo")));
    }

    #[test]
    fn test_missing_llm_key_fails_eagerly() {
        assert!(matches!(
            RagRuntime::new(config(&[])),
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_lazy_and_closable() {
        let runtime = RagRuntime::new(config(&[
            ("DEEPSEEK_API_KEY", "sk-x"),
            ("VECTOR_STORE", "memory"),
        ]))
        .unwrap();
        assert!(!runtime.is_initialized());

        // In-memory backend answers the heartbeat without any server.
        runtime.service().await.unwrap();
        assert!(runtime.is_initialized());

        runtime.shutdown();
        assert!(runtime.service().await.is_err());
        assert!(runtime.translator().await.is_err());
        assert!(runtime.report_generator().await.is_err());
    }

    #[tokio::test]
    async fn test_report_generator_needs_no_index() {
        // Reports go straight to the model; an unreachable Chroma is irrelevant.
        let runtime = RagRuntime::new(config(&[
            ("DEEPSEEK_API_KEY", "sk-x"),
            ("CHROMA_URL", "http://127.0.0.1:9"),
        ]))
        .unwrap();

        runtime.report_generator().await.unwrap();
        assert!(!runtime.is_initialized());
    }

    #[tokio::test]
    async fn test_ask_rejects_blank_question() {
        let runtime = RagRuntime::new(config(&[
            ("DEEPSEEK_API_KEY", "sk-x"),
            ("VECTOR_STORE", "memory"),
        ]))
        .unwrap();

        let err = runtime.ask("   ").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
