//! Offline ingestion: load → chunk → embed → replace collection.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::db::client::VectorIndexClient;
use crate::rag::chunker::Chunker;
use crate::rag::embeddings::EmbeddingClient;
use crate::types::{AppError, Document, ProviderFailureKind, Result};

/// Outcome of one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub collection: String,
    pub source: String,
    pub chunks: usize,
    pub embedding_provider: String,
    pub embedding_model: String,
    pub duration_ms: u64,
}

#[derive(Clone)]
pub struct IngestionPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    index: VectorIndexClient,
    /// Shown in hints when the index cannot be reached.
    index_url: String,
}

impl IngestionPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        index: VectorIndexClient,
        index_url: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            index,
            index_url: index_url.into(),
        }
    }

    /// Runs the pipeline and returns the number of chunks written.
    pub async fn ingest(
        &self,
        source_path: impl AsRef<Path>,
        chunk_size: usize,
        chunk_overlap: usize,
        collection: &str,
    ) -> Result<usize> {
        Ok(self
            .run(source_path, chunk_size, chunk_overlap, collection)
            .await?
            .chunks)
    }

    /// Like [`IngestionPipeline::ingest`], with the full report.
    pub async fn run(
        &self,
        source_path: impl AsRef<Path>,
        chunk_size: usize,
        chunk_overlap: usize,
        collection: &str,
    ) -> Result<IngestReport> {
        self.run_inner(source_path.as_ref(), chunk_size, chunk_overlap, collection)
            .await
            .map_err(|e| self.with_remediation(e))
    }

    async fn run_inner(
        &self,
        source_path: &Path,
        chunk_size: usize,
        chunk_overlap: usize,
        collection: &str,
    ) -> Result<IngestReport> {
        let started = Instant::now();
        let chunker = Chunker::new(chunk_size, chunk_overlap)?;

        let text = tokio::fs::read_to_string(source_path).await.map_err(|e| {
            AppError::Io(format!("Failed to read {}: {}", source_path.display(), e))
        })?;
        let document = Document::new(source_path.display().to_string(), text);

        let chunks = chunker.split(&document);
        info!(
            source = %document.source,
            chunks = chunks.len(),
            chunk_size,
            chunk_overlap,
            "Document chunked"
        );

        let texts: Vec<&str> = chunks.iter().map(|c| c.content).collect();
        let vectors = self.embedder.embed(&texts).await?;
        info!(
            provider = self.embedder.provider_name(),
            model = self.embedder.model_name(),
            vectors = vectors.len(),
            "Chunks embedded"
        );

        let written = self
            .index
            .upsert_collection(collection, &chunks, vectors, self.embedder.as_ref())
            .await?;

        let report = IngestReport {
            collection: collection.to_string(),
            source: document.source.clone(),
            chunks: written,
            embedding_provider: self.embedder.provider_name().to_string(),
            embedding_model: self.embedder.model_name().to_string(),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            collection,
            chunks = report.chunks,
            duration_ms = report.duration_ms,
            "Ingestion complete"
        );

        Ok(report)
    }

    /// Attaches a hint for failures the operator can act on.
    fn with_remediation(&self, err: AppError) -> AppError {
        let hint = match &err {
            AppError::Provider {
                kind: ProviderFailureKind::ModelNotFound,
                ..
            } if self.embedder.provider_name() == "ollama" => Some(format!(
                "pull the embedding model first, e.g. 'ollama pull {}'",
                self.embedder.model_name()
            )),
            AppError::Provider {
                kind: ProviderFailureKind::ModelNotFound,
                ..
            } => Some(format!(
                "check that embedding model '{}' exists for provider '{}'",
                self.embedder.model_name(),
                self.embedder.provider_name()
            )),
            AppError::Provider {
                kind: ProviderFailureKind::Unavailable,
                ..
            } if self.embedder.provider_name() == "ollama" => {
                Some("start the Ollama server first, e.g. 'ollama serve'".to_string())
            }
            AppError::Provider {
                kind: ProviderFailureKind::DimensionMismatch,
                ..
            } => Some(
                "the collection was built with a different embedding model; re-run ingestion with a single provider"
                    .to_string(),
            ),
            AppError::IndexConnection { .. } => Some(format!(
                "start the Chroma server first or set CHROMA_URL. Current CHROMA_URL={}",
                self.index_url
            )),
            _ => None,
        };

        match hint {
            Some(hint) => err.with_hint(hint),
            None => err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::vectorstore::{InMemoryVectorStore, VectorStore};
    use crate::types::Embedding;
    use async_trait::async_trait;
    use std::io::Write;

    struct FailingEmbedder(ProviderFailureKind);

    #[async_trait]
    impl EmbeddingClient for FailingEmbedder {
        fn provider_name(&self) -> &'static str {
            "ollama"
        }

        fn model_name(&self) -> &str {
            "nomic-embed-text"
        }

        async fn embed(&self, _texts: &[&str]) -> Result<Vec<Embedding>> {
            Err(AppError::provider("ollama", self.0, "failed"))
        }
    }

    struct LengthEmbedder;

    #[async_trait]
    impl EmbeddingClient for LengthEmbedder {
        fn provider_name(&self) -> &'static str {
            "length"
        }

        fn model_name(&self) -> &str {
            "len"
        }

        async fn embed(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
            Ok(texts
                .iter()
                .map(|t| vec![t.chars().count() as f32, 1.0])
                .collect())
        }
    }

    fn source_file(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    fn pipeline(embedder: Arc<dyn EmbeddingClient>, store: InMemoryVectorStore) -> IngestionPipeline {
        IngestionPipeline::new(
            embedder,
            VectorIndexClient::new(Arc::new(store)),
            "http://localhost:8000",
        )
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let pipeline = pipeline(Arc::new(LengthEmbedder), InMemoryVectorStore::new());
        let err = pipeline
            .ingest("/definitely/not/here.txt", 300, 80, "horse")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[tokio::test]
    async fn test_invalid_chunking_fails_before_reading() {
        let pipeline = pipeline(Arc::new(LengthEmbedder), InMemoryVectorStore::new());
        let err = pipeline
            .ingest("/definitely/not/here.txt", 80, 80, "horse")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_missing_model_gets_pull_hint() {
        let file = source_file("Horses are mammals.");
        let pipeline = pipeline(
            Arc::new(FailingEmbedder(ProviderFailureKind::ModelNotFound)),
            InMemoryVectorStore::new(),
        );

        let err = pipeline.ingest(file.path(), 300, 80, "horse").await.unwrap_err();

        assert_eq!(
            err.hint(),
            Some("pull the embedding model first, e.g. 'ollama pull nomic-embed-text'")
        );
        assert!(err.to_string().contains("Hint: pull the embedding model first"));
    }

    #[tokio::test]
    async fn test_timeout_has_no_hint() {
        let file = source_file("Horses are mammals.");
        let pipeline = pipeline(
            Arc::new(FailingEmbedder(ProviderFailureKind::Timeout)),
            InMemoryVectorStore::new(),
        );

        let err = pipeline.ingest(file.path(), 300, 80, "horse").await.unwrap_err();
        assert!(err.hint().is_none());
    }

    #[tokio::test]
    async fn test_report_matches_stored_count() {
        let file = source_file("First paragraph about horses.\n\nSecond one.\n\nThird and last.");
        let store = InMemoryVectorStore::new();
        let pipeline = pipeline(Arc::new(LengthEmbedder), store.clone());

        let report = pipeline.run(file.path(), 300, 80, "horse").await.unwrap();

        assert_eq!(report.chunks, 1);
        assert_eq!(report.embedding_provider, "length");
        assert_eq!(store.count("horse").await.unwrap(), report.chunks);
    }
}
