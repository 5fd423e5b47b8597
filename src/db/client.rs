//! Vector index client.
//!
//! Turns chunks and their vectors into index records, and turns query text
//! into a ranked [`RetrievalResult`]. The client embeds query text itself, so
//! callers never handle query vectors.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{info, warn};

use crate::db::vectorstore::VectorStore;
use crate::rag::embeddings::EmbeddingClient;
use crate::types::{
    AppError, Chunk, ChunkMetadata, CollectionSpec, Embedding, IndexRecord, Result,
    RetrievalResult,
};

/// Relevance/diversity balance used for MMR.
pub const MMR_LAMBDA: f32 = 0.5;

/// Candidates fetched per requested result before MMR selection.
pub const MMR_FETCH_FACTOR: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Similarity,
    /// Maximal marginal relevance.
    Mmr,
}

impl FromStr for SearchMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "similarity" => Ok(SearchMode::Similarity),
            "mmr" => Ok(SearchMode::Mmr),
            _ => Err(AppError::Config(format!(
                "Unknown RETRIEVER_SEARCH_TYPE '{}'. Use 'similarity' or 'mmr'.",
                s
            ))),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Similarity => write!(f, "similarity"),
            SearchMode::Mmr => write!(f, "mmr"),
        }
    }
}

#[derive(Clone)]
pub struct VectorIndexClient {
    store: Arc<dyn VectorStore>,
}

impl VectorIndexClient {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Creates or replaces `name` with one record per chunk/vector pair.
    ///
    /// Returns the number of records the backend reports as written.
    pub async fn upsert_collection(
        &self,
        name: &str,
        chunks: &[Chunk<'_>],
        vectors: Vec<Embedding>,
        embedder: &dyn EmbeddingClient,
    ) -> Result<usize> {
        if chunks.len() != vectors.len() {
            return Err(AppError::Internal(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let dimensions = vectors.first().map(Vec::len).unwrap_or(0);
        let mut spec = CollectionSpec {
            dimensions,
            embedding_provider: embedder.provider_name().to_string(),
            embedding_model: embedder.model_name().to_string(),
            ..Default::default()
        };
        spec.extra
            .insert("ingested_at".into(), chrono::Utc::now().to_rfc3339());

        let records: Vec<IndexRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, embedding)| IndexRecord {
                id: uuid::Uuid::new_v4().to_string(),
                content: chunk.content.to_string(),
                embedding,
                metadata: ChunkMetadata::from(chunk),
            })
            .collect();

        let written = self.store.replace_collection(name, &spec, &records).await?;

        info!(
            collection = name,
            backend = self.store.provider_name(),
            records = written,
            dimensions,
            "Collection replaced"
        );

        Ok(written)
    }

    /// Embeds `query` and returns at most `top_k` chunks, most similar first.
    ///
    /// MMR on a backend that cannot do it degrades to similarity search with a
    /// warning instead of failing the request.
    pub async fn query(
        &self,
        name: &str,
        query: &str,
        embedder: &dyn EmbeddingClient,
        top_k: usize,
        mode: SearchMode,
    ) -> Result<RetrievalResult> {
        let vector = embedder.embed_query(query).await?;

        let chunks = match mode {
            SearchMode::Mmr if self.store.supports_mmr() => {
                self.store
                    .search_mmr(
                        name,
                        &vector,
                        top_k,
                        top_k.saturating_mul(MMR_FETCH_FACTOR),
                        MMR_LAMBDA,
                    )
                    .await?
            }
            SearchMode::Mmr => {
                warn!(
                    backend = self.store.provider_name(),
                    collection = name,
                    "RETRIEVER_SEARCH_TYPE=mmr is not supported by this vector store. Falling back to similarity."
                );
                self.store.search(name, &vector, top_k).await?
            }
            SearchMode::Similarity => self.store.search(name, &vector, top_k).await?,
        };

        Ok(RetrievalResult::ranked(chunks, top_k))
    }
}
