use std::sync::Arc;

use crate::db::client::{SearchMode, VectorIndexClient};
use crate::rag::embeddings::EmbeddingClient;
use crate::types::{Result, RetrievalResult};

/// Fetches the chunks most relevant to a query from one collection.
///
/// Errors from the index client pass through unchanged and scores are not
/// rescaled.
#[derive(Clone)]
pub struct Retriever {
    index: VectorIndexClient,
    embedder: Arc<dyn EmbeddingClient>,
    collection: String,
    top_k: usize,
    mode: SearchMode,
}

impl Retriever {
    pub fn new(
        index: VectorIndexClient,
        embedder: Arc<dyn EmbeddingClient>,
        collection: impl Into<String>,
        top_k: usize,
        mode: SearchMode,
    ) -> Self {
        Self {
            index,
            embedder,
            collection: collection.into(),
            top_k,
            mode,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn retrieve(&self, query: &str) -> Result<RetrievalResult> {
        retrieve(
            &self.index,
            query,
            self.top_k,
            &self.collection,
            self.embedder.as_ref(),
            self.mode,
        )
        .await
    }
}

/// One-off retrieval without a configured [`Retriever`].
pub async fn retrieve(
    index: &VectorIndexClient,
    query: &str,
    top_k: usize,
    collection: &str,
    embedder: &dyn EmbeddingClient,
    mode: SearchMode,
) -> Result<RetrievalResult> {
    let started = std::time::Instant::now();
    let result = index.query(collection, query, embedder, top_k, mode).await?;

    tracing::debug!(
        collection,
        top_k,
        mode = %mode,
        hits = result.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "Retrieved context"
    );

    Ok(result)
}
