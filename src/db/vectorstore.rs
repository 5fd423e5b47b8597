//! Vector Store Abstraction Layer
//!
//! Backends store `(chunk content, embedding, metadata)` records under a named
//! collection and answer nearest-neighbour queries against it.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       VectorStore Trait                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │ replace_collection │ search │ search_mmr │ collection_info │ … │
//! └──────────────────────────────────────────────────────────────┘
//!              ▲                                 ▲
//!        ┌─────┴─────┐                     ┌─────┴─────┐
//!        │  ChromaDB │                     │ In-memory │
//!        │  (REST)   │                     │ (testing) │
//!        └───────────┘                     └───────────┘
//! ```

use crate::types::{
    AppError, CollectionSpec, Embedding, IndexRecord, ProviderFailureKind, Result, ScoredChunk,
};
use crate::utils::config::IndexConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Vector Store Provider Configuration
// ============================================================================

/// Vector store backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum VectorStoreProvider {
    /// Chroma server reached over its v2 REST API.
    ChromaDB {
        url: String,
        tenant: String,
        database: String,
    },

    /// Process-local store. Data is lost when the process exits.
    InMemory,
}

impl VectorStoreProvider {
    pub fn from_config(config: &IndexConfig) -> Result<Self> {
        match config.backend.trim().to_lowercase().as_str() {
            "chromadb" | "chroma" => Ok(Self::ChromaDB {
                url: config.url.clone(),
                tenant: config.tenant.clone(),
                database: config.database.clone(),
            }),
            "memory" | "in-memory" | "inmemory" => Ok(Self::InMemory),
            other => Err(AppError::Config(format!(
                "Unsupported VECTOR_STORE '{}'. Use 'chromadb' or 'memory'.",
                other
            ))),
        }
    }

    /// Create a vector store instance. No network traffic happens here.
    pub fn create_store(&self, timeout: Duration) -> Result<Arc<dyn VectorStore>> {
        match self {
            VectorStoreProvider::ChromaDB {
                url,
                tenant,
                database,
            } => {
                let store = super::chromadb::ChromaDBStore::new(url, tenant, database, timeout)?;
                Ok(Arc::new(store))
            }
            VectorStoreProvider::InMemory => Ok(Arc::new(InMemoryVectorStore::new())),
        }
    }
}

// ============================================================================
// Collection Information
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub document_count: usize,
    /// Vector dimensions, when the backend reports them.
    pub dimensions: Option<usize>,
}

// ============================================================================
// Vector Store Trait
// ============================================================================

/// Abstract trait for vector database operations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Get the name of this vector store provider.
    fn provider_name(&self) -> &'static str;

    /// Whether [`VectorStore::search_mmr`] is implemented.
    fn supports_mmr(&self) -> bool {
        false
    }

    /// Cheap reachability check.
    async fn heartbeat(&self) -> Result<()>;

    /// Drop any collection called `name` and write `records` into a fresh one.
    ///
    /// Returns the number of records written. A second call with the same name
    /// replaces the previous content rather than appending to it.
    async fn replace_collection(
        &self,
        name: &str,
        spec: &CollectionSpec,
        records: &[IndexRecord],
    ) -> Result<usize>;

    /// Fails with [`AppError::CollectionNotFound`] when absent.
    async fn collection_info(&self, name: &str) -> Result<CollectionInfo>;

    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Nearest neighbours of `embedding`, most similar first.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>>;

    /// Diversity-aware search using maximal marginal relevance.
    ///
    /// # Default Implementation
    ///
    /// Backends without MMR report the request as unsupported.
    async fn search_mmr(
        &self,
        collection: &str,
        _embedding: &[f32],
        _limit: usize,
        _fetch_k: usize,
        _lambda: f32,
    ) -> Result<Vec<ScoredChunk>> {
        Err(AppError::Index(format!(
            "{} does not support MMR search (collection '{}')",
            self.provider_name(),
            collection
        )))
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.collection_info(collection).await?.document_count)
    }
}

// ============================================================================
// In-Memory Vector Store
// ============================================================================

use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory vector store.
///
/// Brute-force cosine similarity over every record. Clones share storage, so
/// an ingestion pipeline and a retriever built from clones see the same data.
#[derive(Clone, Default)]
pub struct InMemoryVectorStore {
    collections: Arc<RwLock<HashMap<String, InMemoryCollection>>>,
}

struct InMemoryCollection {
    spec: CollectionSpec,
    records: Vec<IndexRecord>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spec recorded for `name` at its last replacement.
    pub fn collection_spec(&self, name: &str) -> Option<CollectionSpec> {
        self.collections.read().get(name).map(|c| c.spec.clone())
    }

    /// Scored candidates with their vectors, most similar first.
    fn ranked(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<(ScoredChunk, Embedding)>> {
        let collections = self.collections.read();
        let col = collections
            .get(collection)
            .ok_or_else(|| AppError::CollectionNotFound(collection.to_string()))?;

        if col.spec.dimensions != 0 && embedding.len() != col.spec.dimensions {
            return Err(AppError::provider(
                self.provider_name(),
                ProviderFailureKind::DimensionMismatch,
                format!(
                    "query has {} dimensions, collection '{}' expects {}",
                    embedding.len(),
                    collection,
                    col.spec.dimensions
                ),
            ));
        }

        let mut results: Vec<(ScoredChunk, Embedding)> = col
            .records
            .iter()
            .map(|record| {
                let chunk = ScoredChunk {
                    content: record.content.clone(),
                    score: cosine_similarity(embedding, &record.embedding),
                    metadata: Some(record.metadata.clone()),
                };
                (chunk, record.embedding.clone())
            })
            .collect();

        results.sort_by(|a, b| {
            b.0.score
                .partial_cmp(&a.0.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);

        Ok(results)
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn provider_name(&self) -> &'static str {
        "in-memory"
    }

    fn supports_mmr(&self) -> bool {
        true
    }

    async fn heartbeat(&self) -> Result<()> {
        Ok(())
    }

    async fn replace_collection(
        &self,
        name: &str,
        spec: &CollectionSpec,
        records: &[IndexRecord],
    ) -> Result<usize> {
        if let Some(bad) = records
            .iter()
            .find(|r| r.embedding.len() != spec.dimensions)
        {
            return Err(AppError::provider(
                self.provider_name(),
                ProviderFailureKind::DimensionMismatch,
                format!(
                    "record '{}' has {} dimensions, collection '{}' expects {}",
                    bad.id,
                    bad.embedding.len(),
                    name,
                    spec.dimensions
                ),
            ));
        }

        let mut collections = self.collections.write();
        collections.insert(
            name.to_string(),
            InMemoryCollection {
                spec: spec.clone(),
                records: records.to_vec(),
            },
        );

        Ok(records.len())
    }

    async fn collection_info(&self, name: &str) -> Result<CollectionInfo> {
        let collections = self.collections.read();
        let col = collections
            .get(name)
            .ok_or_else(|| AppError::CollectionNotFound(name.to_string()))?;

        Ok(CollectionInfo {
            name: name.to_string(),
            document_count: col.records.len(),
            dimensions: Some(col.spec.dimensions),
        })
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| AppError::CollectionNotFound(name.to_string()))
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        Ok(self
            .ranked(collection, embedding, limit)?
            .into_iter()
            .map(|(chunk, _)| chunk)
            .collect())
    }

    async fn search_mmr(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        fetch_k: usize,
        lambda: f32,
    ) -> Result<Vec<ScoredChunk>> {
        let candidates = self.ranked(collection, embedding, fetch_k.max(limit))?;
        Ok(mmr_select(candidates, limit, lambda))
    }
}

// ============================================================================
// Similarity helpers
// ============================================================================

/// Cosine similarity, 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Maximal marginal relevance over candidates already scored against the
/// query. Each step picks the candidate maximising
/// `λ·sim(query, d) − (1 − λ)·max sim(d, selected)`. The selection is returned
/// in descending query similarity.
fn mmr_select(
    mut remaining: Vec<(ScoredChunk, Embedding)>,
    k: usize,
    lambda: f32,
) -> Vec<ScoredChunk> {
    let lambda = lambda.clamp(0.0, 1.0);
    let mut selected: Vec<(ScoredChunk, Embedding)> = Vec::with_capacity(k);

    while selected.len() < k && !remaining.is_empty() {
        let mut best_idx = 0;
        let mut best_score = f32::NEG_INFINITY;

        for (idx, (candidate, vector)) in remaining.iter().enumerate() {
            let redundancy = selected
                .iter()
                .map(|(_, chosen)| cosine_similarity(vector, chosen))
                .fold(f32::NEG_INFINITY, f32::max);
            let redundancy = if selected.is_empty() { 0.0 } else { redundancy };
            let score = lambda * candidate.score - (1.0 - lambda) * redundancy;

            if score > best_score {
                best_score = score;
                best_idx = idx;
            }
        }

        selected.push(remaining.remove(best_idx));
    }

    let mut chunks: Vec<ScoredChunk> = selected.into_iter().map(|(chunk, _)| chunk).collect();
    chunks.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    chunks
}

// ============================================================================
// Tests
// ============================================================================
