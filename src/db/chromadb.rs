//! ChromaDB vector store over the v2 REST API.
//!
//! Collections live under `/api/v2/tenants/{tenant}/databases/{database}` and
//! are created with cosine distance, so a result's similarity is
//! `1 - distance`.

use crate::types::{
    AppError, ChunkMetadata, CollectionSpec, IndexRecord, ProviderFailureKind, Result,
    ScoredChunk,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use reqwest::Url;
use std::time::Duration;
use tracing::debug;

use super::vectorstore::{CollectionInfo, VectorStore};

/// Records sent per upsert request.
pub const UPSERT_BATCH_SIZE: usize = 500;

/// ChromaDB vector store.
///
/// Requires a running Chroma server. Construction does not touch the network;
/// use [`VectorStore::heartbeat`] to check reachability.
pub struct ChromaDBStore {
    http: reqwest::Client,
    url: String,
    base: Url,
}

#[derive(Debug, Deserialize)]
struct ChromaCollection {
    id: String,
    #[serde(default)]
    dimension: Option<usize>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    ids: Vec<&'a str>,
    embeddings: Vec<&'a [f32]>,
    documents: Vec<&'a str>,
    metadatas: Vec<&'a ChunkMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Value>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f32>>>>,
}

impl ChromaDBStore {
    pub fn new(url: &str, tenant: &str, database: &str, timeout: Duration) -> Result<Self> {
        let url = url.trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let mut base = Url::parse(&url)
            .map_err(|e| AppError::Config(format!("Invalid CHROMA_URL '{}': {}", url, e)))?;
        base.path_segments_mut()
            .map_err(|_| AppError::Config(format!("CHROMA_URL '{}' cannot carry a path", url)))?
            .pop_if_empty()
            .extend(["api", "v2", "tenants", tenant, "databases", database]);

        Ok(Self { http, url, base })
    }

    /// `segments` are appended to the database path one by one and
    /// percent-encoded, so a `/` or `?` in a collection name stays inside
    /// its segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // `new` already proved the base can carry a path.
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn connection_error(&self, err: reqwest::Error) -> AppError {
        AppError::IndexConnection {
            url: self.url.clone(),
            message: err.to_string(),
        }
    }

    /// Maps a non-success response to the error taxonomy.
    async fn rejection(&self, response: reqwest::Response, collection: &str) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let lowered = body.to_lowercase();

        if status == reqwest::StatusCode::NOT_FOUND
            || lowered.contains("does not exist")
            || lowered.contains("notfounderror")
        {
            return AppError::CollectionNotFound(collection.to_string());
        }
        if lowered.contains("dimension") {
            return AppError::provider(
                self.provider_name(),
                ProviderFailureKind::DimensionMismatch,
                body.trim().to_string(),
            );
        }

        AppError::Index(format!("Chroma returned HTTP {}: {}", status, body.trim()))
    }

    async fn get_collection(&self, name: &str) -> Result<ChromaCollection> {
        let response = self
            .http
            .get(self.endpoint(&["collections", name]))
            .send()
            .await
            .map_err(|e| self.connection_error(e))?;

        if !response.status().is_success() {
            return Err(self.rejection(response, name).await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Index(format!("Invalid collection response: {}", e)))
    }

    async fn create_collection(&self, name: &str, spec: &CollectionSpec) -> Result<ChromaCollection> {
        let mut metadata = Map::new();
        metadata.insert("hnsw:space".into(), json!("cosine"));
        metadata.insert("embedding_provider".into(), json!(spec.embedding_provider));
        metadata.insert("embedding_model".into(), json!(spec.embedding_model));
        metadata.insert("dimensions".into(), json!(spec.dimensions));
        for (key, value) in &spec.extra {
            metadata.insert(key.clone(), json!(value));
        }

        let response = self
            .http
            .post(self.endpoint(&["collections"]))
            .json(&json!({
                "name": name,
                "metadata": metadata,
                "get_or_create": false,
            }))
            .send()
            .await
            .map_err(|e| self.connection_error(e))?;

        if !response.status().is_success() {
            return Err(self.rejection(response, name).await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Index(format!("Invalid collection response: {}", e)))
    }

    async fn upsert_batch(&self, name: &str, id: &str, batch: &[IndexRecord]) -> Result<()> {
        let body = UpsertRequest {
            ids: batch.iter().map(|r| r.id.as_str()).collect(),
            embeddings: batch.iter().map(|r| r.embedding.as_slice()).collect(),
            documents: batch.iter().map(|r| r.content.as_str()).collect(),
            metadatas: batch.iter().map(|r| &r.metadata).collect(),
        };

        let response = self
            .http
            .post(self.endpoint(&["collections", id, "upsert"]))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.connection_error(e))?;

        if !response.status().is_success() {
            return Err(self.rejection(response, name).await);
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for ChromaDBStore {
    fn provider_name(&self) -> &'static str {
        "chromadb"
    }

    async fn heartbeat(&self) -> Result<()> {
        let response = self
            .http
            .get(format!("{}/api/v2/heartbeat", self.url))
            .send()
            .await
            .map_err(|e| self.connection_error(e))?;

        if !response.status().is_success() {
            return Err(AppError::IndexConnection {
                url: self.url.clone(),
                message: format!("heartbeat returned HTTP {}", response.status()),
            });
        }
        Ok(())
    }

    async fn replace_collection(
        &self,
        name: &str,
        spec: &CollectionSpec,
        records: &[IndexRecord],
    ) -> Result<usize> {
        match self.delete_collection(name).await {
            Ok(()) | Err(AppError::CollectionNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let collection = self.create_collection(name, spec).await?;
        debug!(collection = name, id = %collection.id, "Created Chroma collection");

        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            self.upsert_batch(name, &collection.id, batch).await?;
            debug!(collection = name, batch_size = batch.len(), "Upserted batch");
        }

        Ok(records.len())
    }

    async fn collection_info(&self, name: &str) -> Result<CollectionInfo> {
        let collection = self.get_collection(name).await?;

        let response = self
            .http
            .get(self.endpoint(&["collections", collection.id.as_str(), "count"]))
            .send()
            .await
            .map_err(|e| self.connection_error(e))?;

        if !response.status().is_success() {
            return Err(self.rejection(response, name).await);
        }

        let document_count: usize = response
            .json()
            .await
            .map_err(|e| AppError::Index(format!("Invalid count response: {}", e)))?;

        Ok(CollectionInfo {
            name: name.to_string(),
            document_count,
            dimensions: collection.dimension,
        })
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.endpoint(&["collections", name]))
            .send()
            .await
            .map_err(|e| self.connection_error(e))?;

        if !response.status().is_success() {
            return Err(self.rejection(response, name).await);
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let target = self.get_collection(collection).await?;

        let response = self
            .http
            .post(self.endpoint(&["collections", target.id.as_str(), "query"]))
            .json(&json!({
                "query_embeddings": [embedding],
                "n_results": limit,
                "include": ["documents", "metadatas", "distances"],
            }))
            .send()
            .await
            .map_err(|e| self.connection_error(e))?;

        if !response.status().is_success() {
            return Err(self.rejection(response, collection).await);
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| AppError::Index(format!("Invalid query response: {}", e)))?;

        Ok(parsed.into_chunks())
    }
}

impl QueryResponse {
    /// Flattens the first (only) query's columns into scored chunks.
    fn into_chunks(self) -> Vec<ScoredChunk> {
        let documents = self
            .documents
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();
        let mut metadatas = self
            .metadatas
            .and_then(|m| m.into_iter().next())
            .unwrap_or_default()
            .into_iter();
        let mut distances = self
            .distances
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default()
            .into_iter();

        documents
            .into_iter()
            .map(|document| {
                let metadata = metadatas
                    .next()
                    .flatten()
                    .and_then(|m| serde_json::from_value::<ChunkMetadata>(m).ok());
                let distance = distances.next().flatten().unwrap_or(1.0);
                ScoredChunk {
                    content: document.unwrap_or_default(),
                    score: 1.0 - distance,
                    metadata,
                }
            })
            .collect()
    }
}
