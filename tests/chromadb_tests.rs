//! Chroma v2 REST contract tests, against wiremock.

mod common;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use common::mocks::MockEmbeddingClient;
use ragbot::{
    db::{ChromaDBStore, SearchMode, VectorIndexClient, VectorStore},
    rag::ingest::IngestionPipeline,
    types::{AppError, CollectionSpec, ProviderFailureKind},
};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE: &str = "/api/v2/tenants/default_tenant/databases/default_database";

fn store(url: &str) -> ChromaDBStore {
    ChromaDBStore::new(url, "default_tenant", "default_database", Duration::from_secs(5)).unwrap()
}

async fn mount_collection(server: &MockServer, name: &str, id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/collections/{name}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "name": name,
            "dimension": 5,
            "metadata": { "hnsw:space": "cosine" }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_heartbeat() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/heartbeat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "nanosecond heartbeat": 1 })),
        )
        .expect(1)
        .mount(&server)
        .await;

    store(&server.uri()).heartbeat().await.unwrap();
}

#[tokio::test]
async fn test_unreachable_server_is_connection_error() {
    let err = store("http://127.0.0.1:1").heartbeat().await.unwrap_err();
    assert!(matches!(err, AppError::IndexConnection { url, .. } if url == "http://127.0.0.1:1"));
}

#[tokio::test]
async fn test_ingest_replaces_collection() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{BASE}/collections/horse")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "NotFoundError",
            "message": "Collection [horse] does not exists"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{BASE}/collections")))
        .and(body_partial_json(json!({
            "name": "horse",
            "metadata": {
                "hnsw:space": "cosine",
                "embedding_provider": "mock",
                "embedding_model": "bag-of-words"
            }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "c-1", "name": "horse" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{BASE}/collections/c-1/upsert")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"The horse runs.\n\nThe zebra grazes.").unwrap();

    let pipeline = IngestionPipeline::new(
        Arc::new(MockEmbeddingClient::new()),
        VectorIndexClient::new(Arc::new(store(&server.uri()))),
        server.uri(),
    );
    let written = pipeline.ingest(file.path(), 300, 80, "horse").await.unwrap();
    assert_eq!(written, 1);

    let requests = server.received_requests().await.unwrap();
    let upsert = requests
        .iter()
        .find(|r| r.url.path().ends_with("/upsert"))
        .unwrap();
    let body: Value = upsert.body_json().unwrap();
    assert_eq!(body["ids"].as_array().unwrap().len(), written);
    assert_eq!(body["documents"][0], "The horse runs.\n\nThe zebra grazes.");
    assert_eq!(body["metadatas"][0]["chunk_index"], 0);
    assert_eq!(body["embeddings"][0].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_unreachable_index_during_ingest_has_hint() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"The horse runs.").unwrap();

    let pipeline = IngestionPipeline::new(
        Arc::new(MockEmbeddingClient::new()),
        VectorIndexClient::new(Arc::new(store("http://127.0.0.1:1"))),
        "http://127.0.0.1:1",
    );
    let err = pipeline.ingest(file.path(), 300, 80, "horse").await.unwrap_err();

    assert!(matches!(err.root(), AppError::IndexConnection { .. }));
    assert_eq!(
        err.hint(),
        Some("start the Chroma server first or set CHROMA_URL. Current CHROMA_URL=http://127.0.0.1:1")
    );
}

#[tokio::test]
async fn test_dimension_rejection_is_provider_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{BASE}/collections/horse")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{BASE}/collections")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "c-1", "name": "horse" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{BASE}/collections/c-1/upsert")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "InvalidArgumentError",
            "message": "Collection expecting embedding with dimension of 768, got 5"
        })))
        .mount(&server)
        .await;

    let records = vec![ragbot::types::IndexRecord {
        id: "r-1".into(),
        content: "horse".into(),
        embedding: vec![0.0; 5],
        metadata: Default::default(),
    }];
    let spec = CollectionSpec {
        dimensions: 5,
        ..Default::default()
    };

    let err = store(&server.uri())
        .replace_collection("horse", &spec, &records)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Provider {
            kind: ProviderFailureKind::DimensionMismatch,
            ..
        }
    ));
}

#[tokio::test]
async fn test_query_converts_distance_to_similarity() {
    let server = MockServer::start().await;
    mount_collection(&server, "horse", "c-1").await;
    Mock::given(method("POST"))
        .and(path(format!("{BASE}/collections/c-1/query")))
        .and(body_partial_json(json!({
            "n_results": 2,
            "include": ["documents", "metadatas", "distances"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ids": [["a", "b"]],
            "documents": [["The horse runs.", "A horse and a donkey."]],
            "metadatas": [[{ "source": "horse.txt", "chunk_index": 0 }, { "source": "horse.txt", "chunk_index": 1 }]],
            "distances": [[0.05, 0.3]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let index = VectorIndexClient::new(Arc::new(store(&server.uri())));
    let result = index
        .query("horse", "horse", &MockEmbeddingClient::new(), 2, SearchMode::Similarity)
        .await
        .unwrap();

    assert_eq!(result.len(), 2);
    assert!((result.chunks[0].score - 0.95).abs() < 1e-6);
    assert!((result.chunks[1].score - 0.7).abs() < 1e-6);
    assert_eq!(result.chunks[1].metadata.as_ref().unwrap().chunk_index, 1);
}

#[tokio::test]
async fn test_mmr_falls_back_to_similarity() {
    let server = MockServer::start().await;
    mount_collection(&server, "horse", "c-1").await;
    Mock::given(method("POST"))
        .and(path(format!("{BASE}/collections/c-1/query")))
        .and(body_partial_json(json!({ "n_results": 3 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "documents": [["one"]],
            "distances": [[0.2]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let index = VectorIndexClient::new(Arc::new(store(&server.uri())));
    let result = index
        .query("horse", "horse", &MockEmbeddingClient::new(), 3, SearchMode::Mmr)
        .await
        .unwrap();

    assert_eq!(result.contents().collect::<Vec<_>>(), vec!["one"]);
}

#[tokio::test]
async fn test_query_missing_collection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/collections/unicorn")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "NotFoundError",
            "message": "Collection [unicorn] does not exists"
        })))
        .mount(&server)
        .await;

    let index = VectorIndexClient::new(Arc::new(store(&server.uri())));
    let err = index
        .query("unicorn", "horse", &MockEmbeddingClient::new(), 6, SearchMode::Similarity)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::CollectionNotFound(name) if name == "unicorn"));
}

#[tokio::test]
async fn test_collection_info_reads_count() {
    let server = MockServer::start().await;
    mount_collection(&server, "horse", "c-1").await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/collections/c-1/count")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(42)))
        .mount(&server)
        .await;

    let info = store(&server.uri()).collection_info("horse").await.unwrap();
    assert_eq!(info.document_count, 42);
    assert_eq!(info.dimensions, Some(5));
    assert_eq!(store(&server.uri()).count("horse").await.unwrap(), 42);
}

#[tokio::test]
async fn test_collection_name_stays_in_its_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{BASE}/collections/horse%20notes%2F2024%3Fdraft")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/collections/horse%20notes%2F2024%3Fdraft")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "c-7",
            "name": "horse notes/2024?draft",
            "dimension": 5
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/collections/c-7/count")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(3)))
        .mount(&server)
        .await;

    let store = store(&server.uri());
    store.delete_collection("horse notes/2024?draft").await.unwrap();
    let info = store.collection_info("horse notes/2024?draft").await.unwrap();
    assert_eq!(info.document_count, 3);
}
