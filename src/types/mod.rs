use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

// ============= API Request/Response Types =============

/// Body of `POST /api/ask`.
///
/// `question` is optional at the serde level so that a missing field is
/// reported as a 400 with an `error` payload instead of an extractor rejection.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct AskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
}

/// Answer text plus previews of the chunks that grounded it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnswerResponse {
    pub answer: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct TranslateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_lang: Option<String>,
}

/// Structured translation returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Translation {
    pub original: String,
    pub translation: String,
    pub example: String,
}

/// Body of `POST /api/generate-report`: free-form notes for the week.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct GenerateReportRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Markdown weekly report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReportResponse {
    pub report: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

// ============= RAG Types =============

/// Dense vector produced by an embedding provider.
pub type Embedding = Vec<f32>;

/// Raw text loaded from a source. Never mutated after loading.
#[derive(Debug, Clone)]
pub struct Document {
    pub source: String,
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }
}

/// A bounded slice of a [`Document`].
///
/// Borrows both its content and its source from the document it was cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub content: &'a str,
    pub source: &'a str,
    /// Position in the chunk sequence, starting at 0.
    pub index: usize,
    /// Byte offset of `content` inside the document text.
    pub start: usize,
    /// 1-based line range covered by the chunk.
    pub line_from: usize,
    pub line_to: usize,
}

impl Chunk<'_> {
    /// Byte offset one past the end of `content`.
    pub fn end(&self) -> usize {
        self.start + self.content.len()
    }

    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Metadata stored next to each chunk in the vector index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub chunk_index: usize,
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub line_from: usize,
    #[serde(default)]
    pub line_to: usize,
}

impl From<&Chunk<'_>> for ChunkMetadata {
    fn from(chunk: &Chunk<'_>) -> Self {
        Self {
            source: chunk.source.to_string(),
            chunk_index: chunk.index,
            start: chunk.start,
            line_from: chunk.line_from,
            line_to: chunk.line_to,
        }
    }
}

/// One record written to a collection.
#[derive(Debug, Clone)]
pub struct IndexRecord {
    pub id: String,
    pub content: String,
    pub embedding: Embedding,
    pub metadata: ChunkMetadata,
}

/// Collection-level attributes recorded when a collection is (re)built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub dimensions: usize,
    pub embedding_provider: String,
    pub embedding_model: String,
    /// Free-form attributes, e.g. the ingestion timestamp.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

/// Chunk content returned by a query together with its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub content: String,
    /// Higher is more similar.
    pub score: f32,
    pub metadata: Option<ChunkMetadata>,
}

/// Ordered (descending similarity) result of a retrieval.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    pub chunks: Vec<ScoredChunk>,
}

impl RetrievalResult {
    /// Builds a result, enforcing descending score order and the `top_k` bound.
    pub fn ranked(mut chunks: Vec<ScoredChunk>, top_k: usize) -> Self {
        chunks.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        chunks.truncate(top_k);
        Self { chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn contents(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(|c| c.content.as_str())
    }
}

// ============= Error Types =============

/// Why an embedding or model backend call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFailureKind {
    Timeout,
    Unavailable,
    ModelNotFound,
    MalformedResponse,
    DimensionMismatch,
    Rejected,
}

impl std::fmt::Display for ProviderFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
            Self::ModelNotFound => "model not found",
            Self::MalformedResponse => "malformed response",
            Self::DimensionMismatch => "dimension mismatch",
            Self::Rejected => "rejected",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Provider error ({provider}, {kind}): {message}")]
    Provider {
        provider: String,
        kind: ProviderFailureKind,
        message: String,
    },

    #[error("Vector index unreachable at {url}: {message}")]
    IndexConnection { url: String, message: String },

    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Model invocation error: {0}")]
    ModelInvocation(String),

    #[error("Response parse error: {0}")]
    ResponseParse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{error}\nHint: {hint}")]
    Hinted {
        #[source]
        error: Box<AppError>,
        hint: String,
    },
}

impl AppError {
    pub fn provider(
        provider: impl Into<String>,
        kind: ProviderFailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            kind,
            message: message.into(),
        }
    }

    /// Attaches a remediation hint to this error.
    pub fn with_hint(self, hint: impl Into<String>) -> Self {
        Self::Hinted {
            error: Box::new(self),
            hint: hint.into(),
        }
    }

    /// The error underneath any hint decoration.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::Hinted { error, .. } => error.root(),
            other => other,
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            AppError::Hinted { hint, .. } => Some(hint),
            _ => None,
        }
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        match self.root() {
            AppError::InvalidInput(_) => axum::http::StatusCode::BAD_REQUEST,
            _ => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let message = match self.root() {
            AppError::InvalidInput(msg) => msg.clone(),
            _ => self.to_string(),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    fn scored(content: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            content: content.to_string(),
            score,
            metadata: None,
        }
    }

    #[test]
    fn test_ranked_orders_and_truncates() {
        let result = RetrievalResult::ranked(
            vec![scored("b", 0.2), scored("a", 0.9), scored("c", 0.5)],
            2,
        );

        assert_eq!(result.len(), 2);
        assert_eq!(result.contents().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn test_hint_is_rendered_after_error() {
        let err = AppError::CollectionNotFound("horse".into()).with_hint("run ingest first");

        assert_eq!(
            err.to_string(),
            "Collection 'horse' not found\nHint: run ingest first"
        );
        assert_eq!(err.hint(), Some("run ingest first"));
        assert!(matches!(err.root(), AppError::CollectionNotFound(_)));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::InvalidInput("x".into()).into_response().status(),
            axum::http::StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::ModelInvocation("x".into()).into_response().status(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::IndexConnection {
                url: "http://localhost:8000".into(),
                message: "refused".into()
            }
            .into_response()
            .status(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
