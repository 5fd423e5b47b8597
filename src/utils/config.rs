//! Configuration for ragbot.
//!
//! Settings come from an optional TOML file (`ragbot.toml`) and are then
//! overridden by environment variables (a `.env` file is honoured). Every field
//! has a default so an empty environment yields a working local setup
//! (Ollama embeddings, Chroma on localhost).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::types::{AppError, Result};

/// Default configuration file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "ragbot.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retriever: RetrieverConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Budget applied to every outbound embedding, index and model call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3003
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// ============= Embedding Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// `ollama` or `openai`. Checked when the provider is constructed.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    #[serde(default = "default_ollama_base_url")]
    pub ollama_base_url: String,

    #[serde(default = "default_ollama_embedding_model")]
    pub ollama_model: String,

    #[serde(default)]
    pub openai_api_key: Option<String>,

    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    #[serde(default = "default_openai_embedding_model")]
    pub openai_model: String,
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}

fn default_ollama_base_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_ollama_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            ollama_base_url: default_ollama_base_url(),
            ollama_model: default_ollama_embedding_model(),
            openai_api_key: None,
            openai_base_url: default_openai_base_url(),
            openai_model: default_openai_embedding_model(),
        }
    }
}

// ============= Vector Index Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// `chromadb` (default) or `memory` for a process-local index.
    #[serde(default = "default_index_backend")]
    pub backend: String,

    #[serde(default = "default_chroma_url")]
    pub url: String,

    #[serde(default = "default_chroma_tenant")]
    pub tenant: String,

    #[serde(default = "default_chroma_database")]
    pub database: String,

    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_index_backend() -> String {
    "chromadb".to_string()
}

fn default_chroma_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_chroma_tenant() -> String {
    "default_tenant".to_string()
}

fn default_chroma_database() -> String {
    "default_database".to_string()
}

fn default_collection() -> String {
    "horse".to_string()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: default_index_backend(),
            url: default_chroma_url(),
            tenant: default_chroma_tenant(),
            database: default_chroma_database(),
            collection: default_collection(),
        }
    }
}

// ============= Retrieval Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieverConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// `similarity` or `mmr`.
    #[serde(default = "default_search_type")]
    pub search_type: String,

    #[serde(default = "default_prompt_template")]
    pub prompt_template: String,

    /// Characters of each retrieved chunk echoed back as a source preview.
    #[serde(default = "default_source_preview_chars")]
    pub source_preview_chars: usize,
}

fn default_top_k() -> usize {
    6
}

fn default_search_type() -> String {
    "similarity".to_string()
}

fn default_prompt_template() -> String {
    "general_qa".to_string()
}

fn default_source_preview_chars() -> usize {
    100
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            search_type: default_search_type(),
            prompt_template: default_prompt_template(),
            source_preview_chars: default_source_preview_chars(),
        }
    }
}

// ============= Ingestion Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_source_file")]
    pub source_file: String,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_source_file() -> String {
    "data/horse.txt".to_string()
}

fn default_chunk_size() -> usize {
    300
}

fn default_chunk_overlap() -> usize {
    80
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source_file: default_source_file(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

// ============= LLM Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// `deepseek`, `openai` or `ollama`.
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    #[serde(default)]
    pub deepseek_api_key: Option<String>,

    #[serde(default = "default_deepseek_model")]
    pub deepseek_model: String,

    #[serde(default = "default_deepseek_base_url")]
    pub deepseek_base_url: String,

    #[serde(default = "default_openai_chat_model")]
    pub openai_model: String,

    #[serde(default = "default_ollama_chat_model")]
    pub ollama_model: String,
}

fn default_llm_provider() -> String {
    "deepseek".to_string()
}

fn default_deepseek_model() -> String {
    "deepseek-chat".to_string()
}

fn default_deepseek_base_url() -> String {
    "https://api.deepseek.com/v1".to_string()
}

fn default_openai_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_ollama_chat_model() -> String {
    "llama3.2".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            deepseek_api_key: None,
            deepseek_model: default_deepseek_model(),
            deepseek_base_url: default_deepseek_base_url(),
            openai_model: default_openai_chat_model(),
            ollama_model: default_ollama_chat_model(),
        }
    }
}

// ============= Loading =============

impl Config {
    /// Loads the TOML file at `path` (a missing file is not an error), reads
    /// `.env`, then applies overrides from the process environment.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_file(path)?;
        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Parses a TOML file, returning defaults when the file does not exist.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Invalid TOML: {}", e)))
    }

    /// Applies overrides from a key lookup. Tests pass a map-backed closure so
    /// the process environment is never touched.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = parse_var("PORT", &v)?;
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.server.log_level = v;
        }
        if let Some(v) = get("REQUEST_TIMEOUT_SECS") {
            self.server.request_timeout_secs = parse_var("REQUEST_TIMEOUT_SECS", &v)?;
        }

        if let Some(v) = get("EMBEDDING_PROVIDER") {
            self.embedding.provider = v;
        }
        if let Some(v) = get("OLLAMA_BASE_URL") {
            self.embedding.ollama_base_url = v;
        }
        if let Some(v) = get("OLLAMA_EMBEDDING_MODEL") {
            self.embedding.ollama_model = v;
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.embedding.openai_api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.embedding.openai_base_url = v;
        }
        if let Some(v) = get("OPENAI_EMBEDDING_MODEL") {
            self.embedding.openai_model = v;
        }

        if let Some(v) = get("VECTOR_STORE") {
            self.index.backend = v;
        }
        if let Some(v) = get("CHROMA_URL") {
            self.index.url = v;
        }
        if let Some(v) = get("CHROMA_TENANT") {
            self.index.tenant = v;
        }
        if let Some(v) = get("CHROMA_DATABASE") {
            self.index.database = v;
        }
        if let Some(v) = get("CHROMA_COLLECTION") {
            self.index.collection = v;
        }

        if let Some(v) = get("RETRIEVER_TOP_K") {
            self.retriever.top_k = parse_var("RETRIEVER_TOP_K", &v)?;
        }
        if let Some(v) = get("RETRIEVER_SEARCH_TYPE") {
            self.retriever.search_type = v;
        }
        if let Some(v) = get("PROMPT_TEMPLATE") {
            self.retriever.prompt_template = v;
        }
        if let Some(v) = get("SOURCE_PREVIEW_CHARS") {
            self.retriever.source_preview_chars = parse_var("SOURCE_PREVIEW_CHARS", &v)?;
        }

        if let Some(v) = get("SOURCE_FILE_PATH") {
            self.ingest.source_file = v;
        }
        if let Some(v) = get("CHUNK_SIZE") {
            self.ingest.chunk_size = parse_var("CHUNK_SIZE", &v)?;
        }
        if let Some(v) = get("CHUNK_OVERLAP") {
            self.ingest.chunk_overlap = parse_var("CHUNK_OVERLAP", &v)?;
        }

        if let Some(v) = get("LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Some(v) = get("DEEPSEEK_API_KEY") {
            self.llm.deepseek_api_key = Some(v);
        }
        if let Some(v) = get("DEEPSEEK_MODEL") {
            self.llm.deepseek_model = v;
        }
        if let Some(v) = get("DEEPSEEK_BASE_URL") {
            self.llm.deepseek_base_url = v;
        }
        if let Some(v) = get("OPENAI_CHAT_MODEL") {
            self.llm.openai_model = v;
        }
        if let Some(v) = get("OLLAMA_CHAT_MODEL") {
            self.llm.ollama_model = v;
        }

        Ok(self)
    }

    /// Validates values that do not depend on provider construction.
    pub fn validate(&self) -> Result<()> {
        if self.ingest.chunk_size == 0 {
            return Err(AppError::Config("CHUNK_SIZE must be positive".into()));
        }
        if self.ingest.chunk_overlap >= self.ingest.chunk_size {
            return Err(AppError::Config(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.ingest.chunk_overlap, self.ingest.chunk_size
            )));
        }
        if self.retriever.top_k == 0 {
            return Err(AppError::Config("RETRIEVER_TOP_K must be positive".into()));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "REQUEST_TIMEOUT_SECS must be positive".into(),
            ));
        }
        if self.index.collection.trim().is_empty() {
            return Err(AppError::Config("CHROMA_COLLECTION must not be empty".into()));
        }
        crate::db::client::SearchMode::from_str(&self.retriever.search_type)?;
        crate::db::vectorstore::VectorStoreProvider::from_config(&self.index)?;

        Ok(())
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Human-readable view of the effective configuration with secrets masked.
    pub fn redacted(&self) -> RedactedConfig<'_> {
        RedactedConfig(self)
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| AppError::Config(format!("{}={:?} is not valid: {}", key, value, e)))
}

fn mask(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "********",
        None => "(unset)",
    }
}

pub struct RedactedConfig<'a>(&'a Config);

impl RedactedConfig<'_> {
    /// Ordered key/value rows, secrets masked.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let c = self.0;
        vec![
            ("HOST", c.server.host.clone()),
            ("PORT", c.server.port.to_string()),
            ("LOG_LEVEL", c.server.log_level.clone()),
            (
                "REQUEST_TIMEOUT_SECS",
                c.server.request_timeout_secs.to_string(),
            ),
            ("EMBEDDING_PROVIDER", c.embedding.provider.clone()),
            ("OLLAMA_BASE_URL", c.embedding.ollama_base_url.clone()),
            ("OLLAMA_EMBEDDING_MODEL", c.embedding.ollama_model.clone()),
            ("OPENAI_API_KEY", mask(&c.embedding.openai_api_key).into()),
            ("OPENAI_BASE_URL", c.embedding.openai_base_url.clone()),
            ("OPENAI_EMBEDDING_MODEL", c.embedding.openai_model.clone()),
            ("VECTOR_STORE", c.index.backend.clone()),
            ("CHROMA_URL", c.index.url.clone()),
            ("CHROMA_TENANT", c.index.tenant.clone()),
            ("CHROMA_DATABASE", c.index.database.clone()),
            ("CHROMA_COLLECTION", c.index.collection.clone()),
            ("RETRIEVER_TOP_K", c.retriever.top_k.to_string()),
            ("RETRIEVER_SEARCH_TYPE", c.retriever.search_type.clone()),
            ("PROMPT_TEMPLATE", c.retriever.prompt_template.clone()),
            (
                "SOURCE_PREVIEW_CHARS",
                c.retriever.source_preview_chars.to_string(),
            ),
            ("SOURCE_FILE_PATH", c.ingest.source_file.clone()),
            ("CHUNK_SIZE", c.ingest.chunk_size.to_string()),
            ("CHUNK_OVERLAP", c.ingest.chunk_overlap.to_string()),
            ("LLM_PROVIDER", c.llm.provider.clone()),
            ("DEEPSEEK_API_KEY", mask(&c.llm.deepseek_api_key).into()),
            ("DEEPSEEK_MODEL", c.llm.deepseek_model.clone()),
            ("DEEPSEEK_BASE_URL", c.llm.deepseek_base_url.clone()),
            ("OPENAI_CHAT_MODEL", c.llm.openai_model.clone()),
            ("OLLAMA_CHAT_MODEL", c.llm.ollama_model.clone()),
        ]
    }
}

impl fmt::Display for RedactedConfig<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.rows() {
            writeln!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}
