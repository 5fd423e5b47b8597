//! # ragbot - retrieval-augmented question answering
//!
//! Splits a document into overlapping chunks, embeds them, stores them in a
//! vector index, and answers questions with a language model grounded in the
//! chunks retrieved for each question.
//!
//! ## Overview
//!
//! ragbot can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `ragbot` binary
//! 2. **As a library** - Use the pipeline pieces in your own project
//!
//! ### Ingestion
//!
//! ```rust,ignore
//! use ragbot::db::{VectorIndexClient, VectorStoreProvider};
//! use ragbot::rag::ingest::IngestionPipeline;
//! use ragbot::{Config, EmbeddingProvider};
//!
//! let config = Config::load("ragbot.toml")?;
//! let timeout = config.request_timeout();
//! let embedder = EmbeddingProvider::from_config(&config.embedding)?.create_client(timeout)?;
//! let store = VectorStoreProvider::from_config(&config.index)?.create_store(timeout)?;
//!
//! let pipeline = IngestionPipeline::new(embedder, VectorIndexClient::new(store), &config.index.url);
//! let written = pipeline
//!     .ingest(&config.ingest.source_file, 300, 80, &config.index.collection)
//!     .await?;
//! println!("{} chunks", written);
//! ```
//!
//! ### Asking
//!
//! ```rust,ignore
//! let runtime = RagRuntime::new(Arc::new(config))?;
//! let response = runtime.ask("普氏野马生活在哪里？").await?;
//! println!("{}", response.answer);
//! for source in &response.sources {
//!     println!("- {}", source);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`cli`] - Command-line definitions and terminal output
//! - [`db`] - Vector index backends (Chroma, in-memory) and the index client
//! - [`llm`] - Chat model clients, structured output and report generation
//! - [`rag`] - Chunking, embeddings, ingestion, retrieval, prompts, answers
//! - [`types`] - Common types and error handling
//! - [`utils`] - Configuration
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// Vector index backends and client.
pub mod db;
/// LLM provider clients and abstractions.
pub mod llm;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use db::{VectorIndexClient, VectorStore};
pub use llm::{LLMClient, Provider, ReportGenerator, Translator};
pub use rag::embeddings::{EmbeddingClient, EmbeddingProvider};
pub use rag::{RagRuntime, RagService};
pub use types::{AppError, Result};
pub use utils::Config;

use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Effective configuration
    pub config: Arc<Config>,
    /// Lazily initialised RAG pipeline and translator
    pub rag: Arc<RagRuntime>,
}

impl AppState {
    pub fn new(config: Arc<Config>, rag: Arc<RagRuntime>) -> Self {
        Self { config, rag }
    }
}
