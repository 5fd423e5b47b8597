//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! Offline, [`ingest`] loads a document, [`chunker`] splits it, [`embeddings`]
//! vectorises the chunks and the index client replaces the collection.
//!
//! Online, [`retriever`] fetches the top-K chunks for a question, [`prompts`]
//! injects them into the configured system prompt and [`answer`] calls the
//! model and attaches source previews. [`service`] ties the online steps
//! together behind a lazily initialised runtime.
//!
//! ```ignore
//! use ragbot::rag::service::RagRuntime;
//!
//! let runtime = RagRuntime::new(config)?;
//! let response = runtime.ask("What is a Przewalski's horse?").await?;
//! println!("{}", response.answer);
//! ```

pub mod answer;
pub mod chunker;
pub mod embeddings;
pub mod ingest;
pub mod prompts;
pub mod retriever;
pub mod service;

pub use service::{RagRuntime, RagService};
