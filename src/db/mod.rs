//! Vector index access.
//!
//! - [`vectorstore`] defines the backend trait, backend selection and the
//!   in-memory backend.
//! - [`chromadb`] talks to a Chroma server over REST.
//! - [`client`] is the index client used by ingestion and retrieval.

pub mod chromadb;
pub mod client;
pub mod vectorstore;

pub use chromadb::ChromaDBStore;
pub use client::{SearchMode, VectorIndexClient};
pub use vectorstore::{CollectionInfo, InMemoryVectorStore, VectorStore, VectorStoreProvider};
