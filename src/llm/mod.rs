//! LLM Provider Clients
//!
//! [`LLMClient`] is the narrow request/response contract the rest of the
//! crate uses to talk to a chat model. [`Provider`] is resolved once from
//! configuration and turned into a shared client.
//!
//! ```ignore
//! use ragbot::llm::Provider;
//!
//! let provider = Provider::from_config(&config)?;
//! let client = provider.create_client(config.request_timeout(), 0.0)?;
//! let answer = client.generate_with_system("Be brief.", "What is a horse?").await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;
pub mod ollama;
pub mod openai;
/// Few-shot weekly report generation.
pub mod report;
/// JSON extraction from model replies.
pub mod structured;

pub use client::{LLMClient, Provider};
pub use report::ReportGenerator;
pub use structured::Translator;
