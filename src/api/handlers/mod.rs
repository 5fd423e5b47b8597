//! API request handlers.

/// Liveness check.
pub mod health;
/// Grounded question answering.
pub mod rag;
/// Weekly report generation.
pub mod report;
/// Structured translation.
pub mod translate;
