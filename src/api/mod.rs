//! HTTP API Handlers and Routes
//!
//! A thin axum layer over [`crate::rag::RagRuntime`].
//!
//! # API Endpoints
//!
//! - `POST /api/ask` - Answer a question from the ingested collection
//! - `POST /api/translate` - Translate text and return an example sentence
//! - `GET /api/health` - Health check endpoint
//! - `GET /api/openapi.json` - OpenAPI document
//!
//! Errors are JSON objects with an `error` field; a missing question or text
//! is a 400, any backend failure a 500.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

pub use routes::{create_router, ApiDoc};
