//! Grounded question answering over the ingested collection.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::{debug, error};

use crate::{
    types::{AnswerResponse, AppError, AskRequest, ErrorResponse, Result},
    AppState,
};

/// Message returned when the request carries no usable question.
pub const MISSING_QUESTION: &str = "请提供问题";

/// Answer a question from the retrieved context.
///
/// A missing, blank or unparseable question is rejected before any backend is
/// contacted.
#[utoipa::path(
    post,
    path = "/api/ask",
    request_body = AskRequest,
    responses(
        (status = 200, description = "Grounded answer with source previews", body = AnswerResponse),
        (status = 400, description = "Missing question", body = ErrorResponse),
        (status = 500, description = "Retrieval or model failure", body = ErrorResponse)
    ),
    tag = "rag"
)]
pub async fn ask(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>> {
    let question = match payload {
        Ok(Json(AskRequest {
            question: Some(question),
        })) if !question.trim().is_empty() => question,
        Ok(_) => return Err(AppError::InvalidInput(MISSING_QUESTION.into())),
        Err(rejection) => {
            debug!(reason = %rejection.body_text(), "Rejected ask payload");
            return Err(AppError::InvalidInput(MISSING_QUESTION.into()));
        }
    };

    let response = state.rag.ask(&question).await.inspect_err(|e| {
        error!(error = %e, "Failed to answer question");
    })?;

    Ok(Json(response))
}
