use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, info};

use crate::{
    llm::structured::DEFAULT_TARGET_LANG,
    types::{ErrorResponse, TranslateRequest, Translation},
    AppState,
};

const MISSING_TEXT: &str = "请提供原文";
const TRANSLATION_FAILED: &str = "翻译失败";

/// Translate a word or sentence and return an example sentence.
///
/// Failures carry the underlying reason in `detail`.
#[utoipa::path(
    post,
    path = "/api/translate",
    request_body = TranslateRequest,
    responses(
        (status = 200, description = "Structured translation", body = Translation),
        (status = 400, description = "Missing text", body = ErrorResponse),
        (status = 500, description = "Model failure or unparseable reply")
    ),
    tag = "translate"
)]
pub async fn translate(
    State(state): State<AppState>,
    payload: std::result::Result<Json<TranslateRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(_) => return missing_text(),
    };
    let text = match request.text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => return missing_text(),
    };
    let target_lang = request
        .target_lang
        .as_deref()
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .unwrap_or(DEFAULT_TARGET_LANG);

    let result = match state.rag.translator().await {
        Ok(translator) => translator.translate(&text, target_lang).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(translation) => {
            info!(target_lang, chars = text.chars().count(), "Translated");
            Json(translation).into_response()
        }
        Err(e) => {
            error!(error = %e, target_lang, "Translation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": TRANSLATION_FAILED, "detail": e.to_string() })),
            )
                .into_response()
        }
    }
}

fn missing_text() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: MISSING_TEXT.to_string(),
        }),
    )
        .into_response()
}
