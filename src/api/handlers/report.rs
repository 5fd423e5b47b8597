use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, info};

use crate::{
    types::{ErrorResponse, GenerateReportRequest, ReportResponse},
    AppState,
};

const MISSING_NOTES: &str = "请提供工作记录";
const GENERATION_FAILED: &str = "生成失败";

/// Turn a week of work notes into a Markdown report.
#[utoipa::path(
    post,
    path = "/api/generate-report",
    request_body = GenerateReportRequest,
    responses(
        (status = 200, description = "Generated report", body = ReportResponse),
        (status = 400, description = "Missing notes", body = ErrorResponse),
        (status = 500, description = "Model failure")
    ),
    tag = "report"
)]
pub async fn generate_report(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GenerateReportRequest>, JsonRejection>,
) -> Response {
    let notes = match payload {
        Ok(Json(GenerateReportRequest { notes: Some(notes) })) if !notes.trim().is_empty() => {
            notes
        }
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: MISSING_NOTES.to_string(),
                }),
            )
                .into_response()
        }
    };

    let result = match state.rag.report_generator().await {
        Ok(reporter) => reporter.generate(&notes).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(report) => {
            info!(chars = notes.chars().count(), "Weekly report generated");
            Json(ReportResponse { report }).into_response()
        }
        Err(e) => {
            error!(error = %e, "Report generation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": GENERATION_FAILED, "detail": e.to_string() })),
            )
                .into_response()
        }
    }
}
