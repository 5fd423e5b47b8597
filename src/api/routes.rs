use crate::api::handlers::{health, rag, report, translate};
use crate::types::{
    AnswerResponse, AskRequest, ErrorResponse, GenerateReportRequest, HealthResponse,
    ReportResponse, TranslateRequest, Translation,
};
use crate::AppState;
use axum::{
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    info(title = "ragbot", description = "Retrieval-augmented question answering"),
    paths(rag::ask, translate::translate, report::generate_report, health::health),
    components(schemas(
        AskRequest,
        AnswerResponse,
        TranslateRequest,
        Translation,
        GenerateReportRequest,
        ReportResponse,
        HealthResponse,
        ErrorResponse
    )),
    tags(
        (name = "rag", description = "Grounded question answering"),
        (name = "translate", description = "Structured translation"),
        (name = "report", description = "Weekly report generation"),
        (name = "system", description = "Health and metadata")
    )
)]
pub struct ApiDoc;

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Routes under `/api`, with CORS, body limit and request tracing applied.
pub fn create_router() -> Router<AppState> {
    let api = Router::new()
        .route("/ask", post(rag::ask))
        .route("/translate", post(translate::translate))
        .route("/generate-report", post(report::generate_report))
        .route("/health", get(health::health))
        .route("/openapi.json", get(openapi));

    Router::new()
        .nest("/api", api)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
