//! HTTP API server for question answering.
//!
//! Query routes always answer 200 with either `{"answer": ...}` or
//! `{"error": ...}`, including for bodies that fail to deserialize.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, QueryRequest, QueryResponse};
use crate::rag::ContextChunk;
use crate::template::TemplateInfo;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let orchestrator = Orchestrator::new(settings)?;
    let app = router(orchestrator);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("docqa API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Ask", "POST /ask");
    Output::kv("Ask (envelope)", "POST /ask/invoke");
    Output::kv("Search", "POST /search");
    Output::kv("Templates", "GET  /templates");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

/// Build the API router around an orchestrator.
pub fn router(orchestrator: Orchestrator) -> Router {
    let state = Arc::new(AppState { orchestrator });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ask", post(ask))
        .route("/ask/invoke", post(ask_invoke))
        .route("/search", post(search))
        .route("/templates", get(templates))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

/// `{"input": {...}}` envelope accepted by `/ask/invoke`.
#[derive(Deserialize)]
struct InvokeRequest {
    input: QueryRequest,
}

/// The answer text, or the error object, under `output`.
#[derive(Serialize)]
struct InvokeResponse {
    output: serde_json::Value,
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<ContextChunk>,
}

#[derive(Serialize)]
struct TemplatesResponse {
    default: String,
    templates: Vec<TemplateInfo>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

fn rejected(rejection: JsonRejection) -> QueryResponse {
    QueryResponse::Error {
        error: format!("Invalid request: {}", rejection.body_text()),
    }
}

async fn ask(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Json<QueryResponse> {
    match payload {
        Ok(Json(req)) => Json(state.orchestrator.query(&req).await),
        Err(rejection) => Json(rejected(rejection)),
    }
}

async fn ask_invoke(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<InvokeRequest>, JsonRejection>,
) -> Json<InvokeResponse> {
    let response = match payload {
        Ok(Json(req)) => state.orchestrator.query(&req.input).await,
        Err(rejection) => rejected(rejection),
    };
    let output = match response {
        QueryResponse::Answer { answer } => serde_json::Value::String(answer),
        QueryResponse::Error { error } => serde_json::json!({ "error": error }),
    };
    Json(InvokeResponse { output })
}

async fn search(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<SearchRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            let error = format!("Invalid request: {}", rejection.body_text());
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error })).into_response();
        }
    };
    let limit = req.limit.unwrap_or(state.orchestrator.settings().rag.top_k);

    match state.orchestrator.search(&req.query, limit).await {
        Ok(results) => Json(SearchResponse { results }).into_response(),
        Err(e) => {
            let status = if e.is_caller_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(ErrorResponse { error: e.to_string() })).into_response()
        }
    }
}

async fn templates(State(state): State<Arc<AppState>>) -> Json<TemplatesResponse> {
    let orchestrator = &state.orchestrator;
    Json(TemplatesResponse {
        default: orchestrator.settings().rag.default_template.clone(),
        templates: orchestrator.registry().list().map(TemplateInfo::from).collect(),
    })
}
