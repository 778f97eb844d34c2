//! HTTP API server for integration with other systems.
//!
//! Provides a retrieval endpoint and a streaming recommendation endpoint
//! backed by one shared pipeline.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::FilmSearchError;
use crate::orchestrator::Orchestrator;
use crate::rag::{ContextEntry, FilmSearch};
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Shared application state.
struct AppState {
    search: FilmSearch,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let orchestrator = Orchestrator::new(settings)?;
    let state = Arc::new(AppState {
        search: orchestrator.film_search(None)?,
    });

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("filmsearch API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Search", "POST /search");
    Output::kv("Ask (SSE)", "POST /ask");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/search", post(search))
        .route("/ask", post(ask))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    k: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<ContextEntry>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn status_for(error: &FilmSearchError) -> StatusCode {
    match error {
        FilmSearchError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        FilmSearchError::RetrievalUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        FilmSearchError::Embedding(_) | FilmSearchError::Generation(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: FilmSearchError) -> Response {
    let status = status_for(&error);
    warn!(%status, "Request failed: {}", error);
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn search(State(state): State<Arc<AppState>>, Json(req): Json<QueryRequest>) -> Response {
    let request_id = Uuid::new_v4();
    async move {
        let retriever = state.search.retriever();
        let k = req.k.unwrap_or_else(|| retriever.k());

        match retriever.retrieve(&req.query, k).await {
            Ok(context) => Json(SearchResponse {
                results: context.into_entries(),
            })
            .into_response(),
            Err(e) => error_response(e),
        }
    }
    .instrument(info_span!("search", %request_id))
    .await
}

async fn ask(State(state): State<Arc<AppState>>, Json(req): Json<QueryRequest>) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!("ask", %request_id);

    let answer = async {
        let k = req.k.unwrap_or_else(|| state.search.retriever().k());
        state.search.ask_with_k(&req.query, k).await
    }
    .instrument(span.clone())
    .await;

    let mut answer = match answer {
        Ok(answer) => answer,
        Err(e) => return span.in_scope(|| error_response(e)),
    };

    let events = async_stream::stream! {
        let mut fragments = 0usize;
        while let Some(item) = answer.next().await {
            match item {
                Ok(text) => {
                    fragments += 1;
                    yield Ok::<_, Infallible>(Event::default().event("answer").data(text));
                }
                Err(e) => {
                    span.in_scope(|| warn!(fragments, "Answer stream failed: {}", e));
                    yield Ok(Event::default().event("error").data(e.to_string()));
                    return;
                }
            }
        }
        span.in_scope(|| info!(fragments, "Answer stream complete"));
        yield Ok(Event::default().event("done").data(""));
    };

    Sse::new(events).keep_alive(KeepAlive::default()).into_response()
}
