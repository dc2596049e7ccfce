//! HTTP query server.
//!
//! Serves the corpus over a small read-only JSON API. The corpus is loaded
//! lazily by the first request that needs it (see [`CorpusCache`]), so the
//! server starts even when the backing document is missing; such requests
//! get a 500 until the document appears.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/hymns` | Filtered, paginated hymns |
//! | `GET`  | `/hymns/facets` | Distinct filter values |
//! | `GET`  | `/hymn?reference=…` | One hymn by exact reference |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": "failed to read corpus document dataset/rv.json: No such file or directory" }
//! ```
//!
//! Status 500 when the corpus cannot be loaded, 404 for an unknown reference,
//! 400 when `/hymn` is called without a reference. Query parameters on
//! `/hymns` are never rejected: malformed values fall back to defaults.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser front-ends on
//! other origins can call the API directly.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::{Config, QueryConfig};
use crate::corpus::{Corpus, CorpusCache};
use crate::error::CorpusError;
use crate::get::find_hymn;
use crate::query::{facets, query, QueryParams};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    cache: Arc<CorpusCache>,
    limits: Arc<QueryConfig>,
}

impl AppState {
    pub fn new(cache: Arc<CorpusCache>, limits: QueryConfig) -> Self {
        Self {
            cache,
            limits: Arc::new(limits),
        }
    }

    async fn corpus(&self) -> Result<Arc<Corpus>, AppError> {
        self.cache.get().await.map_err(AppError::from)
    }
}

/// Build the router with all routes, CORS, and request tracing.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/hymns", get(handle_hymns))
        .route("/hymns/facets", get(handle_facets))
        .route("/hymn", get(handle_hymn))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until the process ends.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let cache = Arc::new(CorpusCache::from_config(config)?);
    let app = build_router(AppState::new(cache, config.query.clone()));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(
        bind = %config.server.bind,
        corpus = %config.corpus.path.display(),
        "hymnal server listening"
    );
    println!("hymnal server listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<CorpusError> for AppError {
    fn from(err: CorpusError) -> Self {
        error!(error = %err, "corpus unavailable");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

// ============ Handlers ============

async fn handle_hymns(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let corpus = state.corpus().await?;
    let params = QueryParams::from_pairs(pairs, &state.limits);
    Ok(Json(query(&corpus, &params)).into_response())
}

async fn handle_facets(State(state): State<AppState>) -> Result<Response, AppError> {
    let corpus = state.corpus().await?;
    Ok(Json(facets(&corpus)).into_response())
}

async fn handle_hymn(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let Some(reference) = pairs
        .into_iter()
        .find_map(|(key, value)| (key == "reference").then_some(value))
    else {
        return Err(AppError::bad_request("missing `reference` parameter"));
    };

    let corpus = state.corpus().await?;
    match find_hymn(&corpus, &reference) {
        Some(hymn) => Ok(Json(hymn).into_response()),
        None => Err(AppError::not_found(format!("hymn not found: {}", reference))),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
