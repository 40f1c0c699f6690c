//! HTTP surface: the merged search endpoints and the catalog lookups.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tokio::task::JoinSet;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeFile;

use search::SearchHit;

use crate::boot::Bootstrap;
use crate::config::Config;
use crate::services::{CourseDirectory, CoursePreview, DisciplineDirectory};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub boot: Arc<Bootstrap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    BadRequest,
    NotFound,
    ServiceUnavailable,
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = match self {
            RequestError::BadRequest => StatusCode::BAD_REQUEST,
            RequestError::NotFound => StatusCode::NOT_FOUND,
            RequestError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        };
        status.into_response()
    }
}

pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    let index_file = ServeFile::new(state.config.public_index());

    let api = Router::new()
        .route("/busca", get(search_handler))
        .route("/busca/ws", get(search_ws_handler))
        .route("/disciplina/:code", get(discipline_handler))
        .route("/curso/:code", get(course_handler))
        .route("/curso/:code/:variant", get(course_tree_handler))
        .route("/", get(|| async { StatusCode::NO_CONTENT }))
        .fallback(|| async { RequestError::BadRequest });

    let compress = state.config.compress_responses();
    let app = Router::new()
        .nest("/api", api)
        .fallback_service(index_file)
        .with_state(state)
        .layer(cors);
    if compress {
        app.layer(CompressionLayer::new())
    } else {
        app
    }
}

/// `limit` must be a plain non-negative integer within the configured guard.
/// Zero is accepted and simply yields an empty response.
fn parse_limit(raw: Option<&str>, config: &Config) -> Result<u32, RequestError> {
    match raw {
        None => Ok(config.default_search_limit),
        Some(text) => {
            let value: u32 = text.parse().map_err(|_| RequestError::BadRequest)?;
            if value > config.max_search_limit {
                return Err(RequestError::BadRequest);
            }
            Ok(value)
        }
    }
}

/// Merge two ascending hit lists, keeping at most `limit` of the best.
pub fn merge_ranked(left: Vec<SearchHit>, right: Vec<SearchHit>, limit: usize) -> Vec<SearchHit> {
    let mut merged = Vec::with_capacity(limit.min(left.len() + right.len()));
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while merged.len() < limit {
        let take_left = match (left.peek(), right.peek()) {
            (Some(a), Some(b)) => SearchHit::ranking(a, b) != Ordering::Greater,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let next = if take_left { left.next() } else { right.next() };
        merged.extend(next);
    }
    merged
}

/// One subtask per registered corpus; results are merged as they land, so
/// the buffer never grows past `limit` per merge step. Dropping the future
/// aborts the outstanding subtasks with it.
pub async fn fan_out_search(state: &AppState, query: &str, limit: u32) -> Vec<SearchHit> {
    let limit = limit as usize;
    if limit == 0 {
        return Vec::new();
    }
    let options = state.config.search_options();

    let mut subtasks = JoinSet::new();
    for searcher in state.boot.cache().searchers() {
        let query = query.to_string();
        subtasks.spawn(async move { searcher.search(&query, &options) });
    }

    let mut merged = Vec::new();
    while let Some(outcome) = subtasks.join_next().await {
        let Ok(mut hits) = outcome else { continue };
        hits.truncate(limit);
        merged = merge_ranked(merged, hits, limit);
    }
    merged
}

fn encode(config: &Config, value: &impl Serialize) -> Result<String, serde_json::Error> {
    if config.pretty_json() {
        // Round-tripping through Value sorts object keys.
        serde_json::to_string_pretty(&serde_json::to_value(value)?)
    } else {
        serde_json::to_string(value)
    }
}

fn json_response(config: &Config, value: &impl Serialize) -> Response {
    match encode(config, value) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(error) => {
            tracing::error!(%error, "response encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, RequestError> {
    let query = params.get("query").ok_or(RequestError::BadRequest)?;
    let limit = parse_limit(params.get("limit").map(String::as_str), &state.config)?;
    let hits = fan_out_search(&state, query, limit).await;
    Ok(json_response(&state.config, &hits))
}

async fn search_ws_handler(
    State(state): State<AppState>,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade.on_upgrade(move |socket| ws_search_loop(socket, state))
}

/// Every text frame is a query; replies are JSON arrays in arrival order.
async fn ws_search_loop(mut socket: WebSocket, state: AppState) {
    while let Some(Ok(frame)) = socket.recv().await {
        if let Message::Text(query) = frame {
            let hits = fan_out_search(&state, &query, state.config.default_search_limit).await;
            let payload = encode(&state.config, &hits).unwrap_or_else(|_| "[]".to_string());
            if socket.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    }
}

async fn discipline_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response, RequestError> {
    let directory = state
        .boot
        .instance::<DisciplineDirectory>()
        .await
        .map_err(|_| RequestError::ServiceUnavailable)?;
    let discipline = directory.get(&code).ok_or(RequestError::NotFound)?;
    Ok(json_response(&state.config, discipline))
}

async fn course_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response, RequestError> {
    let directory = state
        .boot
        .instance::<CourseDirectory>()
        .await
        .map_err(|_| RequestError::ServiceUnavailable)?;
    let course = directory.get(&code).ok_or(RequestError::NotFound)?;
    Ok(json_response(&state.config, &CoursePreview::of(course)))
}

async fn course_tree_handler(
    State(state): State<AppState>,
    Path((code, variant)): Path<(String, String)>,
) -> Result<Response, RequestError> {
    let directory = state
        .boot
        .instance::<CourseDirectory>()
        .await
        .map_err(|_| RequestError::ServiceUnavailable)?;
    let course = directory.get(&code).ok_or(RequestError::NotFound)?;
    let tree = CourseDirectory::variant_tree(course, &variant).ok_or(RequestError::NotFound)?;
    Ok(json_response(&state.config, tree))
}
