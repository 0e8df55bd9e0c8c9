use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::{IntoResponse, Response}, routing::{get, post}, Json, Router};
use docsearch_core::persist::discover_indexes;
use docsearch_core::{BooleanQueryParser, DiskPositionalIndex, Encoding, SearchError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchRequest {
    pub text: Option<String>,
    /// Collection (document type) to search, e.g. `txt` or `json`.
    #[serde(rename = "type")]
    pub collection: Option<String>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub documents: Vec<DocumentHit>,
    pub match_count: usize,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct DocumentHit {
    pub doc_id: u32,
    pub name: Option<String>,
    pub positions: Vec<u32>,
}

#[derive(Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub num_docs: usize,
    pub num_terms: usize,
    pub encoding: Encoding,
}

#[derive(Clone)]
pub struct AppState {
    pub collections: Arc<BTreeMap<String, DiskPositionalIndex>>,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    UnknownCollection(String),
    Corrupt(String),
    Internal(String),
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        if err.is_client_error() {
            ApiError::BadRequest(err.to_string())
        } else if err.is_corruption() {
            tracing::error!(error = %err, "index corruption");
            ApiError::Corrupt(err.to_string())
        } else {
            tracing::error!(error = %err, "search failed");
            ApiError::Internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::UnknownCollection(name) => (StatusCode::NOT_FOUND, format!("unknown collection {name:?}")),
            ApiError::Corrupt(m) => (StatusCode::INTERNAL_SERVER_ERROR, format!("index corruption: {m}")),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Open every completed collection under `index_dir` and build the router.
pub fn build_app(index_dir: impl AsRef<Path>) -> Result<Router> {
    let mut collections = BTreeMap::new();
    for (name, paths) in discover_indexes(index_dir.as_ref())? {
        let index = DiskPositionalIndex::open(paths)?;
        tracing::info!(collection = %name, num_docs = index.num_docs(), "loaded collection");
        collections.insert(name, index);
    }
    if collections.is_empty() {
        tracing::warn!(index_dir = %index_dir.as_ref().display(), "no collections found");
    }
    let app_state = AppState { collections: Arc::new(collections) };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/collections", get(collections_handler))
        .route("/search", post(search_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn collections_handler(State(state): State<AppState>) -> Json<Vec<CollectionInfo>> {
    let infos = state
        .collections
        .iter()
        .map(|(name, index)| CollectionInfo {
            name: name.clone(),
            num_docs: index.num_docs(),
            num_terms: index.vocabulary_len(),
            encoding: index.encoding(),
        })
        .collect();
    Json(infos)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let text = req.text.ok_or_else(|| ApiError::BadRequest("missing \"text\" field".into()))?;
    let name = req.collection.ok_or_else(|| ApiError::BadRequest("missing \"type\" field".into()))?;
    let index = state.collections.get(&name).ok_or(ApiError::UnknownCollection(name))?;

    let result = BooleanQueryParser::new(index).search(&text)?;
    let documents: Vec<DocumentHit> = result
        .documents
        .into_iter()
        .map(|p| DocumentHit { name: index.doc_name(p.doc_id).map(str::to_string), doc_id: p.doc_id, positions: p.positions })
        .collect();
    let message = if documents.is_empty() { "no matching documents" } else { "done" };
    Ok(Json(SearchResponse { match_count: result.match_count, documents, message }))
}
