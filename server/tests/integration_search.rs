use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use docsearch_core::persist::IndexPaths;
use docsearch_core::{DiskIndexWriter, DocumentTokens, Encoding, PositionalInvertedIndex};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::fs::OpenOptions;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

fn build_tiny_index(dir: &Path) {
    let mut index = PositionalInvertedIndex::new();
    index.add_document(&DocumentTokens::from_text("doc0", "Rust is great. rust systems programming.")).unwrap();
    index.add_document(&DocumentTokens::from_text("doc1", "Learning systems design.")).unwrap();
    DiskIndexWriter::new(&index, IndexPaths::new(dir.join("txt")), Encoding::VariableByte)
        .write_index()
        .unwrap();
}

async fn post(app: Router, body: Value) -> (StatusCode, Value) {
    let req = Request::post("/search")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn search_returns_matching_documents() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let app = docsearch_server::build_app(dir.path()).unwrap();

    let (status, json) = post(app, json!({ "text": "systems", "type": "txt" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["match_count"], 2);
    let docs = json["documents"].as_array().unwrap();
    assert_eq!(docs[0]["doc_id"], 0);
    assert_eq!(docs[0]["name"], "doc0");
    assert_eq!(docs[0]["positions"], json!([4]));
    assert_eq!(docs[1]["name"], "doc1");
}

#[tokio::test]
async fn phrase_and_empty_results() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let app = docsearch_server::build_app(dir.path()).unwrap();

    let (status, json) = post(app.clone(), json!({ "text": "\"rust systems\"", "type": "txt" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["match_count"], 1);

    let (status, json) = post(app, json!({ "text": "haskell", "type": "txt" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["match_count"], 0);
    assert_eq!(json["message"], "no matching documents");
}

#[tokio::test]
async fn client_errors() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let app = docsearch_server::build_app(dir.path()).unwrap();

    let (status, json) = post(app.clone(), json!({ "type": "txt" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("text"));

    let (status, _) = post(app.clone(), json!({ "text": "rust" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(app.clone(), json!({ "text": "rust AND", "type": "txt" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(app, json!({ "text": "rust", "type": "pdf" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn corruption_is_reported_distinctly() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let file = OpenOptions::new().write(true).open(IndexPaths::new(dir.path().join("txt")).postings()).unwrap();
    file.set_len(0).unwrap();
    drop(file);
    let app = docsearch_server::build_app(dir.path()).unwrap();

    let (status, json) = post(app, json!({ "text": "rust", "type": "txt" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().starts_with("index corruption"));
}

#[tokio::test]
async fn lists_collections() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let app = docsearch_server::build_app(dir.path()).unwrap();

    let req = Request::get("/collections").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json[0]["name"], "txt");
    assert_eq!(json[0]["num_docs"], 2);
    assert_eq!(json[0]["encoding"], "variable_byte");
}
