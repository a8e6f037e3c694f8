//! Drive the HTTP router directly, without binding a socket.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use common::events::RelayEvent;
use object_store::{MemoryStore, ObjectKind, RemoteObject};
use relay_daemon::http_server::router;
use relay_daemon::{ServiceConfig, ServiceState};

fn setup(store: MemoryStore) -> (TempDir, Arc<MemoryStore>, ServiceState, Router) {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("x.txt"), b"0123456789").unwrap();
    std::fs::write(dir.path().join("y.txt"), vec![b'y'; 20]).unwrap();
    std::fs::create_dir(dir.path().join(".hidden")).unwrap();
    std::fs::write(dir.path().join(".hidden").join("z.txt"), b"zz").unwrap();

    let store = Arc::new(store);
    let config = ServiceConfig::in_memory(vec![dir.path().to_path_buf()]);
    let state = ServiceState::with_store(&config, store.clone());
    let app = router(state.clone());
    (dir, store, state, app)
}

fn remote(id: &str, name: &str, size: u64) -> RemoteObject {
    RemoteObject {
        id: id.to_string(),
        name: name.to_string(),
        size,
        created_at: "2024-01-01T00:00:00Z".to_string(),
        link: format!("memory://{}", id),
        kind: ObjectKind::File,
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn files_lists_local_and_remote() {
    let store = MemoryStore::with_objects([
        remote("R1", "x.txt", 10),
        remote("R2", "elsewhere.bin", 5),
    ]);
    let (_dir, _store, _state, app) = setup(store);

    let (status, body) = send(&app, Method::GET, "/files").await;

    assert_eq!(status, StatusCode::OK);
    let files = body.as_array().unwrap();
    let names: Vec<&str> = files.iter().map(|f| f["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["x.txt", "y.txt", "elsewhere.bin"]);
    assert_eq!(files[0]["upload_id"], "R1");
    assert_eq!(files[0]["upload_progress"], 100.0);
    assert!(files[1]["upload_id"].is_null());
    assert_eq!(files[2]["path"], "memory://R2");
}

#[tokio::test]
async fn files_reports_remote_failure() {
    let store = MemoryStore::new();
    store.fail_list(true);
    let (_dir, _store, _state, app) = setup(store);

    let (status, body) = send(&app, Method::GET, "/files").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("remote"));
}

#[tokio::test]
async fn upload_starts_and_completes() {
    let (dir, store, state, app) = setup(MemoryStore::new());
    let path = dir.path().join("x.txt").to_string_lossy().into_owned();
    let mut events = state.events().subscribe();

    let (status, body) = send(&app, Method::GET, &format!("/upload?path={}", encode(&path))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("x.txt"));

    let completed = loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        if let RelayEvent::Completed(file) = event {
            break file;
        }
    };
    let id = completed.upload_id.unwrap();
    assert_eq!(&store.content(&id).await.unwrap()[..], b"0123456789");
}

#[tokio::test]
async fn upload_of_missing_file_is_not_found() {
    let (dir, _store, state, app) = setup(MemoryStore::new());
    let path = dir.path().join("missing.txt").to_string_lossy().into_owned();

    let (status, body) = send(&app, Method::GET, &format!("/upload?path={}", encode(&path))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("missing.txt"));
    assert!(state.registry().is_empty());
}

#[tokio::test]
async fn duplicate_upload_conflicts_and_cancel_stops_it() {
    let store = MemoryStore::new()
        .with_chunk_size(1)
        .with_chunk_delay(Duration::from_millis(20));
    let (dir, _store, state, app) = setup(store);
    let path = dir.path().join("y.txt").to_string_lossy().into_owned();
    let uri = format!("/upload?path={}", encode(&path));

    let (status, _) = send(&app, Method::GET, &uri).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, &uri).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already"));

    let (status, body) = send(&app, Method::DELETE, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["path"], path.as_str());

    tokio::time::timeout(Duration::from_secs(5), async {
        while !state.registry().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let (status, _) = send(&app, Method::DELETE, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_remote_object() {
    let store = MemoryStore::with_objects([remote("R1", "x.txt", 10)]);
    let (_dir, store, _state, app) = setup(store);

    let (status, body) = send(&app, Method::DELETE, "/delete?upload_id=R1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["upload_id"], "R1");
    assert!(store.is_empty().await);

    let (status, body) = send(&app, Method::DELETE, "/delete?upload_id=R1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn status_endpoints() {
    let (_dir, _store, _state, app) = setup(MemoryStore::new());

    let (status, body) = send(&app, Method::GET, "/_status/livez").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = send(&app, Method::GET, "/_status/readyz").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/_status/version").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn static_files_are_served_from_web_dir() {
    let web = TempDir::new().unwrap();
    std::fs::write(web.path().join("index.html"), b"<html>relay</html>").unwrap();
    let mut config = ServiceConfig::in_memory(vec![]);
    config.web_dir = Some(web.path().to_path_buf());
    let state = ServiceState::with_store(&config, Arc::new(MemoryStore::new()));
    let app = router(state);

    let request = Request::builder()
        .uri("/index.html")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"<html>relay</html>");
}
