use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use sha2::{Digest, Sha256};
use signscan::{ModelError, ModelHandle, ModelManager, ModelSource};

const WEIGHTS: &[u8] = b"pretend these are convolution weights";

async fn spawn_artifact_server() -> SocketAddr {
    let app = Router::new()
        .route("/model.bin", get(|| async { WEIGHTS }))
        .route("/missing.bin", get(|| async { StatusCode::NOT_FOUND }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn source(addr: SocketAddr, path: &str, sha256: Option<String>) -> ModelSource {
    ModelSource {
        name: "model.bin".to_string(),
        url: Some(format!("http://{addr}/{path}")),
        sha256,
    }
}

#[tokio::test]
async fn test_download_and_verify() {
    let addr = spawn_artifact_server().await;
    let dir = tempfile::tempdir().unwrap();
    let manager = ModelManager::new(dir.path()).unwrap();
    let source = source(addr, "model.bin", Some(sha256_hex(WEIGHTS)));

    assert!(!manager.is_model_downloaded(&source));
    let path = manager.ensure_model(&source).await.unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), WEIGHTS);
    assert!(manager.verify_model(&source).unwrap());
    assert!(!dir.path().join("model.part").exists());
}

#[tokio::test]
async fn test_hash_mismatch_leaves_nothing_behind() {
    let addr = spawn_artifact_server().await;
    let dir = tempfile::tempdir().unwrap();
    let manager = ModelManager::new(dir.path()).unwrap();
    let source = source(addr, "model.bin", Some(sha256_hex(b"something else")));

    let result = manager.ensure_model(&source).await;
    assert!(matches!(result, Err(ModelError::HashMismatch { .. })));
    assert!(!manager.is_model_downloaded(&source));
}

#[tokio::test]
async fn test_http_error_is_reported() {
    let addr = spawn_artifact_server().await;
    let dir = tempfile::tempdir().unwrap();
    let manager = ModelManager::new(dir.path()).unwrap();

    let result = manager.ensure_model(&source(addr, "missing.bin", None)).await;
    assert!(matches!(result, Err(ModelError::DownloadError(_))));
}

#[tokio::test]
async fn test_corrupt_local_copy_is_replaced() {
    let addr = spawn_artifact_server().await;
    let dir = tempfile::tempdir().unwrap();
    let manager = ModelManager::new(dir.path()).unwrap();
    std::fs::write(dir.path().join("model.bin"), b"truncated").unwrap();

    let source = source(addr, "model.bin", Some(sha256_hex(WEIGHTS)));
    assert!(!manager.verify_model(&source).unwrap());
    manager.ensure_model(&source).await.unwrap();
    assert!(manager.verify_model(&source).unwrap());
}

#[tokio::test]
async fn test_handle_shares_one_download() {
    let addr = spawn_artifact_server().await;
    let dir = tempfile::tempdir().unwrap();
    let manager = ModelManager::new(dir.path()).unwrap();
    let handle = std::sync::Arc::new(ModelHandle::new(
        manager,
        source(addr, "model.bin", Some(sha256_hex(WEIGHTS))),
    ));

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let handle = handle.clone();
            tokio::spawn(async move { handle.get().await })
        })
        .collect();
    let mut artifacts = Vec::new();
    for task in tasks {
        artifacts.push(task.await.unwrap().unwrap());
    }
    assert!(handle.is_loaded());
    assert!(artifacts.windows(2).all(|w| std::sync::Arc::ptr_eq(&w[0], &w[1])));
}
