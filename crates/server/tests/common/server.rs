//! Server test utilities.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use spool_core::config::AppConfig;
use spool_metadata::{MetadataStore, SqliteStore};
use spool_server::{AppState, create_router};
use spool_storage::{FileStore, FilesystemBackend};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "spool-test-boundary";

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with temporary storage.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let mut config =
            AppConfig::for_testing(temp_dir.path().join("files"), temp_dir.path().join("spool.db"));
        modifier(&mut config);

        let storage: Arc<dyn FileStore> = Arc::new(
            FilesystemBackend::new(&config.storage.root)
                .await
                .expect("Failed to create storage backend"),
        );
        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(&config.metadata.path, &config.metadata.table, None)
                .await
                .expect("Failed to create metadata store"),
        );

        let state = AppState::new(config, storage, metadata);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Send a request and decode the JSON response body.
    pub async fn json_request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    /// POST one chunk to /v1/uploads.
    pub async fn upload_chunk(
        &self,
        unique: Option<&str>,
        index: u32,
        total: u32,
        file_name: &str,
        payload: &[u8],
    ) -> (StatusCode, Value) {
        let index = index.to_string();
        let total = total.to_string();
        let mut fields = vec![
            ("chunkIndex", index.as_str()),
            ("totalChunks", total.as_str()),
            ("fileName", file_name),
        ];
        if let Some(unique) = unique {
            fields.push(("unique", unique));
        }
        self.post_multipart(&fields, Some((file_name, payload))).await
    }

    /// POST an arbitrary multipart form to /v1/uploads.
    pub async fn post_multipart(
        &self,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/v1/uploads")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(fields, file)))
            .unwrap();
        self.send(request).await
    }

    /// Upload `parts` in order and return the final response.
    pub async fn upload_all(&self, file_name: &str, parts: &[&str]) -> (StatusCode, Value) {
        let total = parts.len() as u32;
        let mut unique: Option<String> = None;
        let mut last = None;
        for (index, part) in parts.iter().enumerate() {
            let (status, body) = self
                .upload_chunk(unique.as_deref(), index as u32, total, file_name, part.as_bytes())
                .await;
            if let Some(key) = body["unique"].as_str() {
                unique = Some(key.to_string());
            }
            last = Some((status, body));
        }
        last.expect("no parts uploaded")
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}

/// Encode a multipart/form-data body with the test boundary.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, payload)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
