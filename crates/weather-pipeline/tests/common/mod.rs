//! In-process HTTP fakes for the weather API and Azure Blob endpoints.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{Path, Query, RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Router,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const PORTO: &str = r#"{"coord":{"lon":-8.611,"lat":41.1496},"sys":{"country":"PT"},"name":"Porto","main":{"temp":289.3,"humidity":71},"dt":1700000000}"#;

pub const PORTO_RECORD: &str =
    r#"{"country":"PT","city":"Porto","temperature":289.3,"humidity":71,"timestamp":1700000000}"#;

pub const PORTO_KEY: &str =
    "PT_Porto_weather_data/2024-01-01T10:00:00_PT_Porto_processed_weather_data.json";

/// Bind an ephemeral port, serve `router` on it and return the base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL nothing listens on.
pub fn closed_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    format!("http://{}", listener.local_addr().unwrap())
}

// ── Weather API ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct FakeWeatherApi {
    status: StatusCode,
    body: &'static str,
    pub requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl FakeWeatherApi {
    pub fn new(status: u16, body: &'static str) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            body,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn start(&self) -> String {
        let router = Router::new()
            .route("/data/2.5/weather", get(current_weather))
            .with_state(self.clone());
        serve(router).await
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

async fn current_weather(
    State(api): State<FakeWeatherApi>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, &'static str) {
    api.requests.lock().unwrap().push(params);
    (api.status, api.body)
}

// ── Azure Blob ──────────────────────────────────────────────────────

/// Minimal `Put Blob` emulation honouring `If-None-Match: *`.
///
/// Errors carry an `x-ms-error-code` header the way the service does.
#[derive(Clone)]
pub struct FakeAzure {
    reject_with: Option<(StatusCode, &'static str)>,
    pub blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    pub queries: Arc<Mutex<Vec<String>>>,
}

impl FakeAzure {
    pub fn new() -> Self {
        Self {
            reject_with: None,
            blobs: Arc::new(Mutex::new(HashMap::new())),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer every request with `status` and `error_code`.
    pub fn rejecting(status: u16, error_code: &'static str) -> Self {
        Self {
            reject_with: Some((StatusCode::from_u16(status).unwrap(), error_code)),
            ..Self::new()
        }
    }

    pub async fn start(&self) -> String {
        let router = Router::new()
            .route("/{*path}", put(put_blob))
            .with_state(self.clone());
        serve(router).await
    }

    pub fn blob(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.lock().unwrap().get(path).cloned()
    }
}

async fn put_blob(
    State(azure): State<FakeAzure>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    azure
        .queries
        .lock()
        .unwrap()
        .push(query.unwrap_or_default());

    if let Some((status, error_code)) = azure.reject_with {
        return azure_error(status, error_code);
    }
    if headers.get("x-ms-blob-type").map(|v| v.as_bytes()) != Some(b"BlockBlob".as_slice()) {
        return azure_error(StatusCode::BAD_REQUEST, "MissingRequiredHeader");
    }

    let mut blobs = azure.blobs.lock().unwrap();
    let no_overwrite = headers.get("if-none-match").map(|v| v.as_bytes()) == Some(b"*".as_slice());
    if no_overwrite && blobs.contains_key(&path) {
        return azure_error(StatusCode::CONFLICT, "BlobAlreadyExists");
    }
    blobs.insert(path, body.to_vec());
    StatusCode::CREATED.into_response()
}

fn azure_error(status: StatusCode, error_code: &'static str) -> Response {
    (status, [("x-ms-error-code", error_code)]).into_response()
}
