use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Multipart, Path},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// Credential accepted by `/authorization`, as a full header value.
pub const AUTHORIZED_CREDENTIAL: &str = "Bearer Authorized";
/// Request header holding a delay in milliseconds applied before answering.
pub const DURATION_HEADER: &str = "Duration";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EchoedUri {
    pub path: String,
    pub query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
    pub text: Option<String>,
}

pub fn app() -> Router {
    Router::new()
        .route("/authorization", get(authorization))
        .route("/timeout", any(timeout))
        .route("/empty", get(empty))
        .route("/malformed", get(malformed))
        .route("/headers", any(headers))
        .route("/echo", post(echo).put(echo).patch(echo))
        .route("/upload", post(upload))
        .route("/status/{code}", any(status))
        .route("/v1/{*rest}", get(echo_uri))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "mock server listening");
    }
    axum::serve(listener, app()).await
}

async fn delay(headers: &HeaderMap) {
    let millis = headers
        .get(DURATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    if let Some(millis) = millis {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}

async fn authorization(headers: HeaderMap) -> (StatusCode, Json<Message>) {
    delay(&headers).await;
    let credential = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if credential == Some(AUTHORIZED_CREDENTIAL) {
        (StatusCode::OK, Message::new("authorized"))
    } else {
        tracing::debug!(?credential, "rejecting credential");
        (StatusCode::UNAUTHORIZED, Message::new("unauthorized"))
    }
}

async fn timeout(headers: HeaderMap) -> (StatusCode, Json<Message>) {
    delay(&headers).await;
    (StatusCode::REQUEST_TIMEOUT, Message::new("request timeout"))
}

async fn empty() -> StatusCode {
    StatusCode::OK
}

async fn malformed() -> (StatusCode, &'static str) {
    (StatusCode::OK, "this is not json")
}

/// Request headers grouped by lowercase name, values in arrival order.
async fn headers(headers: HeaderMap) -> Json<BTreeMap<String, Vec<String>>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &headers {
        grouped
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    Json(grouped)
}

async fn echo(headers: HeaderMap, body: Bytes) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| header::HeaderValue::from_static("application/octet-stream"));
    ([(header::CONTENT_TYPE, content_type)], body).into_response()
}

async fn echo_uri(uri: Uri) -> Json<EchoedUri> {
    Json(EchoedUri {
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
    })
}

async fn upload(mut multipart: Multipart) -> Result<Json<Vec<UploadedPart>>, (StatusCode, Json<Message>)> {
    let mut parts = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return Err((StatusCode::BAD_REQUEST, Message::new(err.body_text()))),
        };
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|err| (StatusCode::BAD_REQUEST, Message::new(err.body_text())))?;
        parts.push(UploadedPart {
            name,
            file_name,
            content_type,
            size: data.len(),
            text: String::from_utf8(data.to_vec()).ok(),
        });
    }
    tracing::debug!(parts = parts.len(), "received upload");
    Ok(Json(parts))
}

async fn status(Path(code): Path<u16>) -> (StatusCode, Json<Message>) {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, Message::new(format!("status {code}"))),
        Err(_) => (StatusCode::BAD_REQUEST, Message::new(format!("invalid status {code}"))),
    }
}
