//! Blocking [ureq](https://docs.rs/ureq) transport driven from tokio's
//! blocking thread pool.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{TransportError, TransportErrorKind};
use crate::http::{Header, HttpMethod, HttpRequest, ResponseHead, TransportResult};
use crate::transport::Transport;

/// [`Transport`] backed by a shared `ureq::Agent`.
///
/// Non-2xx statuses are returned as responses so the validator can classify
/// them. Dropping the future of an in-flight attempt stops waiting for it;
/// the blocking request itself runs to completion in the background.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl UreqTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn execute(&self, request: HttpRequest) -> TransportResult {
        let agent = self.agent.clone();
        match tokio::task::spawn_blocking(move || run(&agent, request)).await {
            Ok(result) => result,
            Err(err) => TransportResult::failed(TransportError::new(
                TransportErrorKind::Other,
                format!("transport task failed: {err}"),
            )),
        }
    }
}

fn allows_empty_body_omission(method: HttpMethod) -> bool {
    matches!(method, HttpMethod::Get | HttpMethod::Head | HttpMethod::Delete)
}

fn run(agent: &ureq::Agent, request: HttpRequest) -> TransportResult {
    let mut builder = ureq::http::Request::builder()
        .method(request.method.as_str())
        .uri(request.url.as_str());
    for header in &request.headers {
        builder = builder.header(header.field.as_str(), header.value.as_str());
    }

    let body = request
        .body
        .filter(|body| !(body.is_empty() && allows_empty_body_omission(request.method)));
    let outcome = match body {
        Some(body) => match builder.body(body.as_slice()) {
            Ok(req) => agent.run(req),
            Err(err) => return invalid_request(err),
        },
        None => match builder.body(()) {
            Ok(req) => agent.run(req),
            Err(err) => return invalid_request(err),
        },
    };

    let mut response = match outcome {
        Ok(response) => response,
        Err(err) => return TransportResult::failed(map_error(err)),
    };
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| Header::new(name.as_str(), value))
        })
        .collect();
    let head = ResponseHead {
        url: request.url,
        status: response.status().as_u16(),
        headers,
    };
    match response.body_mut().read_to_vec() {
        Ok(body) => TransportResult::response(head, body),
        Err(err) => TransportResult::failed(map_error(err)),
    }
}

fn invalid_request(err: ureq::http::Error) -> TransportResult {
    TransportResult::failed(TransportError::new(
        TransportErrorKind::Other,
        format!("invalid request: {err}"),
    ))
}

fn map_error(err: ureq::Error) -> TransportError {
    let kind = match &err {
        ureq::Error::Timeout(_) => TransportErrorKind::Timeout,
        ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => TransportErrorKind::Connect,
        ureq::Error::Io(_) => TransportErrorKind::Io,
        _ => TransportErrorKind::Other,
    };
    TransportError::new(kind, err.to_string())
}
