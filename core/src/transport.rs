//! The I/O boundary of the pipeline.

use async_trait::async_trait;

use crate::http::{HttpRequest, TransportResult};

/// Performs one attempt over the network.
///
/// Implementations must not fail with `Err`: every outcome, including
/// connection errors and timeouts, is reported through [`TransportResult`].
/// HTTP error statuses are responses, not transport errors. Headers sharing a
/// field name are all sent, in order.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> TransportResult;
}
