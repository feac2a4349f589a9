//! Classification of raw transport results.

use std::ops::RangeInclusive;

use crate::error::{ErrorKind, HttpError};
use crate::http::{ResponseHead, TransportResult};
use crate::response::Response;

/// Raw result of one attempt: bodies still undecoded.
pub type RawResponse = Response<Vec<u8>, Vec<u8>>;

/// Folds a [`TransportResult`] into a [`RawResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    acceptable: RangeInclusive<u16>,
}

impl Default for Validator {
    fn default() -> Self {
        Self { acceptable: 200..=299 }
    }
}

impl Validator {
    pub fn new(acceptable: RangeInclusive<u16>) -> Self {
        Self { acceptable }
    }

    pub fn acceptable(&self) -> &RangeInclusive<u16> {
        &self.acceptable
    }

    /// Rules, first match wins:
    /// 1. transport error: `Failure(Transport)`, no head;
    /// 2. no status: `Failure(EmptyResponse)`;
    /// 3. status outside the acceptable range: the body is kept as payload;
    /// 4. acceptable status with an empty body: `Failure(EmptyResponse)`;
    /// 5. otherwise `Success(body)`.
    pub fn validate(&self, raw: TransportResult) -> (RawResponse, Option<ResponseHead>) {
        let TransportResult { body, head, error } = raw;

        if let Some(error) = error {
            tracing::debug!(error = %error, "transport failed");
            return (Response::Failure(ErrorKind::Transport(error)), None);
        }

        let Some(head) = head else {
            return (Response::Failure(ErrorKind::EmptyResponse), None);
        };
        tracing::debug!(
            url = %head.url,
            status = head.status,
            body_len = body.as_ref().map_or(0, Vec::len),
            "received response"
        );

        if !self.acceptable.contains(&head.status) {
            let error = ErrorKind::Http(HttpError::from_status(head.status));
            let response = match body {
                Some(body) => Response::FailureWithPayload(body, error),
                None => Response::Failure(error),
            };
            return (response, Some(head));
        }

        match body {
            Some(body) if !body.is_empty() => (Response::Success(body), Some(head)),
            _ => (Response::Failure(ErrorKind::EmptyResponse), Some(head)),
        }
    }
}
