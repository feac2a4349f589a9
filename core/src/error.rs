//! Error types for the request pipeline.
//!
//! # Design
//! Execution failures are values, not `Err`s: the validator folds every
//! transport, status and decoding problem into an [`ErrorKind`] carried by a
//! [`Response`](crate::Response). The only error a caller can get back as
//! `Err` is [`ConfigError`], raised while constructing a client.

use thiserror::Error;

/// Closed taxonomy of failures surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// The attempt failed below HTTP (connect, timeout, cancel).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// No response metadata, or an acceptable status with no body.
    #[error("empty response")]
    EmptyResponse,

    /// The server answered with a status outside the acceptable set.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The body arrived but could not be decoded into the expected type.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl ErrorKind {
    pub fn http(&self) -> Option<HttpError> {
        match self {
            ErrorKind::Http(err) => Some(*err),
            _ => None,
        }
    }
}

/// Classification of a non-acceptable HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum HttpError {
    #[error("bad request")]
    ClientBad,
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("request timeout")]
    Timeout,
    #[error("server error")]
    ServerError,
    #[error("unexpected status {0}")]
    Unknown(u16),
}

impl HttpError {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => HttpError::ClientBad,
            401 => HttpError::Unauthorized,
            403 => HttpError::Forbidden,
            404 => HttpError::NotFound,
            408 => HttpError::Timeout,
            500..=599 => HttpError::ServerError,
            other => HttpError::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    Connect,
    Timeout,
    Cancelled,
    Io,
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Io => "io",
            Self::Other => "other",
        };
        formatter.write_str(text)
    }
}

/// A failure reported by the transport instead of a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport error ({kind}): {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(TransportErrorKind::Cancelled, "call cancelled")
    }
}

/// A body that could not be turned into the expected type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("decoding failed: {message}")]
pub struct DecodeError {
    pub message: String,
}

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Invalid client configuration. Returned only while building a client.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base url {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("base url {url:?} cannot carry a path")]
    CannotBeABase { url: String },

    #[error("required environment variable not set: {var}")]
    MissingVar { var: String },

    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("no tokio runtime available; pass a runtime handle to the builder")]
    NoRuntime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(HttpError::from_status(400), HttpError::ClientBad);
        assert_eq!(HttpError::from_status(401), HttpError::Unauthorized);
        assert_eq!(HttpError::from_status(403), HttpError::Forbidden);
        assert_eq!(HttpError::from_status(404), HttpError::NotFound);
        assert_eq!(HttpError::from_status(408), HttpError::Timeout);
        assert_eq!(HttpError::from_status(500), HttpError::ServerError);
        assert_eq!(HttpError::from_status(599), HttpError::ServerError);
        assert_eq!(HttpError::from_status(409), HttpError::Unknown(409));
        assert_eq!(HttpError::from_status(302), HttpError::Unknown(302));
        assert_eq!(HttpError::from_status(600), HttpError::Unknown(600));
    }

    #[test]
    fn error_kind_display() {
        let err = ErrorKind::from(HttpError::Unauthorized);
        assert_eq!(err.to_string(), "unauthorized");
        let err = ErrorKind::from(TransportError::cancelled());
        assert_eq!(err.to_string(), "transport error (cancelled): call cancelled");
    }

    #[test]
    fn decode_error_from_serde() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        let decode = DecodeError::from(err);
        assert!(decode.message.contains("expected"));
    }
}
