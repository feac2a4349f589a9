//! Typed HTTP request pipeline.
//!
//! # Overview
//! A call is described declaratively by a [`RequestDescriptor`] (path,
//! method, body, codecs). The [`Client`] turns it into an [`HttpRequest`],
//! hands it to a pluggable [`Transport`], classifies the outcome with a
//! [`Validator`], asks an optional [`Retrier`] whether to go again, and
//! finally decodes the body into a typed [`Response`].
//!
//! # Design
//! - Failures are values: every call completes with a [`Response`], never a
//!   panic or an `Err`.
//! - Request construction is pure, so it can be tested without a network.
//! - [`CredentialRenewalRetrier`] coalesces concurrent 401s into a single
//!   credential renewal and re-issues every waiting call once it finishes.
//! - The network layer is behind the [`Transport`] trait; the `ureq` feature
//!   provides a blocking `ureq` agent driven on tokio's blocking pool.

pub mod auth;
pub mod builder;
pub mod client;
pub mod codec;
pub mod config;
pub mod descriptor;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod multipart;
pub mod renewal;
pub mod response;
pub mod retry;
pub mod transport;
#[cfg(feature = "ureq")]
pub mod ureq_transport;
pub mod validate;

pub use auth::{Authorizer, BearerTokenAuth};
pub use builder::build_request;
pub use client::{CallHandle, CallResult, Client, ClientBuilder, RetryEvent};
pub use codec::{Decoder, Encoder};
pub use config::{ClientConfig, StatusRange};
pub use descriptor::{Descriptor, RequestDescriptor};
pub use endpoint::{Endpoint, Path};
pub use error::{ConfigError, DecodeError, ErrorKind, HttpError, TransportError, TransportErrorKind};
pub use http::{Header, HttpMethod, HttpRequest, ResponseHead, TransportResult};
pub use multipart::{MultipartPart, PartSource};
pub use renewal::{CredentialAuthorizer, CredentialRenewal, CredentialRenewalRetrier, RenewalResolver};
pub use response::Response;
pub use retry::{ErrorRetrier, FallbackRetrier, NoRetry, Retrier, RetryAction, RetryCompletion, RetryCoordinator, RetryDecision};
pub use transport::Transport;
#[cfg(feature = "ureq")]
pub use ureq_transport::UreqTransport;
pub use validate::{RawResponse, Validator};
