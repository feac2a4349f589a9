//! Client facade: descriptor in, typed response out.
//!
//! # Design
//! `Client` wires the stages together for each logical call:
//! build → transport → validate → retry decision, repeated until the retry
//! coordinator says the outcome is final, then decode with the descriptor's
//! codecs. Attempts of one call run strictly one after another.
//!
//! Two entry-point styles share the same pipeline:
//! - `load` / `send` take a callback and return a [`CallHandle`]. The call
//!   runs on the client's tokio runtime and the callback fires exactly once,
//!   on a runtime worker thread, even when the call is cancelled.
//! - `load_async` / `send_async` return a future for async callers.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::Authorizer;
use crate::builder::build_request;
use crate::config::ClientConfig;
use crate::descriptor::RequestDescriptor;
use crate::error::{ConfigError, ErrorKind, TransportError};
use crate::http::{HttpRequest, ResponseHead};
use crate::response::Response;
use crate::retry::{Retrier, RetryAction, RetryCoordinator};
use crate::transport::Transport;
use crate::validate::Validator;

/// Typed result of a call, plus the response head when one was received.
pub type CallResult<D> = (
    Response<<D as RequestDescriptor>::Resource, <D as RequestDescriptor>::ResourceError>,
    Option<ResponseHead>,
);

/// Passed to the retry observer each time an attempt is about to be re-issued.
#[derive(Debug)]
pub struct RetryEvent<'a> {
    /// The attempt that just failed, starting at 1.
    pub attempt: u32,
    pub request: &'a HttpRequest,
    pub error: &'a ErrorKind,
}

type RetryObserver = dyn Fn(&RetryEvent<'_>) + Send + Sync;

struct ClientInner {
    base_url: Url,
    transport: Arc<dyn Transport>,
    authorizer: RwLock<Option<Arc<dyn Authorizer>>>,
    coordinator: RetryCoordinator,
    validator: Validator,
    observer: Option<Arc<RetryObserver>>,
    runtime: Handle,
    max_attempts: u32,
}

/// Entry point for issuing calls. Cheap to clone; clones share everything.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url.as_str())
            .field("validator", &self.inner.validator)
            .field("coordinator", &self.inner.coordinator)
            .field("max_attempts", &self.inner.max_attempts)
            .finish()
    }
}

impl Client {
    pub fn builder(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> ClientBuilder {
        ClientBuilder::new(base_url, transport)
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Attempts per call used by [`load_default`](Self::load_default).
    pub fn max_attempts(&self) -> u32 {
        self.inner.max_attempts
    }

    /// Replace the authorizer used for every attempt built from now on.
    pub fn set_authorizer(&self, authorizer: Option<Arc<dyn Authorizer>>) {
        *self
            .inner
            .authorizer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = authorizer;
    }

    /// Build the request for one attempt without sending it.
    pub fn make_request<D>(&self, descriptor: &D) -> HttpRequest
    where
        D: RequestDescriptor + ?Sized,
    {
        let authorizer = self
            .inner
            .authorizer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        build_request(&self.inner.base_url, descriptor, authorizer.as_deref())
    }

    /// Fetch a resource. `max_attempts` counts the first attempt; zero is
    /// treated as one.
    pub fn load<D, F>(&self, descriptor: D, max_attempts: u32, on_complete: F) -> CallHandle
    where
        D: RequestDescriptor + 'static,
        F: FnOnce(Response<D::Resource, D::ResourceError>, Option<ResponseHead>) + Send + 'static,
    {
        self.spawn_call(descriptor, max_attempts, false, on_complete)
    }

    /// Like [`load`](Self::load) with the client's configured attempt count.
    pub fn load_default<D, F>(&self, descriptor: D, on_complete: F) -> CallHandle
    where
        D: RequestDescriptor + 'static,
        F: FnOnce(Response<D::Resource, D::ResourceError>, Option<ResponseHead>) + Send + 'static,
    {
        self.load(descriptor, self.inner.max_attempts, on_complete)
    }

    /// Submit data. The request always carries a body, empty if the
    /// descriptor encodes none.
    pub fn send<D, F>(&self, descriptor: D, max_attempts: u32, on_complete: F) -> CallHandle
    where
        D: RequestDescriptor + 'static,
        F: FnOnce(Response<D::Resource, D::ResourceError>, Option<ResponseHead>) + Send + 'static,
    {
        self.spawn_call(descriptor, max_attempts, true, on_complete)
    }

    pub async fn load_async<D>(&self, descriptor: &D, max_attempts: u32) -> CallResult<D>
    where
        D: RequestDescriptor + ?Sized,
    {
        self.execute(descriptor, max_attempts, false).await
    }

    pub async fn send_async<D>(&self, descriptor: &D, max_attempts: u32) -> CallResult<D>
    where
        D: RequestDescriptor + ?Sized,
    {
        self.execute(descriptor, max_attempts, true).await
    }

    fn spawn_call<D, F>(&self, descriptor: D, max_attempts: u32, with_body: bool, on_complete: F) -> CallHandle
    where
        D: RequestDescriptor + 'static,
        F: FnOnce(Response<D::Resource, D::ResourceError>, Option<ResponseHead>) + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let client = self.clone();
        self.inner.runtime.spawn(async move {
            let (response, head) = tokio::select! {
                output = client.execute(&descriptor, max_attempts, with_body) => output,
                _ = cancelled.cancelled() => {
                    tracing::debug!("call cancelled");
                    (Response::Failure(ErrorKind::Transport(TransportError::cancelled())), None)
                }
            };
            on_complete(response, head);
        });
        CallHandle { token }
    }

    /// Builds one attempt. Encoders that block (multipart file reads) run via
    /// `block_in_place` on a multi-thread runtime; elsewhere they run inline.
    fn build_attempt<D>(&self, descriptor: &D) -> HttpRequest
    where
        D: RequestDescriptor + ?Sized,
    {
        let blocking = descriptor.encoding().is_some_and(|encoder| encoder.is_blocking());
        let multi_thread = Handle::try_current()
            .is_ok_and(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread);
        if blocking && multi_thread {
            tokio::task::block_in_place(|| self.make_request(descriptor))
        } else {
            self.make_request(descriptor)
        }
    }

    async fn execute<D>(&self, descriptor: &D, max_attempts: u32, with_body: bool) -> CallResult<D>
    where
        D: RequestDescriptor + ?Sized,
    {
        let mut retries_left = max_attempts.max(1) - 1;
        let mut attempt = 1;
        loop {
            let mut request = self.build_attempt(descriptor);
            if with_body && request.body.is_none() {
                request.body = Some(Vec::new());
            }

            let raw = self.inner.transport.execute(request.clone()).await;
            let (result, head) = self.inner.validator.validate(raw);

            match self
                .inner
                .coordinator
                .retry_if_needed(&request, retries_left, &result)
                .await
            {
                RetryAction::Retry => {
                    if let Some(error) = result.error() {
                        tracing::info!(attempt, retries_left, url = %request.url, error = %error, "retrying request");
                        if let Some(observer) = &self.inner.observer {
                            observer(&RetryEvent {
                                attempt,
                                request: &request,
                                error,
                            });
                        }
                    }
                    retries_left -= 1;
                    attempt += 1;
                }
                RetryAction::Finish => {
                    let error_decoder = descriptor.response_error();
                    let response = result.decode(&descriptor.response(), error_decoder.as_ref());
                    if let Some(error) = response.error() {
                        tracing::debug!(attempt, url = %request.url, error = %error, "call failed");
                    }
                    return (response, head);
                }
            }
        }
    }
}

/// Handle to a call started with [`Client::load`] or [`Client::send`].
///
/// Dropping the handle does not cancel the call.
#[derive(Debug, Clone)]
pub struct CallHandle {
    token: CancellationToken,
}

impl CallHandle {
    /// Abort the in-flight attempt. The callback then receives
    /// `Failure(Transport(Cancelled))`, unless it already fired.
    ///
    /// Cancellation drops the attempt's future. A transport that runs the
    /// request on a blocking thread, like `UreqTransport`, cannot interrupt
    /// it: the call stops waiting immediately but the request itself runs
    /// until it completes or hits the transport timeout. Give such a
    /// transport a timeout (`UreqTransport::new(Some(..))`) to bound that.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Assembles a [`Client`].
pub struct ClientBuilder {
    base_url: String,
    transport: Arc<dyn Transport>,
    authorizer: Option<Arc<dyn Authorizer>>,
    retrier: Option<Arc<dyn Retrier>>,
    validator: Validator,
    observer: Option<Arc<RetryObserver>>,
    runtime: Option<Handle>,
    max_attempts: u32,
}

impl ClientBuilder {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
            authorizer: None,
            retrier: None,
            validator: Validator::default(),
            observer: None,
            runtime: None,
            max_attempts: 1,
        }
    }

    pub fn from_config(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self::new(config.base_url.clone(), transport)
            .validator(Validator::new(config.acceptable_status.into()))
            .max_attempts(config.max_attempts)
    }

    pub fn authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    pub fn retrier(mut self, retrier: Arc<dyn Retrier>) -> Self {
        self.retrier = Some(retrier);
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn on_retry<F>(mut self, observer: F) -> Self
    where
        F: Fn(&RetryEvent<'_>) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Runtime that runs callback-style calls. Defaults to the runtime the
    /// builder is finished on.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn build(self) -> Result<Client, ConfigError> {
        let base_url = Url::parse(&self.base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            source,
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::CannotBeABase { url: self.base_url });
        }
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| ConfigError::NoRuntime)?,
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                base_url,
                transport: self.transport,
                authorizer: RwLock::new(self.authorizer),
                coordinator: RetryCoordinator::new(self.retrier),
                validator: self.validator,
                observer: self.observer,
                runtime,
                max_attempts: self.max_attempts,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Decoder;
    use crate::descriptor::Descriptor;
    use crate::endpoint::Endpoint;
    use crate::http::{HttpMethod, TransportResult};
    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait]
    impl Transport for Unreachable {
        async fn execute(&self, _request: HttpRequest) -> TransportResult {
            TransportResult::failed(TransportError::new(
                crate::error::TransportErrorKind::Connect,
                "unreachable",
            ))
        }
    }

    #[tokio::test]
    async fn malformed_base_url_fails_fast() {
        let err = Client::builder("not a url", Arc::new(Unreachable)).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));

        let err = Client::builder("mailto:someone@example.com", Arc::new(Unreachable))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::CannotBeABase { .. }));
    }

    #[test]
    fn building_outside_a_runtime_needs_a_handle() {
        let err = Client::builder("http://localhost", Arc::new(Unreachable))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::NoRuntime));
    }

    #[tokio::test]
    async fn config_feeds_builder() {
        let mut config = ClientConfig::new("http://localhost:3000");
        config.max_attempts = 4;
        let client = ClientBuilder::from_config(&config, Arc::new(Unreachable))
            .build()
            .unwrap();
        assert_eq!(client.max_attempts(), 4);
        assert_eq!(client.base_url().as_str(), "http://localhost:3000/");
    }

    #[tokio::test]
    async fn transport_errors_surface_as_failures() {
        let client = Client::builder("http://localhost", Arc::new(Unreachable))
            .build()
            .unwrap();
        let descriptor = Descriptor::<(), String>::new(HttpMethod::Get, Endpoint::from_path("x"), Decoder::plain_text());
        let (response, head) = client.load_async(&descriptor, 3).await;
        assert!(matches!(response, Response::Failure(ErrorKind::Transport(_))));
        assert!(head.is_none());
    }

    #[derive(Default)]
    struct Recording {
        bodies: std::sync::Mutex<Vec<Option<Vec<u8>>>>,
    }

    #[async_trait]
    impl Transport for Recording {
        async fn execute(&self, request: HttpRequest) -> TransportResult {
            self.bodies.lock().unwrap().push(request.body.clone());
            TransportResult::response(
                ResponseHead {
                    url: request.url,
                    status: 200,
                    headers: Vec::new(),
                },
                b"ok".to_vec(),
            )
        }
    }

    #[tokio::test]
    async fn send_always_carries_a_body() {
        let transport = Arc::new(Recording::default());
        let client = Client::builder("http://localhost", transport.clone())
            .build()
            .unwrap();
        let descriptor = Descriptor::<(), String>::new(HttpMethod::Post, Endpoint::from_path("ping"), Decoder::plain_text());
        assert!(client.make_request(&descriptor).body.is_none());

        client.load_async(&descriptor, 1).await.0.into_success().unwrap();
        client.send_async(&descriptor, 1).await.0.into_success().unwrap();
        assert_eq!(*transport.bodies.lock().unwrap(), vec![None, Some(Vec::new())]);
    }
}
