//! Retry decisions and the per-call retry coordinator.
//!
//! # Design
//! A [`Retrier`] answers "should this failed attempt run again?" with a
//! [`RetryDecision`], a future that resolves exactly once. Simple strategies
//! answer immediately; others hand out a [`RetryCompletion`] and answer later,
//! possibly from another thread. A completion that is dropped unanswered
//! resolves its decision to `false`.
//!
//! Strategies are plain values chosen at construction time and compose by
//! wrapping ([`FallbackRetrier`]).

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::oneshot;

use crate::error::{ErrorKind, HttpError};
use crate::http::HttpRequest;
use crate::response::Response;

/// Decides whether a failed attempt should be re-issued.
pub trait Retrier: Send + Sync {
    fn should_retry(&self, request: &HttpRequest, error: &ErrorKind) -> RetryDecision;
}

/// Single-shot answer from a [`Retrier`]. Resolves to `true` to retry.
pub struct RetryDecision {
    state: DecisionState,
}

enum DecisionState {
    Ready(Option<bool>),
    Waiting(oneshot::Receiver<bool>),
    Deferred(BoxFuture<'static, bool>),
}

impl RetryDecision {
    pub fn ready(retry: bool) -> Self {
        Self {
            state: DecisionState::Ready(Some(retry)),
        }
    }

    /// A decision answered later through the returned completion.
    pub fn channel() -> (RetryCompletion, RetryDecision) {
        let (sender, receiver) = oneshot::channel();
        (
            RetryCompletion { sender },
            Self {
                state: DecisionState::Waiting(receiver),
            },
        )
    }

    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = bool> + Send + 'static,
    {
        Self {
            state: DecisionState::Deferred(future.boxed()),
        }
    }
}

impl fmt::Debug for RetryDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            DecisionState::Ready(value) => format!("Ready({value:?})"),
            DecisionState::Waiting(_) => "Waiting".to_string(),
            DecisionState::Deferred(_) => "Deferred".to_string(),
        };
        f.debug_struct("RetryDecision").field("state", &state).finish()
    }
}

impl Future for RetryDecision {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        match &mut self.state {
            DecisionState::Ready(value) => Poll::Ready(value.take().unwrap_or(false)),
            DecisionState::Waiting(receiver) => Pin::new(receiver).poll(cx).map(|answer| {
                answer.unwrap_or_else(|_| {
                    tracing::warn!("retry completion dropped without an answer; not retrying");
                    false
                })
            }),
            DecisionState::Deferred(future) => future.as_mut().poll(cx),
        }
    }
}

/// The sending half of a [`RetryDecision::channel`].
#[derive(Debug)]
pub struct RetryCompletion {
    sender: oneshot::Sender<bool>,
}

impl RetryCompletion {
    /// Answer the decision. Returns `false` if nobody is waiting any more.
    pub fn complete(self, retry: bool) -> bool {
        self.sender.send(retry).is_ok()
    }
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl Retrier for NoRetry {
    fn should_retry(&self, _request: &HttpRequest, _error: &ErrorKind) -> RetryDecision {
        RetryDecision::ready(false)
    }
}

type ErrorPredicate = dyn Fn(&ErrorKind) -> bool + Send + Sync;
type RetryHook = dyn Fn() + Send + Sync;

/// Retries whenever the error matches a fixed predicate, independently of
/// any other request.
#[derive(Clone)]
pub struct ErrorRetrier {
    matches: Arc<ErrorPredicate>,
    on_retry: Option<Arc<RetryHook>>,
}

impl ErrorRetrier {
    pub fn new<F>(matches: F) -> Self
    where
        F: Fn(&ErrorKind) -> bool + Send + Sync + 'static,
    {
        Self {
            matches: Arc::new(matches),
            on_retry: None,
        }
    }

    /// Retries on HTTP 408.
    pub fn timeout() -> Self {
        Self::http([HttpError::Timeout])
    }

    pub fn http(errors: impl IntoIterator<Item = HttpError>) -> Self {
        let errors: Vec<HttpError> = errors.into_iter().collect();
        Self::new(move |error| error.http().is_some_and(|e| errors.contains(&e)))
    }

    /// Called each time this retrier answers "retry".
    pub fn on_retry<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for ErrorRetrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorRetrier")
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

impl Retrier for ErrorRetrier {
    fn should_retry(&self, _request: &HttpRequest, error: &ErrorKind) -> RetryDecision {
        let retry = (self.matches)(error);
        if retry {
            if let Some(hook) = &self.on_retry {
                hook();
            }
        }
        RetryDecision::ready(retry)
    }
}

/// Asks `first`; if it declines, asks `second`.
#[derive(Clone)]
pub struct FallbackRetrier {
    first: Arc<dyn Retrier>,
    second: Arc<dyn Retrier>,
}

impl FallbackRetrier {
    pub fn new(first: Arc<dyn Retrier>, second: Arc<dyn Retrier>) -> Self {
        Self { first, second }
    }
}

impl Retrier for FallbackRetrier {
    fn should_retry(&self, request: &HttpRequest, error: &ErrorKind) -> RetryDecision {
        let first = self.first.should_retry(request, error);
        let second = Arc::clone(&self.second);
        let request = request.clone();
        let error = error.clone();
        RetryDecision::deferred(async move {
            first.await || second.should_retry(&request, &error).await
        })
    }
}

/// What to do after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    Retry,
    Finish,
}

/// Consults the configured retrier for failed attempts.
///
/// Empty responses and decode failures are always final; retrying cannot
/// change malformed or missing data.
#[derive(Clone, Default)]
pub struct RetryCoordinator {
    retrier: Option<Arc<dyn Retrier>>,
}

impl RetryCoordinator {
    pub fn new(retrier: Option<Arc<dyn Retrier>>) -> Self {
        Self { retrier }
    }

    pub async fn retry_if_needed<S, F>(
        &self,
        request: &HttpRequest,
        retries_left: u32,
        result: &Response<S, F>,
    ) -> RetryAction {
        let Some(retrier) = &self.retrier else {
            return RetryAction::Finish;
        };
        let Some(error) = result.error() else {
            return RetryAction::Finish;
        };
        if retries_left == 0 || matches!(error, ErrorKind::EmptyResponse | ErrorKind::Decode(_)) {
            return RetryAction::Finish;
        }
        if retrier.should_retry(request, error).await {
            RetryAction::Retry
        } else {
            RetryAction::Finish
        }
    }
}

impl fmt::Debug for RetryCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryCoordinator")
            .field("retrier", &self.retrier.is_some())
            .finish()
    }
}
