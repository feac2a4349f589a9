//! Coalesced credential renewal on `401 Unauthorized`.
//!
//! # Design
//! Many requests can fail with 401 for the same expired credential at once.
//! [`CredentialRenewalRetrier`] makes exactly one of them start a renewal and
//! parks the rest in a pending-waiters queue. When the renewal resolves, the
//! queue is drained in one go and every waiter receives the same answer.
//!
//! The current credential and the queue live behind a single mutex. The
//! lock is held only to compare, enqueue, update or drain, never while the
//! renewal itself runs.
//!
//! A caller that stops waiting (its call was cancelled) is not removed from
//! the queue. It is resolved with the next renewal outcome like every other
//! waiter, and the answer is discarded.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::auth::{Authorizer, AUTHORIZATION_HEADER};
use crate::error::{ErrorKind, HttpError};
use crate::http::HttpRequest;
use crate::retry::{Retrier, RetryCompletion, RetryDecision};

/// The external action that fetches a fresh credential.
///
/// Called at most once per renewal cycle. The implementation must eventually
/// consume the [`RenewalResolver`], from any thread; dropping it counts as a
/// failure that keeps the current credential.
pub trait CredentialRenewal: Send + Sync {
    fn renew(&self, resolver: RenewalResolver);
}

impl<F> CredentialRenewal for F
where
    F: Fn(RenewalResolver) + Send + Sync,
{
    fn renew(&self, resolver: RenewalResolver) {
        self(resolver)
    }
}

#[derive(Default)]
struct RenewalState {
    credential: Option<String>,
    waiters: Vec<RetryCompletion>,
}

enum CredentialUpdate {
    Keep,
    Set(String),
    Clear,
}

#[derive(Default)]
struct Shared {
    state: Mutex<RenewalState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RenewalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, update: CredentialUpdate, retry: bool) {
        let waiters = {
            let mut state = self.lock();
            match update {
                CredentialUpdate::Keep => {}
                CredentialUpdate::Set(credential) => state.credential = Some(credential),
                CredentialUpdate::Clear => state.credential = None,
            }
            std::mem::take(&mut state.waiters)
        };
        tracing::info!(waiters = waiters.len(), retry, "credential renewal resolved");
        for waiter in waiters {
            if !waiter.complete(retry) {
                tracing::debug!("renewal waiter went away before the outcome arrived");
            }
        }
    }
}

/// Single-shot handle through which a renewal reports its outcome.
pub struct RenewalResolver {
    shared: Option<Arc<Shared>>,
}

impl RenewalResolver {
    fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared: Some(shared),
        }
    }

    /// Store `credential` and release every waiter with "retry".
    pub fn succeed(mut self, credential: impl Into<String>) {
        if let Some(shared) = self.shared.take() {
            shared.resolve(CredentialUpdate::Set(credential.into()), true);
        }
    }

    /// Release every waiter with "do not retry", clearing the credential
    /// first when `clear_credential` is set.
    pub fn fail(mut self, clear_credential: bool) {
        if let Some(shared) = self.shared.take() {
            let update = if clear_credential {
                CredentialUpdate::Clear
            } else {
                CredentialUpdate::Keep
            };
            shared.resolve(update, false);
        }
    }
}

impl Drop for RenewalResolver {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            tracing::warn!("renewal resolver dropped without an outcome; treating as failure");
            shared.resolve(CredentialUpdate::Keep, false);
        }
    }
}

impl fmt::Debug for RenewalResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenewalResolver")
            .field("resolved", &self.shared.is_none())
            .finish()
    }
}

type CredentialMatcher = dyn Fn(&str, &str) -> bool + Send + Sync;

/// Retrier that renews the credential on 401 and coalesces concurrent
/// failures into a single renewal.
///
/// The credential is stored as the exact header value stamped on requests
/// (for example `Bearer abc`). Use [`authorizer`](Self::authorizer) to stamp
/// it, so every attempt carries whatever is current when it is built.
#[derive(Clone)]
pub struct CredentialRenewalRetrier {
    shared: Arc<Shared>,
    renewal: Arc<dyn CredentialRenewal>,
    credential_header: String,
    is_current: Arc<CredentialMatcher>,
}

impl CredentialRenewalRetrier {
    pub fn new<R>(renewal: R) -> Self
    where
        R: CredentialRenewal + 'static,
    {
        Self {
            shared: Arc::default(),
            renewal: Arc::new(renewal),
            credential_header: AUTHORIZATION_HEADER.to_string(),
            is_current: Arc::new(|attached: &str, current: &str| attached == current),
        }
    }

    pub fn credential_header(mut self, field: impl Into<String>) -> Self {
        self.credential_header = field.into();
        self
    }

    /// Replace the staleness test. Called as `(attached, current)`; returns
    /// `true` when the request was sent with the current credential.
    /// Defaults to string equality.
    pub fn credential_matcher<F>(mut self, is_current: F) -> Self
    where
        F: Fn(&str, &str) -> bool + Send + Sync + 'static,
    {
        self.is_current = Arc::new(is_current);
        self
    }

    pub fn with_credential(self, credential: impl Into<String>) -> Self {
        self.set_credential(Some(credential.into()));
        self
    }

    pub fn credential(&self) -> Option<String> {
        self.shared.lock().credential.clone()
    }

    pub fn set_credential(&self, credential: Option<String>) {
        self.shared.lock().credential = credential;
    }

    /// Number of requests currently parked behind an in-flight renewal.
    pub fn pending_waiters(&self) -> usize {
        self.shared.lock().waiters.len()
    }

    /// An authorizer that stamps the current credential.
    pub fn authorizer(&self) -> CredentialAuthorizer {
        CredentialAuthorizer {
            shared: Arc::clone(&self.shared),
            credential_header: self.credential_header.clone(),
        }
    }

    /// Whether `request` was sent with the credential held right now.
    /// Always `false` while no credential is held.
    pub fn is_credential_current(&self, request: &HttpRequest) -> bool {
        let state = self.shared.lock();
        self.matches(&state, request)
    }

    fn matches(&self, state: &RenewalState, request: &HttpRequest) -> bool {
        match (state.credential.as_deref(), request.header(&self.credential_header)) {
            (Some(current), Some(attached)) => (self.is_current)(attached, current),
            _ => false,
        }
    }
}

impl fmt::Debug for CredentialRenewalRetrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRenewalRetrier")
            .field("credential_header", &self.credential_header)
            .field("pending_waiters", &self.pending_waiters())
            .finish()
    }
}

impl Retrier for CredentialRenewalRetrier {
    fn should_retry(&self, request: &HttpRequest, error: &ErrorKind) -> RetryDecision {
        if error.http() != Some(HttpError::Unauthorized) {
            return RetryDecision::ready(false);
        }

        let (completion, decision) = RetryDecision::channel();
        let start_renewal = {
            let mut state = self.shared.lock();
            if !self.matches(&state, request) {
                tracing::debug!(url = %request.url, "credential already rotated; retrying without renewal");
                return RetryDecision::ready(true);
            }
            state.waiters.push(completion);
            state.waiters.len() == 1
        };

        if start_renewal {
            tracing::info!(url = %request.url, "starting credential renewal");
            self.renewal.renew(RenewalResolver::new(Arc::clone(&self.shared)));
        } else {
            tracing::debug!(url = %request.url, "waiting for in-flight credential renewal");
        }
        decision
    }
}

/// Stamps the renewal coordinator's current credential onto requests.
/// Leaves the request untouched while no credential is held.
#[derive(Clone)]
pub struct CredentialAuthorizer {
    shared: Arc<Shared>,
    credential_header: String,
}

impl fmt::Debug for CredentialAuthorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialAuthorizer")
            .field("credential_header", &self.credential_header)
            .finish()
    }
}

impl Authorizer for CredentialAuthorizer {
    fn authorize(&self, request: &mut HttpRequest) {
        if let Some(credential) = self.shared.lock().credential.clone() {
            request.set_header(&self.credential_header, credential);
        }
    }
}
