//! Request authorization strategies.

use crate::http::HttpRequest;

pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const BEARER: &str = "Bearer";

/// Stamps credentials onto a request.
///
/// Runs last during the build, so whatever it sets wins over descriptor and
/// codec headers. Called once per attempt; implementations must be idempotent.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, request: &mut HttpRequest);
}

/// Sets `Authorization: Bearer <token>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerTokenAuth {
    token: String,
    bearer_token: String,
}

impl BearerTokenAuth {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let bearer_token = format!("{BEARER} {token}");
        Self {
            token,
            bearer_token,
        }
    }

    /// The token without the `Bearer` prefix.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The full header value.
    pub fn bearer_token(&self) -> &str {
        &self.bearer_token
    }
}

impl Authorizer for BearerTokenAuth {
    fn authorize(&self, request: &mut HttpRequest) {
        request.set_header(AUTHORIZATION_HEADER, self.bearer_token.clone());
    }
}
