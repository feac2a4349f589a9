//! Declarative descriptions of one logical call.
//!
//! # Design
//! A descriptor says *what* to call (path, method, body, codecs) and nothing
//! about *how*: the builder, transport and retry machinery never look past
//! this trait. Call sites either implement [`RequestDescriptor`] on a
//! dedicated type or fill in a [`Descriptor`] value.

use crate::codec::{Decoder, Encoder};
use crate::endpoint::{Endpoint, Path};
use crate::http::{Header, HttpMethod};

/// Description of a call to the remote host.
///
/// If [`parameters`](Self::parameters) returns a value, an
/// [`encoding`](Self::encoding) must be present for a body to be sent.
pub trait RequestDescriptor: Send + Sync {
    type BodyParameters;
    type Resource: Send + 'static;
    type ResourceError: Send + 'static;

    fn path(&self) -> Endpoint;
    fn method(&self) -> HttpMethod;
    fn response(&self) -> Decoder<Self::Resource>;

    fn encoding(&self) -> Option<Encoder<Self::BodyParameters>> {
        None
    }

    fn parameters(&self) -> Option<&Self::BodyParameters> {
        None
    }

    fn headers(&self) -> Vec<Header> {
        Vec::new()
    }

    fn response_error(&self) -> Option<Decoder<Self::ResourceError>> {
        None
    }

    fn version_path(&self) -> Option<Path> {
        None
    }
}

/// A descriptor assembled from plain values.
#[derive(Debug, Clone)]
pub struct Descriptor<P, R, E = ()> {
    path: Endpoint,
    method: HttpMethod,
    response: Decoder<R>,
    encoding: Option<Encoder<P>>,
    parameters: Option<P>,
    headers: Vec<Header>,
    response_error: Option<Decoder<E>>,
    version_path: Option<Path>,
}

impl<R, E> Descriptor<(), R, E> {
    pub fn new(method: HttpMethod, path: Endpoint, response: Decoder<R>) -> Self {
        Self {
            path,
            method,
            response,
            encoding: None,
            parameters: None,
            headers: Vec::new(),
            response_error: None,
            version_path: None,
        }
    }
}

impl<P, R, E> Descriptor<P, R, E> {
    /// Attach body parameters together with the encoder that serializes them.
    pub fn body<Q>(self, parameters: Q, encoding: Encoder<Q>) -> Descriptor<Q, R, E> {
        Descriptor {
            path: self.path,
            method: self.method,
            response: self.response,
            encoding: Some(encoding),
            parameters: Some(parameters),
            headers: self.headers,
            response_error: self.response_error,
            version_path: self.version_path,
        }
    }

    pub fn error_payload<G>(self, decoder: Decoder<G>) -> Descriptor<P, R, G> {
        Descriptor {
            path: self.path,
            method: self.method,
            response: self.response,
            encoding: self.encoding,
            parameters: self.parameters,
            headers: self.headers,
            response_error: Some(decoder),
            version_path: self.version_path,
        }
    }

    pub fn header(mut self, header: Header) -> Self {
        self.headers.push(header);
        self
    }

    pub fn version(mut self, prefix: Path) -> Self {
        self.version_path = Some(prefix);
        self
    }
}

impl<P, R, E> RequestDescriptor for Descriptor<P, R, E>
where
    P: Send + Sync,
    R: Send + 'static,
    E: Send + 'static,
{
    type BodyParameters = P;
    type Resource = R;
    type ResourceError = E;

    fn path(&self) -> Endpoint {
        self.path.clone()
    }

    fn method(&self) -> HttpMethod {
        self.method
    }

    fn response(&self) -> Decoder<R> {
        self.response.clone()
    }

    fn encoding(&self) -> Option<Encoder<P>> {
        self.encoding.clone()
    }

    fn parameters(&self) -> Option<&P> {
        self.parameters.as_ref()
    }

    fn headers(&self) -> Vec<Header> {
        self.headers.clone()
    }

    fn response_error(&self) -> Option<Decoder<E>> {
        self.response_error.clone()
    }

    fn version_path(&self) -> Option<Path> {
        self.version_path.clone()
    }
}
