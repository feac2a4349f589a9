//! Pluggable body encoders and response decoders.
//!
//! # Design
//! A codec is a function plus the headers it needs on the request: an
//! [`Encoder`] announces the body's content type, a [`Decoder`] announces
//! what it accepts from the server. Both are cheap to clone and safe to share
//! across threads.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::DecodeError;
use crate::http::Header;

type EncodeFn<T> = dyn Fn(&T) -> Option<Vec<u8>> + Send + Sync;
type DecodeFn<T> = dyn Fn(&[u8]) -> Result<T, DecodeError> + Send + Sync;

/// Turns request parameters into body bytes. Returning `None` means the
/// parameters could not be encoded and no body is sent.
pub struct Encoder<T> {
    encode: Arc<EncodeFn<T>>,
    headers: Vec<Header>,
    blocking: bool,
}

impl<T> Clone for Encoder<T> {
    fn clone(&self) -> Self {
        Self {
            encode: Arc::clone(&self.encode),
            headers: self.headers.clone(),
            blocking: self.blocking,
        }
    }
}

impl<T> fmt::Debug for Encoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("headers", &self.headers)
            .field("blocking", &self.blocking)
            .finish()
    }
}

impl<T> Encoder<T> {
    pub fn new<F>(encode: F, headers: Vec<Header>) -> Self
    where
        F: Fn(&T) -> Option<Vec<u8>> + Send + Sync + 'static,
    {
        Self {
            encode: Arc::new(encode),
            headers,
            blocking: false,
        }
    }

    /// Mark this encoder as doing blocking I/O (e.g. reading files). The
    /// client then builds requests using it off the async worker when the
    /// runtime allows.
    pub fn blocking(mut self) -> Self {
        self.blocking = true;
        self
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    pub fn encode(&self, params: &T) -> Option<Vec<u8>> {
        (self.encode)(params)
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }
}

impl<T: Serialize> Encoder<T> {
    pub fn json() -> Self {
        Self::new(
            |params| match serde_json::to_vec(params) {
                Ok(body) => Some(body),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to encode json body");
                    None
                }
            },
            vec![Header::json_content()],
        )
    }
}

impl Encoder<String> {
    pub fn text() -> Self {
        Self::new(|text: &String| Some(text.as_bytes().to_vec()), vec![Header::text_content()])
    }
}

/// Turns response bytes into a typed value.
pub struct Decoder<T> {
    decode: Arc<DecodeFn<T>>,
    headers: Vec<Header>,
}

impl<T> Clone for Decoder<T> {
    fn clone(&self) -> Self {
        Self {
            decode: Arc::clone(&self.decode),
            headers: self.headers.clone(),
        }
    }
}

impl<T> fmt::Debug for Decoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder").field("headers", &self.headers).finish()
    }
}

impl<T> Decoder<T> {
    pub fn new<F>(decode: F, headers: Vec<Header>) -> Self
    where
        F: Fn(&[u8]) -> Result<T, DecodeError> + Send + Sync + 'static,
    {
        Self {
            decode: Arc::new(decode),
            headers,
        }
    }

    pub fn decode(&self, body: &[u8]) -> Result<T, DecodeError> {
        (self.decode)(body)
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }
}

impl<T: DeserializeOwned> Decoder<T> {
    pub fn json() -> Self {
        Self::new(
            |body| serde_json::from_slice(body).map_err(DecodeError::from),
            vec![Header::accept_json()],
        )
    }
}

impl Decoder<String> {
    pub fn plain_text() -> Self {
        Self::new(
            |body| {
                String::from_utf8(body.to_vec())
                    .map_err(|_| DecodeError::new("response body is not valid utf-8"))
            },
            vec![Header::accept_text()],
        )
    }
}

impl Decoder<Vec<u8>> {
    pub fn bytes() -> Self {
        Self::new(|body| Ok(body.to_vec()), Vec::new())
    }
}

impl Decoder<()> {
    /// Ignores the body.
    pub fn none() -> Self {
        Self::new(|_| Ok(()), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Track {
        name: String,
        length: u32,
    }

    #[test]
    fn json_encoder_announces_content_type() {
        let encoder = Encoder::<Track>::json();
        let body = encoder
            .encode(&Track {
                name: "Upside Down".to_string(),
                length: 208,
            })
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["name"], "Upside Down");
        assert_eq!(encoder.headers(), &[Header::json_content()]);
    }

    #[test]
    fn json_decoder_rejects_malformed_body() {
        let decoder = Decoder::<Track>::json();
        assert!(decoder.decode(b"not json").is_err());
        assert_eq!(
            decoder.decode(br#"{"name":"Banana Pancakes","length":191}"#).unwrap(),
            Track {
                name: "Banana Pancakes".to_string(),
                length: 191
            }
        );
        assert_eq!(decoder.headers(), &[Header::accept_json()]);
    }

    #[test]
    fn plain_text_decoder_requires_utf8() {
        let decoder = Decoder::plain_text();
        assert_eq!(decoder.decode(b"hello").unwrap(), "hello");
        assert!(decoder.decode(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn none_decoder_ignores_body() {
        assert!(Decoder::none().decode(b"anything").is_ok());
    }
}
