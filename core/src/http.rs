//! Wire model: HTTP requests and transport results described as plain data.
//!
//! # Design
//! The pipeline builds `HttpRequest` values and classifies `TransportResult`
//! values without touching the network. A [`Transport`](crate::Transport)
//! performs the actual I/O in between, which keeps every other stage
//! deterministic and easy to test.
//!
//! Headers are an ordered list, not a map: two headers with the same field are
//! both kept. Only [`HttpRequest::set_header`] replaces existing values.

use std::fmt;

use url::Url;

use crate::error::TransportError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// MIME types the built-in codecs announce.
pub mod mime {
    pub const APPLICATION_JSON: &str = "application/json";
    pub const TEXT_PLAIN: &str = "text/plain";
    pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";
}

/// A single `(field, value)` header pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Header {
    pub field: String,
    pub value: String,
}

impl Header {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn json_content() -> Self {
        Self::new("Content-Type", mime::APPLICATION_JSON)
    }

    pub fn text_content() -> Self {
        Self::new("Content-Type", mime::TEXT_PLAIN)
    }

    pub fn multipart_form_data(boundary: &str) -> Self {
        Self::new(
            "Content-Type",
            format!("{}; boundary={boundary}", mime::MULTIPART_FORM_DATA),
        )
    }

    pub fn accept_json() -> Self {
        Self::new("Accept", mime::APPLICATION_JSON)
    }

    pub fn accept_text() -> Self {
        Self::new("Accept", mime::TEXT_PLAIN)
    }

    fn is(&self, field: &str) -> bool {
        self.field.eq_ignore_ascii_case(field)
    }
}

/// A fully resolved request, ready to hand to a transport.
///
/// Built once per attempt by [`build_request`](crate::build_request). Nothing
/// downstream of the builder mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: Url,
    pub method: HttpMethod,
    pub headers: Vec<Header>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            url,
            method,
            headers: Vec::new(),
            body: None,
        }
    }

    /// First value for `field`, compared case-insensitively.
    pub fn header(&self, field: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.is(field))
            .map(|h| h.value.as_str())
    }

    /// Append a header, keeping any earlier values for the same field.
    pub fn append_header(&mut self, header: Header) {
        self.headers.push(header);
    }

    /// Replace every value of `field` with a single `value`.
    pub fn set_header(&mut self, field: &str, value: impl Into<String>) {
        self.headers.retain(|h| !h.is(field));
        self.headers.push(Header::new(field, value));
    }

    /// Render this request as a `curl` command line for debug logs.
    ///
    /// `Cookie` headers are left out. Bodies that are not UTF-8 are skipped.
    pub fn curl_command(&self) -> String {
        let mut command = vec![format!("curl {}", shell_quote(self.url.as_str()))];
        if self.method == HttpMethod::Head {
            command[0].push_str(" --head");
        } else {
            command.push(format!("-X {}", self.method));
        }
        for header in self.headers.iter().filter(|h| !h.is("Cookie")) {
            command.push(format!("-H {}", shell_quote(&format!("{}: {}", header.field, header.value))));
        }
        if let Some(body) = self.body.as_deref().and_then(|b| std::str::from_utf8(b).ok()) {
            command.push(format!("-d {}", shell_quote(body)));
        }
        command.join(" ")
    }
}

/// Single-quote `value` for a POSIX shell; embedded quotes become `'\''`.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Status line and headers of a response: the raw metadata handed back to
/// callers next to the typed result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub url: Url,
    pub status: u16,
    pub headers: Vec<Header>,
}

impl ResponseHead {
    pub fn header(&self, field: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.is(field))
            .map(|h| h.value.as_str())
    }
}

/// Everything a transport can report about one attempt.
///
/// Any combination of fields may be missing; the
/// [`Validator`](crate::Validator) decides what each combination means.
#[derive(Debug, Clone, Default)]
pub struct TransportResult {
    pub body: Option<Vec<u8>>,
    pub head: Option<ResponseHead>,
    pub error: Option<TransportError>,
}

impl TransportResult {
    /// A response that made it back from the server.
    pub fn response(head: ResponseHead, body: Vec<u8>) -> Self {
        Self {
            body: Some(body),
            head: Some(head),
            error: None,
        }
    }

    /// An attempt that failed below HTTP.
    pub fn failed(error: TransportError) -> Self {
        Self {
            body: None,
            head: None,
            error: Some(error),
        }
    }
}
