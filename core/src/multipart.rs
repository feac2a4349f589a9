//! `multipart/form-data` body encoding.
//!
//! # Design
//! Every [`Encoder`] built here owns a fresh boundary derived from a random
//! v4 UUID, and its `Content-Type` header carries that same boundary. Part
//! contents are read in full before anything is returned, so a part that
//! cannot be read yields no body at all rather than a truncated one.

use std::path::PathBuf;

use uuid::Uuid;

use crate::codec::Encoder;
use crate::http::Header;

const CRLF: &str = "\r\n";

/// Where a part's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartSource {
    Bytes(Vec<u8>),
    File(PathBuf),
}

impl PartSource {
    fn read(&self) -> std::io::Result<Vec<u8>> {
        match self {
            PartSource::Bytes(bytes) => Ok(bytes.clone()),
            PartSource::File(path) => std::fs::read(path),
        }
    }
}

/// One field of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    pub name: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub source: PartSource,
}

impl MultipartPart {
    pub fn bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            file_name: None,
            mime_type: None,
            source: PartSource::Bytes(bytes.into()),
        }
    }

    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            file_name: None,
            mime_type: None,
            source: PartSource::File(path.into()),
        }
    }

    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

fn new_boundary() -> String {
    format!("Boundary-{}", Uuid::new_v4().simple())
}

/// Quote-safe form of a disposition parameter: `"`, CR and LF are
/// percent-encoded so a value cannot end the quoted string or the line.
fn escape_parameter(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("%22"),
            '\r' => escaped.push_str("%0D"),
            '\n' => escaped.push_str("%0A"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn write_part(body: &mut Vec<u8>, boundary: &str, part: &MultipartPart) -> std::io::Result<()> {
    let content = part.source.read()?;
    body.extend_from_slice(format!("--{boundary}{CRLF}").as_bytes());

    let mut disposition = format!(
        "Content-Disposition: form-data; name=\"{}\"",
        escape_parameter(&part.name)
    );
    if let Some(file_name) = &part.file_name {
        disposition.push_str(&format!("; filename=\"{}\"", escape_parameter(file_name)));
    }
    disposition.push_str(CRLF);
    body.extend_from_slice(disposition.as_bytes());

    if let Some(mime_type) = &part.mime_type {
        body.extend_from_slice(format!("Content-Type: {mime_type}{CRLF}").as_bytes());
    }
    body.extend_from_slice(CRLF.as_bytes());
    body.extend_from_slice(&content);
    body.extend_from_slice(CRLF.as_bytes());
    Ok(())
}

/// Encode `parts` between `boundary` lines. Fails if any part cannot be read.
pub fn encode_multipart(boundary: &str, parts: &[MultipartPart]) -> std::io::Result<Vec<u8>> {
    let mut body = Vec::new();
    for part in parts {
        write_part(&mut body, boundary, part)?;
    }
    body.extend_from_slice(format!("--{boundary}--{CRLF}").as_bytes());
    Ok(body)
}

fn encode_or_log(boundary: &str, parts: &[MultipartPart]) -> Option<Vec<u8>> {
    match encode_multipart(boundary, parts) {
        Ok(body) => Some(body),
        Err(err) => {
            tracing::warn!(error = %err, "failed to read multipart part; sending no body");
            None
        }
    }
}

impl Encoder<Vec<MultipartPart>> {
    pub fn multipart() -> Self {
        let boundary = new_boundary();
        let header = Header::multipart_form_data(&boundary);
        Self::new(move |parts: &Vec<MultipartPart>| encode_or_log(&boundary, parts), vec![header]).blocking()
    }
}

impl Encoder<MultipartPart> {
    /// Single-part counterpart of the list encoder.
    pub fn multipart_part() -> Self {
        let boundary = new_boundary();
        let header = Header::multipart_form_data(&boundary);
        Self::new(
            move |part: &MultipartPart| encode_or_log(&boundary, std::slice::from_ref(part)),
            vec![header],
        )
        .blocking()
    }
}
