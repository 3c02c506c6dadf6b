use std::io::Write;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use http::StatusCode;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue, LAST_MODIFIED};
use serde::Serialize;

use crate::doc_id::DocId;
use crate::{Error, Result};

/// A request for the content of one document.
#[derive(Debug, Clone)]
pub struct Request {
    pub doc_id: DocId,
}

impl Request {
    pub fn new(doc_id: DocId) -> Self {
        Self { doc_id }
    }
}

/// Where a document's content and metadata are written.
pub trait Response {
    /// Terminal: no metadata or body may follow.
    fn respond_not_found(&mut self) -> Result<()>;

    fn set_last_modified(&mut self, time: SystemTime);

    fn add_metadata(&mut self, key: &str, value: &str);

    fn set_content_type(&mut self, content_type: &str);

    /// Sink for the document body.
    fn output_stream(&mut self) -> Result<&mut dyn Write>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Setup,
    Body,
    NotFound,
}

/// A [`Response`] that keeps everything in memory.
#[derive(Debug)]
pub struct BufferedResponse {
    state: State,
    last_modified: Option<SystemTime>,
    content_type: Option<String>,
    metadata: Vec<(String, String)>,
    body: Vec<u8>,
}

/// Serializable view of a finished response, without the body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseSummary {
    pub status: u16,
    pub content_type: Option<String>,
    pub last_modified: Option<String>,
    pub metadata: Vec<(String, String)>,
    pub body_len: usize,
}

impl Default for BufferedResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self {
            state: State::Setup,
            last_modified: None,
            content_type: None,
            metadata: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.state == State::NotFound
    }

    pub fn status(&self) -> StatusCode {
        if self.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::OK
        }
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn metadata(&self) -> &[(String, String)] {
        &self.metadata
    }

    /// First metadata value recorded under `key`.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn summary(&self) -> ResponseSummary {
        ResponseSummary {
            status: self.status().as_u16(),
            content_type: self.content_type.clone(),
            last_modified: self.last_modified.map(http_date),
            metadata: self.metadata.clone(),
            body_len: self.body.len(),
        }
    }

    /// Converts into an HTTP response. Metadata entries become `x-meta-*` headers.
    pub fn into_http(self) -> Result<http::Response<Vec<u8>>> {
        let mut builder = http::Response::builder().status(self.status());
        if self.is_not_found() {
            return Ok(builder.body(Vec::new())?);
        }

        if let Some(content_type) = &self.content_type {
            builder = builder.header(CONTENT_TYPE, header_value(content_type)?);
        }
        if let Some(time) = self.last_modified {
            builder = builder.header(LAST_MODIFIED, header_value(&http_date(time))?);
        }
        for (key, value) in &self.metadata {
            builder = builder.header(metadata_header_name(key)?, header_value(value)?);
        }
        Ok(builder.body(self.body)?)
    }

    fn ensure_not_terminated(&self) -> Result<()> {
        if self.is_not_found() {
            return Err(Error::Response(
                "response was already answered with not found".to_string(),
            ));
        }
        Ok(())
    }
}

impl Response for BufferedResponse {
    fn respond_not_found(&mut self) -> Result<()> {
        if self.state == State::Body {
            return Err(Error::Response(
                "cannot respond not found after the body was started".to_string(),
            ));
        }
        self.state = State::NotFound;
        Ok(())
    }

    fn set_last_modified(&mut self, time: SystemTime) {
        self.last_modified = Some(time);
    }

    fn add_metadata(&mut self, key: &str, value: &str) {
        self.metadata.push((key.to_string(), value.to_string()));
    }

    fn set_content_type(&mut self, content_type: &str) {
        self.content_type = Some(content_type.to_string());
    }

    fn output_stream(&mut self) -> Result<&mut dyn Write> {
        self.ensure_not_terminated()?;
        self.state = State::Body;
        Ok(&mut self.body)
    }
}

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::Response(format!("invalid header value {:?}: {}", value, e)))
}

fn metadata_header_name(key: &str) -> Result<HeaderName> {
    let name = format!("x-meta-{}", key.trim().to_lowercase().replace(' ', "-"));
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::Response(format!("invalid metadata key {:?}: {}", key, e)))
}
