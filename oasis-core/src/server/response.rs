//! Response Sinks
//!
//! [`ResponseSink`] is the minimal contract a handler writes a response
//! through: headers, a status line, and body bytes. [`BufferedResponse`]
//! collects all three and converts into an axum [`Response`] once the
//! handler is done.

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::error::WriteError;

/// Something a handler can write an HTTP response into.
pub trait ResponseSink {
    /// Response headers, writable until the response is sent.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Set the response status.
    fn write_header(&mut self, status: StatusCode);

    /// Write body bytes, returning how many were accepted.
    fn write(&mut self, bytes: &[u8]) -> Result<usize, WriteError>;
}

impl<S: ResponseSink + ?Sized> ResponseSink for &mut S {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        (**self).headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        (**self).write_header(status);
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize, WriteError> {
        (**self).write(bytes)
    }
}

/// An in-memory response.
///
/// The first `write_header` wins; later ones are ignored with a warning.
/// Without one, the status is `200 OK`.
#[derive(Debug, Default)]
pub struct BufferedResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl BufferedResponse {
    /// Create an empty response.
    pub fn new() -> Self {
        Self::default()
    }

    /// The status that will be sent.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Headers written so far.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Body written so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Whether neither a status nor any body bytes have been written.
    pub fn is_untouched(&self) -> bool {
        self.status.is_none() && self.body.is_empty()
    }
}

impl ResponseSink for BufferedResponse {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        match self.status {
            Some(current) => warn!(%current, ignored = %status, "superfluous write_header"),
            None => self.status = Some(status),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize, WriteError> {
        self.body.extend_from_slice(bytes);
        Ok(bytes.len())
    }
}

impl IntoResponse for BufferedResponse {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut headers = self.headers;
        if !self.body.is_empty() && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            );
        }
        (status, headers, self.body).into_response()
    }
}
