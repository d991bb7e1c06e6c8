//! Hydration Bridge
//!
//! [`HydrationWriter`] sits between a request handler and the real response
//! sink. The handler does not write HTML: it writes the JSON payload the
//! bound island should be hydrated with, and the writer turns that into the
//! rendered page.
//!
//! # Single-shot writes
//!
//! This deliberately breaks the usual "write appends to the body" contract.
//! Every call to [`ResponseSink::write`] is taken as one complete JSON
//! object:
//!
//! 1. decode the bytes (on failure nothing is written);
//! 2. hydrate the bound island, replacing any earlier payload;
//! 3. render the island;
//! 4. write the HTML to the underlying sink.
//!
//! Write exactly once per request. A second write re-hydrates, re-renders
//! and appends a second copy of the page after the first.
//!
//! # Recovery
//!
//! This is the crate's one guaranteed recovery boundary. Render errors, and
//! panics raised by a template renderer, come back as a [`WriteError`]
//! instead of unwinding into the server, so one broken island cannot take
//! the serving process down.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use axum::http::{HeaderMap, StatusCode};
use tracing::{debug, warn};

use super::response::ResponseSink;
use crate::error::WriteError;
use crate::island::Island;

/// A response sink that hydrates and renders an island on write.
#[derive(Debug)]
pub struct HydrationWriter<S> {
    sink: S,
    island: Island,
    failed: bool,
}

impl<S: ResponseSink> HydrationWriter<S> {
    /// Bind `island` to `sink`.
    pub fn new(sink: S, island: Island) -> Self {
        Self {
            sink,
            island,
            failed: false,
        }
    }

    /// The bound island.
    pub fn island(&self) -> &Island {
        &self.island
    }

    /// Whether any write has failed.
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Unwrap the underlying sink.
    pub fn into_inner(self) -> S {
        self.sink
    }

    fn hydrate_and_write(&mut self, bytes: &[u8]) -> Result<usize, WriteError> {
        self.island.hydrate_bytes(bytes)?;
        let html = render_recovering(&self.island)?;
        debug!(
            island = self.island.name(),
            bytes = html.len(),
            "writing hydrated island"
        );
        self.sink.write(html.as_bytes())
    }
}

impl<S: ResponseSink> ResponseSink for HydrationWriter<S> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.sink.headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        self.sink.write_header(status);
    }

    /// Hydrate the bound island with `bytes` and write the rendered HTML.
    ///
    /// Returns the number of HTML bytes written, not the number of payload
    /// bytes consumed.
    fn write(&mut self, bytes: &[u8]) -> Result<usize, WriteError> {
        let result = self.hydrate_and_write(bytes);
        if let Err(err) = &result {
            self.failed = true;
            warn!(island = self.island.name(), error = %err, "hydration write failed");
        }
        result
    }
}

fn render_recovering(island: &Island) -> Result<String, WriteError> {
    match panic::catch_unwind(AssertUnwindSafe(|| island.render())) {
        Ok(rendered) => Ok(rendered?),
        Err(payload) => Err(WriteError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::{DecodeError, TemplateError};
    use crate::island::{AttributeBag, ChildMode};
    use crate::server::BufferedResponse;
    use crate::template::TemplateRenderer;

    fn card() -> Island {
        let card = Island::new("card", "<div>{{.props.title}}</div>");
        card.add_prop("title", "Hi");
        card
    }

    #[test]
    fn write_renders_the_bound_island() {
        let mut response = BufferedResponse::new();
        let mut writer = HydrationWriter::new(&mut response, card());

        let n = writer.write(br#"{"x":1}"#).unwrap();

        assert_eq!(n, "<div>Hi</div>".len());
        assert!(!writer.failed());
        assert_eq!(response.body(), b"<div>Hi</div>");
    }

    #[test]
    fn payload_reaches_the_template() {
        let island = Island::new("hello", "hello {{.payload.name}}");
        let mut response = BufferedResponse::new();
        let mut writer = HydrationWriter::new(&mut response, island.clone());

        writer.write(br#"{"name":"Ada"}"#).unwrap();

        assert_eq!(response.body(), b"hello Ada");
        assert_eq!(island.payload().unwrap()["name"], "Ada");
    }

    #[test]
    fn bad_json_writes_nothing() {
        let mut response = BufferedResponse::new();
        let mut writer = HydrationWriter::new(&mut response, card());

        let err = writer.write(b"<html>").unwrap_err();
        assert!(matches!(err, WriteError::Decode(DecodeError::Json(_))));
        let err = writer.write(b"\"scalar\"").unwrap_err();
        assert!(matches!(err, WriteError::Decode(DecodeError::NotAnObject("string"))));
        assert!(writer.failed());
        assert!(response.is_untouched());
    }

    #[test]
    fn render_failure_is_reported() {
        let island = Island::new("page", "{{.children.broken}}");
        island.add_child(&Island::new("broken", "{{if}}"), ChildMode::Eager);
        let mut response = BufferedResponse::new();
        let mut writer = HydrationWriter::new(&mut response, island);

        let err = writer.write(b"{}").unwrap_err();
        let WriteError::Render(render) = err else {
            panic!("expected a render error");
        };
        assert_eq!(render.child_path(), vec!["broken"]);
        assert!(response.is_untouched());
    }

    #[test]
    fn renderer_panic_is_recovered() {
        let renderer: Arc<dyn TemplateRenderer> =
            Arc::new(|_: &str, _: &AttributeBag| -> Result<String, TemplateError> {
                panic!("renderer exploded")
            });
        let island = Island::with_renderer("volatile", "", renderer);
        let mut response = BufferedResponse::new();
        let mut writer = HydrationWriter::new(&mut response, island);

        let err = writer.write(b"{}").unwrap_err();
        assert!(matches!(err, WriteError::Panicked(ref msg) if msg == "renderer exploded"));
    }

    #[test]
    fn headers_and_status_pass_through() {
        let mut response = BufferedResponse::new();
        let mut writer = HydrationWriter::new(&mut response, card());

        writer.write_header(StatusCode::CREATED);
        writer
            .headers_mut()
            .insert("x-island", "card".parse().unwrap());
        drop(writer);

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-island"], "card");
    }

    #[test]
    fn second_write_appends_a_second_render() {
        let island = Island::new("n", "[{{.payload.n}}]");
        let mut response = BufferedResponse::new();
        let mut writer = HydrationWriter::new(&mut response, island);

        writer.write(br#"{"n":1}"#).unwrap();
        writer.write(br#"{"n":2}"#).unwrap();

        assert_eq!(response.body(), b"[1][2]");
    }
}
