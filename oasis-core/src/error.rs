//! Error Types
//!
//! Every fallible operation in the crate returns one of the enums below.
//!
//! # Propagation
//!
//! Errors inside an island tree fail fast: the first failing child aborts the
//! whole render and no partial output is produced. Each hop up the tree wraps
//! the error in [`RenderError::Child`], so a failure deep in the tree carries
//! the full path of child names that led to it.
//!
//! The HTTP edge ([`HydrationWriter`](crate::server::HydrationWriter)) is the
//! one place where render failures are recovered and turned into a
//! [`WriteError`] instead of unwinding further.

use thiserror::Error;

/// The hydration payload could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The bytes are not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The bytes are valid JSON, but the top-level value is not an object.
    #[error("payload must be a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// The template engine failed to parse or execute a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template source is malformed.
    #[error("parse error on line {line}: {message}")]
    Parse {
        /// 1-based line of the offending action.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// The template parsed, but evaluating it against the bag failed.
    #[error("exec error: {0}")]
    Exec(String),

    /// A lazy child invoked from the template failed to render.
    #[error("rendering lazy child `{name}`: {source}")]
    Island {
        /// Name of the lazy child.
        name: String,
        /// The child's own render failure.
        #[source]
        source: Box<RenderError>,
    },
}

/// Rendering an island failed.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The island's own template failed.
    #[error("island `{island}`: {source}")]
    Template {
        /// Name of the island whose template failed.
        island: String,
        /// Underlying template failure.
        #[source]
        source: TemplateError,
    },

    /// An eager child failed while the parent was being rendered.
    #[error("child `{child}` -> {source}")]
    Child {
        /// Name of the failing child.
        child: String,
        /// The child's own render failure.
        #[source]
        source: Box<RenderError>,
    },
}

impl RenderError {
    /// Names of the children between the rendered island and the island
    /// whose template actually failed, outermost first.
    ///
    /// Eager children are reached through [`RenderError::Child`], lazy ones
    /// through [`TemplateError::Island`]. Empty when the root island's own
    /// template failed.
    pub fn child_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = self;
        loop {
            match current {
                RenderError::Child { child, source } => {
                    path.push(child.as_str());
                    current = source;
                }
                RenderError::Template {
                    source: TemplateError::Island { name, source },
                    ..
                } => {
                    path.push(name.as_str());
                    current = source;
                }
                RenderError::Template { .. } => return path,
            }
        }
    }

    /// The template failure at the bottom of the chain.
    ///
    /// Never [`TemplateError::Island`]: lazy child failures are followed down
    /// to the template that actually failed.
    pub fn template_error(&self) -> &TemplateError {
        match self {
            RenderError::Template {
                source: TemplateError::Island { source, .. },
                ..
            } => source.template_error(),
            RenderError::Template { source, .. } => source,
            RenderError::Child { source, .. } => source.template_error(),
        }
    }
}

/// A write through the hydration bridge failed.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The written bytes were not a JSON object. Nothing reached the sink.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The hydrated island failed to render. Nothing reached the sink.
    #[error("recovered from rendering island: {0}")]
    Render(#[from] RenderError),

    /// The template renderer panicked. Nothing reached the sink.
    #[error("recovered from rendering island panic: {0}")]
    Panicked(String),

    /// The underlying sink rejected the bytes.
    #[error("response sink: {0}")]
    Sink(#[from] std::io::Error),
}

/// Server configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The listen address is not a valid socket address.
    #[error("invalid listen address `{value}`: {source}")]
    InvalidAddr {
        /// The offending value.
        value: String,
        /// Parse failure.
        #[source]
        source: std::net::AddrParseError,
    },

    /// The body limit is not a valid byte count.
    #[error("invalid body limit `{value}`: {source}")]
    InvalidLimit {
        /// The offending value.
        value: String,
        /// Parse failure.
        #[source]
        source: std::num::ParseIntError,
    },
}
