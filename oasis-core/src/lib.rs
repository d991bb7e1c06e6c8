//! Oasis Core
//!
//! This crate provides the server-side core of the Oasis islands framework.
//! It implements:
//!
//! - Islands: named template fragments with props, nested child islands and
//!   a per-request hydration payload
//! - Eager and lazy child composition
//! - A small template engine for island markup
//! - The hydration bridge that turns a handler's JSON payload into the
//!   rendered HTTP response body
//! - Router glue for serving islands with axum
//!
//! Rendering is one-shot and server-side: text in, text out. There is no
//! virtual DOM and no client-side reactivity.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `island`: the island tree, the attribute bag, and composition
//! - `template`: the renderer trait and the default template engine
//! - `server`: response sinks, the hydration bridge, endpoints and routing
//! - `config`: server settings
//! - `error`: error types shared by all of the above
//!
//! # Example
//!
//! ```rust
//! use oasis_core::island::{ChildMode, Island};
//!
//! let card = Island::new("card", "<div>{{.props.title}}</div>");
//! card.add_prop("title", "Hi");
//!
//! let page = Island::new("page", "<section>{{.children.card}}</section>");
//! page.add_child(&card, ChildMode::Eager);
//!
//! assert_eq!(page.render().unwrap(), "<section><div>Hi</div></section>");
//! ```

pub mod config;
pub mod error;
pub mod island;
pub mod server;
pub mod template;

pub use config::ServerConfig;
pub use error::{ConfigError, DecodeError, RenderError, TemplateError, WriteError};
pub use island::{must_render, AttributeBag, ChildMode, ChildSlot, Island, Props};
pub use template::{TemplateRenderer, TextRenderer};
