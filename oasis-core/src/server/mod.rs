//! HTTP Integration
//!
//! Everything between an incoming request and a rendered island:
//!
//! - [`ResponseSink`] / [`BufferedResponse`]: what handlers write into.
//! - [`HydrationWriter`]: the bridge that turns a written JSON payload into
//!   rendered island HTML.
//! - [`Payload`]: a builder for that JSON payload.
//! - [`IslandHandler`] / [`Endpoint`] / [`Router`]: binding islands,
//!   handlers and middleware to routes on an axum router.
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::http::Method;
//! use oasis_core::island::Island;
//! use oasis_core::server::{serve, Endpoint, IslandHandler, Payload, Router};
//! use oasis_core::ServerConfig;
//!
//! let greeting = Island::new("greeting", "<h1>Hello {{.payload.name}}</h1>");
//!
//! let endpoint = Endpoint::new("/hello").handler(
//!     Method::GET,
//!     IslandHandler::new(greeting, |_request, writer| {
//!         let mut payload = Payload::new();
//!         payload.set("name", "world");
//!         if let Ok(bytes) = payload.marshal() {
//!             let _ = writer.write(&bytes);
//!         }
//!     }),
//! );
//!
//! let config = ServerConfig::from_env()?;
//! let router = Router::new()
//!     .with_body_limit(config.max_body_bytes)
//!     .add_endpoint(endpoint);
//! serve(router, &config).await?;
//! ```

mod endpoint;
mod hydration;
mod payload;
mod response;
mod router;

pub use endpoint::{props_for_request, Endpoint, Handler, IslandHandler, IslandProps, Middleware};
pub use hydration::HydrationWriter;
pub use payload::Payload;
pub use response::{BufferedResponse, ResponseSink};
pub use router::Router;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;

/// Bind `config.addr` and serve `router` until the server stops.
pub async fn serve(router: Router, config: &ServerConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.addr).await?;
    info!(addr = %listener.local_addr()?, "serving islands");
    axum::serve(listener, router.into_axum()).await
}
