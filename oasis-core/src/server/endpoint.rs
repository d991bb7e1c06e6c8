//! Endpoints
//!
//! An [`Endpoint`] ties a route to one [`IslandHandler`] per HTTP method.
//! An island handler bundles the island to render, the handler that
//! produces its payload, and the middleware that runs first.
//!
//! # Request flow
//!
//! For every request, [`IslandHandler::call`]:
//!
//! 1. forks the bound island, so concurrent requests never share a payload;
//! 2. stores the island's props in the request extensions
//!    (see [`props_for_request`]);
//! 3. runs the middleware in order; any of them may stop the chain;
//! 4. runs the handler, which writes its JSON payload through a
//!    [`HydrationWriter`];
//! 5. returns the buffered response, or `500` if the hydration write failed
//!    before anything reached the response.

use std::ops::ControlFlow;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use indexmap::IndexMap;
use tracing::{debug, warn};

use super::hydration::HydrationWriter;
use super::response::{BufferedResponse, ResponseSink};
use crate::island::{Island, Props};

/// Produces the hydration payload for a request.
pub type Handler = Arc<dyn Fn(&Request<Bytes>, &mut dyn ResponseSink) + Send + Sync>;

/// Runs before the handler. Returning [`ControlFlow::Break`] skips the rest
/// of the chain, including the handler.
pub type Middleware =
    Arc<dyn Fn(&Request<Bytes>, &mut dyn ResponseSink) -> ControlFlow<()> + Send + Sync>;

/// Request extension carrying the bound island's props.
#[derive(Debug, Clone)]
pub struct IslandProps(pub Props);

/// The props of the island serving `request`, if any.
pub fn props_for_request<B>(request: &Request<B>) -> Option<&Props> {
    request
        .extensions()
        .get::<IslandProps>()
        .map(|props| &props.0)
}

/// An island plus the handler and middleware that serve it.
#[derive(Clone)]
pub struct IslandHandler {
    island: Island,
    handler: Handler,
    middleware: Vec<Middleware>,
}

impl IslandHandler {
    /// Serve `island` with `handler`, which writes the hydration payload.
    pub fn new<F>(island: Island, handler: F) -> Self
    where
        F: Fn(&Request<Bytes>, &mut dyn ResponseSink) + Send + Sync + 'static,
    {
        Self {
            island,
            handler: Arc::new(handler),
            middleware: Vec::new(),
        }
    }

    /// Append a middleware to the chain.
    pub fn with_middleware<F>(mut self, middleware: F) -> Self
    where
        F: Fn(&Request<Bytes>, &mut dyn ResponseSink) -> ControlFlow<()> + Send + Sync + 'static,
    {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// The island each request forks from.
    pub fn island(&self) -> &Island {
        &self.island
    }

    /// Buffer the request body (up to `body_limit` bytes) and [`call`](Self::call).
    pub async fn dispatch(&self, request: Request<Body>, body_limit: usize) -> Response {
        let (parts, body) = request.into_parts();
        let body = match axum::body::to_bytes(body, body_limit).await {
            Ok(body) => body,
            Err(err) => {
                warn!(island = self.island.name(), error = %err, "failed to read request body");
                return (StatusCode::BAD_REQUEST, "failed to read request body").into_response();
            }
        };
        self.call(Request::from_parts(parts, body))
    }

    /// Serve one request with a buffered body.
    pub fn call(&self, mut request: Request<Bytes>) -> Response {
        let island = self.island.fork();
        request
            .extensions_mut()
            .insert(IslandProps(island.props()));

        let mut response = BufferedResponse::new();
        let failed = {
            let mut writer = HydrationWriter::new(&mut response, island);
            let proceed = self
                .middleware
                .iter()
                .all(|middleware| middleware(&request, &mut writer).is_continue());

            if proceed {
                (self.handler)(&request, &mut writer);
            } else {
                debug!(island = writer.island().name(), "middleware stopped the chain");
            }
            writer.failed()
        };

        if failed && response.is_untouched() {
            return (StatusCode::INTERNAL_SERVER_ERROR, "island render failed").into_response();
        }
        response.into_response()
    }
}

impl std::fmt::Debug for IslandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IslandHandler")
            .field("island", &self.island.name())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

/// A route and its handlers, one per method.
#[derive(Debug, Clone)]
pub struct Endpoint {
    route: String,
    handlers: IndexMap<Method, IslandHandler>,
}

impl Endpoint {
    /// An endpoint with no handlers yet.
    pub fn new(route: impl Into<String>) -> Self {
        Self::with_handlers(route, IndexMap::new())
    }

    /// An endpoint with a prepared method-to-handler map.
    pub fn with_handlers(
        route: impl Into<String>,
        handlers: IndexMap<Method, IslandHandler>,
    ) -> Self {
        Self {
            route: route.into(),
            handlers,
        }
    }

    /// Serve `method` on this route with `handler`, replacing any previous
    /// handler for that method.
    pub fn handler(mut self, method: Method, handler: IslandHandler) -> Self {
        self.handlers.insert(method, handler);
        self
    }

    /// The route path, as given.
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Handlers in registration order.
    pub fn handlers(&self) -> impl Iterator<Item = (&Method, &IslandHandler)> {
        self.handlers.iter()
    }

    pub(crate) fn into_parts(self) -> (String, IndexMap<Method, IslandHandler>) {
        (self.route, self.handlers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::Payload;
    use axum::http::header::CONTENT_TYPE;

    fn card() -> Island {
        let card = Island::new("card", "<div>{{.props.title}}{{.payload.x}}</div>");
        card.add_prop("title", "Hi");
        card
    }

    fn request(body: &'static str) -> Request<Bytes> {
        Request::builder()
            .method(Method::POST)
            .uri("/card")
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn handler_payload_is_rendered() {
        let handler = IslandHandler::new(card(), |_request, writer| {
            let mut payload = Payload::new();
            payload.set("x", 1);
            let _ = writer.write(&payload.marshal().unwrap());
        });

        let response = handler.call(request(""));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(body_string(response).await, "<div>Hi1</div>");
    }

    #[tokio::test]
    async fn handler_sees_props_and_body() {
        let handler = IslandHandler::new(card(), |request, writer| {
            let title = props_for_request(request)
                .and_then(|props| props.get("title"))
                .cloned();
            assert_eq!(title, Some(serde_json::json!("Hi")));
            let _ = writer.write(request.body());
        });

        let response = handler.call(request(r#"{"x":"!"}"#));
        assert_eq!(body_string(response).await, "<div>Hi!</div>");
    }

    #[test]
    fn props_are_absent_outside_island_requests() {
        assert!(props_for_request(&request("")).is_none());
    }

    #[tokio::test]
    async fn middleware_runs_in_order_and_can_stop() {
        let handler = IslandHandler::new(card(), |_request, writer| {
            let _ = writer.write(b"{}");
        })
        .with_middleware(|_request, writer| {
            writer
                .headers_mut()
                .insert("x-first", "1".parse().unwrap());
            ControlFlow::Continue(())
        })
        .with_middleware(|request, writer| {
            if request.headers().contains_key("x-deny") {
                writer.write_header(StatusCode::FORBIDDEN);
                return ControlFlow::Break(());
            }
            ControlFlow::Continue(())
        });

        let response = handler.call(request(""));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-first"], "1");
        assert_eq!(body_string(response).await, "<div>Hi</div>");

        let mut denied = request("");
        denied
            .headers_mut()
            .insert("x-deny", "yes".parse().unwrap());
        let response = handler.call(denied);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_string(response).await, "");
    }

    #[tokio::test]
    async fn failed_write_becomes_server_error() {
        let handler = IslandHandler::new(card(), |request, writer| {
            assert!(writer.write(request.body()).is_err());
        });

        let response = handler.call(request("not json"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn requests_do_not_hydrate_the_shared_island() {
        let island = card();
        let handler = IslandHandler::new(island.clone(), |request, writer| {
            let _ = writer.write(request.body());
        });

        handler.call(request(r#"{"x":1}"#));
        assert!(island.payload().is_none());
    }

    #[tokio::test]
    async fn dispatch_enforces_the_body_limit() {
        let handler = IslandHandler::new(card(), |request, writer| {
            let _ = writer.write(request.body());
        });
        let request = Request::builder()
            .method(Method::POST)
            .uri("/card")
            .body(Body::from(r#"{"x":"way too long"}"#))
            .unwrap();

        let response = handler.dispatch(request, 4).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn endpoint_replaces_handlers_per_method() {
        let first = IslandHandler::new(card(), |_, _| {});
        let second = IslandHandler::new(Island::new("other", ""), |_, _| {});
        let endpoint = Endpoint::new("/card")
            .handler(Method::GET, first)
            .handler(Method::GET, second);

        let handlers: Vec<_> = endpoint.handlers().collect();
        assert_eq!(handlers.len(), 1);
        assert_eq!(handlers[0].1.island().name(), "other");
        assert_eq!(endpoint.route(), "/card");
    }
}
