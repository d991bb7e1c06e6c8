//! Router
//!
//! Mounts [`Endpoint`]s onto an [`axum::Router`].

use std::sync::Arc;

use axum::extract::Request;
use axum::routing::{MethodFilter, MethodRouter};
use tracing::{debug, warn};

use super::endpoint::Endpoint;
use crate::config::DEFAULT_BODY_LIMIT;

/// An axum router that island endpoints can be added to.
#[derive(Debug, Clone)]
pub struct Router {
    inner: axum::Router,
    body_limit: usize,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// A router with no routes.
    pub fn new() -> Self {
        Self::upgrade(axum::Router::new())
    }

    /// Wrap an existing axum router, keeping its routes.
    pub fn upgrade(router: axum::Router) -> Self {
        Self {
            inner: router,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Limit request bodies of endpoints added after this call.
    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }

    /// Mount `endpoint`.
    ///
    /// Methods axum cannot route on are skipped with a warning. A route
    /// without a leading `/` gets one.
    ///
    /// # Panics
    ///
    /// Panics, as [`axum::Router::route`] does, if a method is already
    /// routed on the same path.
    pub fn add_endpoint(mut self, endpoint: Endpoint) -> Self {
        let (route, handlers) = endpoint.into_parts();
        let route = if route.starts_with('/') {
            route
        } else {
            format!("/{route}")
        };

        let mut methods: MethodRouter = MethodRouter::new();
        let mut mounted = 0;
        for (method, handler) in handlers {
            let Ok(filter) = MethodFilter::try_from(method.clone()) else {
                warn!(%route, %method, "method cannot be routed, skipping");
                continue;
            };

            let handler = Arc::new(handler);
            let body_limit = self.body_limit;
            methods = methods.on(filter, move |request: Request| {
                let handler = Arc::clone(&handler);
                async move { handler.dispatch(request, body_limit).await }
            });
            mounted += 1;
        }

        if mounted == 0 {
            warn!(%route, "endpoint has no routable handlers");
            return self;
        }

        debug!(%route, methods = mounted, "mounted island endpoint");
        self.inner = self.inner.route(&route, methods);
        self
    }

    /// Mount every endpoint in order.
    pub fn add_endpoints(self, endpoints: impl IntoIterator<Item = Endpoint>) -> Self {
        endpoints
            .into_iter()
            .fold(self, |router, endpoint| router.add_endpoint(endpoint))
    }

    /// The underlying axum router.
    pub fn into_axum(self) -> axum::Router {
        self.inner
    }
}

impl From<Router> for axum::Router {
    fn from(router: Router) -> Self {
        router.into_axum()
    }
}
