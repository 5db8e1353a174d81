//! Per-path, per-method handler buckets.
//!
//! A [`Route`] is created by [`Router::route`](crate::Router::route) and
//! holds the handlers for one exact path, multiplexed by HTTP method. The
//! route never matches a path itself (its containing layer already did);
//! it only decides whether the request *method* is handled.

use crate::layer::{Layer, MethodTag, Target};
use crate::pattern::{MatchOptions, PathPattern};
use crate::Method;
use indexmap::IndexSet;
use std::sync::Arc;
use viaduct_core::{DispatchError, ErrorHandler, Flow, Handler, Outcome, RequestContext, Response};

/// Every method a route registered through [`Route::all`] reports handling.
pub(crate) const KNOWN_METHODS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
    Method::TRACE,
    Method::CONNECT,
];

/// Normalizes a method to its uppercase form.
///
/// Standard methods are already canonical; this covers extension methods
/// registered from lowercase strings so lookup stays case-insensitive.
pub(crate) fn canonical(method: &Method) -> Method {
    if KNOWN_METHODS.contains(method) {
        return method.clone();
    }
    Method::from_bytes(method.as_str().to_ascii_uppercase().as_bytes())
        .unwrap_or_else(|_| method.clone())
}

/// The handlers registered for one exact path.
///
/// # Example
///
/// ```
/// use viaduct_router::Router;
/// use viaduct_core::{handler_fn, Flow};
/// use http::Method;
///
/// let mut router = Router::new();
/// router
///     .route("/items")
///     .get(handler_fn(|_req, res| {
///         res.send("list");
///         Ok(Flow::Finish)
///     }));
///
/// let route = router.route("/items");
/// assert!(route.handles(&Method::GET));
/// assert!(route.handles(&Method::HEAD)); // degrades to GET
/// assert!(!route.handles(&Method::POST));
/// ```
pub struct Route {
    path: String,
    stack: Vec<Layer>,
    methods: IndexSet<Method>,
    handles_all: bool,
}

impl Route {
    /// Creates an empty route for a path.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            stack: Vec::new(),
            methods: IndexSet::new(),
            handles_all: false,
        }
    }

    /// The exact path this route is bound to.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    fn push(&mut self, tag: MethodTag, target: Target) {
        let pattern = PathPattern::compile("/", MatchOptions::default());
        self.stack.push(Layer::new(pattern, target).with_method(tag));
    }

    /// Registers a handler for one method.
    pub fn handle(&mut self, method: Method, handler: Arc<dyn Handler>) -> &mut Self {
        let method = canonical(&method);
        self.methods.insert(method.clone());
        self.push(MethodTag::Only(method), Target::Handler(handler));
        self
    }

    /// Registers an error handler for one method.
    pub fn handle_error(&mut self, method: Method, handler: Arc<dyn ErrorHandler>) -> &mut Self {
        let method = canonical(&method);
        self.methods.insert(method.clone());
        self.push(MethodTag::Only(method), Target::ErrorHandler(handler));
        self
    }

    /// Registers a handler against every known HTTP method.
    pub fn all(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.handles_all = true;
        self.push(MethodTag::All, Target::Handler(handler));
        self
    }

    /// Registers a GET handler.
    pub fn get(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.handle(Method::GET, handler)
    }

    /// Registers a POST handler.
    pub fn post(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.handle(Method::POST, handler)
    }

    /// Registers a PUT handler.
    pub fn put(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.handle(Method::PUT, handler)
    }

    /// Registers a DELETE handler.
    pub fn delete(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.handle(Method::DELETE, handler)
    }

    /// Registers a PATCH handler.
    pub fn patch(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.handle(Method::PATCH, handler)
    }

    /// Registers a HEAD handler.
    pub fn head(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.handle(Method::HEAD, handler)
    }

    /// Registers an OPTIONS handler.
    pub fn options(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.handle(Method::OPTIONS, handler)
    }

    /// Whether this route handles a method.
    ///
    /// `HEAD` degrades to `GET` when no explicit HEAD handler exists.
    #[must_use]
    pub fn handles(&self, method: &Method) -> bool {
        if self.handles_all {
            return true;
        }
        let method = canonical(method);
        if self.methods.contains(&method) {
            return true;
        }
        method == Method::HEAD && self.methods.contains(&Method::GET)
    }

    /// The methods this route reports allowing, in registration order.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        if self.handles_all {
            return KNOWN_METHODS.to_vec();
        }
        self.methods.iter().cloned().collect()
    }

    /// Runs the route's handler chain for the request's method.
    ///
    /// Handlers run in registration order. `SkipRoute` aborts the remaining
    /// handlers and resumes at the parent router; an error skips forward to
    /// the route's own error handlers, or propagates out if none resolve it.
    pub async fn dispatch(&self, req: &mut RequestContext, res: &mut Response) -> Outcome {
        if self.stack.is_empty() {
            return Ok(Flow::Continue);
        }

        let mut method = canonical(req.method());
        if method == Method::HEAD && !self.methods.contains(&Method::HEAD) {
            method = Method::GET;
        }

        let mut pending: Option<DispatchError> = None;
        for layer in &self.stack {
            if !layer.method_matches(&method) {
                continue;
            }
            let outcome = match pending.take() {
                Some(err) => layer.handle_error(err, req, res).await,
                None => layer.handle_request(req, res).await,
            };
            match outcome {
                Ok(Flow::Continue) => {}
                Ok(Flow::Finish) => return Ok(Flow::Finish),
                Ok(Flow::SkipRoute) => return Ok(Flow::Continue),
                Ok(Flow::SkipRouter) => return Ok(Flow::SkipRouter),
                Err(err) => pending = Some(err),
            }
        }

        match pending {
            Some(err) => Err(err),
            None => Ok(Flow::Continue),
        }
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("methods", &self.methods)
            .field("handles_all", &self.handles_all)
            .field("layers", &self.stack.len())
            .finish()
    }
}
