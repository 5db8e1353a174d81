//! The application-level dispatch chain.
//!
//! [`App`] is the outermost, simplest continuation sequence: an ordered list
//! of global middleware that always runs (no path matching), followed by the
//! app's router once a route tree exists. It also guarantees the terminal
//! contract: a request that nothing finalized gets a default "not found"
//! response, and an error nothing resolved gets a default error response.

use crate::middleware::query_parser;
use http::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use viaduct_core::{
    ErrorHandler, Flow, Handler, Outcome, RequestContext, Response, Settings,
};
use viaduct_router::{ParamHandler, Route, Router};

/// The application: a global middleware chain wrapped around a router.
///
/// # Example
///
/// ```
/// use viaduct::{App, Flow};
/// use viaduct_core::{handler_fn, RequestContext, Response};
/// use http::Method;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut app = App::new();
/// app.get("/hello/:name", handler_fn(|req, res| {
///     let name = req.params().get("name").unwrap_or("world").to_string();
///     res.send(format!("hello {name}"));
///     Ok(Flow::Finish)
/// }));
///
/// let mut req = RequestContext::new(Method::GET, "/hello/ada");
/// let mut res = Response::new();
/// app.handle(&mut req, &mut res).await;
/// assert_eq!(res.body(), &b"hello ada"[..]);
/// # }
/// ```
pub struct App {
    chain: Vec<Arc<dyn Handler>>,
    router: Option<Router>,
    settings: Settings,
}

impl App {
    /// Creates an application with empty root settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(Settings::new())
    }

    /// Creates an application over an existing settings store.
    ///
    /// Use [`Settings::child`] to make a mounted application inherit its
    /// parent's configuration.
    #[must_use]
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            chain: Vec::new(),
            router: None,
            settings,
        }
    }

    /// The application settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Sets a setting value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.settings.set(name, value);
        self
    }

    /// Looks up a setting value.
    #[must_use]
    pub fn setting(&self, name: &str) -> Option<&Value> {
        self.settings.get(name)
    }

    /// Sets a setting to `true`.
    pub fn enable(&mut self, name: impl Into<String>) -> &mut Self {
        self.settings.enable(name);
        self
    }

    /// Sets a setting to `false`.
    pub fn disable(&mut self, name: impl Into<String>) -> &mut Self {
        self.settings.disable(name);
        self
    }

    /// Whether a setting is truthy.
    #[must_use]
    pub fn enabled(&self, name: &str) -> bool {
        self.settings.enabled(name)
    }

    /// Whether a setting is absent or falsy.
    #[must_use]
    pub fn disabled(&self, name: &str) -> bool {
        self.settings.disabled(name)
    }

    /// Appends a global middleware.
    ///
    /// Global middleware runs for every request, in registration order,
    /// before the router. An error from a global middleware goes straight
    /// to the terminal default; route-level error handlers do not see it.
    pub fn use_middleware(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.chain.push(handler);
        self
    }

    /// The app's router, created on first use.
    ///
    /// Routing settings (`case sensitive routing`, `strict routing`,
    /// `merge params`) are snapshotted at this moment, and the built-in
    /// query middleware becomes the router's first layer.
    pub fn router(&mut self) -> &mut Router {
        let settings = &self.settings;
        self.router.get_or_insert_with(|| {
            let mut router = Router::from_settings(settings);
            router.use_middleware("/", query_parser());
            router
        })
    }

    /// Returns the route bound to an exact path, creating it on first use.
    pub fn route(&mut self, path: &str) -> &mut Route {
        self.router().route(path)
    }

    /// Mounts a nested router at a path prefix.
    pub fn mount(&mut self, path: &str, router: Router) -> &mut Self {
        self.router().mount(path, router);
        self
    }

    /// Mounts an error handler at a path prefix on the app's router.
    pub fn use_error(&mut self, handler: Arc<dyn ErrorHandler>) -> &mut Self {
        self.router().use_error("/", handler);
        self
    }

    /// Registers parameter middleware on the app's router.
    pub fn param(&mut self, name: &str, handler: Arc<dyn ParamHandler>) -> &mut Self {
        self.router().param(name, handler);
        self
    }

    /// Registers a GET handler at an exact path.
    pub fn get(&mut self, path: &str, handler: Arc<dyn Handler>) -> &mut Self {
        self.router().get(path, handler);
        self
    }

    /// Registers a POST handler at an exact path.
    pub fn post(&mut self, path: &str, handler: Arc<dyn Handler>) -> &mut Self {
        self.router().post(path, handler);
        self
    }

    /// Registers a PUT handler at an exact path.
    pub fn put(&mut self, path: &str, handler: Arc<dyn Handler>) -> &mut Self {
        self.router().put(path, handler);
        self
    }

    /// Registers a DELETE handler at an exact path.
    pub fn delete(&mut self, path: &str, handler: Arc<dyn Handler>) -> &mut Self {
        self.router().delete(path, handler);
        self
    }

    /// Registers a handler for every known method at an exact path.
    pub fn all(&mut self, path: &str, handler: Arc<dyn Handler>) -> &mut Self {
        self.router().all(path, handler);
        self
    }

    /// Handles one request to completion.
    ///
    /// Runs the global chain, then the router, then applies the terminal
    /// defaults so the response is always finalized when this returns.
    pub async fn handle(&self, req: &mut RequestContext, res: &mut Response) {
        let outcome = self.dispatch(req, res).await;
        finalize(res, outcome);
    }

    /// Runs the chain and router without applying terminal defaults.
    ///
    /// Useful when embedding an `App` under another dispatcher.
    pub async fn dispatch(&self, req: &mut RequestContext, res: &mut Response) -> Outcome {
        for handler in &self.chain {
            match handler.call(req, res).await {
                Ok(Flow::Finish) => return Ok(Flow::Finish),
                Ok(_) => {}
                Err(err) => return Err(err),
            }
        }
        match &self.router {
            Some(router) => router.handle(req, res).await,
            None => Ok(Flow::Continue),
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("chain", &self.chain.len())
            .field("router", &self.router)
            .finish()
    }
}

/// Applies the terminal defaults to an outcome.
fn finalize(res: &mut Response, outcome: Outcome) {
    match outcome {
        Ok(Flow::Finish) => {}
        Ok(_) => {
            if !res.is_ended() {
                tracing::debug!("no handler finalized the response");
                send_status(res, StatusCode::NOT_FOUND);
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "request failed");
            if !res.is_ended() {
                send_status(res, err.status_code());
            }
        }
    }
}

fn send_status(res: &mut Response, status: StatusCode) {
    res.set_status(status);
    res.send(status.canonical_reason().unwrap_or("Unknown"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use viaduct_core::{handler_fn, DispatchError};

    #[tokio::test]
    async fn test_global_chain_runs_before_router() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut app = App::new();
        {
            let order = Arc::clone(&order);
            app.use_middleware(handler_fn(move |_, _| {
                order.lock().unwrap().push("global");
                Ok(Flow::Continue)
            }));
        }
        {
            let order = Arc::clone(&order);
            app.get(
                "/x",
                handler_fn(move |_, res| {
                    order.lock().unwrap().push("route");
                    res.send("done");
                    Ok(Flow::Finish)
                }),
            );
        }

        let mut req = RequestContext::new(Method::GET, "/x");
        let mut res = Response::new();
        app.handle(&mut req, &mut res).await;

        assert_eq!(*order.lock().unwrap(), vec!["global", "route"]);
    }

    #[tokio::test]
    async fn test_default_not_found() {
        let app = App::new();

        let mut req = RequestContext::new(Method::GET, "/missing");
        let mut res = Response::new();
        app.handle(&mut req, &mut res).await;

        assert!(res.is_ended());
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_chain_error_goes_to_terminal_default() {
        let reached = Arc::new(AtomicUsize::new(0));
        let mut app = App::new();
        app.use_middleware(handler_fn(|_, _| {
            Err(DispatchError::internal("broken middleware"))
        }));
        {
            let reached = Arc::clone(&reached);
            app.use_middleware(handler_fn(move |_, _| {
                reached.fetch_add(1, Ordering::SeqCst);
                Ok(Flow::Continue)
            }));
        }

        let mut req = RequestContext::new(Method::GET, "/x");
        let mut res = Response::new();
        app.handle(&mut req, &mut res).await;

        assert_eq!(reached.load(Ordering::SeqCst), 0);
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_router_snapshots_settings_lazily() {
        let mut app = App::new();
        app.enable("case sensitive routing");
        app.get(
            "/CaseSensitive",
            handler_fn(|_, res| {
                res.send("hit");
                Ok(Flow::Finish)
            }),
        );

        let mut req = RequestContext::new(Method::GET, "/casesensitive");
        let mut res = Response::new();
        app.handle(&mut req, &mut res).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let mut req = RequestContext::new(Method::GET, "/CaseSensitive");
        let mut res = Response::new();
        app.handle(&mut req, &mut res).await;
        assert_eq!(res.body(), &b"hit"[..]);
    }

    #[tokio::test]
    async fn test_query_populated_before_routes() {
        let mut app = App::new();
        app.get(
            "/search",
            handler_fn(|req, res| {
                let q = req
                    .query()
                    .and_then(|query| query.get("q").cloned())
                    .unwrap_or_default();
                res.send(q);
                Ok(Flow::Finish)
            }),
        );

        let mut req = RequestContext::new(Method::GET, "/search?q=dispatch+engine");
        let mut res = Response::new();
        app.handle(&mut req, &mut res).await;

        assert_eq!(res.body(), &b"dispatch engine"[..]);
    }
}
