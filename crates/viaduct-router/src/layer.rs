//! A single path-matching unit.
//!
//! A [`Layer`] pairs one compiled [`PathPattern`] with one [`Target`]: a
//! plain handler, an error handler, a [`Route`] or a nested [`Router`].
//! The target kind is an explicit tag: it decides whether the layer
//! participates in normal traversal or in error propagation, and the
//! inapplicable kind passes control through unchanged.

use crate::pattern::{PathMatch, PathPattern};
use crate::route::Route;
use crate::router::Router;
use crate::Method;
use std::sync::Arc;
use viaduct_core::{
    BoxFuture, DispatchError, DispatchResult, ErrorHandler, Flow, Handler, Outcome,
    RequestContext, Response,
};

/// What a layer dispatches to on a match.
pub enum Target {
    /// A plain handler; runs only when no error is in flight.
    Handler(Arc<dyn Handler>),
    /// An error handler; runs only during error propagation.
    ErrorHandler(Arc<dyn ErrorHandler>),
    /// A per-method handler bucket bound to an exact path.
    Route(Route),
    /// A nested router mounted at a path prefix.
    Router(Router),
}

impl Target {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::Handler(_) => "handler",
            Self::ErrorHandler(_) => "error_handler",
            Self::Route(_) => "route",
            Self::Router(_) => "router",
        }
    }
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind_name())
    }
}

/// A method constraint on a route-internal layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodTag {
    /// Matches every method.
    All,
    /// Matches exactly one method.
    Only(Method),
}

impl MethodTag {
    /// Whether the tag admits `method`.
    #[must_use]
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            Self::All => true,
            Self::Only(m) => m == method,
        }
    }
}

/// One path-matching unit in a router or route stack.
#[derive(Debug)]
pub struct Layer {
    pattern: PathPattern,
    target: Target,
    method: Option<MethodTag>,
}

impl Layer {
    /// Creates a layer from a compiled pattern and a target.
    #[must_use]
    pub fn new(pattern: PathPattern, target: Target) -> Self {
        Self {
            pattern,
            target,
            method: None,
        }
    }

    /// Tags the layer with a method constraint.
    #[must_use]
    pub fn with_method(mut self, method: MethodTag) -> Self {
        self.method = Some(method);
        self
    }

    /// The layer's target.
    #[must_use]
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Mutable access to the layer's target.
    pub(crate) fn target_mut(&mut self) -> &mut Target {
        &mut self.target
    }

    /// The parameter names the layer's pattern extracts.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        self.pattern.keys()
    }

    /// The pattern string this layer was registered with.
    #[must_use]
    pub fn path(&self) -> &str {
        self.pattern.source()
    }

    /// A short tag for trace output.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        self.target.kind_name()
    }

    /// Whether the layer's method tag admits `method`.
    ///
    /// Untagged layers admit everything.
    #[must_use]
    pub fn method_matches(&self, method: &Method) -> bool {
        self.method.as_ref().map_or(true, |tag| tag.matches(method))
    }

    /// Matches the layer's pattern against a path.
    ///
    /// Returns an immutable match value; per-dispatch results are never
    /// stored on the layer itself.
    pub fn matches(&self, path: &str) -> DispatchResult<Option<PathMatch>> {
        self.pattern.matches(path)
    }

    /// Invokes the target with no error in flight.
    ///
    /// Error handlers are skipped with a plain continue.
    pub fn handle_request<'a>(
        &'a self,
        req: &'a mut RequestContext,
        res: &'a mut Response,
    ) -> BoxFuture<'a, Outcome> {
        match &self.target {
            Target::Handler(handler) => handler.call(req, res),
            Target::ErrorHandler(_) => Box::pin(std::future::ready(Ok(Flow::Continue))),
            Target::Route(route) => Box::pin(route.dispatch(req, res)),
            Target::Router(router) => router.handle(req, res),
        }
    }

    /// Invokes the target during error propagation.
    ///
    /// Only error handlers consume the error; every other kind passes it
    /// through unchanged.
    pub fn handle_error<'a>(
        &'a self,
        err: DispatchError,
        req: &'a mut RequestContext,
        res: &'a mut Response,
    ) -> BoxFuture<'a, Outcome> {
        match &self.target {
            Target::ErrorHandler(handler) => handler.call(err, req, res),
            _ => Box::pin(std::future::ready(Err(err))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::MatchOptions;
    use http::Method;
    use viaduct_core::{error_handler_fn, handler_fn};

    fn layer(path: &str, end: bool) -> Layer {
        let pattern = PathPattern::compile(
            path,
            MatchOptions {
                end,
                ..MatchOptions::default()
            },
        );
        Layer::new(pattern, Target::Handler(handler_fn(|_, _| Ok(Flow::Continue))))
    }

    #[test]
    fn test_match_produces_fresh_value() {
        let layer = layer("/users/:id", true);

        let first = layer.matches("/users/1").unwrap().unwrap();
        let second = layer.matches("/users/2").unwrap().unwrap();

        assert_eq!(first.params.get("id"), Some("1"));
        assert_eq!(second.params.get("id"), Some("2"));
    }

    #[test]
    fn test_method_tag() {
        let tagged = layer("/", true).with_method(MethodTag::Only(Method::GET));
        assert!(tagged.method_matches(&Method::GET));
        assert!(!tagged.method_matches(&Method::POST));

        let all = layer("/", true).with_method(MethodTag::All);
        assert!(all.method_matches(&Method::DELETE));

        let untagged = layer("/", true);
        assert!(untagged.method_matches(&Method::PATCH));
    }

    #[tokio::test]
    async fn test_error_handler_skipped_without_error() {
        let layer = Layer::new(
            PathPattern::compile("/", MatchOptions::default()),
            Target::ErrorHandler(error_handler_fn(|_, _, res| {
                res.send("should not run");
                Ok(Flow::Finish)
            })),
        );

        let mut req = RequestContext::new(Method::GET, "/");
        let mut res = Response::new();
        let outcome = layer.handle_request(&mut req, &mut res).await;

        assert_eq!(outcome, Ok(Flow::Continue));
        assert!(!res.is_ended());
    }

    #[tokio::test]
    async fn test_normal_handler_passes_error_through() {
        let layer = layer("/", true);

        let mut req = RequestContext::new(Method::GET, "/");
        let mut res = Response::new();
        let err = DispatchError::internal("boom");
        let outcome = layer.handle_error(err.clone(), &mut req, &mut res).await;

        assert_eq!(outcome, Err(err));
    }

    #[tokio::test]
    async fn test_error_handler_consumes_error() {
        let layer = Layer::new(
            PathPattern::compile("/", MatchOptions::default()),
            Target::ErrorHandler(error_handler_fn(|err, _, res| {
                res.set_status(err.status_code());
                res.send("handled");
                Ok(Flow::Finish)
            })),
        );

        let mut req = RequestContext::new(Method::GET, "/");
        let mut res = Response::new();
        let outcome = layer
            .handle_error(DispatchError::internal("boom"), &mut req, &mut res)
            .await;

        assert_eq!(outcome, Ok(Flow::Finish));
        assert!(res.is_ended());
    }
}
