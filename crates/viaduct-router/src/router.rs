//! The router traversal loop.
//!
//! A [`Router`] owns an ordered stack of layers. Dispatch scans the stack
//! in registration order for the first structurally matching, applicable
//! layer, runs parameter middleware, rewrites the request's path state
//! while descending into a nested route or router, and undoes the rewrite
//! when control returns. The loop is iterative (handlers report an
//! [`Outcome`] instead of calling back into the traversal), so native stack
//! depth stays flat no matter how many layers match.

use crate::layer::{Layer, Target};
use crate::param::{process_params, ParamFactory, ParamHandler, ParamMemo};
use crate::pattern::{MatchOptions, PathPattern};
use crate::route::Route;
use crate::Method;
use http::header;
use http::HeaderValue;
use indexmap::IndexSet;
use std::collections::HashMap;
use std::sync::Arc;
use viaduct_core::{
    BoxFuture, DispatchError, ErrorHandler, Flow, Handler, Outcome, RequestContext, Response,
    Settings, CASE_SENSITIVE_ROUTING, MERGE_PARAMS, STRICT_ROUTING,
};

/// Consecutive layer invocations before the loop yields to the scheduler.
///
/// Purely a fairness/stack-safety knob; any bound preserves observable
/// ordering.
const MAX_SYNC_STEPS: usize = 100;

/// Matching behavior snapshotted from settings at router construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterConfig {
    /// Match paths case-sensitively.
    pub case_sensitive: bool,
    /// Require trailing slashes to match exactly.
    pub strict: bool,
    /// Merge a matched layer's params with the parent router's.
    pub merge_params: bool,
}

impl RouterConfig {
    /// Reads the routing-related settings out of a layered store.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            case_sensitive: settings.enabled(CASE_SENSITIVE_ROUTING),
            strict: settings.enabled(STRICT_ROUTING),
            merge_params: settings.enabled(MERGE_PARAMS),
        }
    }
}

/// An ordered collection of layers implementing prefix-based dispatch.
///
/// Layer order is append-only and defines priority: the first structurally
/// matching, applicable layer wins.
///
/// # Example
///
/// ```
/// use viaduct_router::Router;
/// use viaduct_core::{handler_fn, Flow};
///
/// let mut router = Router::new();
/// router.use_middleware("/api", handler_fn(|_req, _res| Ok(Flow::Continue)));
/// router.route("/api/users/:id").get(handler_fn(|req, res| {
///     let id = req.params().get("id").unwrap_or("").to_string();
///     res.send(id);
///     Ok(Flow::Finish)
/// }));
/// ```
pub struct Router {
    stack: Vec<Layer>,
    params: HashMap<String, Vec<Arc<dyn ParamHandler>>>,
    param_factories: Vec<Arc<dyn ParamFactory>>,
    config: RouterConfig,
}

impl Router {
    /// Creates a router with default matching behavior.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    /// Creates a router with explicit matching behavior.
    #[must_use]
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            stack: Vec::new(),
            params: HashMap::new(),
            param_factories: Vec::new(),
            config,
        }
    }

    /// Creates a router configured from a layered settings store.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_config(RouterConfig::from_settings(settings))
    }

    fn prefix_options(&self) -> MatchOptions {
        MatchOptions {
            case_sensitive: self.config.case_sensitive,
            strict: false,
            end: false,
        }
    }

    fn route_options(&self) -> MatchOptions {
        MatchOptions {
            case_sensitive: self.config.case_sensitive,
            strict: self.config.strict,
            end: true,
        }
    }

    /// Mounts a handler at a path prefix.
    pub fn use_middleware(&mut self, path: &str, handler: Arc<dyn Handler>) -> &mut Self {
        let pattern = PathPattern::compile(path, self.prefix_options());
        self.stack.push(Layer::new(pattern, Target::Handler(handler)));
        self
    }

    /// Mounts an error handler at a path prefix.
    pub fn use_error(&mut self, path: &str, handler: Arc<dyn ErrorHandler>) -> &mut Self {
        let pattern = PathPattern::compile(path, self.prefix_options());
        self.stack
            .push(Layer::new(pattern, Target::ErrorHandler(handler)));
        self
    }

    /// Mounts a nested router at a path prefix.
    ///
    /// While the nested router runs, the consumed prefix moves from the
    /// request's `url` onto its `base_url`; both are restored when it
    /// returns.
    pub fn mount(&mut self, path: &str, router: Router) -> &mut Self {
        let pattern = PathPattern::compile(path, self.prefix_options());
        self.stack.push(Layer::new(pattern, Target::Router(router)));
        self
    }

    /// Returns the route bound to an exact path, creating it on first use.
    pub fn route(&mut self, path: &str) -> &mut Route {
        let position = self.stack.iter().position(|layer| match layer.target() {
            Target::Route(route) => route.path() == path,
            _ => false,
        });
        let index = match position {
            Some(index) => index,
            None => {
                let pattern = PathPattern::compile(path, self.route_options());
                self.stack
                    .push(Layer::new(pattern, Target::Route(Route::new(path))));
                self.stack.len() - 1
            }
        };
        match self.stack[index].target_mut() {
            Target::Route(route) => route,
            _ => unreachable!("layer at route position wraps a route"),
        }
    }

    /// Registers parameter middleware for a named parameter.
    ///
    /// Runs at most once per unique value of the parameter within a single
    /// request's traversal.
    pub fn param(&mut self, name: &str, handler: Arc<dyn ParamHandler>) -> &mut Self {
        let name = match name.strip_prefix(':') {
            Some(stripped) => {
                tracing::warn!(name, "param name should not start with ':'");
                stripped
            }
            None => name,
        };
        let mut handler = handler;
        for factory in &self.param_factories {
            handler = factory.wrap(name, handler);
        }
        self.params.entry(name.to_string()).or_default().push(handler);
        self
    }

    /// Registers a factory that wraps every subsequently registered
    /// parameter handler.
    pub fn param_factory(&mut self, factory: Arc<dyn ParamFactory>) -> &mut Self {
        self.param_factories.push(factory);
        self
    }

    /// Registers a GET handler at an exact path.
    pub fn get(&mut self, path: &str, handler: Arc<dyn Handler>) -> &mut Self {
        self.route(path).get(handler);
        self
    }

    /// Registers a POST handler at an exact path.
    pub fn post(&mut self, path: &str, handler: Arc<dyn Handler>) -> &mut Self {
        self.route(path).post(handler);
        self
    }

    /// Registers a PUT handler at an exact path.
    pub fn put(&mut self, path: &str, handler: Arc<dyn Handler>) -> &mut Self {
        self.route(path).put(handler);
        self
    }

    /// Registers a DELETE handler at an exact path.
    pub fn delete(&mut self, path: &str, handler: Arc<dyn Handler>) -> &mut Self {
        self.route(path).delete(handler);
        self
    }

    /// Registers a PATCH handler at an exact path.
    pub fn patch(&mut self, path: &str, handler: Arc<dyn Handler>) -> &mut Self {
        self.route(path).patch(handler);
        self
    }

    /// Registers a handler for every known method at an exact path.
    pub fn all(&mut self, path: &str, handler: Arc<dyn Handler>) -> &mut Self {
        self.route(path).all(handler);
        self
    }

    /// Dispatches a request through the layer stack.
    ///
    /// Resolves to `Ok(Flow::Continue)` when the stack is exhausted without
    /// an error (the caller decides what a no-match means), `Ok(Flow::Finish)`
    /// when some handler finalized the response, or `Err` when an error fell
    /// out unresolved.
    pub fn handle<'a>(
        &'a self,
        req: &'a mut RequestContext,
        res: &'a mut Response,
    ) -> BoxFuture<'a, Outcome> {
        Box::pin(self.handle_inner(req, res))
    }

    async fn handle_inner(&self, req: &mut RequestContext, res: &mut Response) -> Outcome {
        tracing::trace!(method = %req.method(), url = %req.url(), "router dispatch");

        let parent_url = req.base_url().to_string();
        let parent_params = req.params().clone();
        let protohost = protohost(req.url()).map(str::to_string);
        let collect_allow = *req.method() == Method::OPTIONS;

        let mut index = 0;
        let mut sync_steps = 0;
        let mut pending: Option<DispatchError> = None;
        let mut allowed: IndexSet<Method> = IndexSet::new();
        let mut memo = ParamMemo::default();

        let outcome = 'traversal: loop {
            sync_steps += 1;
            if sync_steps > MAX_SYNC_STEPS {
                tokio::task::yield_now().await;
                sync_steps = 0;
            }

            let path = request_path(req.url(), protohost.as_deref()).to_string();

            // Scan forward for the next applicable structural match.
            let mut matched = None;
            while index < self.stack.len() {
                let layer = &self.stack[index];
                index += 1;
                let result = match layer.matches(&path) {
                    Ok(result) => result,
                    Err(err) => {
                        // Keep the first failure; the scan continues so the
                        // error can reach a matching error handler.
                        pending.get_or_insert(err);
                        continue;
                    }
                };
                let Some(layer_match) = result else { continue };
                if let Target::Route(route) = layer.target() {
                    if pending.is_some() {
                        // Routes never match with an error in flight.
                        continue;
                    }
                    if !route.handles(req.method()) {
                        if collect_allow {
                            allowed.extend(route.allowed_methods());
                        }
                        if *req.method() != Method::HEAD {
                            continue;
                        }
                    }
                }
                matched = Some((index - 1, layer_match));
                break;
            }

            let Some((layer_index, layer_match)) = matched else {
                break 'traversal match pending.take() {
                    Some(err) => Err(err),
                    None => Ok(Flow::Continue),
                };
            };
            let layer = &self.stack[layer_index];
            tracing::trace!(
                kind = layer.kind_name(),
                pattern = layer.path(),
                matched = %layer_match.path,
                "layer matched"
            );

            let params = if self.config.merge_params {
                layer_match.params.merged_over(&parent_params)
            } else {
                layer_match.params.clone()
            };
            req.set_params(params);

            match process_params(&self.params, layer.keys(), &mut memo, req, res).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::SkipRoute) => continue,
                Ok(Flow::SkipRouter) => break 'traversal Ok(Flow::Continue),
                Ok(Flow::Finish) => break 'traversal Ok(Flow::Finish),
                Err(err) => {
                    let err = pending.take().unwrap_or(err);
                    pending = Some(err);
                    continue;
                }
            }

            let outcome = match (pending.take(), layer.target()) {
                (Some(err), Target::ErrorHandler(handler)) => handler.call(err, req, res).await,
                (Some(err), _) => {
                    // Pass the error through everything that cannot consume it.
                    pending = Some(err);
                    continue;
                }
                (None, Target::Handler(handler)) => handler.call(req, res).await,
                (None, Target::ErrorHandler(_)) => continue,
                // A route's exact path is not a mount prefix; routes run
                // with the current url and base_url.
                (None, Target::Route(route)) => route.dispatch(req, res).await,
                (None, Target::Router(router)) => {
                    let snapshot =
                        strip_prefix(req, &layer_match.path, protohost.as_deref(), &parent_url);
                    let outcome = router.handle(req, res).await;
                    restore_prefix(req, snapshot, protohost.as_deref(), &parent_url);
                    outcome
                }
            };

            match outcome {
                Ok(Flow::Continue | Flow::SkipRoute) => {}
                Ok(Flow::SkipRouter) => break 'traversal Ok(Flow::Continue),
                Ok(Flow::Finish) => break 'traversal Ok(Flow::Finish),
                Err(err) => pending = Some(err),
            }
        };

        // Restore the caller's view before handing back.
        req.set_base_url(parent_url);
        req.set_params(parent_params);

        if collect_allow && !allowed.is_empty() && !res.is_ended() {
            if let Ok(Flow::Continue) = outcome {
                return send_allow_response(res, &allowed);
            }
        }
        outcome
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("layers", &self.stack.len())
            .field("param_names", &self.params.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

/// The `scheme://host` prefix of an absolute request URL.
fn protohost(url: &str) -> Option<&str> {
    if url.is_empty() || url.starts_with('/') {
        return None;
    }
    let path_end = url.find('?').unwrap_or(url.len());
    let scheme_end = url[..path_end].find("://")?;
    let rest = &url[scheme_end + 3..];
    let slash = rest.find('/')?;
    Some(&url[..scheme_end + 3 + slash])
}

/// The path component the layer patterns match against.
fn request_path<'a>(url: &'a str, protohost: Option<&str>) -> &'a str {
    let path_end = url.find('?').unwrap_or(url.len());
    let path = &url[..path_end];
    match protohost {
        Some(ph) if path.len() >= ph.len() => &path[ph.len()..],
        Some(_) => "",
        None => path,
    }
}

struct PrefixSnapshot {
    removed: String,
    slash_added: bool,
}

/// Moves a matched prefix from the request's url onto its base url.
fn strip_prefix(
    req: &mut RequestContext,
    layer_path: &str,
    protohost: Option<&str>,
    parent_url: &str,
) -> PrefixSnapshot {
    if layer_path.is_empty() {
        return PrefixSnapshot {
            removed: String::new(),
            slash_added: false,
        };
    }

    let removed = layer_path.to_string();
    let url = req.url().to_string();
    let protohost_len = protohost.map_or(0, str::len);
    let mut stripped = format!(
        "{}{}",
        protohost.unwrap_or(""),
        &url[protohost_len + removed.len()..]
    );
    let mut slash_added = false;
    if protohost.is_none() && !stripped.starts_with('/') {
        stripped.insert(0, '/');
        slash_added = true;
    }
    req.set_url(stripped);

    let trimmed = removed.strip_suffix('/').unwrap_or(&removed);
    req.set_base_url(format!("{parent_url}{trimmed}"));

    PrefixSnapshot {
        removed,
        slash_added,
    }
}

/// Undoes [`strip_prefix`] when control returns to the stripping frame.
fn restore_prefix(
    req: &mut RequestContext,
    snapshot: PrefixSnapshot,
    protohost: Option<&str>,
    parent_url: &str,
) {
    if snapshot.slash_added {
        let url = req.url()[1..].to_string();
        req.set_url(url);
    }
    if !snapshot.removed.is_empty() {
        req.set_base_url(parent_url.to_string());
        let url = req.url().to_string();
        let restored = match protohost {
            Some(ph) => format!("{}{}{}", ph, snapshot.removed, &url[ph.len()..]),
            None => format!("{}{}", snapshot.removed, url),
        };
        req.set_url(restored);
    }
}

/// The automatic response for an OPTIONS request that matched no method.
fn send_allow_response(res: &mut Response, allowed: &IndexSet<Method>) -> Outcome {
    let list = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let value = HeaderValue::from_str(&list)
        .map_err(|_| DispatchError::internal("unrepresentable Allow header"))?;
    res.insert_header(header::ALLOW, value);
    res.send(list);
    Ok(Flow::Finish)
}
