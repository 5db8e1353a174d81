//! Parameter middleware.
//!
//! A router can register middleware keyed by parameter name; it runs when a
//! matched layer binds that parameter, before the layer's target is invoked.
//! Within one request's traversal a (name, value) pair is processed at most
//! once: the outcome is memoized and replayed when another layer binds the
//! same name to the same value. A stored error is replayed even for a new
//! value, so the middleware is never re-run once it has failed.
//!
//! The memoization map lives on the stack of a single `handle` call; nothing
//! is shared or cached across requests.

use std::collections::HashMap;
use std::sync::Arc;
use viaduct_core::{BoxFuture, Flow, Outcome, RequestContext, Response};

/// Middleware invoked for a named path parameter.
pub trait ParamHandler: Send + Sync + 'static {
    /// Processes the decoded parameter value.
    fn call<'a>(
        &'a self,
        req: &'a mut RequestContext,
        res: &'a mut Response,
        value: &'a str,
    ) -> BoxFuture<'a, Outcome>;
}

struct FnParamHandler<F>(F);

impl<F> ParamHandler for FnParamHandler<F>
where
    F: Fn(&mut RequestContext, &mut Response, &str) -> Outcome + Send + Sync + 'static,
{
    fn call<'a>(
        &'a self,
        req: &'a mut RequestContext,
        res: &'a mut Response,
        value: &'a str,
    ) -> BoxFuture<'a, Outcome> {
        let outcome = (self.0)(req, res, value);
        Box::pin(std::future::ready(outcome))
    }
}

/// Wraps a synchronous closure as a [`ParamHandler`].
pub fn param_fn<F>(f: F) -> Arc<dyn ParamHandler>
where
    F: Fn(&mut RequestContext, &mut Response, &str) -> Outcome + Send + Sync + 'static,
{
    Arc::new(FnParamHandler(f))
}

/// A factory applied to every parameter handler registered after it.
///
/// Factories let cross-cutting behavior (say, timing or validation) wrap
/// each named handler at registration time.
pub trait ParamFactory: Send + Sync + 'static {
    /// Wraps a handler being registered for `name`.
    fn wrap(&self, name: &str, inner: Arc<dyn ParamHandler>) -> Arc<dyn ParamHandler>;
}

#[derive(Debug, Clone)]
struct ParamCall {
    value: String,
    outcome: Outcome,
}

/// Per-request record of which (name, value) pairs already ran.
#[derive(Default)]
pub(crate) struct ParamMemo {
    calls: HashMap<String, ParamCall>,
}

/// Runs the registered handlers for a matched layer's parameter names.
pub(crate) async fn process_params(
    registry: &HashMap<String, Vec<Arc<dyn ParamHandler>>>,
    keys: &[String],
    memo: &mut ParamMemo,
    req: &mut RequestContext,
    res: &mut Response,
) -> Outcome {
    if keys.is_empty() || registry.is_empty() {
        return Ok(Flow::Continue);
    }

    for name in keys {
        let Some(handlers) = registry.get(name) else {
            continue;
        };
        let Some(value) = req.params().get(name).map(str::to_string) else {
            continue;
        };

        if let Some(prev) = memo.calls.get(name) {
            if prev.outcome.is_err() || prev.value == value {
                match prev.outcome.clone() {
                    Ok(Flow::Continue) => continue,
                    replayed => return replayed,
                }
            }
        }

        let mut outcome = Ok(Flow::Continue);
        for handler in handlers {
            outcome = handler.call(req, res, &value).await;
            if outcome != Ok(Flow::Continue) {
                break;
            }
        }
        memo.calls.insert(
            name.clone(),
            ParamCall {
                value,
                outcome: outcome.clone(),
            },
        );
        if outcome != Ok(Flow::Continue) {
            return outcome;
        }
    }

    Ok(Flow::Continue)
}
