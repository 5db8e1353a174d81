//! Handler traits for request processing.
//!
//! A handler registration carries an explicit kind: [`Handler`] for normal
//! processing and [`ErrorHandler`] for error recovery. A normal handler is
//! only invoked when no error is in flight; an error handler is only invoked
//! during error propagation. The dispatch loop skips the other kind with a
//! pass-through, preserving whatever is currently travelling down the chain.

use crate::{DispatchError, Outcome, RequestContext, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed future, the async building block of the dispatch loop.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A normal request handler.
///
/// Handlers receive mutable access to the per-request context and the
/// buffered response, and resolve to an [`Outcome`] telling the dispatch
/// loop how to proceed.
///
/// # Example
///
/// ```
/// use viaduct_core::{handler_fn, Flow, RequestContext, Response};
///
/// let greet = handler_fn(|_req, res| {
///     res.send("hello");
///     Ok(Flow::Finish)
/// });
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Processes the request.
    fn call<'a>(
        &'a self,
        req: &'a mut RequestContext,
        res: &'a mut Response,
    ) -> BoxFuture<'a, Outcome>;
}

/// An error-recovery handler.
///
/// Invoked only while an error is propagating. Returning `Ok(Flow::Continue)`
/// resolves the error and resumes normal traversal; returning `Err` keeps
/// (or replaces) the error in flight.
pub trait ErrorHandler: Send + Sync + 'static {
    /// Processes the in-flight error.
    fn call<'a>(
        &'a self,
        err: DispatchError,
        req: &'a mut RequestContext,
        res: &'a mut Response,
    ) -> BoxFuture<'a, Outcome>;
}

struct FnHandler<F>(F);

impl<F> Handler for FnHandler<F>
where
    F: Fn(&mut RequestContext, &mut Response) -> Outcome + Send + Sync + 'static,
{
    fn call<'a>(
        &'a self,
        req: &'a mut RequestContext,
        res: &'a mut Response,
    ) -> BoxFuture<'a, Outcome> {
        let outcome = (self.0)(req, res);
        Box::pin(std::future::ready(outcome))
    }
}

struct FnErrorHandler<F>(F);

impl<F> ErrorHandler for FnErrorHandler<F>
where
    F: Fn(DispatchError, &mut RequestContext, &mut Response) -> Outcome + Send + Sync + 'static,
{
    fn call<'a>(
        &'a self,
        err: DispatchError,
        req: &'a mut RequestContext,
        res: &'a mut Response,
    ) -> BoxFuture<'a, Outcome> {
        let outcome = (self.0)(err, req, res);
        Box::pin(std::future::ready(outcome))
    }
}

/// Wraps a synchronous closure as a [`Handler`].
///
/// Most handlers complete without suspending; this keeps them free of
/// boxed-future boilerplate. Implement [`Handler`] directly when the body
/// needs to await.
pub fn handler_fn<F>(f: F) -> Arc<dyn Handler>
where
    F: Fn(&mut RequestContext, &mut Response) -> Outcome + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

/// Wraps a synchronous closure as an [`ErrorHandler`].
pub fn error_handler_fn<F>(f: F) -> Arc<dyn ErrorHandler>
where
    F: Fn(DispatchError, &mut RequestContext, &mut Response) -> Outcome + Send + Sync + 'static,
{
    Arc::new(FnErrorHandler(f))
}
