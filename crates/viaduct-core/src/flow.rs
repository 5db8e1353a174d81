//! Control-flow values for the dispatch loop.
//!
//! Handlers do not receive a `next` callback. Instead every invocation
//! reports back how traversal should proceed, and the dispatch loop in the
//! router acts on that value. This keeps the ordering and short-circuit
//! rules in one place and guarantees the loop always regains control.

use crate::DispatchError;

/// How traversal should proceed after a handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Proceed to the following applicable layer.
    Continue,
    /// The response has been finalized; stop traversal entirely.
    Finish,
    /// Abort the current route's remaining handlers and resume scanning
    /// at the parent router.
    SkipRoute,
    /// Abort the enclosing router entirely (remaining layers, parameter
    /// middleware, and prefix bookkeeping) and resume one level up.
    SkipRouter,
}

/// The value every handler invocation resolves to.
///
/// `Err` is the error channel: it skips forward to the nearest matching
/// error handler, exactly as if the handler had reported the error
/// explicitly. This means `?` inside a handler body behaves like a caught
/// exception: it can never unwind past the dispatch loop.
pub type Outcome = Result<Flow, DispatchError>;
