//! # Viaduct
//!
//! **Composable HTTP request dispatch for Rust**
//!
//! Viaduct decides which of many registered handlers should process an
//! incoming request, rewrites request path state as dispatch descends into
//! nested routers, and propagates success and error outcomes back out:
//!
//! - **Layered routing** – ordered layers, first structural match wins
//! - **Nested routers** – mount prefixes move between `url` and `base_url`
//!   on the way down and are restored on the way out
//! - **Per-method routes** – exact-path handler buckets with HEAD→GET
//!   fallback and automatic `Allow` responses for unmatched OPTIONS
//! - **Parameter middleware** – runs once per unique value per request
//! - **Terminal guarantees** – unmatched requests become 404s, unresolved
//!   errors become error responses; nothing disappears silently
//!
//! ## Quick Start
//!
//! ```
//! use viaduct::prelude::*;
//! use http::Method;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut app = App::new();
//! app.get("/users/:id", handler_fn(|req, res| {
//!     let id = req.params().get("id").unwrap_or("").to_string();
//!     res.send(format!("user {id}"));
//!     Ok(Flow::Finish)
//! }));
//!
//! let mut req = RequestContext::new(Method::GET, "/users/42");
//! let mut res = Response::new();
//! app.handle(&mut req, &mut res).await;
//! assert_eq!(res.body(), &b"user 42"[..]);
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! App::handle → global chain → Router::handle → (per layer) Route::dispatch → handler
//!                                    │
//!                                    └── nested Router::handle (prefix stripped,
//!                                        restored on return)
//! ```
//!
//! Hosting (binding a socket and feeding requests into [`App::handle`]) is
//! the embedder's responsibility; this crate has no process surface.

#![doc(html_root_url = "https://docs.rs/viaduct/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
pub mod middleware;

pub use app::App;

// Re-export core types
pub use viaduct_core::{
    error_handler_fn, handler_fn, BoxFuture, DispatchError, DispatchResult, ErrorHandler, Flow,
    Handler, Outcome, Params, RequestContext, Response, Settings,
};

// Re-export router types
pub use viaduct_router::{
    param_fn, Layer, MatchOptions, MethodTag, ParamFactory, ParamHandler, PathMatch, PathPattern,
    Route, Router, RouterConfig, Target,
};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use viaduct::prelude::*;
/// ```
pub mod prelude {
    pub use crate::app::App;
    pub use viaduct_core::{
        error_handler_fn, handler_fn, DispatchError, Flow, Handler, Outcome, RequestContext,
        Response,
    };
    pub use viaduct_router::{param_fn, Route, Router};
}
