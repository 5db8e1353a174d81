//! # Viaduct Router
//!
//! Layered path matching and request dispatch.
//!
//! A [`Router`] is an ordered stack of [`Layer`]s, each pairing a compiled
//! [`PathPattern`] with a target: a plain handler, an error handler, a
//! [`Route`] (a per-method handler bucket bound to an exact path), or a
//! nested `Router` mounted at a prefix. Dispatch walks the stack in
//! registration order, strips consumed mount prefixes on the way down and
//! restores them on the way back out, and threads success and error
//! outcomes through the [`Outcome`](viaduct_core::Outcome) channel.
//!
//! # Example
//!
//! ```
//! use viaduct_router::Router;
//! use viaduct_core::{handler_fn, Flow, RequestContext, Response};
//! use http::Method;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut api = Router::new();
//! api.get("/users/:id", handler_fn(|req, res| {
//!     let id = req.params().get("id").unwrap_or("").to_string();
//!     res.send(id);
//!     Ok(Flow::Finish)
//! }));
//!
//! let mut root = Router::new();
//! root.mount("/api", api);
//!
//! let mut req = RequestContext::new(Method::GET, "/api/users/42");
//! let mut res = Response::new();
//! root.handle(&mut req, &mut res).await.unwrap();
//! assert_eq!(res.body(), &b"42"[..]);
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/viaduct-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod layer;
mod param;
mod pattern;
mod route;
mod router;

pub use http::Method;
pub use layer::{Layer, MethodTag, Target};
pub use param::{param_fn, ParamFactory, ParamHandler};
pub use pattern::{MatchOptions, PathMatch, PathPattern};
pub use route::Route;
pub use router::{Router, RouterConfig};
