//! # Viaduct Core
//!
//! Core types and traits for the Viaduct dispatch engine.
//!
//! This crate provides the foundational types used throughout Viaduct:
//!
//! - [`RequestContext`] - Per-request mutable dispatch state (url, base URL, params)
//! - [`Response`] - Buffered response with a finalization flag
//! - [`Flow`] / [`Outcome`] - Control-flow values handlers report back with
//! - [`DispatchError`] - Standard error type for the dispatch pipeline
//! - [`Handler`] / [`ErrorHandler`] - Core handler traits
//! - [`Settings`] - Layered configuration store

#![doc(html_root_url = "https://docs.rs/viaduct-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod flow;
mod handler;
mod params;
mod request;
mod response;
mod settings;

pub use error::{DispatchError, DispatchResult};
pub use flow::{Flow, Outcome};
pub use handler::{
    error_handler_fn, handler_fn, BoxFuture, ErrorHandler, Handler,
};
pub use params::Params;
pub use request::RequestContext;
pub use response::Response;
pub use settings::{Settings, CASE_SENSITIVE_ROUTING, MERGE_PARAMS, STRICT_ROUTING};
