//! Built-in middleware.

mod query;

pub use query::{query_parser, QueryParser};
