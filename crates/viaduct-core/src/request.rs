//! Per-request dispatch state.
//!
//! The [`RequestContext`] carries the mutable path state the router rewrites
//! as it descends into nested routers: the current effective `url`, the
//! accumulated mount prefix (`base_url`), and the current layer's extracted
//! parameters. The original request URL is captured once and never mutated.

use crate::Params;
use http::{HeaderMap, Method};
use std::collections::HashMap;

/// Per-request mutable context threaded through the dispatch pipeline.
///
/// Every request gets its own `RequestContext`; layers never share match
/// state between concurrent requests. Routers snapshot `url`, `base_url`
/// and `params` before descending into a nested route or router and restore
/// them when control returns, so a caller's view is never corrupted by a
/// nested traversal.
///
/// # Example
///
/// ```
/// use viaduct_core::RequestContext;
/// use http::Method;
///
/// let req = RequestContext::new(Method::GET, "/api/users/42");
/// assert_eq!(req.url(), "/api/users/42");
/// assert_eq!(req.original_url(), "/api/users/42");
/// assert_eq!(req.base_url(), "");
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    url: String,
    base_url: String,
    original_url: String,
    headers: HeaderMap,
    params: Params,
    query: Option<HashMap<String, String>>,
}

impl RequestContext {
    /// Creates a new request context.
    ///
    /// The URL may be absolute (`scheme://host/path`); prefix arithmetic in
    /// the router then operates on the path component only.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            method,
            original_url: url.clone(),
            url,
            base_url: String::new(),
            headers: HeaderMap::new(),
            params: Params::new(),
            query: None,
        }
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The current effective URL.
    ///
    /// Inside a mounted router this has the consumed mount prefix stripped.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Replaces the current effective URL.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    /// The accumulated mount prefix consumed by enclosing routers.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replaces the accumulated mount prefix.
    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }

    /// The URL as received, captured once and never rewritten.
    #[must_use]
    pub fn original_url(&self) -> &str {
        &self.original_url
    }

    /// The request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The current layer's extracted path parameters.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Replaces the extracted path parameters.
    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    /// The parsed query map, if query middleware has run.
    #[must_use]
    pub fn query(&self) -> Option<&HashMap<String, String>> {
        self.query.as_ref()
    }

    /// Stores the parsed query map.
    pub fn set_query(&mut self, query: HashMap<String, String>) {
        self.query = Some(query);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_captures_original_url() {
        let mut req = RequestContext::new(Method::GET, "/a/b");
        req.set_url("/b");
        req.set_base_url("/a");

        assert_eq!(req.url(), "/b");
        assert_eq!(req.base_url(), "/a");
        assert_eq!(req.original_url(), "/a/b");
    }

    #[test]
    fn test_query_starts_unset() {
        let mut req = RequestContext::new(Method::GET, "/search?q=x");
        assert!(req.query().is_none());

        let mut query = HashMap::new();
        query.insert("q".to_string(), "x".to_string());
        req.set_query(query);

        assert_eq!(
            req.query().and_then(|q| q.get("q")).map(String::as_str),
            Some("x")
        );
    }
}
