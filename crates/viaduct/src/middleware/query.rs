//! Query-string parsing middleware.
//!
//! Parses the request URL's query string once per request into a key/value
//! map on the request context. Runs as the app router's first layer, so
//! every route and nested router sees a populated query map. Repeated keys
//! keep the first value.

use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use std::sync::Arc;
use viaduct_core::{BoxFuture, Flow, Handler, Outcome, RequestContext, Response};

/// Middleware populating [`RequestContext::query`].
///
/// Skips work when the query map is already populated, so installing it
/// twice (say, once on an outer app and once on a mounted router) parses
/// only once.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryParser;

impl Handler for QueryParser {
    fn call<'a>(
        &'a self,
        req: &'a mut RequestContext,
        _res: &'a mut Response,
    ) -> BoxFuture<'a, Outcome> {
        if req.query().is_none() {
            let raw = req
                .url()
                .split_once('?')
                .map_or("", |(_, query)| query)
                .to_string();
            req.set_query(parse_query(&raw));
        }
        Box::pin(std::future::ready(Ok(Flow::Continue)))
    }
}

/// Creates the query middleware.
pub fn query_parser() -> Arc<dyn Handler> {
    Arc::new(QueryParser)
}

fn parse_query(raw: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for pair in raw.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key);
        let value = decode_component(value);
        map.entry(key).or_insert(value);
    }
    map
}

/// Form-style decoding: `+` means space, invalid sequences pass through raw.
fn decode_component(raw: &str) -> String {
    let replaced = raw.replace('+', " ");
    let decoded = percent_decode_str(&replaced)
        .decode_utf8()
        .map(|value| value.into_owned());
    match decoded {
        Ok(value) => value,
        Err(_) => replaced,
    }
}
