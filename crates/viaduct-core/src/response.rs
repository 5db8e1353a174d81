//! Buffered response with a finalization flag.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

/// A buffered response value.
///
/// The dispatch core only needs a small response surface: a settable status,
/// header get/set, a terminal send/end operation, and a way to ask whether
/// the response has already been finalized. Transport concerns (actually
/// writing bytes to a socket) belong to the host.
///
/// # Example
///
/// ```
/// use viaduct_core::Response;
/// use http::StatusCode;
///
/// let mut res = Response::new();
/// res.set_status(StatusCode::CREATED);
/// res.send("done");
///
/// assert!(res.is_ended());
/// assert_eq!(res.body(), &b"done"[..]);
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    ended: bool,
}

impl Response {
    /// Creates an empty, unfinalized response with status 200.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            ended: false,
        }
    }

    /// The response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the response status.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Returns a header value by name.
    #[must_use]
    pub fn header(&self, name: &HeaderName) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    /// Sets a header, replacing any existing value.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// The response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The response body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Writes the body and finalizes the response.
    ///
    /// A second send on an already-finalized response is ignored; the first
    /// writer wins.
    pub fn send(&mut self, body: impl Into<Bytes>) {
        if self.ended {
            tracing::warn!("send after response finalized; ignoring");
            return;
        }
        self.body = body.into();
        self.ended = true;
    }

    /// Finalizes the response without a body.
    pub fn end(&mut self) {
        self.ended = true;
    }

    /// Whether the response has been finalized.
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}
