//! Inbound invocation request.

use bytes::Bytes;
use hyper::Method;
use std::collections::BTreeMap;

/// Raw request handed to HTTP-triggered functions, and the carrier of the
/// payload for message-queue functions.
///
/// Header names are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Path after the route prefix, always starting with `/`.
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl Request {
    /// A request with no headers, query or body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: BTreeMap::new(),
            body: Bytes::new(),
        }
    }

    /// A `POST /` request carrying `body`.
    pub fn post(body: impl Into<Bytes>) -> Self {
        Self::new(Method::POST, "/").body(body)
    }

    /// Set a header. Names are stored lowercase.
    pub fn header(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Header lookup, case-insensitive.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new(Method::GET, "/")
    }
}
