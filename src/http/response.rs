//! Response returned from an invocation.

use bytes::Bytes;
use hyper::StatusCode;
use serde::Serialize;
use std::collections::BTreeMap;

/// Response produced by a function (or by the runtime on its behalf).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl Response {
    /// An empty response with `status`.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT)
    }

    /// A `200 OK` plain-text response.
    pub fn text(content: impl Into<String>) -> Self {
        Self::ok()
            .header("content-type", "text/plain; charset=utf-8")
            .body(content.into())
    }

    /// A `200 OK` JSON response.
    pub fn json<T: Serialize>(data: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(data)?;
        Ok(Self::ok().header("content-type", "application/json").body(body))
    }

    /// A plain-text error message with `status`.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status)
            .header("content-type", "text/plain; charset=utf-8")
            .body(message.into())
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Set a header. Names are stored lowercase.
    pub fn header(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// The body as UTF-8, lossily.
    pub fn text_body(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}
