//! Type-erased invocation handlers.
//!
//! [`http_handler`] forwards the raw [`Request`] to the user function.
//! [`queue_handler`] decodes the JSON payload into the function's argument
//! first. Whatever the function returns is converted with [`IntoResponse`];
//! errors it returns are passed through as [`InvocationError::Handler`]
//! without being inspected.

use crate::http::{Request, Response, StatusCode};
use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::marker::PhantomData;
use thiserror::Error;

/// Error type user functions may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure while invoking a discovered function.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// No function is registered for the route.
    #[error("no {kind} function named `{name}`")]
    RouteNotFound { kind: String, name: String },

    /// The message payload could not be decoded into the function's argument.
    #[error("failed to decode payload for `{name}`: {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The function itself returned an error.
    #[error(transparent)]
    Handler(BoxError),
}

impl InvocationError {
    /// Status a server would reasonably answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            InvocationError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            InvocationError::Decode { .. } => StatusCode::BAD_REQUEST,
            InvocationError::Handler(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Conversion of a function's return value into a response.
pub trait IntoResponse {
    fn into_response(self) -> Result<Response, InvocationError>;
}

impl IntoResponse for Response {
    fn into_response(self) -> Result<Response, InvocationError> {
        Ok(self)
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Result<Response, InvocationError> {
        Ok(Response::no_content())
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Result<Response, InvocationError> {
        Ok(Response::text(self))
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Result<Response, InvocationError> {
        Ok(Response::text(self))
    }
}

impl IntoResponse for Vec<u8> {
    fn into_response(self) -> Result<Response, InvocationError> {
        Ok(Response::ok().body(self))
    }
}

impl IntoResponse for Bytes {
    fn into_response(self) -> Result<Response, InvocationError> {
        Ok(Response::ok().body(self))
    }
}

impl IntoResponse for serde_json::Value {
    fn into_response(self) -> Result<Response, InvocationError> {
        Json(self).into_response()
    }
}

impl<T, E> IntoResponse for Result<T, E>
where
    T: IntoResponse,
    E: Into<BoxError>,
{
    fn into_response(self) -> Result<Response, InvocationError> {
        match self {
            Ok(value) => value.into_response(),
            Err(err) => Err(InvocationError::Handler(err.into())),
        }
    }
}

/// Serialize the wrapped value as a JSON response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Result<Response, InvocationError> {
        Response::json(&self.0).map_err(|e| InvocationError::Handler(Box::new(e)))
    }
}

/// A routable function with its calling convention erased.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, name: &str, request: Request) -> Result<Response, InvocationError>;
}

struct HttpHandler<F> {
    func: F,
}

#[async_trait]
impl<F, Fut, R> Handler for HttpHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + 'static,
{
    async fn call(&self, _name: &str, request: Request) -> Result<Response, InvocationError> {
        (self.func)(request).await.into_response()
    }
}

struct QueueHandler<F, T> {
    func: F,
    payload: PhantomData<fn() -> T>,
}

#[async_trait]
impl<F, T, Fut, R> Handler for QueueHandler<F, T>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + 'static,
{
    async fn call(&self, name: &str, request: Request) -> Result<Response, InvocationError> {
        let payload: T =
            serde_json::from_slice(&request.body).map_err(|source| InvocationError::Decode {
                name: name.to_string(),
                source,
            })?;
        (self.func)(payload).await.into_response()
    }
}

/// Wrap a function taking the raw request.
pub fn http_handler<F, Fut, R>(func: F) -> Box<dyn Handler>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + 'static,
{
    Box::new(HttpHandler { func })
}

/// Wrap a function taking a decoded message payload.
pub fn queue_handler<F, T, Fut, R>(func: F) -> Box<dyn Handler>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + 'static,
{
    Box::new(QueueHandler {
        func,
        payload: PhantomData,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Order {
        id: u32,
        quantity: u32,
    }

    async fn echo(request: Request) -> Response {
        Response::ok().body(request.body)
    }

    async fn total(order: Order) -> String {
        format!("order {} x{}", order.id, order.quantity)
    }

    async fn reject(order: Order) -> Result<(), std::io::Error> {
        Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("order {} rejected", order.id),
        ))
    }

    #[tokio::test]
    async fn test_http_handler_forwards_request() {
        let handler = http_handler(echo);
        let response = handler
            .call("echo", Request::post(&b"\x00raw\xff"[..]))
            .await
            .unwrap();
        assert_eq!(&response.body[..], b"\x00raw\xff");
    }

    #[tokio::test]
    async fn test_queue_handler_decodes_payload() {
        let handler = queue_handler(total);
        let response = handler
            .call("total", Request::post(r#"{"id": 3, "quantity": 2}"#))
            .await
            .unwrap();
        assert_eq!(response.text_body(), "order 3 x2");
    }

    #[tokio::test]
    async fn test_queue_handler_decode_error() {
        let handler = queue_handler(total);
        let err = handler
            .call("total", Request::post(r#"{"id": "three"}"#))
            .await
            .unwrap_err();
        assert!(matches!(err, InvocationError::Decode { ref name, .. } if name == "total"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_user_errors_pass_through() {
        let handler = queue_handler(reject);
        let err = handler
            .call("reject", Request::post(r#"{"id": 9, "quantity": 1}"#))
            .await
            .unwrap_err();
        let InvocationError::Handler(inner) = err else {
            panic!("expected a handler error");
        };
        let io = inner.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::InvalidData);
        assert_eq!(io.to_string(), "order 9 rejected");
    }

    #[test]
    fn test_into_response_conversions() {
        assert_eq!(().into_response().unwrap().status, StatusCode::NO_CONTENT);
        assert_eq!("hi".into_response().unwrap().text_body(), "hi");
        let json = Json(vec![1, 2]).into_response().unwrap();
        assert_eq!(json.text_body(), "[1,2]");
    }
}
