//! Applications loaded by a server process.
//!
//! A generated entrypoint exposes two of them: an [`Application`] routing
//! invocations to user functions by trigger kind and identifier, and a
//! [`ManifestApp`] answering every request with the deployment manifest.

use crate::discovery::DiscoveryResult;
use crate::function::{DecoratedFunction, TriggerKind};
use crate::http::{Request, Response};
use crate::runtime::handler::{http_handler, queue_handler, Handler, IntoResponse, InvocationError};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use tracing::{debug, warn};

/// Key of an invocation route.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteKey {
    pub kind: TriggerKind,
    pub name: String,
}

impl RouteKey {
    pub fn new(kind: TriggerKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Request path of this route, e.g. `/queue/on_order`.
    pub fn path(&self) -> String {
        self.kind.route(&self.name)
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

struct Route {
    topic: Option<String>,
    handler: Box<dyn Handler>,
}

/// Dispatch table from route keys to user functions. Immutable once built.
pub struct Application {
    routes: BTreeMap<RouteKey, Route>,
}

impl Application {
    /// Start an empty routing table.
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::default()
    }

    /// Build an application from functions found in the runtime registry.
    ///
    /// Functions discovered from source text carry no handler and are
    /// skipped.
    pub fn from_discovery(discovery: &DiscoveryResult) -> Self {
        let mut builder = Self::builder();
        for function in discovery {
            match function.handler {
                Some(factory) => {
                    builder = builder.route(
                        function.metadata.kind(),
                        function.name.clone(),
                        function.metadata.topic().map(str::to_string),
                        factory(),
                    );
                }
                None => warn!(name = %function.name, "function has no handler; not routed"),
            }
        }
        builder.build()
    }

    /// Invoke the function registered for `(kind, name)`.
    pub async fn dispatch(
        &self,
        kind: TriggerKind,
        name: &str,
        request: Request,
    ) -> Result<Response, InvocationError> {
        let key = RouteKey::new(kind, name);
        let route = self
            .routes
            .get(&key)
            .ok_or_else(|| InvocationError::RouteNotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            })?;

        debug!(route = %key, "dispatching invocation");
        route.handler.call(name, request).await
    }

    /// Registered routes in key order.
    pub fn routes(&self) -> impl Iterator<Item = &RouteKey> {
        self.routes.keys()
    }

    /// Topic a message-queue route subscribes to.
    pub fn topic(&self, name: &str) -> Option<&str> {
        self.routes
            .get(&RouteKey::new(TriggerKind::MessageQueue, name))
            .and_then(|route| route.topic.as_deref())
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder used by generated entrypoints.
#[derive(Default)]
pub struct ApplicationBuilder {
    routes: BTreeMap<RouteKey, Route>,
}

impl ApplicationBuilder {
    /// Route `/http/{name}` to a function taking the raw request.
    pub fn http<F, Fut, R>(self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.route(TriggerKind::Http, name, None, http_handler(func))
    }

    /// Route `/queue/{name}` to a function taking the decoded payload.
    pub fn message_queue<F, T, Fut, R>(
        self,
        name: impl Into<String>,
        topic: impl Into<String>,
        func: F,
    ) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.route(
            TriggerKind::MessageQueue,
            name,
            Some(topic.into()),
            queue_handler(func),
        )
    }

    /// Route a function decorated with [`crate::HttpTrigger`] under its
    /// deployment identifier. Functions decorated for another trigger are
    /// skipped.
    pub fn decorated_http<F, Fut, R>(self, function: DecoratedFunction<F>) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + 'static,
    {
        if function.kind() != TriggerKind::Http {
            warn!(name = %function.name(), trigger = %function.kind(), "not an http function; not routed");
            return self;
        }
        let name = function.name().to_string();
        self.route(TriggerKind::Http, name, None, http_handler(function.into_inner()))
    }

    /// Route a function decorated with [`crate::MessageQueueTrigger`] under
    /// its deployment identifier and topic. Functions decorated for another
    /// trigger are skipped.
    pub fn decorated_message_queue<F, T, Fut, R>(self, function: DecoratedFunction<F>) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + 'static,
    {
        if function.kind() != TriggerKind::MessageQueue {
            warn!(name = %function.name(), trigger = %function.kind(), "not a message_queue function; not routed");
            return self;
        }
        let name = function.name().to_string();
        let topic = function.metadata().topic().map(str::to_string);
        self.route(
            TriggerKind::MessageQueue,
            name,
            topic,
            queue_handler(function.into_inner()),
        )
    }

    /// Register an already erased handler. A later route with the same key
    /// replaces the earlier one.
    pub fn route(
        mut self,
        kind: TriggerKind,
        name: impl Into<String>,
        topic: Option<String>,
        handler: Box<dyn Handler>,
    ) -> Self {
        let key = RouteKey::new(kind, name);
        debug!(route = %key, "registering route");
        if let Some(_previous) = self.routes.insert(key.clone(), Route { topic, handler }) {
            warn!(route = %key, "route registered twice; keeping the last one");
        }
        self
    }

    /// Freeze the routing table.
    pub fn build(self) -> Application {
        Application {
            routes: self.routes,
        }
    }
}

/// Serves the deployment manifest as a static response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestApp {
    body: String,
    content_type: String,
}

impl ManifestApp {
    /// Serve `body` with the given content type.
    pub fn new(body: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
        }
    }

    /// The manifest text.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Content type sent with the manifest.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The manifest, whatever the request.
    pub fn respond(&self, _request: &Request) -> Response {
        Response::ok()
            .header("content-type", self.content_type.clone())
            .body(self.body.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, StatusCode};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Signup {
        email: String,
    }

    async fn raw(request: Request) -> Response {
        Response::ok()
            .header("x-path", request.path.clone())
            .body(request.body)
    }

    async fn welcome(signup: Signup) -> String {
        format!("welcome {}", signup.email)
    }

    async fn fail(_request: Request) -> Result<Response, String> {
        Err("database unavailable".to_string())
    }

    fn app() -> Application {
        Application::builder()
            .http("raw", raw)
            .http("fail", fail)
            .message_queue("welcome", "signups", welcome)
            .build()
    }

    #[tokio::test]
    async fn test_http_route_returns_result_verbatim() {
        let request = Request::new(Method::PUT, "/items/1").body("payload");
        let response = app().dispatch(TriggerKind::Http, "raw", request).await.unwrap();
        assert_eq!(response.text_body(), "payload");
        assert_eq!(response.headers.get("x-path").map(String::as_str), Some("/items/1"));
    }

    #[tokio::test]
    async fn test_queue_route_decodes_payload() {
        let response = app()
            .dispatch(
                TriggerKind::MessageQueue,
                "welcome",
                Request::post(r#"{"email":"a@b.c"}"#),
            )
            .await
            .unwrap();
        assert_eq!(response.text_body(), "welcome a@b.c");
    }

    #[tokio::test]
    async fn test_routes_are_keyed_by_kind() {
        let err = app()
            .dispatch(TriggerKind::MessageQueue, "raw", Request::default())
            .await
            .unwrap_err();
        assert!(matches!(err, InvocationError::RouteNotFound { .. }));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_user_error_propagates() {
        let err = app()
            .dispatch(TriggerKind::Http, "fail", Request::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "database unavailable");
    }

    #[test]
    fn test_routes_and_topics() {
        let app = app();
        let paths: Vec<String> = app.routes().map(RouteKey::path).collect();
        assert_eq!(paths, vec!["/http/fail", "/http/raw", "/queue/welcome"]);
        assert_eq!(app.topic("welcome"), Some("signups"));
        assert_eq!(app.topic("raw"), None);
    }

    #[test]
    fn test_duplicate_route_keeps_last() {
        let app = Application::builder()
            .http("raw", raw)
            .http("raw", fail)
            .build();
        assert_eq!(app.len(), 1);
        let response = tokio_test::block_on(app.dispatch(TriggerKind::Http, "raw", Request::default()));
        assert!(response.is_err());
    }

    #[tokio::test]
    async fn test_decorated_functions_are_routed() {
        use crate::function::{HttpTrigger, MessageQueueTrigger};

        let app = Application::builder()
            .decorated_http(HttpTrigger::new().memory_mb(512).decorate("raw-v2", raw).unwrap())
            .decorated_message_queue(MessageQueueTrigger::new("signups").decorate("welcome", welcome).unwrap())
            .decorated_http(MessageQueueTrigger::new("misrouted").decorate("misrouted", raw).unwrap())
            .build();

        assert_eq!(app.len(), 2);
        assert_eq!(app.topic("welcome"), Some("signups"));

        let response = app
            .dispatch(TriggerKind::Http, "raw-v2", Request::post("bytes"))
            .await
            .unwrap();
        assert_eq!(response.text_body(), "bytes");

        let response = app
            .dispatch(
                TriggerKind::MessageQueue,
                "welcome",
                Request::post(r#"{"email":"d@e.f"}"#),
            )
            .await
            .unwrap();
        assert_eq!(response.text_body(), "welcome d@e.f");
    }

    #[test]
    fn test_manifest_app_answers_any_request() {
        let manifest = ManifestApp::new("version: 1\nfunctions: []\n", "application/yaml");
        for request in [Request::default(), Request::post("ignored").header("accept", "*/*")] {
            let response = manifest.respond(&request);
            assert_eq!(response.status, StatusCode::OK);
            assert_eq!(response.text_body(), "version: 1\nfunctions: []\n");
            assert_eq!(
                response.headers.get("content-type").map(String::as_str),
                Some("application/yaml")
            );
        }
    }
}
