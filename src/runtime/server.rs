//! Minimal HTTP/1 host for a generated entrypoint.
//!
//! Mounts the [`ManifestApp`] at the configured manifest path and the
//! [`Application`] under `/{segment}/{name}`. Errors returned by user
//! functions are answered with the status of [`InvocationError::status`].

use crate::function::TriggerKind;
use crate::http::{Request, Response, StatusCode};
use crate::runtime::{Application, InvocationError, ManifestApp, ServerConfig};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Serves one application and its manifest.
pub struct Server {
    config: ServerConfig,
    app: Arc<Application>,
    manifest: Arc<ManifestApp>,
}

impl Server {
    /// Pair a configuration with the two applications it serves.
    pub fn new(config: ServerConfig, app: Application, manifest: ManifestApp) -> Self {
        Self {
            config,
            app: Arc::new(app),
            manifest: Arc::new(manifest),
        }
    }

    /// Accept connections until the listener fails.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = self.config.bind_addr().parse()?;
        let listener = TcpListener::bind(addr).await?;

        info!(%addr, routes = self.app.len(), "server listening");
        for route in self.app.routes() {
            info!(%route, "serving");
        }

        let state = Arc::new(State {
            config: self.config,
            app: self.app,
            manifest: self.manifest,
        });

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let state = state.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let state = state.clone();
                    async move { handle(req, state, remote_addr).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("error serving connection: {:?}", err);
                }
            });
        }
    }
}

struct State {
    config: ServerConfig,
    app: Arc<Application>,
    manifest: Arc<ManifestApp>,
}

/// What a request path addresses.
#[derive(Debug, PartialEq, Eq)]
enum Target<'a> {
    Health,
    Manifest,
    Function {
        kind: TriggerKind,
        name: &'a str,
        sub_path: String,
    },
    Unknown,
}

fn resolve<'a>(path: &'a str, config: &ServerConfig) -> Target<'a> {
    if config.enable_health && path == "/_health" {
        return Target::Health;
    }
    if path == config.manifest_path {
        return Target::Manifest;
    }

    let mut parts = path.trim_start_matches('/').splitn(3, '/');
    let kind = parts.next().and_then(TriggerKind::from_route_segment);
    let name = parts.next().filter(|name| !name.is_empty());

    match (kind, name) {
        (Some(kind), Some(name)) => Target::Function {
            kind,
            name,
            sub_path: format!("/{}", parts.next().unwrap_or_default()),
        },
        _ => Target::Unknown,
    }
}

async fn handle(
    req: hyper::Request<Incoming>,
    state: Arc<State>,
    remote_addr: SocketAddr,
) -> Result<hyper::Response<Full<Bytes>>, hyper::Error> {
    let path = req.uri().path().to_string();
    debug!(method = %req.method(), %path, %remote_addr, "handling request");

    let response = match resolve(&path, &state.config) {
        Target::Health => Response::text("OK"),
        Target::Manifest => match convert_request(req, &path, state.config.max_body_size).await {
            Ok(request) => state.manifest.respond(&request),
            Err(response) => response,
        },
        Target::Function {
            kind,
            name,
            sub_path,
        } => match convert_request(req, &sub_path, state.config.max_body_size).await {
            Ok(request) => match state.app.dispatch(kind, name, request).await {
                Ok(response) => response,
                Err(err) => failure(kind, name, err),
            },
            Err(response) => response,
        },
        Target::Unknown => Response::error(StatusCode::NOT_FOUND, "no such route"),
    };

    Ok(build_response(response))
}

fn failure(kind: TriggerKind, name: &str, err: InvocationError) -> Response {
    let status = err.status();
    match &err {
        InvocationError::Handler(_) => error!(%kind, %name, error = %err, "function failed"),
        _ => warn!(%kind, %name, error = %err, "invocation rejected"),
    }
    Response::error(status, err.to_string())
}

/// Copy a hyper request into a [`Request`]. Bodies are read through a
/// [`Limited`] wrapper, so no more than `max_body_size` bytes are buffered.
async fn convert_request<B>(
    req: hyper::Request<B>,
    path: &str,
    max_body_size: usize,
) -> Result<Request, Response>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();
    let query = parts.uri.query().map(str::to_string);
    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let body = match Limited::new(body, max_body_size).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            return Err(Response::error(
                StatusCode::PAYLOAD_TOO_LARGE,
                "request body too large",
            ));
        }
        Err(err) => return Err(Response::error(StatusCode::BAD_REQUEST, err.to_string())),
    };

    Ok(Request {
        method: parts.method,
        path: path.to_string(),
        query,
        headers,
        body,
    })
}

fn build_response(response: Response) -> hyper::Response<Full<Bytes>> {
    let mut builder = hyper::Response::builder().status(response.status);
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder.body(Full::new(response.body)).unwrap_or_else(|err| {
        warn!("invalid response header: {}", err);
        let mut fallback = hyper::Response::new(Full::new(Bytes::from_static(
            b"invalid response from function",
        )));
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_function_routes() {
        let config = ServerConfig::default();
        assert_eq!(
            resolve("/http/hello", &config),
            Target::Function {
                kind: TriggerKind::Http,
                name: "hello",
                sub_path: "/".to_string(),
            }
        );
        assert_eq!(
            resolve("/queue/on_order/extra/path", &config),
            Target::Function {
                kind: TriggerKind::MessageQueue,
                name: "on_order",
                sub_path: "/extra/path".to_string(),
            }
        );
    }

    #[test]
    fn test_resolve_system_routes() {
        let config = ServerConfig::default().manifest_path("/deploy.yaml");
        assert_eq!(resolve("/_health", &config), Target::Health);
        assert_eq!(resolve("/deploy.yaml", &config), Target::Manifest);
        assert_eq!(resolve("/_manifest", &config), Target::Unknown);
    }

    #[test]
    fn test_resolve_unknown() {
        let config = ServerConfig::default();
        for path in ["/", "/http", "/http/", "/cron/nightly"] {
            assert_eq!(resolve(path, &config), Target::Unknown, "{}", path);
        }
    }

    fn incoming(body: &'static [u8]) -> hyper::Request<Full<Bytes>> {
        hyper::Request::builder()
            .method("POST")
            .uri("/queue/ingest?source=test")
            .header("x-batch", "7")
            .body(Full::new(Bytes::from_static(body)))
            .unwrap()
    }

    #[tokio::test]
    async fn test_convert_request_within_limit() {
        let request = convert_request(incoming(b"0123456789"), "/", 10).await.unwrap();
        assert_eq!(request.method, hyper::Method::POST);
        assert_eq!(request.path, "/");
        assert_eq!(request.query.as_deref(), Some("source=test"));
        assert_eq!(request.get_header("x-batch"), Some("7"));
        assert_eq!(request.body, Bytes::from_static(b"0123456789"));
    }

    #[tokio::test]
    async fn test_convert_request_rejects_oversized_body() {
        let response = convert_request(incoming(b"0123456789A"), "/", 10)
            .await
            .unwrap_err();
        assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.text_body(), "request body too large");
    }

    #[test]
    fn test_build_response_copies_headers() {
        let response = build_response(Response::text("hi").with_status(StatusCode::CREATED));
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/plain; charset=utf-8"
        );
    }
}
