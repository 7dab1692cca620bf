//! Runtime side of a generated entrypoint: invocation handlers, the
//! dispatching [`Application`], the [`ManifestApp`] and a small server to
//! host both.

mod app;
mod config;
mod handler;
mod server;

pub use app::{Application, ApplicationBuilder, ManifestApp, RouteKey};
pub use config::ServerConfig;
pub use handler::{
    http_handler, queue_handler, BoxError, Handler, IntoResponse, InvocationError, Json,
};
pub use server::Server;

use crate::codegen::CodegenError;
use crate::discovery;
use crate::manifest::{Manifest, ManifestFormat};

/// Build both applications straight from the runtime registry, without a
/// codegen step.
pub fn from_registry(format: ManifestFormat) -> Result<(Application, ManifestApp), CodegenError> {
    let discovery = discovery::discover()?;
    let manifest = Manifest::synthesize(&discovery)?;
    let body = manifest.render(format)?;

    Ok((
        Application::from_discovery(&discovery),
        ManifestApp::new(body, format.content_type()),
    ))
}
