//! # triggerkit - deployment triggers for plain async functions
//!
//! triggerkit attaches deployment metadata to ordinary async functions and
//! turns a set of such functions into a runnable server entrypoint and a
//! deployment manifest.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐   attributes / builders   ┌──────────────────────┐
//! │  user source         │ ────────────────────────► │  FunctionMetadata    │
//! │  #[http] fn hello    │                           │  (validated)         │
//! │  #[message_queue] fn │                           └──────────┬───────────┘
//! └──────────────────────┘                                      │
//!            │ syn (codegen)              inventory (runtime)   │
//!            ▼                                                  ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         DiscoveryResult                             │
//! └─────────────────────────────────────────────────────────────────────┘
//!            │                                                  │
//!            ▼                                                  ▼
//! ┌──────────────────────┐                           ┌──────────────────────┐
//! │  Manifest (YAML/JSON)│                           │  Application         │
//! │  entrypoint module   │                           │  ManifestApp         │
//! └──────────────────────┘                           └──────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use triggerkit::http::{Request, Response};
//! use triggerkit::manifest::ManifestFormat;
//! use triggerkit::runtime::{self, Server, ServerConfig};
//!
//! /// Greets the caller.
//! #[triggerkit::http]
//! async fn hello(_req: Request) -> Response {
//!     Response::text("Hello from triggerkit!")
//! }
//!
//! #[triggerkit::message_queue(topic = "orders", max_instances = 3)]
//! async fn on_order(order: serde_json::Value) -> String {
//!     format!("accepted {}", order)
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let (app, manifest) = runtime::from_registry(ManifestFormat::Yaml)?;
//!     Server::new(ServerConfig::default(), app, manifest).run().await
//! }
//! ```
//!
//! ## Decorated functions stay callable
//!
//! The attributes re-emit the function untouched, so `hello(req).await`
//! behaves exactly as it did before annotation. Programmatic decoration
//! through [`function::HttpTrigger`] and [`function::MessageQueueTrigger`]
//! wraps a callable in a [`function::DecoratedFunction`] that dereferences
//! to it.
//!
//! ## Codegen
//!
//! The `triggerkit` binary parses a source file, discovers the annotated
//! functions and writes an entrypoint module exposing `app()` and
//! `manifest_app()`, plus the manifest on request. See [`codegen`].

extern crate self as triggerkit;

pub mod codegen;
pub mod discovery;
pub mod error;
pub mod function;
pub mod http;
pub mod manifest;
pub mod runtime;

pub use triggerkit_macro::{http, message_queue};

#[doc(hidden)]
pub mod __private {
    pub use inventory;
}

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::discovery::{discover, DiscoveredFunction, DiscoveryResult};
    pub use crate::error::{ConfigurationError, GenerationError};
    pub use crate::function::{
        DecoratedFunction, FunctionMetadata, HttpTrigger, MessageQueueTrigger, TriggerKind,
        TriggerOptions,
    };
    pub use crate::http::{Method, Request, Response, StatusCode};
    pub use crate::manifest::{Manifest, ManifestFormat};
    pub use crate::runtime::{Application, Json, ManifestApp, Server, ServerConfig};
}

pub use discovery::{DiscoveredFunction, DiscoveryResult};
pub use error::{CodegenError, ConfigurationError, GenerationError};
pub use function::{DecoratedFunction, FunctionMetadata, HttpTrigger, MessageQueueTrigger, TriggerKind};
pub use manifest::Manifest;
