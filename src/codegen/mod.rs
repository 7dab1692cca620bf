//! Codegen pipeline: source text in, manifest and entrypoint module out.
//!
//! ```
//! use triggerkit::codegen::{Codegen, CodegenConfig};
//!
//! let source = r#"
//! #[triggerkit::http(min_instances = 1)]
//! async fn hello(req: triggerkit::http::Request) -> triggerkit::http::Response {
//!     triggerkit::http::Response::text("hi")
//! }
//! "#;
//!
//! let generated = Codegen::new(CodegenConfig::default()).generate(source).unwrap();
//! assert_eq!(generated.discovery.names(), vec!["hello"]);
//! assert!(generated.entrypoint.contains(".http(\"hello\", crate::hello)"));
//! ```

pub mod config;
pub mod entrypoint;
pub mod source;

pub use crate::error::CodegenError;
pub use config::{CodegenConfig, CONFIG_FILE};
pub use entrypoint::EntrypointOptions;

use crate::discovery::DiscoveryResult;
use crate::manifest::Manifest;
use tracing::info;

/// Everything a codegen run produces. Nothing is written until the whole
/// run has succeeded.
#[derive(Debug, Clone)]
pub struct Generated {
    pub discovery: DiscoveryResult,
    pub manifest: Manifest,
    /// The manifest rendered in the configured format.
    pub manifest_text: String,
    /// Source of the entrypoint module.
    pub entrypoint: String,
}

/// Runs static discovery and synthesizes both artifacts for one source file.
pub struct Codegen {
    config: CodegenConfig,
    source_name: String,
}

impl Codegen {
    /// Create a generator; the source is labelled `src/lib.rs` until renamed.
    pub fn new(config: CodegenConfig) -> Self {
        Self {
            config,
            source_name: "src/lib.rs".to_string(),
        }
    }

    /// Name used for the source in locations and diagnostics.
    pub fn source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    /// The configuration this generator runs with.
    pub fn config(&self) -> &CodegenConfig {
        &self.config
    }

    /// Discover the functions in `source_text` and render the manifest and
    /// entrypoint. Nothing is produced unless every step succeeds.
    pub fn generate(&self, source_text: &str) -> Result<Generated, CodegenError> {
        self.config.validate()?;

        let file = syn::parse_file(source_text)
            .map_err(|e| CodegenError::parse(&self.source_name, e))?;
        let discovery = source::discover(&file, &self.config.defaults, &self.source_name)?;

        let manifest = Manifest::synthesize(&discovery)?;
        let manifest_text = manifest.render(self.config.manifest_format)?;
        let entrypoint = entrypoint::render(
            &discovery,
            &manifest_text,
            &EntrypointOptions {
                module: self.config.module.clone(),
                manifest_format: self.config.manifest_format,
            },
        );

        info!(
            source = %self.source_name,
            functions = discovery.len(),
            format = %self.config.manifest_format,
            "generated entrypoint"
        );

        Ok(Generated {
            discovery,
            manifest,
            manifest_text,
            entrypoint,
        })
    }
}
