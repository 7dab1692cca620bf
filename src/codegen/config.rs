//! Project configuration for the codegen tool, read from `triggerkit.toml`.
//!
//! ```toml
//! module = "crate::handlers"
//! manifest_format = "json"
//!
//! [defaults]
//! memory_mb = 512
//! timeout_secs = 60
//! ```

use crate::error::CodegenError;
use crate::function::TriggerOptions;
use crate::manifest::ManifestFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default file name looked up next to the project manifest.
pub const CONFIG_FILE: &str = "triggerkit.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodegenConfig {
    /// Path prefix the generated entrypoint uses to call user functions.
    pub module: String,
    pub manifest_format: ManifestFormat,
    /// Options applied to every function that leaves them unset.
    pub defaults: TriggerOptions,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            module: "crate".to_string(),
            manifest_format: ManifestFormat::default(),
            defaults: TriggerOptions::default(),
        }
    }
}

impl CodegenConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, CodegenError> {
        let config: Self = toml::from_str(text).map_err(|e| CodegenError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CodegenError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Set the path prefix used to call the functions.
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    /// Set the manifest format.
    pub fn manifest_format(mut self, format: ManifestFormat) -> Self {
        self.manifest_format = format;
        self
    }

    /// Set the options applied to functions that leave them unset.
    pub fn defaults(mut self, defaults: TriggerOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn validate(&self) -> Result<(), CodegenError> {
        if self.defaults.topic.is_some() {
            return Err(CodegenError::Config(
                "`topic` cannot be set in [defaults]; declare it on each message_queue function"
                    .to_string(),
            ));
        }

        if syn::parse_str::<syn::Path>(&self.module).is_err() {
            return Err(CodegenError::Config(format!(
                "`module` must be a Rust path, got {:?}",
                self.module
            )));
        }

        Ok(())
    }
}
