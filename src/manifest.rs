//! Deployment manifest synthesis.
//!
//! The manifest lists every discovered function with its trigger, route and
//! resolved configuration. It is derived from a [`DiscoveryResult`] alone and
//! rendered deterministically, so the same source always yields the same
//! bytes.

use crate::discovery::{DiscoveryResult, SourceLocation};
use crate::error::GenerationError;
use crate::function::{ResolvedConfig, TriggerKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Version of the manifest document layout.
pub const MANIFEST_VERSION: u32 = 1;

/// Text encoding of a rendered manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestFormat {
    #[default]
    Yaml,
    Json,
}

impl ManifestFormat {
    /// Name accepted on the command line and in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestFormat::Yaml => "yaml",
            ManifestFormat::Json => "json",
        }
    }

    /// MIME type the manifest app serves this format with.
    pub fn content_type(&self) -> &'static str {
        match self {
            ManifestFormat::Yaml => "application/yaml",
            ManifestFormat::Json => "application/json",
        }
    }
}

impl fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ManifestFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(ManifestFormat::Yaml),
            "json" => Ok(ManifestFormat::Json),
            other => Err(format!("unknown manifest format `{}` (expected yaml or json)", other)),
        }
    }
}

/// One deployable function as published to deployment tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub trigger: TriggerKind,
    pub route: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub config: ResolvedConfig,
}

/// Deployment manifest of every discovered function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub functions: Vec<ManifestEntry>,
}

impl Manifest {
    /// Build the manifest, keeping discovery order.
    ///
    /// Fails if two functions share an identifier: their routes would be
    /// ambiguous.
    pub fn synthesize(discovery: &DiscoveryResult) -> Result<Self, GenerationError> {
        let mut seen: HashMap<&str, &SourceLocation> = HashMap::with_capacity(discovery.len());
        let mut functions = Vec::with_capacity(discovery.len());

        for function in discovery {
            if let Some(first) = seen.insert(function.name.as_str(), &function.location) {
                return Err(GenerationError::DuplicateIdentifier {
                    name: function.name.clone(),
                    first: first.clone(),
                    second: function.location.clone(),
                });
            }

            let kind = function.metadata.kind();
            functions.push(ManifestEntry {
                name: function.name.clone(),
                trigger: kind,
                route: kind.route(&function.name),
                description: function.doc.clone(),
                config: function.metadata.resolved(),
            });
        }

        Ok(Self {
            version: MANIFEST_VERSION,
            functions,
        })
    }

    /// Number of functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Look up an entry by deployment identifier.
    pub fn get(&self, name: &str) -> Option<&ManifestEntry> {
        self.functions.iter().find(|entry| entry.name == name)
    }

    pub fn render(&self, format: ManifestFormat) -> Result<String, GenerationError> {
        let render_error = |message: String| GenerationError::Render {
            format: format.as_str(),
            message,
        };

        match format {
            ManifestFormat::Yaml => serde_yaml::to_string(self).map_err(|e| render_error(e.to_string())),
            ManifestFormat::Json => serde_json::to_string_pretty(self)
                .map(|mut text| {
                    text.push('\n');
                    text
                })
                .map_err(|e| render_error(e.to_string())),
        }
    }
}
