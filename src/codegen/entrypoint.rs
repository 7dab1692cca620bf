//! Rendering of the generated entrypoint module.
//!
//! The output is a self-contained Rust module exposing `app()` and
//! `manifest_app()`. It embeds the manifest text and contains nothing that
//! depends on the time or machine it was generated on.

use crate::discovery::DiscoveryResult;
use crate::function::TriggerKind;
use crate::manifest::ManifestFormat;

/// Options controlling the generated module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrypointOptions {
    /// Path prefix used to call user functions, e.g. `crate::handlers`.
    pub module: String,
    pub manifest_format: ManifestFormat,
}

impl Default for EntrypointOptions {
    fn default() -> Self {
        Self {
            module: "crate".to_string(),
            manifest_format: ManifestFormat::default(),
        }
    }
}

/// Render the entrypoint for `discovery`, embedding `manifest_text`.
pub fn render(
    discovery: &DiscoveryResult,
    manifest_text: &str,
    options: &EntrypointOptions,
) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "// @generated by triggerkit {}. Do not edit by hand.\n\n",
        env!("CARGO_PKG_VERSION")
    ));

    let hashes = "#".repeat(raw_string_hashes(manifest_text));
    out.push_str("/// Deployment manifest of this application.\n");
    out.push_str(&format!(
        "pub const MANIFEST: &str = r{hashes}\"{manifest_text}\"{hashes};\n\n"
    ));
    out.push_str(&format!(
        "pub const MANIFEST_CONTENT_TYPE: &str = {:?};\n\n",
        options.manifest_format.content_type()
    ));

    out.push_str("/// Routes every discovered function by trigger kind and name.\n");
    out.push_str("pub fn app() -> ::triggerkit::runtime::Application {\n");
    out.push_str("    ::triggerkit::runtime::Application::builder()\n");
    for function in discovery {
        let path = format!("{}::{}", options.module, function.ident);
        match (function.metadata.kind(), function.metadata.topic()) {
            (TriggerKind::MessageQueue, Some(topic)) => out.push_str(&format!(
                "        .message_queue({:?}, {:?}, {})\n",
                function.name, topic, path
            )),
            _ => out.push_str(&format!("        .http({:?}, {})\n", function.name, path)),
        }
    }
    out.push_str("        .build()\n");
    out.push_str("}\n\n");

    out.push_str("/// Answers every request with [`MANIFEST`].\n");
    out.push_str("pub fn manifest_app() -> ::triggerkit::runtime::ManifestApp {\n");
    out.push_str("    ::triggerkit::runtime::ManifestApp::new(MANIFEST, MANIFEST_CONTENT_TYPE)\n");
    out.push_str("}\n");

    out
}

/// Number of `#` needed so that `text` cannot terminate the raw string early.
fn raw_string_hashes(text: &str) -> usize {
    let mut longest = 0;
    for (index, _) in text.match_indices('"') {
        let run = text[index + 1..].chars().take_while(|c| *c == '#').count();
        longest = longest.max(run);
    }
    longest + 1
}
