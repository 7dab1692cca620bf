//! triggerkit CLI - generate a server entrypoint and deployment manifest
//! from annotated source.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use triggerkit::codegen::{Codegen, CodegenConfig, CONFIG_FILE};
use triggerkit::manifest::ManifestFormat;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "triggerkit")]
#[command(about = "Generate a server entrypoint and deployment manifest from annotated functions")]
#[command(version)]
struct Cli {
    /// Source file containing the annotated functions
    source: PathBuf,

    /// Path prefix used to call the functions (overrides the config file)
    #[arg(short, long)]
    module: Option<String>,

    /// Config file (defaults to the nearest triggerkit.toml above the source)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Manifest format: yaml or json (overrides the config file)
    #[arg(short, long)]
    format: Option<ManifestFormat>,

    /// Also write the manifest to this file
    #[arg(long)]
    manifest_out: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_deref(), &cli.source)?;
    if let Some(module) = cli.module {
        config = config.module(module);
    }
    if let Some(format) = cli.format {
        config = config.manifest_format(format);
    }

    let source = std::fs::read_to_string(&cli.source)
        .with_context(|| format!("failed to read {}", cli.source.display()))?;

    let generated = Codegen::new(config)
        .source_name(cli.source.display().to_string())
        .generate(&source)?;

    // Outputs are written only once everything has been generated.
    if let Some(path) = &cli.manifest_out {
        std::fs::write(path, &generated.manifest_text)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    print!("{}", generated.entrypoint);

    Ok(())
}

fn load_config(explicit: Option<&Path>, source: &Path) -> anyhow::Result<CodegenConfig> {
    if let Some(path) = explicit {
        return CodegenConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()));
    }

    let candidate = source
        .ancestors()
        .skip(1)
        .map(|dir| dir.join(CONFIG_FILE))
        .find(|path| path.is_file());

    match candidate {
        Some(path) => CodegenConfig::load(&path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(CodegenConfig::default()),
    }
}
