use std::path::{Path, PathBuf};

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Parser, ValueEnum};

use crate::config::Config;
use crate::loader::Locator;
use crate::{TmError, TmResult};

/// Defines the styles used for the CLI help output.
const HELP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Blue.on_default().bold())
    .usage(AnsiColor::Blue.on_default().bold())
    .literal(AnsiColor::White.on_default())
    .placeholder(AnsiColor::Green.on_default());

#[derive(Parser, Debug, PartialEq, Default)]
#[command(
    about,
    version,
    after_help = "Use RUST_LOG environment variable to control logging level, e.g. RUST_LOG=debug or RUST_LOG=tmsource=debug. Use TMSOURCE_FORMAT to choose the log format: json, full, compact, bare or pretty.",
    styles = HELP_STYLES
)]
pub struct Args {
    #[command(flatten)]
    pub meta: MetaArgs,
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

// None of these params will be transferred to the config
#[derive(Parser, Debug, Clone, PartialEq, Default)]
#[command(about, version)]
pub struct MetaArgs {
    /// Project to load, either a `tmsource://` locator or the path of a project directory
    pub locator: String,
    /// What to print
    #[arg(short, long, value_enum, default_value_t)]
    pub output: OutputFormat,
    /// Write the output to a file instead of stdout, "-" is stdout.
    #[arg(short, long, value_name = "FILE")]
    pub save: Option<PathBuf>,
    /// Path to config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Save resulting config to a file or use "-" to print to stdout.
    #[arg(long)]
    pub save_config: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone, PartialEq, Default)]
#[command()]
pub struct PipelineArgs {
    /// Capability catalog file (JSON or YAML) to filter datasource parameters with.
    #[arg(long)]
    pub catalog: Option<PathBuf>,
    /// Do not open datasources to discover layer fields.
    #[arg(long)]
    pub no_introspect: bool,
}

/// Output of the `tmsource` command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The compiled Mapnik XML stylesheet
    #[default]
    Xml,
    /// The normalized document as YAML with sorted keys
    Info,
    /// The `vector_layers` metadata as JSON
    VectorLayers,
}

impl Args {
    /// Apply the CLI overrides to `config`.
    pub fn merge_into_config(&self, config: &mut Config) {
        if self.pipeline.catalog.is_some() {
            config.catalog.clone_from(&self.pipeline.catalog);
        }
        if self.pipeline.no_introspect {
            config.introspect = Some(false);
        }
    }

    /// The locator to open. A plain path is turned into a `tmsource://` locator.
    pub fn locator(&self) -> TmResult<String> {
        let locator = &self.meta.locator;
        if locator.contains("://") {
            return Ok(locator.clone());
        }
        Locator::from_path(Path::new(locator))
            .map(|l| l.to_string())
            .map_err(|e| TmError::InvalidLocator(locator.clone(), e.to_string()))
    }
}
