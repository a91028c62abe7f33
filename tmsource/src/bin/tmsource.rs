use std::ffi::OsStr;
use std::fs;
use std::io::{self, Write as _};
use std::process;

use clap::Parser;
use log::log_enabled;
use tmsource::args::{Args, OutputFormat};
use tmsource::config::env::{Env as _, OsEnv};
use tmsource::config::{Config, read_config};
use tmsource::loader::ProtocolRegistry;
use tmsource::logging::{ensure_core_log_level_matches, init_tracing};
use tmsource::{TmError, TmResult};
use tracing::{error, info};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn run(args: Args) -> TmResult<()> {
    info!("Starting tmsource v{VERSION}");

    let env = OsEnv;
    let mut config = if let Some(ref cfg_filename) = args.meta.config {
        info!("Using {}", cfg_filename.display());
        read_config(cfg_filename, &env)?
    } else {
        Config::default()
    };

    args.merge_into_config(&mut config);
    config.finalize();
    let pipeline = config.pipeline()?;

    if let Some(file_name) = &args.meta.save_config {
        config.save_to_file(file_name)?;
    }

    let source = ProtocolRegistry::default().open(&args.locator()?, &pipeline)?;
    let output = match args.meta.output {
        OutputFormat::Xml => source.stylesheet().to_string(),
        OutputFormat::Info => source.info_yaml()?,
        OutputFormat::VectorLayers => source.vector_layers_json()?,
    };

    match &args.meta.save {
        Some(file_name) if file_name.as_os_str() != OsStr::new("-") => {
            fs::write(file_name, output)
                .map_err(|e| TmError::OutputWriteError(e, file_name.clone()))?;
            info!("Saved {} to {}", source.locator(), file_name.display());
        }
        _ => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(output.as_bytes())
                .and_then(|()| stdout.write_all(b"\n"))
                .map_err(|e| TmError::OutputWriteError(e, "-".into()))?;
        }
    }
    Ok(())
}

fn main() {
    let env = OsEnv;
    let filter = ensure_core_log_level_matches(env.get_env_str("RUST_LOG"), "tmsource=");
    init_tracing(&filter, env.get_env_str("TMSOURCE_FORMAT"));

    let args = Args::parse();
    if let Err(e) = run(args) {
        // Ensure the message is printed, even if the logging is disabled
        if log_enabled!(log::Level::Error) {
            error!("{e}");
        } else {
            eprintln!("{e}");
        }
        process::exit(1);
    }
}
