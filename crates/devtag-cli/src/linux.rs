//! `devtag` command-line front end: evaluate tags, poke udev, inspect devices.

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use devtag_core::{
    config::DEFAULT_CONFIG_PATH, logging, send_uevent, ConfigFile, DevtagConfig, SpecEvaluator,
    UeventAction,
};
use devtag_probe::SuperblockProbe;
use devtag_provider::{DeviceCache, DeviceProbe, ProbeRequest};
use devtag_udev::UdevCache;
use log::{info, LevelFilter};
use schemars::schema_for;
use serde_json::to_string_pretty;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Top-level command-line options shared by every subcommand.
#[derive(Parser, Debug)]
#[command(
    name = "devtag",
    version,
    about = "Resolve LABEL=/UUID= device tags to block device paths."
)]
struct Cli {
    /// Configuration file (defaults to DEVTAG_CONFIG, then /etc/devtag.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print the evaluation trace.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate NAME=value (or NAME value) into a device path.
    Evaluate {
        /// Tag name, a combined NAME=value spec, or a plain path.
        token: String,

        /// Tag value when given separately from the name.
        value: Option<String>,
    },

    /// Ask the kernel to re-send an event for a block device.
    Uevent {
        /// Block device node, e.g. /dev/sda1.
        device: PathBuf,

        /// Action written to the device's uevent file.
        #[arg(long, default_value = "change")]
        action: UeventAction,
    },

    /// Show the TYPE, UUID and LABEL read from a device's superblock.
    Probe {
        /// Block device node or filesystem image.
        device: PathBuf,
    },

    /// Validate a configuration file or emit the config schema.
    Validate {
        /// Path to the configuration file to validate.
        #[arg(short = 'f', long)]
        file: Option<PathBuf>,

        /// Output the JSON schema instead of validating a file.
        #[arg(long)]
        schema: bool,
    },
}

/// Entry point: parse arguments and surface errors with an exit code.
pub(crate) fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    logging::init("warn");
    let cli = Cli::parse();
    if cli.verbose {
        logging::set_level(LevelFilter::Debug);
    }

    let config = match &cli.config {
        Some(path) => ConfigFile::new(path),
        None => ConfigFile::discover(),
    };

    match cli.command {
        Commands::Evaluate { token, value } => {
            let path = evaluate(config, &token, value.as_deref());
            match path {
                Some(path) => println!("{}", path.display()),
                None => {
                    eprintln!("{}: not found", describe(&token, value.as_deref()));
                    std::process::exit(1);
                }
            }
        }
        Commands::Uevent { device, action } => {
            send_uevent(&device, action).with_context(|| {
                format!("failed to send '{action}' uevent for {}", device.display())
            })?;
            info!("sent '{action}' uevent for {}", device.display());
        }
        Commands::Probe { device } => probe(&device)?,
        Commands::Validate { file, schema } => {
            if schema {
                let schema = schema_for!(DevtagConfig);
                println!("{}", to_string_pretty(&schema)?);
                return Ok(());
            }

            let file = file
                .or_else(|| config.path().map(Path::to_path_buf))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
            validate(&file)?;
        }
    }

    Ok(())
}

/// Evaluate through the udev links first, keeping one udev context for the call.
fn evaluate(config: ConfigFile, token: &str, value: Option<&str>) -> Option<PathBuf> {
    let evaluator = SpecEvaluator::new(config, SuperblockProbe::new(), UdevCache::new());

    let mut handle = None;
    let path = evaluator.evaluate(token, value, Some(&mut handle));
    if let Some(handle) = handle.take() {
        evaluator.cache().close(handle);
    }
    path
}

fn describe(token: &str, value: Option<&str>) -> String {
    match value {
        Some(value) => format!("{token}={value}"),
        None => token.to_string(),
    }
}

fn probe(device: &Path) -> Result<()> {
    let file =
        File::open(device).with_context(|| format!("failed to open {}", device.display()))?;
    let values = SuperblockProbe::new()
        .probe(&file, ProbeRequest::all())
        .with_context(|| format!("failed to probe {}", device.display()))?;

    for (field, value) in values.iter() {
        println!("{field}={}", String::from_utf8_lossy(value));
    }
    Ok(())
}

fn validate(file: &Path) -> Result<()> {
    let cfg = DevtagConfig::load(file)
        .with_context(|| format!("failed to load configuration from {}", file.display()))?;

    let issues = cfg.validate();
    ensure!(
        issues.is_empty(),
        "configuration validation failed:\n  - {}",
        issues.join("\n  - ")
    );

    let order: Vec<&str> = cfg.evaluate.order.iter().map(|m| m.as_str()).collect();
    println!(
        "Configuration valid (order={}, send_uevent={}).",
        order.join(","),
        cfg.evaluate.send_uevent
    );
    Ok(())
}
