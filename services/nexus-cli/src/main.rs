//! `nexus` command line tool.
//!
//! Inspects catalog files and reads series from the built-in sample source.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use nexus_cli::{
    list_catalogs, merge_files, parse_time, read_sample, render_series, resolve_in_file, CliConfig,
};

#[derive(Parser, Debug)]
#[command(name = "nexus")]
#[command(about = "Catalog inspection and batch reads")]
struct Args {
    /// Configuration file path (YAML)
    #[arg(short, long, env = "NEXUS_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge catalog JSON files and print the result
    Merge {
        /// Catalog files, merged left to right
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Resolve a resource path against a catalog JSON file
    Resolve {
        /// Catalog file
        catalog: PathBuf,
        /// Resource path, e.g. /A/B/T1/10_min_mean
        path: String,
    },

    /// List the catalogs of the sample source
    List,

    /// Read resource paths from the sample source
    Read {
        /// Inclusive begin (RFC 3339)
        #[arg(long)]
        begin: String,
        /// Exclusive end (RFC 3339)
        #[arg(long)]
        end: String,
        /// Resource paths
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

fn init_tracing(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr);

    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args);

    let config = CliConfig::load(args.config.as_deref())?;
    info!(config = ?config.pipeline, "Loaded configuration");

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            ctrl_c.cancel();
        }
    });

    match args.command {
        Command::Merge { files } => {
            let merged = merge_files(&files)?;
            println!("{}", serde_json::to_string_pretty(&merged)?);
        }
        Command::Resolve { catalog, path } => {
            let resolved = resolve_in_file(&catalog, &path)?;
            println!("{}", resolved.item.to_path());
            if let Some(base) = &resolved.base {
                println!("base: {}", base.to_path());
            }
        }
        Command::List => {
            let summaries = list_catalogs(&config, &cancel).await?;
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        Command::Read { begin, end, paths } => {
            let begin = parse_time(&begin)?;
            let end = parse_time(&end)?;

            let progress = |value: f64| {
                tracing::debug!(progress = format!("{:.0}%", value * 100.0), "Read progress");
            };

            let values = read_sample(&config, begin, end, &paths, &progress, &cancel).await?;
            println!("{}", render_series(&paths, &values)?);
        }
    }

    Ok(())
}
