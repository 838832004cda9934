//! Library side of the `nexus` command line tool.
//!
//! The binary only parses arguments and sets up logging; everything it does
//! is implemented here so it can be tested without spawning processes.

pub mod commands;
pub mod config;

pub use commands::{
    list_catalogs, merge_files, parse_time, read_sample, render_series, resolve_in_file,
    CatalogSummary,
};
pub use config::CliConfig;
