//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "mapstyle",
    version,
    about = "Compose dataset style modules into renderer override patches",
    long_about = "Compose dataset style modules into renderer override patches.\n\n\
                  Reads a dataset JSON file with its style modules, expands templates,\n\
                  resolves group and variant selection, and prints the merged patch."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compose a dataset's modules and print the override patch.
    Compose(ComposeArgs),

    /// List a dataset's flattened modules and their activation.
    Modules(ComposeArgs),

    /// Print a built-in lookup table or a gradient table.
    Table(TableArgs),
}

#[derive(Args)]
pub struct ComposeArgs {
    /// Dataset JSON file.
    #[arg(value_name = "DATASET")]
    pub dataset: PathBuf,

    /// Template library JSON file (overrides the configured path).
    #[arg(long = "templates", value_name = "PATH")]
    pub templates: Option<PathBuf>,

    /// Override currently applied by the renderer, as JSON.
    #[arg(long = "existing", value_name = "PATH")]
    pub existing: Option<PathBuf>,

    /// Attribute metadata JSON file.
    #[arg(long = "metadata", value_name = "PATH")]
    pub metadata: Option<PathBuf>,

    /// Runtime configuration TOML file.
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Select a group before composing.
    #[arg(long = "group", value_name = "ID")]
    pub group: Option<String>,

    /// Select a data variant by name before composing.
    #[arg(long = "variant", value_name = "NAME")]
    pub variant: Option<String>,

    /// Remove a module before composing (repeatable).
    #[arg(long = "remove", value_name = "ID")]
    pub remove: Vec<String>,
}

#[derive(Args)]
pub struct TableArgs {
    #[arg(value_enum)]
    pub kind: TableKindArg,

    /// Attribute read by flood-rank and gradient tables.
    #[arg(long = "attribute", value_name = "NAME")]
    pub attribute: Option<String>,

    /// Gradient start color.
    #[arg(long = "start", default_value = "#0000ff")]
    pub start: String,

    /// Gradient end color.
    #[arg(long = "end", default_value = "#ff0000")]
    pub end: String,

    #[arg(long = "min", default_value_t = 0.0)]
    pub min: f64,

    #[arg(long = "max", default_value_t = 100.0)]
    pub max: f64,

    #[arg(long = "step", default_value_t = 10.0)]
    pub step: f64,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum TableKindArg {
    Height,
    Purpose,
    Structure,
    FloodRank,
    Gradient,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
