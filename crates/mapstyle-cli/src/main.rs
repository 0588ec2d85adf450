//! mapstyle CLI.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result, bail};
use clap::{ColorChoice, Parser};
use tracing::level_filters::LevelFilter;

use mapstyle_cli::commands::{ComposeRequest, TableRequest, build_table, run_compose};
use mapstyle_cli::logging::{LogConfig, LogFormat, init_logging};
use mapstyle_cli::render::{condition_table, module_table, patch_json};

mod cli;

use crate::cli::{Cli, Command, ComposeArgs, LogFormatArg, LogLevelArg, TableArgs, TableKindArg};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let result = match cli.command {
        Command::Compose(args) => print_patch(&args),
        Command::Modules(args) => print_modules(&args),
        Command::Table(args) => print_table(&args),
    };
    let exit_code = match result {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn compose_request(args: &ComposeArgs) -> ComposeRequest {
    ComposeRequest {
        dataset: args.dataset.clone(),
        templates: args.templates.clone(),
        existing: args.existing.clone(),
        metadata: args.metadata.clone(),
        config: args.config.clone(),
        group: args.group.clone(),
        variant: args.variant.clone(),
        remove: args.remove.clone(),
    }
}

fn print_patch(args: &ComposeArgs) -> Result<()> {
    let outcome = run_compose(&compose_request(args))?;
    let json = patch_json(outcome.composition.patch.as_ref()).context("serialize patch")?;
    println!("{json}");
    Ok(())
}

fn print_modules(args: &ComposeArgs) -> Result<()> {
    let outcome = run_compose(&compose_request(args))?;
    println!("Dataset: {}", outcome.dataset.id);
    if let Some(group) = &outcome.dataset.selected_group {
        println!("Group: {group}");
    }
    if let Some(variant) = &outcome.dataset.selected_dataset_variant {
        println!("Variant: {} ({})", variant.name, variant.url);
    }
    println!(
        "{}",
        module_table(&outcome.flattened, &outcome.composition.activation)
    );
    Ok(())
}

fn print_table(args: &TableArgs) -> Result<()> {
    let attribute = || match &args.attribute {
        Some(attribute) => Ok(attribute.clone()),
        None => bail!("--attribute is required for this table"),
    };
    let request = match args.kind {
        TableKindArg::Height => TableRequest::Height,
        TableKindArg::Purpose => TableRequest::Purpose,
        TableKindArg::Structure => TableRequest::Structure,
        TableKindArg::FloodRank => TableRequest::FloodRank {
            attribute: attribute()?,
        },
        TableKindArg::Gradient => TableRequest::Gradient {
            attribute: attribute()?,
            start: args.start.clone(),
            end: args.end.clone(),
            min: args.min,
            max: args.max,
            step: args.step,
        },
    };
    println!("{}", condition_table(&build_table(&request)?));
    Ok(())
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
