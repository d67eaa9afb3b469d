//! # mvnr
//!
//! Maven-style transitive dependency resolution from the command line.
//!
//! This is the main entry point for the mvnr CLI tool. It handles command
//! parsing, sets up logging and error reporting, and dispatches to the
//! command handlers.

use std::process::ExitCode;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mvnr_core::types::Scope;

mod commands;
mod descriptor;
mod output;

use commands::{CommandContext, ResolveOptions};
use output::errors::ErrorFormatter;

/// Maven-style transitive dependency resolution
#[derive(Parser, Debug)]
#[command(name = "mvnr", version, about = "Maven-style dependency resolver")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output, including every mediation decision
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Look for mvnr.toml starting in this directory
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<Utf8PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the dependency tree
    Tree {
        /// Only show the classpath of this scope
        #[arg(long)]
        scope: Option<Scope>,
    },
    /// Resolve every dependency and print the resolved files
    Resolve(ResolveArgs),
    /// Validate mvnr.toml and the global settings
    Check,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ResolveArgs {
    /// Only resolve the classpath of this scope
    #[arg(long)]
    pub scope: Option<Scope>,

    /// Never contact remote repositories
    #[arg(long)]
    pub offline: bool,

    /// Download artifacts again even when they are present locally
    #[arg(long)]
    pub force: bool,

    /// Number of parallel downloads
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

impl From<ResolveArgs> for ResolveOptions {
    fn from(args: ResolveArgs) -> Self {
        Self {
            scope: args.scope,
            offline: args.offline,
            force: args.force,
            jobs: args.jobs,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    info!("Starting mvnr v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", ErrorFormatter::new().format_any(&err));
            ExitCode::FAILURE
        },
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

    rt.block_on(async {
        let ctx = CommandContext::new(cli.directory, cli.verbose)?;
        commands::dispatch_command(cli.command, &ctx).await
    })
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            ["mvnr", "mvnr_core", "mvnr_config", "mvnr_repository", "mvnr_cache", "mvnr_resolver"]
                .iter()
                .map(|target| format!("{target}={level}"))
                .collect::<Vec<_>>()
                .join(","),
        )
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("mvnr encountered an unexpected error: {}", panic_info);
        eprintln!("mvnr crashed! This is a bug.");
        eprintln!("Please report this at: https://github.com/mvnr-rs/mvnr/issues");
        eprintln!("Error: {}", panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_resolve_flags() {
        let cli = Cli::parse_from(["mvnr", "resolve", "--scope", "runtime", "--offline", "-j", "4"]);
        match cli.command {
            Commands::Resolve(args) => {
                let options = ResolveOptions::from(args);
                assert_eq!(options.scope, Some(Scope::Runtime));
                assert!(options.offline);
                assert!(!options.force);
                assert_eq!(options.jobs, Some(4));
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_scope_is_rejected() {
        assert!(Cli::try_parse_from(["mvnr", "tree", "--scope", "everything"]).is_err());
    }

    #[test]
    fn test_global_directory() {
        let cli = Cli::parse_from(["mvnr", "check", "-C", "/work/app"]);
        assert_eq!(cli.directory, Some(Utf8PathBuf::from("/work/app")));
        assert!(matches!(cli.command, Commands::Check));
    }
}
