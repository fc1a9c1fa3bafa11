// Copyright 2026 billgrab contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use billgrab_runtime::cli;
use billgrab_runtime::cli::run_cmd::RunArgs;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "billgrab",
    about = "billgrab: fetch monthly billing statements and forward them",
    version,
    after_help = "Run 'billgrab <command> --help' for details on each command.\nRun 'billgrab' with no command to fetch with the default configuration."
)]
struct Cli {
    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit log records as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in, fetch the statements and deliver them
    Run {
        /// Path to the configuration file
        #[arg(long, short)]
        config: Option<PathBuf>,
        /// Capture statements but do not send them
        #[arg(long)]
        dry_run: bool,
        /// Category to fetch (e.g. "mobilfunk", "kabel"). Can be repeated.
        #[arg(long = "category")]
        categories: Vec<String>,
    },
    /// Load and validate the configuration
    CheckConfig {
        /// Path to the configuration file
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
    /// Check environment and diagnose issues
    Doctor {
        /// Path to the configuration file
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: Shell,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose { "billgrab=debug" } else { "billgrab=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global flags via environment variables so all modules can check them
    if cli.quiet {
        std::env::set_var("BILLGRAB_QUIET", "1");
    }
    if cli.verbose {
        std::env::set_var("BILLGRAB_VERBOSE", "1");
    }
    init_tracing(cli.verbose, cli.log_json);

    let result = match cli.command {
        None => cli::run_cmd::run(&RunArgs::default()).await,
        Some(Commands::Run {
            config,
            dry_run,
            categories,
        }) => {
            cli::run_cmd::run(&RunArgs {
                config,
                dry_run,
                categories,
            })
            .await
        }
        Some(Commands::CheckConfig { config }) => cli::check_config::run(config.as_deref()).await,
        Some(Commands::Doctor { config }) => cli::doctor::run(config.as_deref()).await,
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "billgrab", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }

    result
}
