//! # warden-cli
//!
//! Command-line interface for Warden access policies.
//!
//! - `warden init` — write a starter `.warden/policy.yaml`
//! - `warden show` — print the normalized policy as JSON
//! - `warden check` — evaluate a load request against the policy
//!
//! Policy errors are printed as `<Category>: <message>` and exit with
//! status 1.

mod commands;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use warden_policy::PolicyError;

/// Warden — provenance checks for restricted module loads.
#[derive(Parser)]
#[command(name = "warden", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Policy file to use instead of `.warden/policy.*`.
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter policy file.
    Init {
        /// Overwrite an existing policy file.
        #[arg(long)]
        force: bool,
    },
    /// Print the normalized policy.
    Show,
    /// Check whether a module may be loaded from the given frames.
    Check {
        /// Identifier being loaded.
        #[arg(long)]
        module: String,
        /// Caller frame origin path, innermost first (repeatable).
        #[arg(long = "frame")]
        frames: Vec<PathBuf>,
        /// Print the evaluation trace as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't mix with command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("warden_loader=warn".parse()?)
                .add_directive("warden_policy=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);

    let result = match &cli.command {
        Commands::Init { force } => commands::init::execute(&project_root, *force),
        Commands::Show => commands::show::execute(&project_root, cli.policy.as_ref()),
        Commands::Check {
            module,
            frames,
            json,
        } => commands::check::execute(
            &project_root,
            cli.policy.as_ref(),
            module,
            frames,
            *json,
        ),
    };

    match result {
        Err(err) => match err.downcast_ref::<PolicyError>() {
            Some(policy_err) => report::fail(policy_err),
            None => Err(err),
        },
        Ok(()) => Ok(()),
    }
}
