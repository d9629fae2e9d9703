//! soltros - maintenance helper for the immutable SoltrOS desktop
//!
//! One validated front door over the tools an image-based system leans
//! on: `nix profile` for user packages, `bootc` for OS image updates,
//! and the container runtime's signature policy for pull trust.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use soltros_core::process::{CommandRunner, SystemRunner};
use soltros_core::refresh::{Capabilities, DesktopEnvironment, DesktopRefresher};
use soltros_core::trust::{with_enforced_policy, with_permissive_policy, PolicyStore};
use soltros_core::{pkg, Config, SoltrosError};

mod args;
mod trust_cli;

use args::{at_most_one, expect_none, require_one};

#[derive(Parser, Debug)]
#[clap(
    name = "soltros",
    about = "Maintenance helper for the immutable SoltrOS desktop",
    version
)]
struct Cli {
    /// Emit extra diagnostic output
    #[clap(long, global = true)]
    verbose: bool,

    /// Suppress informational and warning output (errors still print)
    #[clap(long, global = true)]
    quiet: bool,

    /// Override the package source flake
    #[clap(long, global = true, value_name = "PATH")]
    flake_path: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Install a package from the system flake
    Install {
        #[clap(value_name = "PACKAGE")]
        args: Vec<String>,
    },
    /// Remove a package by name, profile index or store path
    Remove {
        #[clap(value_name = "PACKAGE")]
        args: Vec<String>,
    },
    /// List installed packages
    List {
        #[clap(value_name = "ARGS", hide = true)]
        args: Vec<String>,
    },
    /// Search nixpkgs for a package
    Search {
        #[clap(value_name = "QUERY")]
        args: Vec<String>,
    },
    /// Show details for a package
    Info {
        #[clap(value_name = "PACKAGE")]
        args: Vec<String>,
    },
    /// Upgrade all installed packages
    Upgrade {
        #[clap(value_name = "ARGS", hide = true)]
        args: Vec<String>,
    },
    /// Update the package source lock
    Update {
        #[clap(value_name = "ARGS", hide = true)]
        args: Vec<String>,
    },
    /// Show profile generation history
    History {
        #[clap(value_name = "ARGS", hide = true)]
        args: Vec<String>,
    },
    /// Roll back one step, or to a specific generation
    Rollback {
        #[clap(value_name = "GENERATION")]
        args: Vec<String>,
    },
    /// Garbage-collect the package store
    Clean {
        #[clap(value_name = "ARGS", hide = true)]
        args: Vec<String>,
    },
    /// Manage the container signature policy
    Trust {
        #[clap(subcommand)]
        command: trust_cli::TrustCommand,
    },
    /// Relax trust, pull the latest OS image, then re-enforce
    EmergencyFix,
    /// Routine OS image update, with trust enforced for its duration
    SystemUpdate,
}

fn init_tracing(config: &Config) {
    let directive = if config.quiet {
        "error"
    } else if config.verbose {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    let config = Config::from_env().with_overrides(
        cli.flake_path.clone(),
        cli.verbose,
        cli.quiet,
    );
    init_tracing(&config);

    if let Err(err) = run(cli.command, &config) {
        error!("{err:#}");
        let code = err
            .downcast_ref::<SoltrosError>()
            .map(SoltrosError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

/// Package verb after the argument-cardinality policy has been applied.
enum PkgAction {
    Install(String),
    Remove(String),
    List,
    Search(String),
    Info(String),
    Upgrade,
    Update,
    History,
    Rollback(Option<String>),
    Clean,
}

fn run(command: Command, config: &Config) -> Result<()> {
    let runner = SystemRunner;

    let action = match command {
        Command::Install { args } => {
            PkgAction::Install(require_one("install", "<package>", &args)?.to_string())
        }
        Command::Remove { args } => {
            PkgAction::Remove(require_one("remove", "<package>", &args)?.to_string())
        }
        Command::List { args } => {
            expect_none("list", &args);
            PkgAction::List
        }
        Command::Search { args } => {
            PkgAction::Search(require_one("search", "<query>", &args)?.to_string())
        }
        Command::Info { args } => {
            PkgAction::Info(require_one("info", "<package>", &args)?.to_string())
        }
        Command::Upgrade { args } => {
            expect_none("upgrade", &args);
            PkgAction::Upgrade
        }
        Command::Update { args } => {
            expect_none("update", &args);
            PkgAction::Update
        }
        Command::History { args } => {
            expect_none("history", &args);
            PkgAction::History
        }
        Command::Rollback { args } => {
            PkgAction::Rollback(at_most_one("rollback", &args).map(str::to_string))
        }
        Command::Clean { args } => {
            expect_none("clean", &args);
            PkgAction::Clean
        }
        Command::Trust { command } => {
            return Ok(trust_cli::run(&command, &PolicyStore::system())?);
        }
        Command::EmergencyFix => {
            ensure_bootc(&runner)?;
            let store = PolicyStore::system();
            let backup = with_permissive_policy(&store, || runner.run("bootc", &["upgrade"]))?;
            if let Some(path) = backup {
                info!("previous policy backed up to {}", path.display());
            }
            println!("OS image updated; signature policy re-enforced.");
            return Ok(());
        }
        Command::SystemUpdate => {
            ensure_bootc(&runner)?;
            let store = PolicyStore::system();
            let backup = with_enforced_policy(&store, || runner.run("bootc", &["upgrade"]))?;
            if let Some(path) = backup {
                info!("previous policy backed up to {}", path.display());
            }
            println!("OS image updated.");
            return Ok(());
        }
    };

    Ok(run_pkg(action, config, &runner)?)
}

/// Build the package-manager stack (environment check, capability
/// discovery, desktop detection) and dispatch one verb into it.
fn run_pkg(
    action: PkgAction,
    config: &Config,
    runner: &SystemRunner,
) -> soltros_core::Result<()> {
    pkg::ensure_environment(runner)?;
    let capabilities = Capabilities::discover(runner);
    let desktop = DesktopEnvironment::detect();
    let refresher = DesktopRefresher::new(runner, capabilities, desktop);
    let pm = pkg::PackageManager::new(config, runner, &refresher);

    match action {
        PkgAction::Install(name) => pm.install(&name),
        PkgAction::Remove(identifier) => pm.remove(&identifier),
        PkgAction::List => pm.list(),
        PkgAction::Search(query) => pm.search(&query),
        PkgAction::Info(name) => pm.info(&name),
        PkgAction::Upgrade => pm.upgrade(),
        PkgAction::Update => pm.update(),
        PkgAction::History => pm.history(),
        PkgAction::Rollback(generation) => pm.rollback(generation.as_deref()),
        PkgAction::Clean => pm.clean(),
    }
}

fn ensure_bootc(runner: &dyn CommandRunner) -> soltros_core::Result<()> {
    if runner.has("bootc") {
        Ok(())
    } else {
        Err(SoltrosError::Environment {
            tool: "bootc".to_string(),
            hint: "OS image updates need bootc; this command only works on an \
                   image-based SoltrOS install."
                .to_string(),
        })
    }
}
