//! Trust policy subcommands: relax, enforce, status

use clap::Subcommand;
use soltros_core::trust::{PolicyStore, TrustPolicy};
use soltros_core::Result;
use tracing::warn;

#[derive(Subcommand, Debug)]
pub enum TrustCommand {
    /// Accept any image from anywhere (transient bootstrap state)
    Relax,
    /// Require signatures for the SoltrOS image repositories
    Enforce,
    /// Show the current policy state
    Status,
}

pub fn run(command: &TrustCommand, store: &PolicyStore) -> Result<()> {
    match command {
        TrustCommand::Relax => {
            let backup = store.apply(&TrustPolicy::permissive())?;
            store.mark_relaxed();
            if let Some(path) = backup {
                println!("Previous policy backed up to {}", path.display());
            }
            println!("Trust policy is now PERMISSIVE: any image will be accepted.");
            warn!("run 'soltros trust enforce' as soon as the maintenance is done");
            Ok(())
        }
        TrustCommand::Enforce => {
            let backup = store.apply(&TrustPolicy::enforcing())?;
            store.clear_relaxed();
            if let Some(path) = backup {
                println!("Previous policy backed up to {}", path.display());
            }
            println!("Trust policy is now ENFORCING: SoltrOS images require signatures.");
            Ok(())
        }
        TrustCommand::Status => {
            if !store.exists() {
                println!("No policy document at {}", store.policy_path().display());
                println!("Trust behavior is undefined; run 'soltros trust enforce'.");
                return Ok(());
            }
            let policy = store.load()?;
            println!("Policy document: {}", store.policy_path().display());
            println!("Default rule:    {}", policy.default_rule_name());
            println!(
                "Pinned repos:    {}",
                policy.transports.docker.len()
            );
            for repo in policy.transports.docker.keys() {
                println!("  - {repo}");
            }
            if store.is_relaxed() {
                println!("Marker:          trust currently relaxed");
            }
            Ok(())
        }
    }
}
