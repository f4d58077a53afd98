use anyhow::Result;
use clap::{Args, Subcommand};

use decree_core::hooks::{HookManager, HookState, InstallOutcome, UninstallOutcome};

#[derive(Args)]
pub struct HooksArgs {
    #[command(subcommand)]
    pub command: HooksCommand,
}

#[derive(Subcommand)]
pub enum HooksCommand {
    /// Install the pre-push hook (backs up any existing hook)
    Install {
        /// Reinstall over an existing decree hook
        #[arg(long)]
        force: bool,
    },
    /// Remove the pre-push hook, restoring any backup
    Uninstall,
    /// Show the hook's installation state
    Status,
}

pub fn run(args: &HooksArgs) -> Result<()> {
    let (git, _settings) = super::open()?;
    let manager = HookManager::for_repo(&git)?;

    match &args.command {
        HooksCommand::Install { force } => match manager.install(*force)? {
            InstallOutcome::Installed => println!("Pre-push hook installed."),
            InstallOutcome::InstalledWithBackup => {
                println!("Pre-push hook installed. Existing hook backed up; it still runs after decree.");
            }
            InstallOutcome::AlreadyInstalled => {
                println!("Pre-push hook is already installed. Use --force to reinstall.");
            }
            InstallOutcome::Reinstalled => println!("Pre-push hook reinstalled."),
        },
        HooksCommand::Uninstall => match manager.uninstall()? {
            UninstallOutcome::Removed => println!("Pre-push hook removed."),
            UninstallOutcome::RemovedAndRestored => {
                println!("Pre-push hook removed; previous hook restored.");
            }
            UninstallOutcome::NotInstalled => println!("No decree hook installed."),
            UninstallOutcome::ForeignPresent => {
                println!("The pre-push hook belongs to another tool; left untouched.");
            }
        },
        HooksCommand::Status => {
            let status = manager.status()?;
            let state = match status.state {
                HookState::Absent => "absent",
                HookState::OursOnly => "installed",
                HookState::OursWithBackup => "installed (foreign hook backed up)",
                HookState::ForeignOnly => "foreign hook present",
            };
            println!("pre-push: {state}");
            if let Some(version) = &status.version {
                println!("version:  {version}");
            }
            if status.backup_present {
                println!("backup:   present");
            }
        }
    }
    Ok(())
}
