use anyhow::{Context, Result};
use clap::Args;

use decree_core::config;

#[derive(Args)]
pub struct InitArgs {
    /// Force re-initialization
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: &InitArgs) -> Result<()> {
    let (git, _settings) = super::open()?;

    if config::is_initialized(&git)? && !args.force {
        println!("Decree is already initialized in this repository.");
        println!("Use --force to re-initialize.");
        return Ok(());
    }

    config::initialize(&git).context("Failed to initialize decree")?;

    println!("Decree initialized.");
    println!();
    println!("Next steps:");
    println!("  decree new -m <text>     Create a decision record");
    println!("  decree hooks install     Sync records on every git push");
    println!("  decree list              List decision records");
    Ok(())
}
