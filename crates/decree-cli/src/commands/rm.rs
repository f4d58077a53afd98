use anyhow::{Context, Result};
use clap::Args;

#[derive(Args)]
pub struct RmArgs {
    /// Record id, or a bare sequence number under the configured prefix
    pub id: String,
}

pub fn run(args: &RmArgs) -> Result<()> {
    let (git, settings) = super::open_initialized()?;
    let store = super::indexed_store(&git, &settings);

    let record = super::show::resolve(store.store(), &settings, &args.id)
        .with_context(|| format!("Cannot remove '{}'", args.id))?;
    store.delete(&record.id)?;
    println!("Removed {}", record.id);

    super::new::auto_push(&git, &settings);
    Ok(())
}
