use anyhow::Result;
use clap::Args;

#[derive(Args)]
pub struct ReindexArgs {
    /// Only check whether the index matches the store
    #[arg(long)]
    pub check: bool,
}

pub fn run(args: &ReindexArgs) -> Result<()> {
    let (git, settings) = super::open_initialized()?;
    let store = super::record_store(&git, &settings);
    let engine = super::search_engine(&git, &settings);

    if args.check {
        if engine.verify(&store)? {
            eprintln!("Index is current.");
            return Ok(());
        }
        anyhow::bail!("Index is stale. Run `decree reindex` to rebuild it.");
    }

    eprintln!("Rebuilding search index...");
    let count = engine.rebuild(&store)?;
    eprintln!("Indexed {count} record(s).");
    Ok(())
}
