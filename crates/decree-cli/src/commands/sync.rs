use std::time::Duration;

use anyhow::Result;
use clap::Args;

use decree_protocol::{SyncDirection, SyncEngine};

#[derive(Args)]
pub struct SyncArgs {
    /// Remote name (default: configured decree.remote)
    pub remote: Option<String>,

    /// Sync direction
    #[arg(long, default_value = "both", value_parser = parse_direction)]
    pub direction: SyncDirection,
}

fn parse_direction(raw: &str) -> Result<SyncDirection, String> {
    match raw {
        "push" => Ok(SyncDirection::Push),
        "pull" => Ok(SyncDirection::Pull),
        "both" => Ok(SyncDirection::Both),
        other => Err(format!("unknown direction {other:?} (push, pull, both)")),
    }
}

pub fn run(args: &SyncArgs) -> Result<()> {
    let (git, settings) = super::open_initialized()?;
    let remote = args.remote.clone().unwrap_or_else(|| settings.remote.clone());
    let refs = super::sync_refs(&settings)?;

    let engine = SyncEngine::new(
        git.clone(),
        Duration::from_secs(settings.sync_timeout_secs()),
    );

    // Pull first so the push is a fast-forward; the index rebuild sits
    // between the two so a rebuilt index is what gets pushed.
    if matches!(args.direction, SyncDirection::Pull | SyncDirection::Both) {
        let pulled = engine.pull(&remote, &refs)?;
        super::pull::report(&pulled);
        super::pull::reindex_if_changed(&git, &settings, &pulled)?;
    }
    if matches!(args.direction, SyncDirection::Push | SyncDirection::Both) {
        let pushed = engine.push(&remote, &refs, false)?;
        super::push::report(&pushed);
    }
    Ok(())
}
