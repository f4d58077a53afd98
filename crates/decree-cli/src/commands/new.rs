use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use decree_core::config::Settings;
use decree_core::model::{next_id, DecisionRecord, RecordId, RecordLink, RecordStatus};
use decree_core::runner::GitRunner;
use decree_protocol::SyncEngine;

#[derive(Args)]
pub struct NewArgs {
    /// Record body text (reads stdin when neither this nor --file is given)
    #[arg(short, long)]
    pub message: Option<String>,

    /// Read the body from a file ("-" for stdin)
    #[arg(long, conflicts_with = "message")]
    pub file: Option<PathBuf>,

    /// Explicit id instead of the next sequential one
    #[arg(long)]
    pub id: Option<String>,

    /// Initial status (default: draft)
    #[arg(long)]
    pub status: Option<RecordStatus>,

    /// Tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Decider (repeatable)
    #[arg(long = "decider")]
    pub deciders: Vec<String>,

    /// Id of a record this one supersedes
    #[arg(long)]
    pub supersedes: Option<String>,
}

pub fn run(args: &NewArgs) -> Result<()> {
    let (git, settings) = super::open_initialized()?;
    let store = super::indexed_store(&git, &settings);

    let body = read_body(args)?;
    let id = match &args.id {
        Some(raw) => RecordId::parse(raw.clone())?,
        None => {
            let existing = store.list()?;
            next_id(&existing, &settings.id_prefix)
        }
    };

    let mut record = DecisionRecord::new(id.clone(), body);
    if let Some(status) = args.status {
        record.metadata.status = status;
    }
    record.metadata.tags = args.tags.clone();
    record.metadata.deciders = args.deciders.clone();

    // Superseding touches two records; both land in one container
    // write so a losing compare-and-swap cannot leave the old record
    // retired with no successor.
    let mut writes = Vec::new();
    if let Some(old_raw) = &args.supersedes {
        let old_id = RecordId::parse(old_raw.clone())?;
        let mut old = store
            .get(&old_id)
            .with_context(|| format!("Cannot supersede '{old_id}'"))?;
        old.metadata.superseded_by = Some(id.clone());
        old.metadata.status = RecordStatus::Superseded;
        old.touch();
        writes.push(old);

        record.metadata.supersedes = Some(old_id.clone());
        record.metadata.links.push(RecordLink {
            rel: "supersedes".to_string(),
            target: old_id,
        });
    }
    writes.push(record.clone());
    store.put_many(&writes)?;
    println!("Created {}", record.id);

    auto_push(&git, &settings);
    Ok(())
}

/// Push after a write when `decree.sync.autoPush` is set. Failures
/// warn instead of erroring; the record is already committed locally.
pub(crate) fn auto_push(git: &GitRunner, settings: &Settings) {
    if !settings.auto_push {
        return;
    }
    let result = super::sync_refs(settings).and_then(|refs| {
        let engine = SyncEngine::new(
            git.clone(),
            Duration::from_secs(settings.sync_timeout_secs()),
        );
        engine.push(&settings.remote, &refs, false)?;
        Ok(())
    });
    if let Err(err) = result {
        tracing::warn!(remote = %settings.remote, %err, "auto-push failed");
        eprintln!("Warning: auto-push to '{}' failed: {err}", settings.remote);
        eprintln!("Run `decree sync` to retry.");
    }
}

fn read_body(args: &NewArgs) -> Result<String> {
    if let Some(message) = &args.message {
        return Ok(message.clone());
    }
    match &args.file {
        Some(path) if path.as_os_str() == "-" => read_stdin(),
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => read_stdin(),
    }
}

fn read_stdin() -> Result<String> {
    let mut body = String::new();
    std::io::stdin()
        .read_to_string(&mut body)
        .context("Failed to read record body from stdin")?;
    if body.trim().is_empty() {
        anyhow::bail!("Record body is empty. Pass -m <text> or pipe content on stdin.");
    }
    Ok(body)
}
