use anyhow::{Context, Result};
use clap::Args;

use decree_core::config::Settings;
use decree_core::model::{DecisionRecord, RecordId};
use decree_core::storage::RecordStore;
use decree_core::CoreError;

use crate::output::format::format_record_full;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct ShowArgs {
    /// Record id, or a bare sequence number under the configured prefix
    pub id: String,

    /// Print only the body text
    #[arg(long)]
    pub body: bool,
}

pub fn run(args: &ShowArgs, format: OutputFormat) -> Result<()> {
    let (git, settings) = super::open_initialized()?;
    let store = super::record_store(&git, &settings);

    let record = resolve(&store, &settings, &args.id)
        .with_context(|| format!("Failed to read record '{}'", args.id))?;

    if args.body {
        print!("{}", record.body);
        if !record.body.ends_with('\n') {
            println!();
        }
    } else {
        print!("{}", format_record_full(&record, format));
    }
    Ok(())
}

/// Look up an id verbatim; a bare number falls back to the sequential
/// form, so `decree show 7` finds `DR-0007`.
pub(crate) fn resolve(
    store: &RecordStore,
    settings: &Settings,
    raw: &str,
) -> Result<DecisionRecord, CoreError> {
    match store.get(&RecordId::parse(raw)?) {
        Err(CoreError::NotFound { .. }) => {
            if let Ok(number) = raw.parse::<u32>() {
                return store.get(&RecordId::format(&settings.id_prefix, number));
            }
            Err(CoreError::NotFound {
                id: raw.to_string(),
            })
        }
        other => other,
    }
}
