use anyhow::Result;
use clap::Args;

use decree_core::model::RecordStatus;

use crate::output::format::format_record_list;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct ListArgs {
    /// Only records with this status
    #[arg(long)]
    pub status: Option<RecordStatus>,

    /// Only records carrying this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Maximum number of entries
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

pub fn run(args: &ListArgs, format: OutputFormat) -> Result<()> {
    let (git, settings) = super::open_initialized()?;
    let store = super::record_store(&git, &settings);

    let mut records = store.records()?;
    if let Some(status) = args.status {
        records.retain(|r| r.metadata.status == status);
    }
    if let Some(tag) = &args.tag {
        records.retain(|r| r.metadata.tags.iter().any(|t| t == tag));
    }
    if let Some(limit) = args.limit {
        records.truncate(limit);
    }

    print!("{}", format_record_list(&records, format));
    Ok(())
}
