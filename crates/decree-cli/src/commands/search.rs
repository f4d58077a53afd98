use anyhow::Result;
use clap::Args;

use decree_core::model::RecordStatus;
use decree_query::SearchOptions;

use crate::output::format::format_hits;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Treat the query as a regular expression
    #[arg(long)]
    pub regex: bool,

    /// Match case exactly
    #[arg(long)]
    pub case_sensitive: bool,

    /// Rank records with this status first (repeatable, in order)
    #[arg(long = "status")]
    pub statuses: Vec<RecordStatus>,

    /// Rank records with this tag first (repeatable, after statuses)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Maximum number of results
    #[arg(short = 'n', long, default_value = "10")]
    pub limit: usize,
}

pub fn run(args: &SearchArgs, format: OutputFormat) -> Result<()> {
    let (git, settings) = super::open_initialized()?;
    let engine = super::search_engine(&git, &settings);

    let opts = SearchOptions {
        regex: args.regex,
        case_sensitive: args.case_sensitive,
        statuses: args.statuses.clone(),
        tags: args.tags.clone(),
        limit: Some(args.limit),
    };
    let hits = engine.search(&args.query, &opts)?;

    if hits.is_empty() {
        eprintln!("No results found for: {}", args.query);
        return Ok(());
    }
    print!("{}", format_hits(&hits, format));
    Ok(())
}
