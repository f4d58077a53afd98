use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod output;

#[derive(Parser)]
#[command(
    name = "decree",
    version,
    about = "Decision records as Git-native versioned data"
)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: output::OutputFormat,

    #[command(subcommand)]
    command: commands::Commands,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        commands::Commands::Init(args) => commands::init::run(args),
        commands::Commands::New(args) => commands::new::run(args),
        commands::Commands::Show(args) => commands::show::run(args, cli.format),
        commands::Commands::List(args) => commands::list::run(args, cli.format),
        commands::Commands::Rm(args) => commands::rm::run(args),
        commands::Commands::Search(args) => commands::search::run(args, cli.format),
        commands::Commands::Reindex(args) => commands::reindex::run(args),
        commands::Commands::Push(args) => commands::push::run(args),
        commands::Commands::Pull(args) => commands::pull::run(args),
        commands::Commands::Sync(args) => commands::sync::run(args),
        commands::Commands::Hooks(args) => commands::hooks::run(args),
        commands::Commands::HookHandler(args) => commands::hook_handler::run(args),
        commands::Commands::Version => commands::version::run(),
    }
}
