use std::time::Duration;

use anyhow::Result;
use clap::Args;

use decree_core::config;
use decree_core::hooks::HookContext;
use decree_protocol::SyncEngine;

#[derive(Args)]
pub struct HookHandlerArgs {
    /// The hook name (only pre-push is handled)
    pub hook_name: String,

    /// Remote name passed by git to the hook
    pub remote: Option<String>,
}

/// Invoked by the generated hook script, never by users. The script
/// already checks the guard and skip signals; they are re-checked here
/// so a direct invocation behaves the same. Errors propagate as a
/// nonzero exit and the script decides whether that blocks the push.
pub fn run(args: &HookHandlerArgs) -> Result<()> {
    if args.hook_name != "pre-push" {
        tracing::debug!(hook = %args.hook_name, "unhandled hook, ignoring");
        return Ok(());
    }

    let context = HookContext::from_env();
    if !context.should_run() {
        return Ok(());
    }

    let (git, settings) = super::open()?;
    if settings.hook_skip || !config::is_initialized(&git)? {
        return Ok(());
    }

    let remote = args.remote.clone().unwrap_or_else(|| settings.remote.clone());
    let refs = super::sync_refs(&settings)?;
    let engine = SyncEngine::new(
        context.guarded(git),
        Duration::from_secs(settings.hook_timeout_secs()),
    );
    engine.push(&remote, &refs, false)?;
    Ok(())
}
