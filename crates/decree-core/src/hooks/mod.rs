pub mod context;
pub mod installer;
pub mod script;

pub use context::{HookContext, GUARD_ENV, SKIP_ENV};
pub use installer::{HookManager, HookState, HookStatus, InstallOutcome, UninstallOutcome};
pub use script::{HOOK_MARKER, HOOK_NAME, HOOK_VERSION};
