//! The hook-time signals, modeled as an explicit context.
//!
//! The recursion guard and skip flag live in the process environment
//! because the hook boundary is a subprocess boundary. In-process they
//! travel as this struct; the environment variables are only read at
//! startup and only re-emitted when a new git subprocess is spawned.

use crate::runner::GitRunner;

/// Set while a decree hook invocation is in flight. Any nested decree
/// process sees it and stands down.
pub const GUARD_ENV: &str = "DECREE_HOOK_RUNNING";

/// User-settable one-shot escape hatch (`DECREE_SKIP=1 git push`).
pub const SKIP_ENV: &str = "DECREE_SKIP";

#[derive(Debug, Clone, Copy, Default)]
pub struct HookContext {
    pub reentrant: bool,
    pub skip: bool,
}

impl HookContext {
    pub fn from_env() -> Self {
        Self {
            reentrant: std::env::var_os(GUARD_ENV).is_some_and(|v| !v.is_empty()),
            skip: std::env::var(SKIP_ENV).is_ok_and(|v| v == "1"),
        }
    }

    /// Whether the hook body should run at all.
    pub fn should_run(&self) -> bool {
        !self.reentrant && !self.skip
    }

    /// A runner whose subprocess tree carries the recursion guard, so
    /// nothing the hook shells out to can re-enter the hook path.
    pub fn guarded(&self, git: GitRunner) -> GitRunner {
        git.with_env(GUARD_ENV, "1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_run_gates_on_both_signals() {
        assert!(HookContext::default().should_run());
        assert!(!HookContext {
            reentrant: true,
            skip: false
        }
        .should_run());
        assert!(!HookContext {
            reentrant: false,
            skip: true
        }
        .should_run());
    }
}
