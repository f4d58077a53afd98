//! The generated pre-push hook script.

/// Bumped whenever the script template changes; `status` reports the
/// installed version so upgrades are detectable.
pub const HOOK_VERSION: &str = "1.0";

/// Ownership marker. A hook file containing this line is ours.
pub const HOOK_MARKER: &str = "# decree hook";

/// The hook slot this tool manages.
pub const HOOK_NAME: &str = "pre-push";

/// Filename suffix for the backed-up foreign hook.
pub const BACKUP_SUFFIX: &str = ".decree-backup";

/// Render the pre-push script. At push time it: bails out behind the
/// recursion guard and the skip signals, syncs for branch pushes only,
/// honors `decree.hooks.blockOnFailure`, and finally hands control to
/// any backed-up foreign hook with the original arguments and its exit
/// code as the result.
pub fn pre_push_script() -> String {
    format!(
        r#"#!/bin/sh
{HOOK_MARKER} - {HOOK_NAME}
# Version: {HOOK_VERSION}
# Installed by: decree hooks install

# Recursion guard - prevent infinite loops
[ -n "$DECREE_HOOK_RUNNING" ] && exit 0
export DECREE_HOOK_RUNNING=1

# Skip if disabled via environment
[ "$DECREE_SKIP" = "1" ] && exit 0

# Skip if disabled via config
skip=$(git config --get decree.hooks.skip 2>/dev/null)
[ "$skip" = "true" ] && exit 0

# Check if decree is available
command -v decree >/dev/null 2>&1 || {{
    printf >&2 '\ndecree not found in PATH. Hook skipped.\n'
    exit 0
}}

# Get remote name from arguments
remote="$1"

# Only sync if pushing branches (not tags)
has_branch=false
while read local_ref local_sha remote_ref remote_sha; do
    case "$remote_ref" in
        refs/heads/*) has_branch=true; break ;;
    esac
done
[ "$has_branch" = "true" ] || exit 0

# Sync records to remote (delegate to decree)
decree hook-handler {HOOK_NAME} "$remote" || {{
    # Check if blocking is enabled
    block=$(git config --get decree.hooks.blockOnFailure 2>/dev/null)
    if [ "$block" = "true" ]; then
        printf >&2 'decree: record sync failed, push blocked\n'
        exit 1
    fi
    printf >&2 'decree: record sync failed (non-blocking)\n'
}}

# Chain to backup hook if exists, its exit code is the result
backup_hook="$(dirname "$0")/{HOOK_NAME}{BACKUP_SUFFIX}"
if [ -f "$backup_hook" ]; then
    exec "$backup_hook" "$@"
fi

exit 0
"#
    )
}

/// Extract the `# Version: X.Y` line from an installed script.
pub fn installed_version(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let version = line.trim().strip_prefix("# Version: ")?;
        let mut parts = version.split('.');
        let numeric = |s: Option<&str>| {
            s.is_some_and(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
        };
        if numeric(parts.next()) && numeric(parts.next()) && parts.next().is_none() {
            Some(version.to_string())
        } else {
            None
        }
    })
}
