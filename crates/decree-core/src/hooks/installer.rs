//! Install/uninstall of the pre-push hook.
//!
//! One state machine per hook slot. A foreign hook is never destroyed:
//! install copies it byte-for-byte to `<hook>.decree-backup` first and
//! the generated script chains to the backup; uninstall restores it
//! verbatim.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::hooks::script::{
    installed_version, pre_push_script, BACKUP_SUFFIX, HOOK_MARKER, HOOK_NAME,
};
use crate::runner::GitRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    Absent,
    OursOnly,
    OursWithBackup,
    ForeignOnly,
}

/// What `status` reports upward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookStatus {
    pub state: HookState,
    /// Version embedded in the installed script, when it is ours.
    pub version: Option<String>,
    pub backup_present: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    InstalledWithBackup,
    AlreadyInstalled,
    Reinstalled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UninstallOutcome {
    Removed,
    RemovedAndRestored,
    NotInstalled,
    /// The installed hook is not ours; left untouched.
    ForeignPresent,
}

pub struct HookManager {
    hooks_dir: PathBuf,
}

impl HookManager {
    pub fn new(git_dir: &Path) -> Self {
        Self {
            hooks_dir: git_dir.join("hooks"),
        }
    }

    /// Manager for the repository the runner is rooted at.
    pub fn for_repo(git: &GitRunner) -> Result<Self, CoreError> {
        Ok(Self::new(&git.git_dir()?))
    }

    fn hook_path(&self) -> PathBuf {
        self.hooks_dir.join(HOOK_NAME)
    }

    fn backup_path(&self) -> PathBuf {
        self.hooks_dir.join(format!("{HOOK_NAME}{BACKUP_SUFFIX}"))
    }

    pub fn state(&self) -> Result<HookState, CoreError> {
        let hook_path = self.hook_path();
        if !hook_path.exists() {
            return Ok(HookState::Absent);
        }
        let content = fs::read_to_string(&hook_path)?;
        if !content.contains(HOOK_MARKER) {
            return Ok(HookState::ForeignOnly);
        }
        if self.backup_path().exists() {
            Ok(HookState::OursWithBackup)
        } else {
            Ok(HookState::OursOnly)
        }
    }

    pub fn status(&self) -> Result<HookStatus, CoreError> {
        let state = self.state()?;
        let version = match state {
            HookState::OursOnly | HookState::OursWithBackup => {
                installed_version(&fs::read_to_string(self.hook_path())?)
            }
            _ => None,
        };
        Ok(HookStatus {
            state,
            version,
            backup_present: self.backup_path().exists(),
        })
    }

    pub fn install(&self, force: bool) -> Result<InstallOutcome, CoreError> {
        fs::create_dir_all(&self.hooks_dir)?;

        let outcome = match self.state()? {
            HookState::Absent => {
                self.write_script()?;
                InstallOutcome::Installed
            }
            HookState::ForeignOnly => {
                self.backup_existing()?;
                self.write_script()?;
                InstallOutcome::InstalledWithBackup
            }
            HookState::OursOnly | HookState::OursWithBackup if !force => {
                InstallOutcome::AlreadyInstalled
            }
            // Reinstalling our own hook never creates a second backup.
            HookState::OursOnly | HookState::OursWithBackup => {
                self.write_script()?;
                InstallOutcome::Reinstalled
            }
        };
        Ok(outcome)
    }

    pub fn uninstall(&self) -> Result<UninstallOutcome, CoreError> {
        let outcome = match self.state()? {
            HookState::Absent => UninstallOutcome::NotInstalled,
            HookState::ForeignOnly => UninstallOutcome::ForeignPresent,
            HookState::OursOnly => {
                fs::remove_file(self.hook_path())?;
                UninstallOutcome::Removed
            }
            HookState::OursWithBackup => {
                fs::remove_file(self.hook_path())?;
                fs::rename(self.backup_path(), self.hook_path())?;
                UninstallOutcome::RemovedAndRestored
            }
        };
        Ok(outcome)
    }

    fn write_script(&self) -> Result<(), CoreError> {
        let hook_path = self.hook_path();
        fs::write(&hook_path, pre_push_script())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&hook_path, fs::Permissions::from_mode(0o755))?;
        }
        Ok(())
    }

    /// Copy (not move) the foreign hook to the backup path, preserving
    /// its permissions. Copying keeps the replacement a single write of
    /// the hook file itself.
    fn backup_existing(&self) -> Result<(), CoreError> {
        let backup_path = self.backup_path();
        if backup_path.exists() {
            return Ok(());
        }
        let hook_path = self.hook_path();
        fs::copy(&hook_path, &backup_path)?;
        let mode = fs::metadata(&hook_path)?.permissions();
        fs::set_permissions(&backup_path, mode)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager() -> (TempDir, HookManager) {
        let tmp = TempDir::new().unwrap();
        let manager = HookManager::new(tmp.path());
        (tmp, manager)
    }

    #[test]
    fn test_install_into_empty_slot() {
        let (_tmp, manager) = manager();
        assert_eq!(manager.state().unwrap(), HookState::Absent);

        assert_eq!(manager.install(false).unwrap(), InstallOutcome::Installed);
        assert_eq!(manager.state().unwrap(), HookState::OursOnly);

        let status = manager.status().unwrap();
        assert_eq!(status.version.as_deref(), Some(super::super::HOOK_VERSION));
        assert!(!status.backup_present);
    }

    #[test]
    fn test_install_backs_up_foreign_hook_byte_identical() {
        let (tmp, manager) = manager();
        let hooks_dir = tmp.path().join("hooks");
        fs::create_dir_all(&hooks_dir).unwrap();
        let foreign = b"#!/bin/sh\necho original\nexit 3\n";
        fs::write(hooks_dir.join("pre-push"), foreign).unwrap();

        assert_eq!(
            manager.install(false).unwrap(),
            InstallOutcome::InstalledWithBackup
        );
        assert_eq!(manager.state().unwrap(), HookState::OursWithBackup);

        let backup = fs::read(hooks_dir.join("pre-push.decree-backup")).unwrap();
        assert_eq!(backup, foreign);

        // The new script chains to the backup.
        let script = fs::read_to_string(hooks_dir.join("pre-push")).unwrap();
        assert!(script.contains("pre-push.decree-backup"));
    }

    #[test]
    fn test_repeated_install_needs_force_and_keeps_backup() {
        let (tmp, manager) = manager();
        let hooks_dir = tmp.path().join("hooks");
        fs::create_dir_all(&hooks_dir).unwrap();
        fs::write(hooks_dir.join("pre-push"), "#!/bin/sh\necho original\n").unwrap();

        manager.install(false).unwrap();
        let backup_before = fs::read(hooks_dir.join("pre-push.decree-backup")).unwrap();

        assert_eq!(
            manager.install(false).unwrap(),
            InstallOutcome::AlreadyInstalled
        );
        assert_eq!(manager.install(true).unwrap(), InstallOutcome::Reinstalled);

        // Force reinstall must not snapshot our own script over the
        // foreign backup.
        let backup_after = fs::read(hooks_dir.join("pre-push.decree-backup")).unwrap();
        assert_eq!(backup_before, backup_after);
    }

    #[test]
    fn test_uninstall_restores_foreign_hook_verbatim() {
        let (tmp, manager) = manager();
        let hooks_dir = tmp.path().join("hooks");
        fs::create_dir_all(&hooks_dir).unwrap();
        let foreign = b"#!/bin/sh\necho original\n";
        fs::write(hooks_dir.join("pre-push"), foreign).unwrap();

        manager.install(false).unwrap();
        assert_eq!(
            manager.uninstall().unwrap(),
            UninstallOutcome::RemovedAndRestored
        );
        assert_eq!(manager.state().unwrap(), HookState::ForeignOnly);
        assert_eq!(fs::read(hooks_dir.join("pre-push")).unwrap(), foreign);
        assert!(!hooks_dir.join("pre-push.decree-backup").exists());
    }

    #[test]
    fn test_uninstall_edge_states() {
        let (tmp, manager) = manager();
        assert_eq!(manager.uninstall().unwrap(), UninstallOutcome::NotInstalled);

        let hooks_dir = tmp.path().join("hooks");
        fs::create_dir_all(&hooks_dir).unwrap();
        fs::write(hooks_dir.join("pre-push"), "#!/bin/sh\necho mine\n").unwrap();
        assert_eq!(
            manager.uninstall().unwrap(),
            UninstallOutcome::ForeignPresent
        );
        // Untouched.
        assert!(hooks_dir.join("pre-push").exists());
    }
}
