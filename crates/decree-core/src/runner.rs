//! Subprocess wrapper around the `git` binary.
//!
//! Every git interaction in decree goes through [`GitRunner`]: plumbing
//! commands with optional stdin, a hard wall-clock timeout, and captured
//! stdout/stderr. Porcelain output is never parsed; callers stick to
//! plumbing with stable output formats.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::CoreError;

/// Default wall-clock limit for a single git invocation. Network-facing
/// operations (fetch/push) pass their own, larger limit.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Captured result of one git invocation.
#[derive(Debug)]
pub struct RunOutput {
    /// Raw stdout. Kept as bytes: container blobs are not guaranteed
    /// to be valid UTF-8 at this layer.
    pub stdout: Vec<u8>,
    /// Stderr, lossily decoded. Only ever used for diagnostics and
    /// error-signature matching.
    pub stderr: String,
    pub exit_code: i32,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout as text, lossily decoded.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// First line of stdout, trimmed. What plumbing like `rev-parse`
    /// and `hash-object` print.
    pub fn line(&self) -> String {
        self.stdout_text().trim().to_string()
    }
}

/// Runs git commands in a fixed working directory with a fixed
/// environment overlay.
#[derive(Debug, Clone)]
pub struct GitRunner {
    work_dir: PathBuf,
    env: Vec<(String, String)>,
    timeout: Duration,
}

impl GitRunner {
    /// Runner rooted at `work_dir`. Does not verify that a repository
    /// exists there; use [`GitRunner::discover`] for that.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            env: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Runner rooted at the repository containing `start_dir`.
    pub fn discover(start_dir: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let probe = Self::new(start_dir);
        let out = probe.invoke(&["rev-parse", "--show-toplevel"], None, None)?;
        if !out.success() {
            return Err(CoreError::NotARepository);
        }
        Ok(Self::new(PathBuf::from(out.line())))
    }

    /// Adds an environment variable to every invocation.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Overrides the default per-command timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Absolute path of the repository's `.git` directory.
    pub fn git_dir(&self) -> Result<PathBuf, CoreError> {
        let out = self.check(&["rev-parse", "--absolute-git-dir"])?;
        Ok(PathBuf::from(out.line()))
    }

    /// Runs git and fails unless it exits 0.
    pub fn check(&self, args: &[&str]) -> Result<RunOutput, CoreError> {
        self.check_allowing(args, &[])
    }

    /// Runs git, treating the listed non-zero exit codes as success.
    /// `config --get` exits 1 on a missing key and `config --unset`
    /// exits 5 when there was nothing to unset.
    pub fn check_allowing(&self, args: &[&str], allowed: &[i32]) -> Result<RunOutput, CoreError> {
        let out = self.invoke(args, None, None)?;
        if out.success() || allowed.contains(&out.exit_code) {
            Ok(out)
        } else {
            Err(self.process_error(args, out))
        }
    }

    /// Runs git with `stdin` piped in and fails unless it exits 0.
    pub fn check_with_stdin(&self, args: &[&str], stdin: &[u8]) -> Result<RunOutput, CoreError> {
        let out = self.invoke(args, Some(stdin), None)?;
        if out.success() {
            Ok(out)
        } else {
            Err(self.process_error(args, out))
        }
    }

    /// Spawns git and waits for it, enforcing the timeout. Exit codes
    /// are reported, not judged; callers decide what non-zero means.
    pub fn invoke(
        &self,
        args: &[&str],
        stdin: Option<&[u8]>,
        timeout: Option<Duration>,
    ) -> Result<RunOutput, CoreError> {
        let timeout = timeout.unwrap_or(self.timeout);
        let started = Instant::now();

        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(&self.work_dir)
            // Never hang on a credential prompt, and keep messages
            // parseable regardless of the user's locale.
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        tracing::trace!(?args, "running git");

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::GitNotFound
            } else {
                CoreError::Io(e)
            }
        })?;

        // Drain stdout/stderr on background threads so the child can
        // never block on a full pipe while we poll for exit.
        let child_stdout = child.stdout.take();
        let child_stderr = child.stderr.take();
        let out_handle = std::thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut stream) = child_stdout {
                let _ = stream.read_to_end(&mut buf);
            }
            buf
        });
        let err_handle = std::thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut stream) = child_stderr {
                let _ = stream.read_to_end(&mut buf);
            }
            buf
        });

        if let Some(bytes) = stdin {
            if let Some(mut pipe) = child.stdin.take() {
                // A dead child closes the pipe; the exit status carries
                // the real error, so a broken pipe here is ignored.
                let _ = pipe.write_all(bytes);
            }
        }

        let mut timed_out = false;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= timeout {
                timed_out = true;
                let _ = child.kill();
                break child.wait()?;
            }
            std::thread::sleep(Duration::from_millis(10));
        };

        let stdout = out_handle.join().unwrap_or_default();
        let stderr = String::from_utf8_lossy(&err_handle.join().unwrap_or_default()).into_owned();

        if timed_out {
            return Err(CoreError::Timeout {
                command: Self::describe(args),
                seconds: timeout.as_secs(),
            });
        }

        Ok(RunOutput {
            stdout,
            stderr,
            exit_code: status.code().unwrap_or(-1),
        })
    }

    /// `git config --get`; `None` when the key is unset.
    pub fn config_get(&self, key: &str) -> Result<Option<String>, CoreError> {
        let out = self.check_allowing(&["config", "--get", key], &[1])?;
        if out.exit_code == 1 {
            Ok(None)
        } else {
            Ok(Some(out.line()))
        }
    }

    /// All values of a multi-valued config key, in config order.
    pub fn config_get_all(&self, key: &str) -> Result<Vec<String>, CoreError> {
        let out = self.check_allowing(&["config", "--get-all", key], &[1])?;
        Ok(out
            .stdout_text()
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }

    pub fn config_set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.check(&["config", key, value])?;
        Ok(())
    }

    /// Idempotent: unsetting an absent key is not an error.
    pub fn config_unset(&self, key: &str) -> Result<(), CoreError> {
        self.check_allowing(&["config", "--unset", key], &[5])?;
        Ok(())
    }

    fn process_error(&self, args: &[&str], out: RunOutput) -> CoreError {
        CoreError::Process {
            command: Self::describe(args),
            exit_code: out.exit_code,
            stderr: out.stderr.trim().to_string(),
        }
    }

    fn describe(args: &[&str]) -> String {
        let mut command = String::from("git");
        for arg in args {
            command.push(' ');
            command.push_str(arg);
        }
        command
    }
}
