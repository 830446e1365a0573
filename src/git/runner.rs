//! Invocation boundary around the external `git` binary.
//!
//! Every operation in this crate talks to git exclusively through
//! [`GitRunner`]. Each call is a single attempt: the process is spawned with
//! an argument vector (never through a shell), awaited to completion and its
//! output captured. Non-zero exit codes become [`GitError::Command`].

use super::error::{GitError, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs git subcommands inside a working directory.
#[derive(Clone, Debug)]
pub struct GitRunner {
    binary: String,
    timeout: Option<Duration>,
}

impl GitRunner {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            timeout: None,
        }
    }

    /// Kill git and fail with [`GitError::Timeout`] once `timeout` elapses.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Run `git <args>` in `dir` and return stdout when it exits with 0.
    pub async fn run<S: AsRef<str>>(&self, args: &[S], dir: &Path) -> Result<String> {
        self.run_allowing(args, dir, &[]).await
    }

    /// Like [`GitRunner::run`], but also treats the exit codes in `ok_codes` as success.
    pub async fn run_allowing<S: AsRef<str>>(
        &self,
        args: &[S],
        dir: &Path,
        ok_codes: &[i32],
    ) -> Result<String> {
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        debug!(binary = %self.binary, ?args, cwd = %dir.display(), "running git");

        let mut cmd = Command::new(&self.binary);
        cmd.args(&args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
                Ok(output) => output?,
                Err(_) => {
                    warn!(?args, secs = limit.as_secs(), "git timed out");
                    return Err(GitError::Timeout {
                        args,
                        secs: limit.as_secs(),
                    });
                }
            },
            None => cmd.output().await?,
        };

        let code = output.status.code();
        let accepted = output.status.success() || code.is_some_and(|c| ok_codes.contains(&c));
        if !accepted {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(?args, ?code, %stderr, "git exited with failure");
            return Err(GitError::Command { args, code, stderr });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for GitRunner {
    fn default() -> Self {
        Self::new("git")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_run_success_returns_stdout() {
        let temp_dir = TempDir::new().unwrap();
        let runner = GitRunner::default();
        let out = runner.run(&["--version"], temp_dir.path()).await.unwrap();
        assert!(out.starts_with("git version"));
    }

    #[tokio::test]
    async fn test_run_failure_carries_code_and_stderr() {
        let temp_dir = TempDir::new().unwrap();
        let runner = GitRunner::default();

        // Not a repository, so rev-parse fails
        let err = runner
            .run(&["rev-parse", "HEAD"], temp_dir.path())
            .await
            .unwrap_err();

        match err {
            GitError::Command { args, code, stderr } => {
                assert_eq!(args, vec!["rev-parse", "HEAD"]);
                assert!(code.is_some_and(|c| c != 0));
                assert!(!stderr.is_empty());
                assert_eq!(stderr, stderr.trim());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_allowing_accepts_extra_codes() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.txt"), "a\n").unwrap();
        std::fs::write(temp_dir.path().join("b.txt"), "b\n").unwrap();
        let runner = GitRunner::default();

        // --no-index exits 1 when the files differ
        let args = ["diff", "--no-index", "a.txt", "b.txt"];
        assert!(runner.run(&args, temp_dir.path()).await.is_err());
        let out = runner
            .run_allowing(&args, temp_dir.path(), &[1])
            .await
            .unwrap();
        assert!(out.contains("+b"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let runner = GitRunner::new("definitely-not-a-git-binary");
        let err = runner.run(&["status"], temp_dir.path()).await.unwrap_err();
        assert_eq!(err.kind(), "io");
    }
}
