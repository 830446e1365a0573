use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid path {name:?}: must stay inside {root}")]
    PathViolation { name: String, root: PathBuf },

    #[error("Invalid branch name {0:?}")]
    InvalidBranch(String),

    #[error("Repository folder not found: {0}")]
    NotFound(PathBuf),

    #[error("Target folder is not a git repository (.git missing): {0}")]
    NotARepo(PathBuf),

    #[error("Invalid session id {0:?}; call open_repo first")]
    InvalidSession(String),

    #[error("git {} failed (exit code {}): {stderr}", .args.join(" "), exit_code_display(.code))]
    Command {
        args: Vec<String>,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Commit message cannot be empty (commit #{index})")]
    EmptyMessage { index: usize },

    #[error("git {} timed out after {secs}s", .args.join(" "))]
    Timeout { args: Vec<String>, secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GitError {
    /// Stable identifier for the error category, reported alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            GitError::Configuration(_) => "configuration",
            GitError::PathViolation { .. } => "path_violation",
            GitError::NotFound(_) => "not_found",
            GitError::NotARepo(_) => "not_a_repository",
            GitError::InvalidSession(_) => "invalid_session",
            GitError::InvalidBranch(_) => "invalid_branch",
            GitError::Command { .. } => "external_tool",
            GitError::EmptyMessage { .. } => "empty_message",
            GitError::Timeout { .. } => "timeout",
            GitError::Io(_) => "io",
        }
    }
}

fn exit_code_display(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none, terminated by signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, GitError>;
