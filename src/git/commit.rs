use super::error::{GitError, Result};
use super::runner::GitRunner;
use super::session::Session;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// One commit to create: the paths to stage and its message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSpec {
    /// Paths to stage first; empty commits whatever is already staged
    #[serde(default)]
    pub files: Vec<String>,
    pub message: String,
}

impl CommitSpec {
    pub fn new<I, S>(files: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            message: message.into(),
        }
    }
}

/// Full hashes of the created commits, in input order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CommitOutcome {
    pub commits: Vec<String>,
}

/// Create one commit per [`CommitSpec`], in order.
///
/// Stops at the first failure and returns that error. Commits created
/// before the failure stay in the repository.
#[instrument(skip(runner, session, specs), fields(session_id = session.id(), count = specs.len()))]
pub async fn commit_changes(
    runner: &GitRunner,
    session: &Session,
    specs: &[CommitSpec],
    signoff: bool,
) -> Result<CommitOutcome> {
    let dir = session.directory();
    let mut outcome = CommitOutcome::default();

    for (index, spec) in specs.iter().enumerate() {
        if spec.message.trim().is_empty() {
            return Err(GitError::EmptyMessage { index });
        }

        if !spec.files.is_empty() {
            let mut args = vec!["add", "--"];
            args.extend(spec.files.iter().map(String::as_str));
            runner.run(&args, dir).await?;
        }

        let mut args = vec!["commit", "-m", spec.message.as_str()];
        if signoff {
            args.push("--signoff");
        }
        runner.run(&args, dir).await?;

        let sha = runner.run(&["rev-parse", "HEAD"], dir).await?;
        let sha = sha.trim().to_string();
        info!(index, %sha, "commit created");
        outcome.commits.push(sha);
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_spec_deserialize_defaults_files() {
        let spec: CommitSpec = serde_json::from_str(r#"{"message": "fix"}"#).unwrap();
        assert!(spec.files.is_empty());
        assert_eq!(spec.message, "fix");
    }

    #[test]
    fn test_commit_spec_requires_message() {
        assert!(serde_json::from_str::<CommitSpec>(r#"{"files": ["a"]}"#).is_err());
    }

    #[tokio::test]
    async fn test_blank_message_rejected_before_git_runs() {
        // The directory does not exist, so any git call would fail with Io
        let session = Session::new("/nonexistent/repo".into(), None);
        let runner = GitRunner::default();
        let specs = [CommitSpec::new(["a.txt"], "   \n\t")];

        let err = commit_changes(&runner, &session, &specs, false)
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::EmptyMessage { index: 0 }));
    }
}
