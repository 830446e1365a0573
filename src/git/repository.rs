use super::error::{GitError, Result};
use super::runner::GitRunner;
use super::session::{Session, SessionRegistry};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Outcome of opening a repository
#[derive(Debug, Clone)]
pub struct OpenedRepo {
    pub session: Arc<Session>,
    /// Branch that was actually checked out, after default-branch resolution
    pub checked_out: Option<String>,
}

/// Resolve `repo_name` under `root` and verify it is a git working tree.
///
/// The resolved path must be `root` itself or lie beneath it. Paths that do
/// not exist cannot be canonicalized, so they are folded lexically instead;
/// an escape attempt is therefore reported before a missing folder.
pub fn resolve_repo_dir(root: &Path, repo_name: &str) -> Result<PathBuf> {
    let root = root.canonicalize().map_err(|e| {
        GitError::Configuration(format!(
            "repos root {} is not accessible: {e}",
            root.display()
        ))
    })?;

    let Some(target) = contained_path(&root, repo_name) else {
        return Err(GitError::PathViolation {
            name: repo_name.to_string(),
            root,
        });
    };

    if !target.is_dir() {
        return Err(GitError::NotFound(target));
    }
    if !target.join(".git").is_dir() {
        return Err(GitError::NotARepo(target));
    }

    Ok(target)
}

/// `base.join(relative)` resolved, or `None` if it lands outside `base`.
///
/// `base` must already be canonical.
pub(crate) fn contained_path(base: &Path, relative: &str) -> Option<PathBuf> {
    let joined = base.join(relative);
    let target = joined
        .canonicalize()
        .unwrap_or_else(|_| normalize_lexically(&joined));

    // Path::starts_with compares whole components, so "/repos-other"
    // does not count as being inside "/repos".
    target.starts_with(base).then_some(target)
}

/// Reject branch names git would parse as an option
fn validate_branch(branch: &str) -> Result<()> {
    if branch.trim().is_empty() || branch.starts_with('-') {
        return Err(GitError::InvalidBranch(branch.to_string()));
    }
    Ok(())
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Open a repository by name under `root`, check out a branch and register a session.
///
/// When `branch` is absent each entry of `default_branches` is tried in
/// order and the first successful checkout wins. No session is created if
/// every checkout fails.
#[instrument(skip(runner, registry, root, default_branches), fields(root = %root.display()))]
pub async fn open_repo(
    runner: &GitRunner,
    registry: &SessionRegistry,
    root: &Path,
    default_branches: &[String],
    repo_name: &str,
    branch: Option<&str>,
) -> Result<OpenedRepo> {
    let dir = resolve_repo_dir(root, repo_name)?;

    let checked_out = match branch {
        Some(branch) => {
            validate_branch(branch)?;
            // The trailing "--" keeps git from reading the name as a file path
            runner.run(&["checkout", branch, "--"], &dir).await?;
            Some(branch.to_string())
        }
        None => checkout_default(runner, &dir, default_branches).await?,
    };

    let session = registry.create(Session::new(dir, branch.map(str::to_string)));
    info!(
        session_id = session.id(),
        dir = %session.directory().display(),
        checked_out = checked_out.as_deref().unwrap_or("<current>"),
        "repository opened"
    );

    Ok(OpenedRepo {
        session,
        checked_out,
    })
}

async fn checkout_default(
    runner: &GitRunner,
    dir: &Path,
    candidates: &[String],
) -> Result<Option<String>> {
    if candidates.is_empty() {
        runner.run(&["checkout"], dir).await?;
        return Ok(None);
    }

    let mut last_err = None;
    for candidate in candidates {
        validate_branch(candidate)?;
        match runner.run(&["checkout", candidate.as_str(), "--"], dir).await {
            Ok(_) => return Ok(Some(candidate.clone())),
            Err(e @ GitError::Command { .. }) => {
                debug!(branch = %candidate, error = %e, "default branch checkout failed");
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    // candidates is non-empty, so at least one error was recorded
    Err(last_err.unwrap_or_else(|| GitError::Configuration("no default branches".into())))
}
