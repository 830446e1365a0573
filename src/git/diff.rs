use super::error::{GitError, Result};
use super::repository::contained_path;
use super::runner::GitRunner;
use super::session::Session;
use serde::Serialize;
use tracing::{debug, instrument};

/// Appended to a diff that was cut to fit the byte budget
pub const TRUNCATION_MARKER: &str = "\n[diff truncated]";

/// Lines of context in every unified diff we produce
const UNIFIED_CONTEXT: &str = "--unified=3";

/// Unified diff for a single path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileDiff {
    pub path: String,
    pub diff: Option<String>,
    #[serde(rename = "diff_truncated")]
    pub truncated: bool,
}

/// Category of a failed git invocation, derived from its diagnostic text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// git does not know the path (e.g. a brand-new untracked file)
    UnknownPath,
    Other,
}

/// Classify a git failure using only its stderr wording.
///
/// git offers no structured error codes for this, so these substrings are
/// the single place to update if its messages change.
pub fn classify_failure(err: &GitError) -> FailureKind {
    const UNKNOWN_PATH_MARKERS: [&str; 2] = ["is outside repository", "ambiguous argument"];

    match err {
        GitError::Command { stderr, .. }
            if UNKNOWN_PATH_MARKERS.iter().any(|m| stderr.contains(m)) =>
        {
            FailureKind::UnknownPath
        }
        _ => FailureKind::Other,
    }
}

/// Cap `text` at `max_bytes` of UTF-8.
///
/// Oversized text is cut at the last character boundary that fits, so a
/// partial multi-byte sequence is dropped rather than split, and
/// [`TRUNCATION_MARKER`] is appended. Returns the text and whether it was cut.
pub fn truncate_to_bytes(text: String, max_bytes: usize) -> (String, bool) {
    if text.len() <= max_bytes {
        return (text, false);
    }

    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    let mut truncated = String::with_capacity(end + TRUNCATION_MARKER.len());
    truncated.push_str(&text[..end]);
    truncated.push_str(TRUNCATION_MARKER);
    (truncated, true)
}

/// Fetch the unified diff of one file.
///
/// `staged = false` compares the working tree against the index,
/// `staged = true` the index against HEAD. Files git does not track yet are
/// diffed against an empty input, so every line shows as added. Paths that
/// resolve outside the repository fail with [`GitError::PathViolation`].
#[instrument(skip(runner, session), fields(session_id = session.id()))]
pub async fn get_file_diff(
    runner: &GitRunner,
    session: &Session,
    path: &str,
    staged: bool,
    max_bytes: usize,
) -> Result<FileDiff> {
    let dir = session.directory();

    let mut args = vec!["diff", UNIFIED_CONTEXT];
    if staged {
        args.push("--staged");
    }
    args.extend(["--", path]);

    let text = match runner.run(&args, dir).await {
        Ok(text) => text,
        Err(e) if classify_failure(&e) == FailureKind::UnknownPath => {
            debug!(path, error = %e, "path unknown to git, diffing against empty input");
            diff_against_empty(runner, session, path).await?
        }
        Err(e) => return Err(e),
    };

    // `git diff -- <path>` succeeds silently for untracked files
    let text = if text.is_empty() && !staged && is_untracked(runner, session, path).await? {
        debug!(path, "path is untracked, diffing against empty input");
        diff_against_empty(runner, session, path).await?
    } else {
        text
    };

    let (diff, truncated) = truncate_to_bytes(text, max_bytes);

    Ok(FileDiff {
        path: path.to_string(),
        diff: (!diff.is_empty()).then_some(diff),
        truncated,
    })
}

async fn is_untracked(runner: &GitRunner, session: &Session, path: &str) -> Result<bool> {
    let out = runner
        .run(
            &["ls-files", "--others", "--exclude-standard", "--", path],
            session.directory(),
        )
        .await?;
    Ok(!out.trim().is_empty())
}

async fn diff_against_empty(runner: &GitRunner, session: &Session, path: &str) -> Result<String> {
    // --no-index reads any file, so keep it to the working tree
    if contained_path(session.directory(), path).is_none() {
        return Err(GitError::PathViolation {
            name: path.to_string(),
            root: session.directory().to_path_buf(),
        });
    }

    // --no-index exits with 1 when the inputs differ
    runner
        .run_allowing(
            &["diff", "--no-index", UNIFIED_CONTEXT, "--", "/dev/null", path],
            session.directory(),
            &[1],
        )
        .await
}
