use super::diff::truncate_to_bytes;
use super::error::Result;
use super::runner::GitRunner;
use super::session::Session;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Which tree state a change listing inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeScope {
    /// Working tree against the index
    #[default]
    Working,
    /// Index against HEAD
    Staged,
}

impl ChangeScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeScope::Working => "working",
            ChangeScope::Staged => "staged",
        }
    }
}

/// Changed files of a session plus an optional combined diff
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeSet {
    pub files: Vec<String>,
    pub scope: ChangeScope,
    pub diff: Option<String>,
    #[serde(rename = "diff_truncated")]
    pub truncated: bool,
}

/// Extract the changed paths from `git status --porcelain=v1` output.
///
/// The path is the last whitespace-separated token of each line, which for
/// a rename (`R  old -> new`) is the destination. Duplicates are dropped,
/// keeping first-seen order.
pub fn parse_porcelain(output: &str) -> Vec<String> {
    let mut files: Vec<String> = Vec::new();
    for line in output.lines() {
        let Some(path) = line.split_whitespace().last() else {
            continue;
        };
        if !files.iter().any(|f| f == path) {
            files.push(path.to_string());
        }
    }
    files
}

/// List changed files and, optionally, a size-capped unified diff for `scope`.
#[instrument(skip(runner, session), fields(session_id = session.id()))]
pub async fn list_changes(
    runner: &GitRunner,
    session: &Session,
    scope: ChangeScope,
    include_diff: bool,
    max_bytes: usize,
) -> Result<ChangeSet> {
    let dir = session.directory();

    let porcelain = runner
        .run(&["status", "--porcelain=v1", "--renames"], dir)
        .await?;
    let files = parse_porcelain(&porcelain);

    let mut diff = None;
    let mut truncated = false;
    if include_diff && !files.is_empty() {
        let mut args = vec!["diff", "--unified=3"];
        if scope == ChangeScope::Staged {
            args.push("--staged");
        }
        let text = runner.run(&args, dir).await?;
        let (text, cut) = truncate_to_bytes(text, max_bytes);
        diff = Some(text);
        truncated = cut;
    }

    Ok(ChangeSet {
        files,
        scope,
        diff,
        truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_porcelain_basic() {
        let output = " M src/lib.rs\nA  new.txt\n?? untracked.txt\n";
        assert_eq!(
            parse_porcelain(output),
            vec!["src/lib.rs", "new.txt", "untracked.txt"]
        );
    }

    #[test]
    fn test_parse_porcelain_rename_takes_destination() {
        let output = "R  old.txt -> new.txt\n";
        assert_eq!(parse_porcelain(output), vec!["new.txt"]);
    }

    #[test]
    fn test_parse_porcelain_dedup_keeps_first_seen_order() {
        let output = " M b.txt\nR  a.txt -> b.txt\n M c.txt\n?? b.txt\n";
        assert_eq!(parse_porcelain(output), vec!["b.txt", "c.txt"]);
    }

    #[test]
    fn test_parse_porcelain_skips_blank_lines() {
        assert!(parse_porcelain("").is_empty());
        assert_eq!(parse_porcelain("\n   \n M x\n"), vec!["x"]);
    }

    #[test]
    fn test_scope_serde() {
        assert_eq!(serde_json::to_string(&ChangeScope::Staged).unwrap(), "\"staged\"");
        let scope: ChangeScope = serde_json::from_str("\"working\"").unwrap();
        assert_eq!(scope, ChangeScope::Working);
        assert!(serde_json::from_str::<ChangeScope>("\"head\"").is_err());
        assert_eq!(ChangeScope::default().as_str(), "working");
    }
}
