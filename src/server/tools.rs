//! Typed tool records and dispatch.
//!
//! Each tool takes a JSON object of arguments, deserialized into an
//! explicit `*Args` struct (unknown fields rejected), and returns one of the
//! result records from [`crate::git`] serialized back to JSON.

use super::protocol::{McpTool, ToolAnnotations};
use crate::config::Config;
use crate::git::{self, ChangeScope, CommitSpec, GitError, GitRunner, SessionRegistry};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

pub const OPEN_REPO: &str = "open_repo";
pub const LIST_CHANGES: &str = "list_changes";
pub const GET_FILE_DIFF: &str = "get_file_diff";
pub const COMMIT_CHANGES: &str = "commit_changes";

/// Why a tool call produced no result
#[derive(Error, Debug)]
pub enum ToolCallError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode result: {0}")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Git(#[from] GitError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenRepoArgs {
    pub repo_name: String,
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenRepoResult {
    pub session_id: String,
    pub dir: String,
    pub branch: Option<String>,
    pub checked_out: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListChangesArgs {
    pub session_id: String,
    #[serde(default)]
    pub scope: ChangeScope,
    #[serde(default = "default_true")]
    pub include_diff: bool,
    #[serde(default)]
    pub max_bytes: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetFileDiffArgs {
    pub session_id: String,
    pub path: String,
    #[serde(default)]
    pub staged: bool,
    #[serde(default)]
    pub max_bytes: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommitChangesArgs {
    pub session_id: String,
    pub commits: Vec<CommitSpec>,
    #[serde(default)]
    pub signoff: bool,
}

fn default_true() -> bool {
    true
}

/// The tool handlers with their shared state: configuration, the git
/// runner and the session registry.
#[derive(Debug, Clone)]
pub struct GitCommitter {
    config: Arc<Config>,
    runner: GitRunner,
    registry: SessionRegistry,
}

impl GitCommitter {
    pub fn new(config: Config) -> Self {
        let runner = GitRunner::new(config.git.binary.clone()).with_timeout(config.git.timeout());
        Self::with_registry(config, runner, SessionRegistry::new())
    }

    pub fn with_registry(config: Config, runner: GitRunner, registry: SessionRegistry) -> Self {
        Self {
            config: Arc::new(config),
            runner,
            registry,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub async fn open_repo(&self, args: OpenRepoArgs) -> git::Result<OpenRepoResult> {
        let root = self.config.repos_root()?;
        let opened = git::open_repo(
            &self.runner,
            &self.registry,
            root,
            &self.config.checkout.default_branches,
            &args.repo_name,
            args.branch.as_deref(),
        )
        .await?;

        Ok(OpenRepoResult {
            session_id: opened.session.id().to_string(),
            dir: opened.session.directory().display().to_string(),
            branch: opened.session.branch().map(str::to_string),
            checked_out: opened.checked_out,
        })
    }

    pub async fn list_changes(&self, args: ListChangesArgs) -> git::Result<git::ChangeSet> {
        let session = self.registry.resolve(&args.session_id)?;
        let max_bytes = args.max_bytes.unwrap_or(self.config.limits.list_max_bytes);
        git::list_changes(&self.runner, &session, args.scope, args.include_diff, max_bytes).await
    }

    pub async fn get_file_diff(&self, args: GetFileDiffArgs) -> git::Result<git::FileDiff> {
        let session = self.registry.resolve(&args.session_id)?;
        let max_bytes = args.max_bytes.unwrap_or(self.config.limits.file_max_bytes);
        git::get_file_diff(&self.runner, &session, &args.path, args.staged, max_bytes).await
    }

    pub async fn commit_changes(&self, args: CommitChangesArgs) -> git::Result<git::CommitOutcome> {
        let session = self.registry.resolve(&args.session_id)?;
        git::commit_changes(&self.runner, &session, &args.commits, args.signoff).await
    }

    /// Dispatch a `tools/call` by name.
    #[instrument(skip(self, arguments))]
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ToolCallError> {
        debug!("tool call");
        match name {
            OPEN_REPO => to_value(self.open_repo(parse_args(name, arguments)?).await?),
            LIST_CHANGES => to_value(self.list_changes(parse_args(name, arguments)?).await?),
            GET_FILE_DIFF => to_value(self.get_file_diff(parse_args(name, arguments)?).await?),
            COMMIT_CHANGES => to_value(self.commit_changes(parse_args(name, arguments)?).await?),
            other => Err(ToolCallError::UnknownTool(other.to_string())),
        }
    }

    /// Catalogue returned by `tools/list`.
    pub fn tools(&self) -> Vec<McpTool> {
        let limits = &self.config.limits;
        vec![
            McpTool {
                name: OPEN_REPO.to_string(),
                description: format!(
                    "Open a local repository by name under the repos root directory and check \
                     out a branch. Without a branch these are tried in order: {}. Returns the \
                     session_id every other tool needs.",
                    self.config.checkout.default_branches.join(", ")
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "repo_name": { "type": "string", "description": "Folder name of the repository inside the repos root" },
                        "branch": { "type": ["string", "null"], "description": "Branch to check out" }
                    },
                    "required": ["repo_name"],
                    "additionalProperties": false
                }),
                annotations: Some(ToolAnnotations {
                    read_only_hint: Some(false),
                    destructive_hint: Some(false),
                    idempotent_hint: Some(false),
                }),
            },
            McpTool {
                name: LIST_CHANGES.to_string(),
                description: "List changed files and, optionally, a size-capped unified diff \
                    of the working tree or the staged changes."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "session_id": { "type": "string" },
                        "scope": { "type": "string", "enum": ["working", "staged"], "default": "working" },
                        "include_diff": { "type": "boolean", "default": true },
                        "max_bytes": { "type": "integer", "minimum": 0, "default": limits.list_max_bytes }
                    },
                    "required": ["session_id"],
                    "additionalProperties": false
                }),
                annotations: Some(read_only()),
            },
            McpTool {
                name: GET_FILE_DIFF.to_string(),
                description: "Return a unified diff for a single file. Useful when the full \
                    diff was truncated. Untracked files show as entirely added."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "session_id": { "type": "string" },
                        "path": { "type": "string", "description": "Path relative to the repository" },
                        "staged": { "type": "boolean", "default": false },
                        "max_bytes": { "type": "integer", "minimum": 0, "default": limits.file_max_bytes }
                    },
                    "required": ["session_id", "path"],
                    "additionalProperties": false
                }),
                annotations: Some(read_only()),
            },
            McpTool {
                name: COMMIT_CHANGES.to_string(),
                description: "Create one or more commits, in order. Group files logically and \
                    give each commit a message. An empty files list commits what is already staged."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "session_id": { "type": "string" },
                        "commits": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "files": { "type": "array", "items": { "type": "string" }, "default": [] },
                                    "message": { "type": "string", "minLength": 1 }
                                },
                                "required": ["message"]
                            }
                        },
                        "signoff": { "type": "boolean", "default": false }
                    },
                    "required": ["session_id", "commits"],
                    "additionalProperties": false
                }),
                annotations: Some(ToolAnnotations {
                    read_only_hint: Some(false),
                    destructive_hint: Some(false),
                    idempotent_hint: Some(false),
                }),
            },
        ]
    }
}

fn read_only() -> ToolAnnotations {
    ToolAnnotations {
        read_only_hint: Some(true),
        destructive_hint: Some(false),
        idempotent_hint: Some(true),
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(tool: &str, arguments: Value) -> Result<T, ToolCallError> {
    serde_json::from_value(arguments).map_err(|source| ToolCallError::InvalidArguments {
        tool: tool.to_string(),
        source,
    })
}

fn to_value<T: Serialize>(result: T) -> Result<Value, ToolCallError> {
    serde_json::to_value(result).map_err(ToolCallError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> GitCommitter {
        GitCommitter::new(Config::default())
    }

    #[test]
    fn test_catalogue_names() {
        let names: Vec<_> = service().tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec![OPEN_REPO, LIST_CHANGES, GET_FILE_DIFF, COMMIT_CHANGES]);
    }

    #[test]
    fn test_list_changes_defaults() {
        let args: ListChangesArgs = serde_json::from_value(json!({"session_id": "s"})).unwrap();
        assert_eq!(args.scope, ChangeScope::Working);
        assert!(args.include_diff);
        assert_eq!(args.max_bytes, None);
    }

    #[test]
    fn test_unknown_argument_rejected() {
        let err = parse_args::<GetFileDiffArgs>(
            GET_FILE_DIFF,
            json!({"session_id": "s", "path": "a", "bogus": 1}),
        )
        .unwrap_err();
        assert!(matches!(err, ToolCallError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let err = service().call_tool("push", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolCallError::UnknownTool(ref n) if n == "push"));
    }

    #[tokio::test]
    async fn test_open_repo_without_root_is_configuration_error() {
        let err = service()
            .call_tool(OPEN_REPO, json!({"repo_name": "app"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolCallError::Git(GitError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let err = service()
            .call_tool(LIST_CHANGES, json!({"session_id": "nope"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolCallError::Git(GitError::InvalidSession(_))));
    }
}
