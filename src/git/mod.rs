// Git session orchestration: subprocess runner, session registry and the
// operations exposed as tools

pub mod commit;
pub mod diff;
pub mod error;
pub mod repository;
pub mod runner;
pub mod session;
pub mod status;

pub use commit::{CommitOutcome, CommitSpec, commit_changes};
pub use diff::{FailureKind, FileDiff, TRUNCATION_MARKER, classify_failure, get_file_diff, truncate_to_bytes};
pub use error::{GitError, Result};
pub use repository::{OpenedRepo, open_repo, resolve_repo_dir};
pub use runner::GitRunner;
pub use session::{Session, SessionRegistry};
pub use status::{ChangeScope, ChangeSet, list_changes, parse_porcelain};
