use super::error::{GitError, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// One opened repository interaction context. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: String,
    directory: PathBuf,
    branch: Option<String>,
    opened_at: DateTime<Utc>,
}

impl Session {
    /// Create a session with a freshly generated id
    pub fn new(directory: PathBuf, branch: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            directory,
            branch,
            opened_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Absolute path to the working tree
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Branch as requested at open time
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }
}

/// Process-wide mapping from session id to [`Session`].
///
/// Insert-only: entries are never mutated or removed, so concurrent readers
/// only ever observe complete sessions. There is no eviction; the map grows
/// for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a session under its id
    pub fn create(&self, session: Session) -> Arc<Session> {
        let session = Arc::new(session);
        self.sessions
            .insert(session.id().to_string(), Arc::clone(&session));
        debug!(session_id = session.id(), total = self.sessions.len(), "session registered");
        session
    }

    /// Look up a session, failing with [`GitError::InvalidSession`] if unknown
    pub fn resolve(&self, id: &str) -> Result<Arc<Session>> {
        self.sessions
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| GitError::InvalidSession(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_resolve() {
        let registry = SessionRegistry::new();
        let session = registry.create(Session::new(
            PathBuf::from("/repos/app"),
            Some("main".to_string()),
        ));

        let resolved = registry.resolve(session.id()).unwrap();
        assert_eq!(resolved.directory(), Path::new("/repos/app"));
        assert_eq!(resolved.branch(), Some("main"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve_unknown_id() {
        let registry = SessionRegistry::new();
        let err = registry.resolve("missing").unwrap_err();
        assert!(matches!(err, GitError::InvalidSession(ref id) if id == "missing"));
        assert!(err.to_string().contains("open_repo"));
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Session::new(PathBuf::from("/r"), None);
        let b = Session::new(PathBuf::from("/r"), None);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_clones_share_the_map() {
        let registry = SessionRegistry::new();
        let other = registry.clone();
        let session = registry.create(Session::new(PathBuf::from("/r"), None));
        assert!(other.resolve(session.id()).is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_inserts() {
        let registry = SessionRegistry::new();
        let mut handles = Vec::new();
        for i in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let session =
                    registry.create(Session::new(PathBuf::from(format!("/r/{i}")), None));
                registry.resolve(session.id()).unwrap().directory().to_path_buf()
            }));
        }
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), PathBuf::from(format!("/r/{i}")));
        }
        assert_eq!(registry.len(), 16);
    }
}
