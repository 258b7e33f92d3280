//! Explicit session state
//!
//! The signed-in user is held by a [`Session`] created at startup and handed
//! to the [`crate::app::App`]. Reads and writes go through a
//! [`SessionStore`]; nothing reads login state from ambient globals.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{MedflowError, Result};

/// A signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub display_name: String,
    pub logged_in_at: DateTime<Utc>,
}

/// Where session state lives between runs
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the stored session, if any
    async fn load(&self) -> Result<Option<SessionState>>;

    /// Persist `state`; `None` clears it
    async fn save(&self, state: Option<&SessionState>) -> Result<()>;
}

/// Session store that forgets everything when dropped
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    state: RwLock<Option<SessionState>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<SessionState>> {
        Ok(self.state.read().await.clone())
    }

    async fn save(&self, state: Option<&SessionState>) -> Result<()> {
        *self.state.write().await = state.cloned();
        Ok(())
    }
}

/// Session store backed by a JSON file
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<SessionState>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, state: Option<&SessionState>) -> Result<()> {
        match state {
            Some(state) => {
                if let Some(parent) = self.path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&self.path, serde_json::to_vec_pretty(state)?).await?;
            }
            None => match tokio::fs::remove_file(&self.path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }
}

/// The current user's session
pub struct Session {
    store: Arc<dyn SessionStore>,
    current: RwLock<Option<SessionState>>,
}

impl Session {
    /// Open a session, restoring whatever the store holds
    pub async fn open(store: Arc<dyn SessionStore>) -> Result<Self> {
        let current = store.load().await?;
        Ok(Self {
            store,
            current: RwLock::new(current),
        })
    }

    /// Session that starts signed out and is never persisted
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(MemorySessionStore::new()),
            current: RwLock::new(None),
        }
    }

    /// Sign in as `display_name`
    pub async fn login(&self, display_name: &str) -> Result<SessionState> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(MedflowError::Session(
                "display name must not be empty".to_string(),
            ));
        }

        let state = SessionState {
            display_name: display_name.to_string(),
            logged_in_at: Utc::now(),
        };
        let mut current = self.current.write().await;
        self.store.save(Some(&state)).await?;
        *current = Some(state.clone());
        info!("session started");
        Ok(state)
    }

    /// Sign out
    pub async fn logout(&self) -> Result<()> {
        let mut current = self.current.write().await;
        self.store.save(None).await?;
        *current = None;
        info!("session ended");
        Ok(())
    }

    pub async fn is_logged_in(&self) -> bool {
        self.current.read().await.is_some()
    }

    pub async fn current(&self) -> Option<SessionState> {
        self.current.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_session_login_logout() {
        let session = Session::in_memory();
        assert!(!session.is_logged_in().await);

        let state = session.login("  Sam ").await.unwrap();
        assert_eq!(state.display_name, "Sam");
        assert!(session.is_logged_in().await);

        session.logout().await.unwrap();
        assert!(session.current().await.is_none());
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let session = Session::in_memory();
        let err = session.login("   ").await.unwrap_err();
        assert!(matches!(err, MedflowError::Session(_)));
        assert!(!session.is_logged_in().await);
    }

    #[tokio::test]
    async fn test_file_session_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(&path));
        let session = Session::open(store.clone()).await.unwrap();
        session.login("Riley").await.unwrap();

        let reopened = Session::open(store.clone()).await.unwrap();
        assert_eq!(reopened.current().await.unwrap().display_name, "Riley");

        reopened.logout().await.unwrap();
        assert!(!path.exists());
        assert!(!Session::open(store).await.unwrap().is_logged_in().await);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not json").unwrap();
        let store = Arc::new(FileSessionStore::new(file.path()));
        assert!(matches!(
            Session::open(store).await,
            Err(MedflowError::Serialization(_))
        ));
    }
}
