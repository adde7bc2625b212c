//! Session persistence.
//!
//! The admission procedure only sees the [`SessionStore`] trait, so the medium
//! can be swapped without touching it. Stores hold the session as JSON under a
//! fixed [`StorageKey`]. Reads never fail: absent or undecodable data is
//! treated as "no session".

use async_trait::async_trait;
use rootcause::Report;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::SessionStoreError;
use crate::session::{Session, StorageKey};

/// Trait for persisting the current session.
///
/// One store serves a single client; concurrent writers follow last writer
/// wins.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists the session, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be serialized or written.
    async fn save(&self, session: &Session) -> Result<(), Report<SessionStoreError>>;

    /// Returns the persisted session, or `None` if there is none or it is
    /// unreadable.
    async fn load(&self) -> Option<Session>;

    /// Removes the persisted session. Clearing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage medium rejects the removal.
    async fn clear(&self) -> Result<(), Report<SessionStoreError>>;
}

fn encode_session(session: &Session) -> Result<Vec<u8>, Report<SessionStoreError>> {
    serde_json::to_vec_pretty(session).map_err(|e| {
        SessionStoreError::Serialization {
            details: e.to_string(),
        }
        .into()
    })
}

fn decode_session(key: &StorageKey, bytes: &[u8]) -> Option<Session> {
    match serde_json::from_slice(bytes) {
        Ok(session) => Some(session),
        Err(e) => {
            warn!(key = %key, error = %e, "Discarding unreadable stored session");
            None
        }
    }
}

/// In-process session store.
///
/// Holds the encoded form rather than the `Session` value so that decoding
/// behaves exactly as it does for persistent media.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    key: StorageKey,
    data: Mutex<Option<Vec<u8>>>,
}

impl MemorySessionStore {
    /// Creates an empty store under the default key.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with raw stored bytes.
    #[must_use]
    pub fn with_raw(key: StorageKey, raw: impl Into<Vec<u8>>) -> Self {
        Self {
            key,
            data: Mutex::new(Some(raw.into())),
        }
    }

    /// Returns the raw stored bytes, if any.
    pub async fn raw(&self) -> Option<Vec<u8>> {
        self.data.lock().await.clone()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, session: &Session) -> Result<(), Report<SessionStoreError>> {
        let bytes = encode_session(session)?;
        *self.data.lock().await = Some(bytes);
        Ok(())
    }

    async fn load(&self) -> Option<Session> {
        let data = self.data.lock().await;
        data.as_deref()
            .and_then(|bytes| decode_session(&self.key, bytes))
    }

    async fn clear(&self) -> Result<(), Report<SessionStoreError>> {
        *self.data.lock().await = None;
        Ok(())
    }
}

/// File-backed session store.
///
/// The session lives in `<dir>/<key>.json`. Writes go to a temporary file in
/// the same directory and are renamed into place.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
    key: StorageKey,
}

impl FileSessionStore {
    /// Creates a store rooted at `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, key: StorageKey) -> Self {
        Self {
            dir: dir.into(),
            key,
        }
    }

    /// Returns the path of the session file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.key))
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(format!(".{}.json.tmp", self.key))
    }

    fn io_error(&self, err: &std::io::Error, path: &Path) -> Report<SessionStoreError> {
        SessionStoreError::Io {
            key: self.key.to_string(),
            details: format!("{}: {err}", path.display()),
        }
        .into()
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save(&self, session: &Session) -> Result<(), Report<SessionStoreError>> {
        let bytes = encode_session(session)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| self.io_error(&e, &self.dir))?;

        let temp = self.temp_path();
        let path = self.path();
        let written = match tokio::fs::write(&temp, &bytes).await {
            Ok(()) => tokio::fs::rename(&temp, &path)
                .await
                .map_err(|e| self.io_error(&e, &path)),
            Err(e) => Err(self.io_error(&e, &temp)),
        };
        if let Err(report) = written {
            match tokio::fs::remove_file(&temp).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %temp.display(), error = %e, "Failed to remove temporary session file");
                }
            }
            return Err(report);
        }

        debug!(path = %path.display(), "Saved session");
        Ok(())
    }

    async fn load(&self) -> Option<Session> {
        let path = self.path();
        match tokio::fs::read(&path).await {
            Ok(bytes) => decode_session(&self.key, &bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read stored session");
                None
            }
        }
    }

    async fn clear(&self) -> Result<(), Report<SessionStoreError>> {
        let path = self.path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Cleared session");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(&e, &path)),
        }
    }
}
