//! JSON-file session archive.

use crate::storage::atomic_json::AtomicJsonFile;
use async_trait::async_trait;
use lumina_core::error::Result;
use lumina_core::session::{Session, SessionRepository};
use lumina_core::LuminaError;
use std::path::PathBuf;

/// Session archive backed by a single JSON file, newest session first.
///
/// The whole archive is small enough to rewrite on every change; atomicity
/// comes from the storage layer, not from fine-grained updates.
pub struct JsonHistoryRepository {
    file: AtomicJsonFile<Vec<Session>>,
}

impl JsonHistoryRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicJsonFile::new(path),
        }
    }

    fn load_all(&self) -> Result<Vec<Session>> {
        Ok(self.file.load().map_err(LuminaError::from)?.unwrap_or_default())
    }
}

#[async_trait]
impl SessionRepository for JsonHistoryRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        let sessions = self.load_all()?;
        Ok(sessions.into_iter().find(|s| s.id == session_id))
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let session = session.clone();
        self.file.update(Vec::new(), move |sessions| {
            sessions.retain(|s| s.id != session.id);
            sessions.insert(0, session);
            Ok(())
        })?;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        // Existence is checked inside the locked update so a concurrent
        // writer cannot invalidate it between check and removal.
        let mut found = false;
        self.file.update(Vec::new(), |sessions| {
            let before = sessions.len();
            sessions.retain(|s| s.id != session_id);
            found = sessions.len() != before;
            Ok(())
        })?;
        if !found {
            return Err(LuminaError::not_found("session", session_id));
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Session>> {
        self.load_all()
    }
}
