//! JSON-file user profile store.

use crate::storage::atomic_json::AtomicJsonFile;
use lumina_core::LuminaError;
use lumina_core::error::Result;
use lumina_core::user::UserIdentity;
use std::path::PathBuf;

/// Persists the single user identity record.
pub struct UserProfileStore {
    file: AtomicJsonFile<UserIdentity>,
}

impl UserProfileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicJsonFile::new(path),
        }
    }

    /// Loads the stored identity; `None` before first-run setup completes.
    pub fn load(&self) -> Result<Option<UserIdentity>> {
        Ok(self.file.load().map_err(LuminaError::from)?)
    }

    pub fn save(&self, identity: &UserIdentity) -> Result<()> {
        self.file.save(identity).map_err(LuminaError::from)?;
        Ok(())
    }
}
