//! Session repository trait.
//!
//! Defines the interface for archived-session persistence, decoupling the
//! application's core logic from the specific storage mechanism.

use super::model::Session;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract repository for the archived chat history.
///
/// Sessions are listed newest-first. Taking a session out of the archive
/// (to resume it) removes it from the list; archiving it again re-inserts
/// it at the front.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Finds an archived session by its ID.
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>>;

    /// Inserts a session at the front of the archive.
    async fn save(&self, session: &Session) -> Result<()>;

    /// Removes a session from the archive.
    ///
    /// Returns `NotFound` if no session with the given ID exists.
    async fn delete(&self, session_id: &str) -> Result<()>;

    /// Lists all archived sessions, newest first.
    async fn list_all(&self) -> Result<Vec<Session>>;
}
