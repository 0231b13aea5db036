//! User identity.

use serde::{Deserialize, Serialize};

/// The identity of the person on the other side of the conversation.
///
/// The email may be empty; the display name alone is enough to personalize
/// the system instruction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Display name
    pub name: String,
    /// Email address (may be empty)
    #[serde(default)]
    pub email: String,
}

impl UserIdentity {
    /// Creates an identity from a display name only.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: String::new(),
        }
    }
}
