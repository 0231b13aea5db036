//! Path management for LUMINA's on-disk files.
//!
//! Everything lives in one configuration directory:
//!
//! ```text
//! ~/.config/lumina/
//! ├── secret.json              # API keys
//! ├── chat_history_v2.json     # Archived sessions
//! ├── memory.json              # Remembered facts
//! └── user_profile.json        # User identity
//! ```

use lumina_core::LuminaError;
use lumina_core::config::{GeminiConfig, SecretConfig};
use std::path::PathBuf;

/// Archived sessions file name. The `_v2` suffix marks the current schema;
/// older files are ignored rather than migrated.
pub const HISTORY_FILE: &str = "chat_history_v2.json";
/// Remembered facts file name.
pub const MEMORY_FILE: &str = "memory.json";
/// User identity file name.
pub const PROFILE_FILE: &str = "user_profile.json";
/// Secrets file name.
pub const SECRET_FILE: &str = "secret.json";

/// Resolves LUMINA's file locations.
pub struct LuminaPaths;

impl LuminaPaths {
    /// Returns the configuration directory (`~/.config/lumina`).
    pub fn config_dir() -> Result<PathBuf, LuminaError> {
        let home = dirs::home_dir()
            .ok_or_else(|| LuminaError::config("Could not determine home directory"))?;
        Ok(home.join(".config").join("lumina"))
    }

    pub fn history_file() -> Result<PathBuf, LuminaError> {
        Ok(Self::config_dir()?.join(HISTORY_FILE))
    }

    pub fn memory_file() -> Result<PathBuf, LuminaError> {
        Ok(Self::config_dir()?.join(MEMORY_FILE))
    }

    pub fn profile_file() -> Result<PathBuf, LuminaError> {
        Ok(Self::config_dir()?.join(PROFILE_FILE))
    }

    pub fn secret_file() -> Result<PathBuf, LuminaError> {
        Ok(Self::config_dir()?.join(SECRET_FILE))
    }

    /// Ensures the secrets file exists, writing a template on first run.
    ///
    /// The template holds an empty API key for the user to fill in. On Unix
    /// the file is created with mode 600.
    pub fn ensure_secret_file() -> Result<PathBuf, LuminaError> {
        let secret_path = Self::secret_file()?;
        if secret_path.exists() {
            return Ok(secret_path);
        }

        if let Some(parent) = secret_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = SecretConfig {
            gemini: Some(GeminiConfig {
                api_key: String::new(),
                model_name: Some("gemini-3-flash-preview".to_string()),
            }),
        };
        let template_json = serde_json::to_string_pretty(&template)?;
        std::fs::write(&secret_path, template_json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&secret_path, permissions)?;
        }

        tracing::info!(path = %secret_path.display(), "created secrets template");
        Ok(secret_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_under_home() {
        let dir = LuminaPaths::config_dir().unwrap();
        assert!(dir.ends_with(".config/lumina"));
    }

    #[test]
    fn test_data_files_under_config_dir() {
        let dir = LuminaPaths::config_dir().unwrap();
        for file in [
            LuminaPaths::history_file().unwrap(),
            LuminaPaths::memory_file().unwrap(),
            LuminaPaths::profile_file().unwrap(),
            LuminaPaths::secret_file().unwrap(),
        ] {
            assert!(file.starts_with(&dir));
        }
        assert!(LuminaPaths::history_file().unwrap().ends_with(HISTORY_FILE));
    }
}
