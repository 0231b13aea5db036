//! Configuration file management for LUMINA.
//!
//! Supports reading secrets from `~/.config/lumina/secret.json`.

use crate::error::{LuminaError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure for secret.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretConfig {
    #[serde(default)]
    pub gemini: Option<GeminiConfig>,
}

/// Gemini API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    #[serde(default)]
    pub model_name: Option<String>,
}

/// Loads the secret configuration file from ~/.config/lumina/secret.json
pub fn load_secret_config() -> Result<SecretConfig> {
    let config_path = secret_file_path()?;
    load_secret_config_from(&config_path)
}

/// Loads the secret configuration from an explicit path.
pub fn load_secret_config_from(config_path: &Path) -> Result<SecretConfig> {
    if !config_path.exists() {
        return Err(LuminaError::config(format!(
            "Configuration file not found at: {}",
            config_path.display()
        )));
    }

    let content = fs::read_to_string(config_path).map_err(|e| {
        LuminaError::config(format!(
            "Failed to read configuration file at {}: {}",
            config_path.display(),
            e
        ))
    })?;

    serde_json::from_str(&content).map_err(|e| {
        LuminaError::config(format!(
            "Failed to parse configuration file at {}: {}",
            config_path.display(),
            e
        ))
    })
}

/// Returns the path to the configuration file: ~/.config/lumina/secret.json
pub fn secret_file_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LuminaError::config("Could not determine home directory"))?;
    Ok(home.join(".config").join("lumina").join("secret.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.json");
        fs::write(
            &path,
            r#"{"gemini":{"api_key":"k-123","model_name":"gemini-3-flash-preview"}}"#,
        )
        .unwrap();

        let config = load_secret_config_from(&path).unwrap();
        let gemini = config.gemini.unwrap();
        assert_eq!(gemini.api_key, "k-123");
        assert_eq!(gemini.model_name.as_deref(), Some("gemini-3-flash-preview"));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_secret_config_from(&dir.path().join("nope.json")).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_missing_gemini_section_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.json");
        fs::write(&path, "{}").unwrap();
        let config = load_secret_config_from(&path).unwrap();
        assert!(config.gemini.is_none());
    }
}
