//! Configuration management for rollcall.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::crop::CropSettings;
use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "rollcall";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "directory.db";

/// Default directory name for uploaded pictures.
const PICTURES_DIR_NAME: &str = "profile-pictures";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `ROLLCALL_`, sections split on `__`,
///    e.g. `ROLLCALL_WIZARD__TARGET_SIZE`)
/// 2. TOML config file at `~/.config/rollcall/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Wizard and crop configuration.
    pub wizard: WizardConfig,
    /// Profile database configuration.
    pub storage: StorageConfig,
    /// Picture storage configuration.
    pub media: MediaConfig,
    /// Session-scoped slot storage configuration.
    pub session: SessionConfig,
    /// Sign-in configuration.
    pub auth: AuthConfig,
    /// Shared-password gate configuration.
    pub gate: GateConfig,
}

/// Wizard-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    /// Edge length in pixels of the stored square picture.
    pub target_size: u32,
    /// Smallest zoom the cropper allows.
    pub zoom_min: f32,
    /// Largest zoom the cropper allows.
    pub zoom_max: f32,
    /// JPEG quality (1-100) of the stored picture.
    pub jpeg_quality: u8,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/rollcall/directory.db`
    pub database_path: Option<PathBuf>,
}

/// Picture storage configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Directory uploaded pictures are written to.
    /// Defaults to `~/.local/share/rollcall/profile-pictures`
    pub root: Option<PathBuf>,
    /// Base URL pictures are served from.
    /// Defaults to a `file://` URL of `root`.
    pub public_base_url: Option<String>,
}

/// Session slot configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory holding session-scoped slots (draft, gate flag).
    /// Defaults to the user runtime directory, which does not survive logout.
    pub dir: Option<PathBuf>,
}

/// Sign-in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Where magic links send the user back to.
    pub redirect_url: String,
    /// Owner identity the CLI acts as when `--owner` is not given.
    pub owner: Option<String>,
    /// Email of the configured owner.
    pub email: Option<String>,
}

/// Shared-password gate configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// BLAKE3 hex digest of the shared directory password.
    /// When unset the gate is open.
    pub password_hash: Option<String>,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            target_size: 400,
            zoom_min: 1.0,
            zoom_max: 3.0,
            jpeg_quality: 85,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            redirect_url: "http://localhost:3000/auth/callback".to_string(),
            owner: None,
            email: None,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("ROLLCALL_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let wizard = &self.wizard;
        if wizard.zoom_min < 1.0 {
            return Err(Error::ConfigValidation {
                message: format!("zoom_min ({}) must be at least 1.0", wizard.zoom_min),
            });
        }

        if wizard.zoom_max < wizard.zoom_min {
            return Err(Error::ConfigValidation {
                message: format!(
                    "zoom_max ({}) cannot be less than zoom_min ({})",
                    wizard.zoom_max, wizard.zoom_min
                ),
            });
        }

        if !(32..=2048).contains(&wizard.target_size) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "target_size ({}) must be between 32 and 2048",
                    wizard.target_size
                ),
            });
        }

        if !(1..=100).contains(&wizard.jpeg_quality) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "jpeg_quality ({}) must be between 1 and 100",
                    wizard.jpeg_quality
                ),
            });
        }

        let redirect = &self.auth.redirect_url;
        if !(redirect.starts_with("http://") || redirect.starts_with("https://")) {
            return Err(Error::ConfigValidation {
                message: format!("redirect_url must be an http(s) URL: {redirect}"),
            });
        }

        if let Some(hash) = &self.gate.password_hash {
            if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(Error::ConfigValidation {
                    message: "password_hash must be a 64-character BLAKE3 hex digest".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the picture directory, resolving defaults if not set.
    #[must_use]
    pub fn media_root(&self) -> PathBuf {
        self.media
            .root
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(PICTURES_DIR_NAME))
    }

    /// Get the base URL pictures are served from.
    #[must_use]
    pub fn public_base_url(&self) -> String {
        self.media
            .public_base_url
            .clone()
            .unwrap_or_else(|| format!("file://{}", self.media_root().display()))
    }

    /// Get the session slot directory, resolving defaults if not set.
    #[must_use]
    pub fn session_dir(&self) -> PathBuf {
        self.session.dir.clone().unwrap_or_else(|| {
            dirs::runtime_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(DATA_DIR_NAME)
        })
    }

    /// Crop pipeline settings derived from the wizard section.
    #[must_use]
    pub fn crop_settings(&self) -> CropSettings {
        CropSettings {
            target_size: self.wizard.target_size,
            zoom_min: self.wizard.zoom_min,
            zoom_max: self.wizard.zoom_max,
            jpeg_quality: self.wizard.jpeg_quality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_wizard_config() {
        let wizard = WizardConfig::default();

        assert_eq!(wizard.target_size, 400);
        assert!((wizard.zoom_min - 1.0).abs() < f32::EPSILON);
        assert!((wizard.zoom_max - 3.0).abs() < f32::EPSILON);
        assert_eq!(wizard.jpeg_quality, 85);
    }

    #[test]
    fn test_validate_zoom_below_one() {
        let mut config = Config::default();
        config.wizard.zoom_min = 0.5;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("zoom_min"));
    }

    #[test]
    fn test_validate_inverted_zoom_bounds() {
        let mut config = Config::default();
        config.wizard.zoom_min = 2.0;
        config.wizard.zoom_max = 1.5;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("zoom_max"));
    }

    #[test]
    fn test_validate_target_size() {
        let mut config = Config::default();
        config.wizard.target_size = 8;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("target_size"));
    }

    #[test]
    fn test_validate_jpeg_quality() {
        let mut config = Config::default();
        config.wizard.jpeg_quality = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_redirect_url() {
        let mut config = Config::default();
        config.auth.redirect_url = "ftp://example.com".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("redirect_url"));
    }

    #[test]
    fn test_validate_password_hash_shape() {
        let mut config = Config::default();
        config.gate.password_hash = Some("not-a-digest".to_string());
        assert!(config.validate().is_err());

        config.gate.password_hash = Some(blake3::hash(b"secret").to_hex().to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        assert!(config
            .database_path()
            .to_string_lossy()
            .contains("directory.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_public_base_url_defaults_to_media_root() {
        let mut config = Config::default();
        config.media.root = Some(PathBuf::from("/srv/pictures"));

        assert_eq!(config.public_base_url(), "file:///srv/pictures");

        config.media.public_base_url = Some("https://cdn.example.com/pics".to_string());
        assert_eq!(config.public_base_url(), "https://cdn.example.com/pics");
    }

    #[test]
    fn test_session_dir_default() {
        let config = Config::default();
        assert!(config.session_dir().to_string_lossy().contains("rollcall"));
    }

    #[test]
    fn test_crop_settings_follow_wizard_section() {
        let mut config = Config::default();
        config.wizard.target_size = 256;

        let settings = config.crop_settings();
        assert_eq!(settings.target_size, 256);
        assert_eq!(settings.jpeg_quality, 85);
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("rollcall"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[wizard]\ntarget_size = 128\n\n[auth]\nowner = \"user-1\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.wizard.target_size, 128);
        assert_eq!(config.auth.owner.as_deref(), Some("user-1"));
        assert_eq!(config.wizard.jpeg_quality, 85);
    }

    #[test]
    fn test_gate_section_closes_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let digest = blake3::hash(b"letmein").to_hex().to_string();
        std::fs::write(&path, format!("[gate]\npassword_hash = \"{digest}\"\n")).unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.gate.password_hash, Some(digest));
        assert_eq!(config.wizard, WizardConfig::default());
    }

    #[test]
    fn test_wizard_config_deserialize_partial() {
        let json = r#"{"zoom_max": 2.5}"#;
        let wizard: WizardConfig = serde_json::from_str(json).unwrap();
        assert!((wizard.zoom_max - 2.5).abs() < f32::EPSILON);
        assert_eq!(wizard.target_size, 400);
    }
}
