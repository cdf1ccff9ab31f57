//! Engine configuration.

use crate::error::{EngineError, EngineResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "REPLAY_VOICE_CONFIG";

/// File name looked up in the platform configuration directory
pub const CONFIG_FILE_NAME: &str = "engine.toml";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// WAV file replayed for every utterance
    pub payload_path: PathBuf,
    /// Fail `speak` when the host accepts fewer bytes than written
    pub fail_on_short_write: bool,
    /// Emit per-fragment diagnostics during `speak`
    pub log_fragments: bool,
    /// Share one payload buffer between engines opened on the same file
    pub share_payload: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            payload_path: default_payload_path(),
            fail_on_short_write: false,
            log_fragments: true,
            share_payload: true,
        }
    }
}

impl EngineConfig {
    /// Parse configuration from TOML text.
    ///
    /// A relative `payload_path` stays relative to the host process's working
    /// directory; use [`EngineConfig::load`] to resolve it against the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or fails validation
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            EngineError::configuration(format!("Failed to read {}: {e}", path.display()))
        })?;

        let mut config = Self::from_toml_str(&text)?;
        if config.payload_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.payload_path = dir.join(&config.payload_path);
            }
        }

        debug!("Loaded engine configuration from {}", path.display());
        Ok(config)
    }

    /// Locate configuration for a host-created engine.
    ///
    /// Order: the file named by `REPLAY_VOICE_CONFIG`, then `engine.toml` in the
    /// platform configuration directory, then defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is found but cannot be loaded
    pub fn discover() -> EngineResult<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            info!("Using configuration from {}", CONFIG_ENV_VAR);
            return Self::load(PathBuf::from(path));
        }

        if let Some(path) = project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME)) {
            if path.is_file() {
                return Self::load(path);
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if the payload path is empty
    pub fn validate(&self) -> EngineResult<()> {
        if self.payload_path.as_os_str().is_empty() {
            return Err(EngineError::configuration("payload_path cannot be empty"));
        }
        Ok(())
    }

    /// Set the payload path
    #[must_use]
    pub fn with_payload_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.payload_path = path.into();
        self
    }

    /// Promote short writes to errors
    #[must_use]
    pub fn with_strict_writes(mut self) -> Self {
        self.fail_on_short_write = true;
        self
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "ReplayVoice", "replay-voice")
}

fn default_payload_path() -> PathBuf {
    project_dirs().map_or_else(
        || PathBuf::from("hal.wav"),
        |dirs| dirs.data_dir().join("hal.wav"),
    )
}
