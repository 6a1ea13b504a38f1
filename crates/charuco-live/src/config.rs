//! Viewer configuration (JSON).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use charuco_live_charuco::{CharucoConfigError, CharucoDetectConfig, CharucoDetector};
use serde::{Deserialize, Serialize};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "charuco_live.json";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Detector(#[from] CharucoConfigError),
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_grab_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Board, dictionary and detector parameters.
    #[serde(flatten)]
    pub detect: CharucoDetectConfig,
    /// Where snapshots are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Also save the annotated frame when a board is visible.
    #[serde(default)]
    pub save_annotated: bool,
    #[serde(default = "default_grab_timeout_ms")]
    pub grab_timeout_ms: u64,
    /// Directory relative paths resolve against; the config file's directory.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            detect: CharucoDetectConfig::default(),
            output_dir: default_output_dir(),
            save_annotated: false,
            grab_timeout_ms: default_grab_timeout_ms(),
            base_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cfg: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        log::debug!("loaded config {}", path.display());
        Ok(cfg)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path`, or [`DEFAULT_CONFIG_FILE`] from `cwd` when it exists, or
    /// fall back to defaults.
    pub fn resolve(path: Option<&Path>, cwd: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_json(path);
        }
        let implicit = cwd.join(DEFAULT_CONFIG_FILE);
        if implicit.is_file() {
            return Self::load_json(implicit);
        }
        log::debug!("no config file, using defaults");
        Ok(Self {
            base_dir: cwd.to_path_buf(),
            ..Self::default()
        })
    }

    #[inline]
    pub fn grab_timeout(&self) -> Duration {
        Duration::from_millis(self.grab_timeout_ms)
    }

    /// Snapshot directory, relative paths taken from the working directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Load the dictionary and build the board detector.
    pub fn build_detector(&self) -> Result<CharucoDetector, ConfigError> {
        Ok(self.detect.build_detector(&self.base_dir)?)
    }
}
