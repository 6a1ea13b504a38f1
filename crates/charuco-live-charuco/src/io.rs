//! JSON configuration for ChArUco detection.

use std::fs;
use std::path::{Path, PathBuf};

use charuco_live_aruco::{builtins, Dictionary, DictionaryError};
use serde::{Deserialize, Serialize};

use crate::{
    CharucoBoard, CharucoBoardError, CharucoBoardSpec, CharucoDetectError, CharucoDetector,
    CharucoDetectorParams,
};

#[derive(thiserror::Error, Debug)]
pub enum CharucoIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum CharucoConfigError {
    #[error(transparent)]
    Board(#[from] CharucoBoardError),
    #[error("dictionary: {0}")]
    Dictionary(#[from] DictionaryError),
    #[error(
        "dictionary {name:?} is not built in (available: {available}) and {} does not exist",
        path.display()
    )]
    UnknownDictionary {
        name: String,
        path: PathBuf,
        available: String,
    },
    #[error(transparent)]
    Detector(#[from] CharucoDetectError),
}

fn default_dictionary() -> PathBuf {
    PathBuf::from("DICT_4X4_1000")
}

/// Board, dictionary and detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharucoDetectConfig {
    #[serde(default)]
    pub board: CharucoBoardSpec,
    /// Built-in dictionary name, or a dictionary JSON file. Relative paths
    /// resolve against the config file.
    #[serde(default = "default_dictionary")]
    pub dictionary: PathBuf,
    #[serde(default)]
    pub detector: CharucoDetectorParams,
}

impl Default for CharucoDetectConfig {
    fn default() -> Self {
        Self {
            board: CharucoBoardSpec::default(),
            dictionary: default_dictionary(),
            detector: CharucoDetectorParams::default(),
        }
    }
}

impl CharucoDetectConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CharucoIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CharucoIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Dictionary path resolved against `base_dir` when relative.
    pub fn dictionary_path(&self, base_dir: &Path) -> PathBuf {
        if self.dictionary.is_absolute() {
            self.dictionary.clone()
        } else {
            base_dir.join(&self.dictionary)
        }
    }

    /// Resolve `dictionary`: a built-in name wins, then the file it names,
    /// then the same file with a `.json` extension.
    pub fn load_dictionary(&self, base_dir: &Path) -> Result<Dictionary, CharucoConfigError> {
        let name = self.dictionary.to_string_lossy();
        if let Some(dict) = builtins::builtin_dictionary(&name) {
            log::debug!("using built-in dictionary {name}");
            return Ok(dict);
        }
        let path = self.dictionary_path(base_dir);
        if path.is_file() {
            return Ok(Dictionary::load_json(path)?);
        }
        let with_ext = path.with_extension("json");
        if path.extension().is_none() && with_ext.is_file() {
            return Ok(Dictionary::load_json(with_ext)?);
        }
        Err(CharucoConfigError::UnknownDictionary {
            name: name.into_owned(),
            path,
            available: builtins::builtin_names().collect::<Vec<_>>().join(", "),
        })
    }

    /// Load the dictionary and build a validated board.
    pub fn build_board(&self, base_dir: &Path) -> Result<CharucoBoard, CharucoConfigError> {
        let dict = self.load_dictionary(base_dir)?;
        Ok(CharucoBoard::new(self.board, dict)?)
    }

    /// Build a detector from this config.
    pub fn build_detector(&self, base_dir: &Path) -> Result<CharucoDetector, CharucoConfigError> {
        let board = self.build_board(base_dir)?;
        Ok(CharucoDetector::new(board, self.detector.clone())?)
    }
}
