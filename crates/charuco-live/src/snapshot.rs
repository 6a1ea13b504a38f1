//! Numbered PNG snapshots that never overwrite earlier files.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;

/// Highest index tried before giving up.
const MAX_INDEX: u32 = 9999;

#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error("cannot create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("all snapshot indices are used in {}", dir.display())]
    Exhausted { dir: PathBuf },
}

/// Which image a snapshot holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotKind {
    Raw,
    Annotated,
}

impl SnapshotKind {
    fn tag(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Annotated => "charuco",
        }
    }
}

/// Writes `{serial}.raw.{NNNN}.png` (and optionally
/// `{serial}.charuco.{NNNN}.png`) into one directory.
#[derive(Clone, Debug)]
pub struct SnapshotWriter {
    dir: PathBuf,
    stem: String,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>, serial: &str) -> Self {
        Self {
            dir: dir.into(),
            stem: sanitize(serial),
        }
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, kind: SnapshotKind, index: u32) -> PathBuf {
        self.dir
            .join(format!("{}.{}.{index:04}.png", self.stem, kind.tag()))
    }

    /// First index with neither a raw nor an annotated file on disk.
    pub fn next_index(&self) -> Result<u32, SnapshotError> {
        (0..=MAX_INDEX)
            .find(|&i| {
                !self.path_for(SnapshotKind::Raw, i).exists()
                    && !self.path_for(SnapshotKind::Annotated, i).exists()
            })
            .ok_or_else(|| SnapshotError::Exhausted {
                dir: self.dir.clone(),
            })
    }

    /// Save `image` under `index`.
    pub fn write(
        &self,
        kind: SnapshotKind,
        index: u32,
        image: &RgbImage,
    ) -> Result<PathBuf, SnapshotError> {
        fs::create_dir_all(&self.dir).map_err(|source| SnapshotError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path_for(kind, index);
        image
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|source| SnapshotError::Write {
                path: path.clone(),
                source,
            })?;
        log::info!("saved {}", path.display());
        Ok(path)
    }

    /// Save a raw frame under the next free index.
    pub fn save_raw(&self, image: &RgbImage) -> Result<(u32, PathBuf), SnapshotError> {
        let index = self.next_index()?;
        let path = self.write(SnapshotKind::Raw, index, image)?;
        Ok((index, path))
    }
}

/// Keep serials usable as file names.
fn sanitize(serial: &str) -> String {
    let s: String = serial
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.is_empty() {
        "camera".to_string()
    } else {
        s
    }
}
