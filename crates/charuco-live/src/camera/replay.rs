use std::fs;
use std::path::{Path, PathBuf};

use super::{AcquisitionError, FrameSource};
use crate::Frame;

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Serves the images of a directory in lexical file-name order.
#[derive(Debug)]
pub struct ReplaySource {
    serial: String,
    files: Vec<PathBuf>,
    next: usize,
}

impl ReplaySource {
    /// Open `dir`. The serial defaults to the directory name.
    pub fn open(dir: impl AsRef<Path>, serial: Option<String>) -> Result<Self, AcquisitionError> {
        let dir = dir.as_ref();
        let io_err = |source| AcquisitionError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && is_image(&path) {
                files.push(path);
            }
        }
        files.sort();

        let serial = serial.unwrap_or_else(|| {
            dir.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "replay".to_string())
        });
        log::info!("replay {}: {} images", dir.display(), files.len());
        Ok(Self {
            serial,
            files,
            next: 0,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

impl FrameSource for ReplaySource {
    fn serial(&self) -> &str {
        &self.serial
    }

    fn grab(&mut self) -> Result<Frame, AcquisitionError> {
        let Some(path) = self.files.get(self.next) else {
            return Err(AcquisitionError::EndOfStream);
        };
        let image = image::open(path)
            .map_err(|e| AcquisitionError::Decode(format!("{}: {e}", path.display())))?
            .to_rgb8();
        log::trace!("replay frame {} from {}", self.next, path.display());
        let frame = Frame::new(self.next as u64, image);
        self.next += 1;
        Ok(frame)
    }
}
