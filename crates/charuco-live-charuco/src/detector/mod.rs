//! ChArUco detection pipeline.
//!
//! Markers are detected over the whole image, checked against the board
//! through a global board-to-image homography, completed by decoding the
//! quads the homography predicts for missing markers, and finally used to
//! interpolate and refine the chessboard corners between them.

mod error;
mod interpolate;
mod params;
mod pipeline;
mod pose;
mod recovery;
mod result;

pub use error::CharucoDetectError;
pub use params::CharucoDetectorParams;
pub use pipeline::CharucoDetector;
pub use result::{BoardDetection, CharucoCorner};
