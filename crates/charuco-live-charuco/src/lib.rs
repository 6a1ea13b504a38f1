//! ChArUco board detection.
//!
//! - [`CharucoBoard`] describes the printed board (OpenCV layout) and can
//!   render it.
//! - [`CharucoDetector`] finds markers, fits the board homography, recovers
//!   missed markers and interpolates the inner chessboard corners.
//!
//! Marker dictionaries and decoding live in `charuco-live-aruco`.

mod board;
mod detector;
mod io;
mod render;

pub use board::{CharucoBoard, CharucoBoardError, CharucoBoardSpec, MarkerLayout};
pub use detector::{
    BoardDetection, CharucoCorner, CharucoDetectError, CharucoDetector, CharucoDetectorParams,
};
pub use io::{CharucoConfigError, CharucoDetectConfig, CharucoIoError};

pub use charuco_live_aruco::{Dictionary, MarkerDetection};
pub use charuco_live_core::Homography;
