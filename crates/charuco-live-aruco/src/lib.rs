//! ArUco marker dictionaries and detection.
//!
//! The detector follows the classic pipeline:
//! - inverted adaptive thresholding at several window sizes,
//! - contour extraction and polygon approximation into convex quads,
//! - perspective sampling of the `(n + 2) x (n + 2)` cell grid with an
//!   Otsu split,
//! - dictionary lookup in all four rotations with bounded Hamming distance,
//! - optional sub-pixel corner refinement.
//!
//! Dictionaries are plain data: either loaded from JSON (see [`Dictionary`])
//! or embedded at build time from `data/*_CODES.json` (see [`builtins`]).

pub mod builtins;
mod candidates;
mod decode;
mod detector;
mod dictionary;
mod matcher;
mod params;
mod threshold;

pub use detector::{ArucoDetector, MarkerDetection};
pub use dictionary::{Dictionary, DictionaryError};
pub use matcher::{min_rotation_distance, rotate_code_u64, Match, Matcher};
pub use params::{CornerRefine, DetectorParams};
