//! Live ChArUco viewer.
//!
//! Grabs frames from a camera (or an image directory), detects a ChArUco
//! board in each frame, shows the frame with an overlay and saves raw frames
//! on request.
//!
//! ```no_run
//! use charuco_live::camera::{open_camera, CameraSelector, FrameSource, DEFAULT_GRAB_TIMEOUT};
//! use charuco_live::display::WindowDisplay;
//! use charuco_live::{session, AppConfig, SnapshotWriter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = AppConfig::load_json("charuco_live.json")?;
//! let detector = cfg.build_detector()?;
//! let mut camera = open_camera(&CameraSelector::First, DEFAULT_GRAB_TIMEOUT)?;
//! let snapshots = SnapshotWriter::new(".", camera.serial());
//! let summary = session::run(
//!     &mut camera,
//!     &detector,
//!     &mut WindowDisplay::new(),
//!     &snapshots,
//!     Default::default(),
//! )?;
//! println!("{} frames", summary.frames);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - [`camera`]: frame sources (V4L2 with feature `v4l`, directory replay).
//! - [`display`]: window and headless display surfaces, key commands.
//! - [`overlay`]: detection drawing.
//! - [`session`]: the capture, detect and display loop.
//! - [`charuco`], [`aruco`], [`core`]: the detection crates.

pub use charuco_live_aruco as aruco;
pub use charuco_live_charuco as charuco;
pub use charuco_live_core as core;

pub mod camera;
mod config;
pub mod display;
mod frame;
pub mod overlay;
pub mod session;
mod snapshot;
mod stats;

pub use config::{AppConfig, ConfigError, DEFAULT_CONFIG_FILE};
pub use frame::Frame;
pub use snapshot::{SnapshotError, SnapshotKind, SnapshotWriter};
pub use stats::IlluminationStats;
