//! The capture, detect and display loop.

use std::path::PathBuf;

use charuco_live_charuco::{BoardDetection, CharucoDetector};

use crate::camera::{AcquisitionError, FrameSource};
use crate::display::{Display, DisplayError, KeyCommand};
use crate::overlay::draw_detection;
use crate::snapshot::{SnapshotKind, SnapshotWriter};
use crate::stats::IlluminationStats;
use crate::Frame;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),
    #[error(transparent)]
    Display(#[from] DisplayError),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Also save the annotated frame when a board is visible.
    pub save_annotated: bool,
    /// Treat [`AcquisitionError::EndOfStream`] as a normal end.
    pub stop_at_end_of_stream: bool,
}

/// Counters reported when the loop ends.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames: usize,
    pub frames_with_board: usize,
    pub snapshots: usize,
    pub snapshot_failures: usize,
    /// Every file written, in order.
    pub saved: Vec<PathBuf>,
}

/// Window title: camera serial plus illumination percentiles.
pub fn window_title(serial: &str, frame: &Frame) -> String {
    match IlluminationStats::from_image(&frame.image) {
        Some(stats) => format!("Camera {serial} | {stats}"),
        None => format!("Camera {serial}"),
    }
}

/// Run until the user quits, the display closes or acquisition fails.
///
/// Each iteration grabs one frame, detects the board, shows an annotated
/// copy and then handles pending key commands. A quit command ends the loop
/// before the next grab. Each saved file is announced on stdout; snapshot
/// failures go to stderr and are counted.
pub fn run<S, D>(
    source: &mut S,
    detector: &CharucoDetector,
    display: &mut D,
    snapshots: &SnapshotWriter,
    options: SessionOptions,
) -> Result<SessionSummary, SessionError>
where
    S: FrameSource + ?Sized,
    D: Display + ?Sized,
{
    let mut summary = SessionSummary::default();
    log::info!("session started for camera {}", source.serial());

    while display.is_open() {
        let frame = match source.grab() {
            Ok(frame) => frame,
            Err(AcquisitionError::EndOfStream) if options.stop_at_end_of_stream => {
                log::info!("end of stream");
                break;
            }
            Err(e) => {
                log::error!("frame {}: {e}", summary.frames);
                return Err(e.into());
            }
        };
        summary.frames += 1;

        let detection = detector.detect(&frame.to_gray());
        if !detection.is_empty() {
            summary.frames_with_board += 1;
        }
        log::debug!(
            "frame {}: {} markers, {} corners",
            frame.sequence,
            detection.markers.len(),
            detection.corners.len()
        );

        let annotated = draw_detection(&frame.image, &detection);
        display.show(&window_title(source.serial(), &frame), &annotated)?;

        let mut quit = false;
        while let Some(cmd) = display.poll_key() {
            match cmd {
                KeyCommand::Save => {
                    save(snapshots, &frame, &annotated, &detection, options, &mut summary)
                }
                KeyCommand::Quit => quit = true,
            }
        }
        if quit {
            log::info!("quit requested");
            break;
        }
    }

    log::info!(
        "session ended: {} frames, {} with board, {} snapshots",
        summary.frames,
        summary.frames_with_board,
        summary.snapshots
    );
    Ok(summary)
}

fn save(
    snapshots: &SnapshotWriter,
    frame: &Frame,
    annotated: &image::RgbImage,
    detection: &BoardDetection,
    options: SessionOptions,
    summary: &mut SessionSummary,
) {
    let index = match snapshots.save_raw(&frame.image) {
        Ok((index, path)) => {
            println!("Saved raw image to {}", path.display());
            summary.snapshots += 1;
            summary.saved.push(path);
            index
        }
        Err(e) => {
            log::error!("snapshot failed: {e}");
            eprintln!("snapshot failed: {e}");
            summary.snapshot_failures += 1;
            return;
        }
    };
    if options.save_annotated && !detection.is_empty() {
        match snapshots.write(SnapshotKind::Annotated, index, annotated) {
            Ok(path) => {
                println!("Saved annotated image to {}", path.display());
                summary.saved.push(path);
            }
            Err(e) => {
                log::error!("annotated snapshot failed: {e}");
                eprintln!("annotated snapshot failed: {e}");
                summary.snapshot_failures += 1;
            }
        }
    }
}
