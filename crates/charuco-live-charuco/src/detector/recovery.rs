//! Board-guided recovery of markers the detector missed.

use charuco_live_aruco::{ArucoDetector, MarkerDetection};
use charuco_live_core::{mean_corner_distance, min_side_length, GrayImageView, Homography, Quad};

use crate::CharucoBoard;

use super::CharucoDetectorParams;

/// Project every undetected board marker through `pose` and decode it in
/// place. A marker is accepted only when it decodes to its own id in the
/// orientation the board predicts and its refined corners stay close to the
/// prediction.
pub(crate) fn recover_markers(
    view: &GrayImageView<'_>,
    board: &CharucoBoard,
    aruco: &ArucoDetector,
    pose: &Homography,
    detected: &[MarkerDetection],
    params: &CharucoDetectorParams,
) -> Vec<MarkerDetection> {
    let mut found = Vec::new();
    let margin = params.aruco.min_distance_to_border as f32;

    for id in 0..board.marker_count() as u32 {
        if detected.iter().any(|m| m.id == id) {
            continue;
        }
        let Some(board_quad) = board.marker_corners(id) else {
            continue;
        };
        let predicted: Quad = board_quad.map(|p| pose.apply(p));
        let outside = predicted
            .iter()
            .any(|p| !(p.x.is_finite() && p.y.is_finite()) || !view.contains(p.x, p.y, margin));
        if outside {
            continue;
        }
        let side = min_side_length(&predicted);
        if side < params.recovery_min_side_px {
            continue;
        }

        let Some(mut det) = aruco.decode_quad(view, &predicted) else {
            continue;
        };
        if det.id != id || det.rotation != 0 {
            continue;
        }
        aruco.refine_corners(view, &mut det);
        if mean_corner_distance(&det.corners, &predicted) > params.recovery_max_shift_rel * side {
            continue;
        }
        log::debug!("recovered marker {id}");
        found.push(det);
    }
    found
}
