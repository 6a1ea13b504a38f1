//! Board-to-image homography from detected markers, with outlier trimming.

use charuco_live_aruco::MarkerDetection;
use charuco_live_core::{quad_perimeter, Homography};
use nalgebra::Point2;

use crate::CharucoBoard;

pub(crate) struct PoseFit {
    pub homography: Homography,
    /// Per input marker: kept by the fit.
    pub inliers: Vec<bool>,
}

/// Fit a homography to all marker corners, then repeatedly drop the marker
/// with the worst mean reprojection error while it exceeds
/// `max_error_rel * median_side`.
///
/// Returns `None` with fewer than `min_markers` markers or when the fit is
/// degenerate.
pub(crate) fn fit_board_pose(
    board: &CharucoBoard,
    markers: &[MarkerDetection],
    min_markers: usize,
    max_error_rel: f32,
) -> Option<PoseFit> {
    if markers.len() < min_markers.max(1) {
        return None;
    }
    let board_quads: Vec<[Point2<f32>; 4]> = markers
        .iter()
        .map(|m| board.marker_corners(m.id))
        .collect::<Option<_>>()?;

    let mut sides: Vec<f32> = markers
        .iter()
        .map(|m| quad_perimeter(&m.corners) / 4.0)
        .collect();
    sides.sort_by(f32::total_cmp);
    let median_side = sides[sides.len() / 2];
    let max_error = max_error_rel * median_side;

    let mut inliers = vec![true; markers.len()];
    loop {
        let (src, dst): (Vec<Point2<f32>>, Vec<Point2<f32>>) = markers
            .iter()
            .zip(&board_quads)
            .zip(&inliers)
            .filter(|(_, keep)| **keep)
            .flat_map(|((m, b), _)| b.iter().copied().zip(m.corners.iter().copied()))
            .unzip();
        let homography = Homography::estimate(&src, &dst)?;

        let worst = markers
            .iter()
            .zip(&board_quads)
            .enumerate()
            .filter(|(i, _)| inliers[*i])
            .map(|(i, (m, b))| {
                let err = b
                    .iter()
                    .zip(&m.corners)
                    .map(|(&p, &q)| homography.reprojection_error(p, q))
                    .sum::<f32>()
                    / 4.0;
                (i, err)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1));

        match worst {
            Some((i, err)) if err > max_error => {
                log::debug!(
                    "pose: dropping marker {} (error {:.2}px > {:.2}px)",
                    markers[i].id,
                    err,
                    max_error
                );
                inliers[i] = false;
                if inliers.iter().filter(|&&k| k).count() < min_markers.max(1) {
                    return None;
                }
            }
            _ => return Some(PoseFit { homography, inliers }),
        }
    }
}
