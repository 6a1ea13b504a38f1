//! ChArUco corner interpolation from neighbouring markers.

use std::collections::HashMap;

use charuco_live_aruco::MarkerDetection;
use charuco_live_core::{refine_corner_subpix, GrayImageView, Homography, SubpixParams};
use nalgebra::Point2;

use crate::CharucoBoard;

use super::{CharucoCorner, CharucoDetectorParams};

/// Predict each inner corner through the local homographies of its detected
/// neighbour markers, then refine it in a window that stays clear of those
/// markers' corners. Corners whose refinement fails keep the prediction.
pub(crate) fn interpolate_corners(
    view: &GrayImageView<'_>,
    board: &CharucoBoard,
    markers: &[MarkerDetection],
    params: &CharucoDetectorParams,
) -> Vec<CharucoCorner> {
    let local: HashMap<u32, (Homography, &MarkerDetection)> = markers
        .iter()
        .filter_map(|m| {
            let b = board.marker_corners(m.id)?;
            Some((m.id, (Homography::from_4pt(&b, &m.corners)?, m)))
        })
        .collect();

    let mut out = Vec::new();
    for id in 0..board.corner_count() as u32 {
        let Some(board_xy) = board.corner_position(id) else {
            continue;
        };
        let neighbours: Vec<&(Homography, &MarkerDetection)> = board
            .markers_around_corner(id)
            .iter()
            .filter_map(|mid| local.get(mid))
            .collect();
        if neighbours.len() < params.min_adjacent_markers {
            continue;
        }

        let n = neighbours.len() as f32;
        let sum = neighbours
            .iter()
            .map(|(h, _)| h.apply(board_xy).coords)
            .fold(nalgebra::Vector2::zeros(), |a, b| a + b);
        let predicted = Point2::from(sum / n);
        if !(predicted.x.is_finite() && predicted.y.is_finite())
            || !view.contains(predicted.x, predicted.y, 1.0)
        {
            continue;
        }

        let position = if params.refine_corners {
            let nearest = neighbours
                .iter()
                .flat_map(|(_, m)| m.corners.iter())
                .map(|c| (c - predicted).norm())
                .fold(f32::INFINITY, f32::min);
            let half_window = (((nearest - 1.0) / 2.0).floor().max(1.0) as usize)
                .min(params.corner_max_half_window);
            let sp = SubpixParams {
                half_window,
                max_iters: params.corner_max_iterations,
                epsilon: params.corner_min_accuracy,
            };
            refine_corner_subpix(view, predicted, &sp).unwrap_or_else(|| {
                log::trace!("corner {id}: refinement diverged, keeping prediction");
                predicted
            })
        } else {
            predicted
        };

        out.push(CharucoCorner {
            id,
            position,
            board: board_xy,
        });
    }
    out
}
