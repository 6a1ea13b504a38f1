use charuco_live_aruco::{ArucoDetector, MarkerDetection};
use charuco_live_core::GrayImageView;
use image::GrayImage;

#[cfg(feature = "tracing")]
use tracing::instrument;

use super::interpolate::interpolate_corners;
use super::pose::fit_board_pose;
use super::recovery::recover_markers;
use super::{BoardDetection, CharucoDetectError, CharucoDetectorParams};
use crate::CharucoBoard;

/// Marker-first ChArUco detector.
#[derive(Clone, Debug)]
pub struct CharucoDetector {
    board: CharucoBoard,
    params: CharucoDetectorParams,
    aruco: ArucoDetector,
}

impl CharucoDetector {
    pub fn new(
        board: CharucoBoard,
        params: CharucoDetectorParams,
    ) -> Result<Self, CharucoDetectError> {
        params.validate()?;
        let aruco = ArucoDetector::new(board.dictionary().clone(), params.aruco.clone());
        Ok(Self {
            board,
            params,
            aruco,
        })
    }

    #[inline]
    pub fn board(&self) -> &CharucoBoard {
        &self.board
    }

    #[inline]
    pub fn params(&self) -> &CharucoDetectorParams {
        &self.params
    }

    /// Detect the board in a grayscale frame.
    ///
    /// Never fails: a frame without a usable board yields an empty result.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, img), fields(w = img.width(), h = img.height()))
    )]
    pub fn detect(&self, img: &GrayImage) -> BoardDetection {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let Some(view) = GrayImageView::new(w, h, img.as_raw()) else {
            return BoardDetection::default();
        };

        let mut markers: Vec<MarkerDetection> = self
            .aruco
            .detect(img)
            .into_iter()
            .filter(|m| (m.id as usize) < self.board.marker_count())
            .collect();
        if markers.is_empty() {
            return BoardDetection::default();
        }

        let p = &self.params;
        let mut pose = None;
        let mut recovered = 0usize;
        if let Some(fit) = fit_board_pose(
            &self.board,
            &markers,
            p.min_markers_for_pose,
            p.max_reprojection_error_rel,
        ) {
            let mut keep = fit.inliers.iter();
            markers.retain(|_| keep.next().copied().unwrap_or(false));
            pose = Some(fit.homography);

            if p.refine_markers {
                let extra = recover_markers(
                    &view,
                    &self.board,
                    &self.aruco,
                    &fit.homography,
                    &markers,
                    p,
                );
                recovered = extra.len();
                if recovered > 0 {
                    markers.extend(extra);
                    markers.sort_by_key(|m| m.id);
                    if let Some(refit) = fit_board_pose(
                        &self.board,
                        &markers,
                        p.min_markers_for_pose,
                        p.max_reprojection_error_rel,
                    ) {
                        pose = Some(refit.homography);
                    }
                }
            }
        }

        let corners = interpolate_corners(&view, &self.board, &markers, p);
        log::debug!(
            "charuco: {} markers ({} recovered), {} corners, pose {}",
            markers.len(),
            recovered,
            corners.len(),
            if pose.is_some() { "yes" } else { "no" }
        );

        BoardDetection {
            markers,
            corners,
            pose,
            recovered_markers: recovered,
        }
    }
}
