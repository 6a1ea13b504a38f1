use charuco_live_aruco::DetectorParams;
use serde::{Deserialize, Serialize};

use super::CharucoDetectError;

/// Configuration for the ChArUco detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharucoDetectorParams {
    /// Marker detection parameters.
    pub aruco: DetectorParams,

    /// Markers needed before the board homography is trusted for outlier
    /// rejection and marker recovery.
    pub min_markers_for_pose: usize,
    /// Markers whose mean corner reprojection error exceeds this fraction of
    /// the median marker side are discarded as misdetections.
    pub max_reprojection_error_rel: f32,

    /// Decode board markers the homography predicts but the detector missed.
    pub refine_markers: bool,
    /// Recovered markers must land within this fraction of their side from
    /// the prediction after corner refinement.
    pub recovery_max_shift_rel: f32,
    /// Predicted markers smaller than this (pixels per side) are skipped.
    pub recovery_min_side_px: f32,

    /// A ChArUco corner needs this many detected neighbouring markers (1 or 2).
    pub min_adjacent_markers: usize,
    /// Sub-pixel refine interpolated corners.
    pub refine_corners: bool,
    /// Upper bound for the per-corner refinement half-window.
    pub corner_max_half_window: usize,
    pub corner_max_iterations: usize,
    pub corner_min_accuracy: f32,
}

impl Default for CharucoDetectorParams {
    fn default() -> Self {
        Self {
            aruco: DetectorParams::default(),
            min_markers_for_pose: 2,
            max_reprojection_error_rel: 0.2,
            refine_markers: true,
            recovery_max_shift_rel: 0.25,
            recovery_min_side_px: 8.0,
            min_adjacent_markers: 2,
            refine_corners: true,
            corner_max_half_window: 8,
            corner_max_iterations: 30,
            corner_min_accuracy: 0.01,
        }
    }
}

impl CharucoDetectorParams {
    pub fn validate(&self) -> Result<(), CharucoDetectError> {
        if !(1..=2).contains(&self.min_adjacent_markers) {
            return invalid("min_adjacent_markers", "must be 1 or 2");
        }
        if self.min_markers_for_pose == 0 {
            return invalid("min_markers_for_pose", "must be at least 1");
        }
        if !self.max_reprojection_error_rel.is_finite() || self.max_reprojection_error_rel <= 0.0 {
            return invalid("max_reprojection_error_rel", "must be positive");
        }
        if !self.recovery_max_shift_rel.is_finite() || self.recovery_max_shift_rel <= 0.0 {
            return invalid("recovery_max_shift_rel", "must be positive");
        }
        if self.corner_max_half_window == 0 {
            return invalid("corner_max_half_window", "must be at least 1");
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &'static str) -> Result<(), CharucoDetectError> {
    Err(CharucoDetectError::InvalidParams { field, reason })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        CharucoDetectorParams::default().validate().expect("valid");
    }

    #[test]
    fn rejects_out_of_range_adjacency() {
        let p = CharucoDetectorParams {
            min_adjacent_markers: 3,
            ..CharucoDetectorParams::default()
        };
        assert!(matches!(
            p.validate(),
            Err(CharucoDetectError::InvalidParams {
                field: "min_adjacent_markers",
                ..
            })
        ));
    }

    #[test]
    fn nested_aruco_params_parse_partially() {
        let p: CharucoDetectorParams = serde_json::from_str(
            r#"{"aruco": {"min_otsu_std_dev": 3.0}, "refine_markers": false}"#,
        )
        .expect("parse");
        assert_eq!(p.aruco.min_otsu_std_dev, 3.0);
        assert_eq!(p.aruco.adaptive_thresh_win_size_max, 23);
        assert!(!p.refine_markers);
        assert_eq!(p.min_adjacent_markers, 2);
    }
}
