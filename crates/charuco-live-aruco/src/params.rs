use serde::{Deserialize, Serialize};

/// Corner refinement applied to decoded markers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerRefine {
    None,
    #[default]
    Subpix,
}

/// Marker detector parameters.
///
/// Names and meanings follow the usual ArUco detector parameters. Defaults
/// are tuned for a 4x4 dictionary viewed by a machine-vision camera.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Smallest adaptive-threshold window (pixels, full side).
    pub adaptive_thresh_win_size_min: u32,
    pub adaptive_thresh_win_size_max: u32,
    pub adaptive_thresh_win_size_step: u32,
    /// Subtracted from the local mean before comparing.
    pub adaptive_thresh_constant: f32,

    /// Candidate perimeter bounds relative to `max(width, height)`.
    pub min_marker_perimeter_rate: f32,
    pub max_marker_perimeter_rate: f32,
    /// Polygon approximation tolerance relative to the contour perimeter.
    pub polygonal_approx_accuracy_rate: f32,
    /// Minimum side length relative to the candidate perimeter.
    pub min_corner_distance_rate: f32,
    /// Candidates with a corner closer than this to the border are dropped.
    pub min_distance_to_border: u32,
    /// Candidates closer than this (mean corner distance / perimeter) merge.
    pub min_marker_distance_rate: f32,

    /// Width of the black marker border in cells.
    pub marker_border_bits: usize,
    /// Sample grid side inside each cell.
    pub perspective_remove_pixel_per_cell: usize,
    /// Fraction of each cell ignored at its edges when sampling.
    pub perspective_remove_ignored_margin_per_cell: f32,
    /// Allowed white border cells relative to `marker_size^2`.
    pub max_erroneous_bits_in_border_rate: f32,
    /// Candidates with a flatter interior are not decoded.
    pub min_otsu_std_dev: f32,
    /// Fraction of the dictionary's correction capability to use.
    pub error_correction_rate: f32,

    pub corner_refinement: CornerRefine,
    /// Half-window for sub-pixel refinement.
    pub corner_refinement_win_size: usize,
    pub corner_refinement_max_iterations: usize,
    pub corner_refinement_min_accuracy: f32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            adaptive_thresh_win_size_min: 5,
            adaptive_thresh_win_size_max: 23,
            adaptive_thresh_win_size_step: 10,
            adaptive_thresh_constant: 7.0,
            min_marker_perimeter_rate: 0.03,
            max_marker_perimeter_rate: 4.0,
            polygonal_approx_accuracy_rate: 0.03,
            min_corner_distance_rate: 0.05,
            min_distance_to_border: 3,
            min_marker_distance_rate: 0.05,
            marker_border_bits: 1,
            perspective_remove_pixel_per_cell: 4,
            perspective_remove_ignored_margin_per_cell: 0.13,
            max_erroneous_bits_in_border_rate: 0.35,
            min_otsu_std_dev: 5.0,
            error_correction_rate: 0.6,
            corner_refinement: CornerRefine::Subpix,
            corner_refinement_win_size: 5,
            corner_refinement_max_iterations: 30,
            corner_refinement_min_accuracy: 0.1,
        }
    }
}

impl DetectorParams {
    /// Threshold window sizes to scan, always at least one.
    pub fn threshold_windows(&self) -> Vec<u32> {
        let min = self.adaptive_thresh_win_size_min.max(3);
        let max = self.adaptive_thresh_win_size_max.max(min);
        let step = self.adaptive_thresh_win_size_step.max(1);
        (min..=max).step_by(step as usize).collect()
    }

    /// Hamming budget for a dictionary with `max_correction_bits`.
    pub fn max_hamming(&self, max_correction_bits: u8) -> u8 {
        (max_correction_bits as f32 * self.error_correction_rate.clamp(0.0, 1.0)).floor() as u8
    }
}
