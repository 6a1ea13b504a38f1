use charuco_live_aruco::MarkerDetection;
use charuco_live_core::Homography;
use nalgebra::Point2;

/// One identified chessboard intersection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CharucoCorner {
    /// Row-major index over the inner intersections.
    pub id: u32,
    /// Sub-pixel image position.
    pub position: Point2<f32>,
    /// Position on the board plane, in board units.
    pub board: Point2<f32>,
}

/// Output of one board detection. Empty means no board was visible.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoardDetection {
    /// Board markers, sorted by id.
    pub markers: Vec<MarkerDetection>,
    /// Interpolated corners, sorted by id.
    pub corners: Vec<CharucoCorner>,
    /// Board plane to image homography, when enough markers agreed on it.
    pub pose: Option<Homography>,
    /// How many of `markers` were found by board-guided recovery.
    pub recovered_markers: usize,
}

impl BoardDetection {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty() && self.corners.is_empty()
    }

    /// Corner with the lowest id.
    #[inline]
    pub fn top_left(&self) -> Option<&CharucoCorner> {
        self.corners.first()
    }

    /// Corner with the highest id.
    #[inline]
    pub fn bottom_right(&self) -> Option<&CharucoCorner> {
        self.corners.last()
    }
}
