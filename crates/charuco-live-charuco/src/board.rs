//! Board specification and layout helpers for ChArUco.

use charuco_live_aruco::Dictionary;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Marker placement scheme for the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarkerLayout {
    /// OpenCV-style ChArUco layout:
    /// - the top-left square is black and markers sit on white squares only,
    /// - marker ids run row-major over those squares.
    #[serde(rename = "opencv_charuco")]
    #[default]
    OpenCvCharuco,
}

/// Static ChArUco board geometry.
///
/// `rows`/`cols` are **square counts** (not inner corner counts). Lengths
/// are in arbitrary board units; only their ratios matter for detection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharucoBoardSpec {
    pub rows: u32,
    pub cols: u32,
    pub cell_size: f32,
    /// Marker side divided by square side.
    pub marker_size_rel: f32,
    #[serde(default)]
    pub marker_layout: MarkerLayout,
}

impl Default for CharucoBoardSpec {
    /// 6 x 12 squares of 24 units with 18.75-unit markers.
    fn default() -> Self {
        Self {
            rows: 12,
            cols: 6,
            cell_size: 24.0,
            marker_size_rel: 18.75 / 24.0,
            marker_layout: MarkerLayout::OpenCvCharuco,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CharucoBoardError {
    #[error("rows and cols must be >= 2")]
    InvalidSize,
    #[error("cell_size must be > 0")]
    InvalidCellSize,
    #[error("marker_size_rel must be in (0, 1)")]
    InvalidMarkerSizeRel,
    #[error("board needs {needed} markers, dictionary has {available}")]
    NotEnoughDictionaryCodes { needed: usize, available: usize },
}

/// A validated board with its dictionary and precomputed layout.
#[derive(Clone, Debug)]
pub struct CharucoBoard {
    spec: CharucoBoardSpec,
    dictionary: Dictionary,
    /// Square `(sx, sy)` of each marker id.
    marker_cells: Vec<(u32, u32)>,
    /// Marker id on each square, row-major.
    square_marker: Vec<Option<u32>>,
}

impl CharucoBoard {
    pub fn new(spec: CharucoBoardSpec, dictionary: Dictionary) -> Result<Self, CharucoBoardError> {
        if spec.rows < 2 || spec.cols < 2 {
            return Err(CharucoBoardError::InvalidSize);
        }
        if !spec.cell_size.is_finite() || spec.cell_size <= 0.0 {
            return Err(CharucoBoardError::InvalidCellSize);
        }
        if !spec.marker_size_rel.is_finite()
            || spec.marker_size_rel <= 0.0
            || spec.marker_size_rel >= 1.0
        {
            return Err(CharucoBoardError::InvalidMarkerSizeRel);
        }

        let marker_cells = match spec.marker_layout {
            MarkerLayout::OpenCvCharuco => opencv_marker_cells(spec.rows, spec.cols),
        };
        let needed = marker_cells.len();
        let available = dictionary.codes.len();
        if available < needed {
            return Err(CharucoBoardError::NotEnoughDictionaryCodes { needed, available });
        }

        let mut square_marker = vec![None; (spec.rows * spec.cols) as usize];
        for (id, &(sx, sy)) in marker_cells.iter().enumerate() {
            square_marker[(sy * spec.cols + sx) as usize] = Some(id as u32);
        }

        Ok(Self {
            spec,
            dictionary,
            marker_cells,
            square_marker,
        })
    }

    #[inline]
    pub fn spec(&self) -> &CharucoBoardSpec {
        &self.spec
    }

    #[inline]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    #[inline]
    pub fn marker_count(&self) -> usize {
        self.marker_cells.len()
    }

    /// Number of inner chessboard corners.
    #[inline]
    pub fn corner_count(&self) -> usize {
        ((self.spec.cols - 1) * (self.spec.rows - 1)) as usize
    }

    /// Board extent `(width, height)` in board units.
    pub fn size(&self) -> (f32, f32) {
        (
            self.spec.cols as f32 * self.spec.cell_size,
            self.spec.rows as f32 * self.spec.cell_size,
        )
    }

    /// Marker side in board units.
    #[inline]
    pub fn marker_side(&self) -> f32 {
        self.spec.marker_size_rel * self.spec.cell_size
    }

    /// Square-cell coordinates `(sx, sy)` for the given marker id.
    #[inline]
    pub fn marker_cell(&self, id: u32) -> Option<(u32, u32)> {
        self.marker_cells.get(id as usize).copied()
    }

    /// Marker id printed on square `(sx, sy)`, if any.
    pub fn marker_at(&self, sx: u32, sy: u32) -> Option<u32> {
        if sx >= self.spec.cols || sy >= self.spec.rows {
            return None;
        }
        self.square_marker[(sy * self.spec.cols + sx) as usize]
    }

    /// Marker outline on the board plane: top-left, top-right, bottom-right,
    /// bottom-left.
    pub fn marker_corners(&self, id: u32) -> Option<[Point2<f32>; 4]> {
        let (sx, sy) = self.marker_cell(id)?;
        let c = self.spec.cell_size;
        let m = self.marker_side();
        let off = 0.5 * (c - m);
        let x0 = sx as f32 * c + off;
        let y0 = sy as f32 * c + off;
        Some([
            Point2::new(x0, y0),
            Point2::new(x0 + m, y0),
            Point2::new(x0 + m, y0 + m),
            Point2::new(x0, y0 + m),
        ])
    }

    /// Row-major ChArUco corner id for inner intersection `(ix, iy)`.
    pub fn corner_id(&self, ix: u32, iy: u32) -> Option<u32> {
        if ix == 0 || iy == 0 || ix >= self.spec.cols || iy >= self.spec.rows {
            return None;
        }
        Some((iy - 1) * (self.spec.cols - 1) + (ix - 1))
    }

    /// Intersection `(ix, iy)` of a ChArUco corner id.
    pub fn corner_intersection(&self, id: u32) -> Option<(u32, u32)> {
        if id as usize >= self.corner_count() {
            return None;
        }
        let stride = self.spec.cols - 1;
        Some((id % stride + 1, id / stride + 1))
    }

    /// Board-plane position of a ChArUco corner.
    pub fn corner_position(&self, id: u32) -> Option<Point2<f32>> {
        let (ix, iy) = self.corner_intersection(id)?;
        Some(Point2::new(
            ix as f32 * self.spec.cell_size,
            iy as f32 * self.spec.cell_size,
        ))
    }

    /// Markers on the (up to four, in practice two) squares touching a corner.
    pub fn markers_around_corner(&self, id: u32) -> Vec<u32> {
        let Some((ix, iy)) = self.corner_intersection(id) else {
            return Vec::new();
        };
        [(ix - 1, iy - 1), (ix, iy - 1), (ix - 1, iy), (ix, iy)]
            .into_iter()
            .filter_map(|(sx, sy)| self.marker_at(sx, sy))
            .collect()
    }

    /// Dictionary code printed for marker `id`.
    #[inline]
    pub fn marker_code(&self, id: u32) -> Option<u64> {
        if (id as usize) < self.marker_count() {
            self.dictionary.codes.get(id as usize).copied()
        } else {
            None
        }
    }
}

fn opencv_marker_cells(rows: u32, cols: u32) -> Vec<(u32, u32)> {
    let mut out = Vec::new();
    for sy in 0..rows {
        for sx in 0..cols {
            // top-left square is black, so white squares have odd parity
            if (sx + sy) % 2 == 1 {
                out.push((sx, sy));
            }
        }
    }
    out
}
