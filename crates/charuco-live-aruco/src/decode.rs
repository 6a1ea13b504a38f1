//! Bit sampling inside a candidate quad.

use charuco_live_core::{sample_bilinear, GrayImageView, Homography, Quad};
use nalgebra::Point2;

use crate::threshold::{otsu_threshold_from_samples, std_dev};
use crate::DetectorParams;

/// Raw reading of one candidate, before dictionary lookup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct BitReading {
    /// Inner bits, row-major from the quad's first corner, black = 1.
    pub code: u64,
    /// White cells found in the black border.
    pub border_errors: usize,
}

/// Precomputed sample offsets for a `cells x cells` marker grid.
pub(crate) struct CellSampler {
    marker_size: usize,
    border: usize,
    cells: usize,
    // (cell index, grid-space point) pairs
    taps: Vec<(usize, Point2<f32>)>,
    min_std_dev: f32,
    max_border_errors: usize,
}

impl CellSampler {
    pub fn new(marker_size: usize, params: &DetectorParams) -> Self {
        let border = params.marker_border_bits.max(1);
        let cells = marker_size + 2 * border;
        let per_cell = params.perspective_remove_pixel_per_cell.max(1);
        let margin = params
            .perspective_remove_ignored_margin_per_cell
            .clamp(0.0, 0.45);
        let span = 1.0 - 2.0 * margin;

        let mut taps = Vec::with_capacity(cells * cells * per_cell * per_cell);
        for cy in 0..cells {
            for cx in 0..cells {
                for sy in 0..per_cell {
                    for sx in 0..per_cell {
                        let u = margin + span * (sx as f32 + 0.5) / per_cell as f32;
                        let v = margin + span * (sy as f32 + 0.5) / per_cell as f32;
                        taps.push((cy * cells + cx, Point2::new(cx as f32 + u, cy as f32 + v)));
                    }
                }
            }
        }

        let max_border_errors = ((marker_size * marker_size) as f32
            * params.max_erroneous_bits_in_border_rate)
            .floor() as usize;

        Self {
            marker_size,
            border,
            cells,
            taps,
            min_std_dev: params.min_otsu_std_dev,
            max_border_errors,
        }
    }

    /// Sample the grid mapped onto `quad` (corner 0 is grid top-left).
    pub fn read(&self, img: &GrayImageView<'_>, quad: &Quad) -> Option<BitReading> {
        let n = self.cells as f32;
        let grid = [
            Point2::new(0.0, 0.0),
            Point2::new(n, 0.0),
            Point2::new(n, n),
            Point2::new(0.0, n),
        ];
        let h = Homography::from_4pt(&grid, quad)?;

        let count = self.cells * self.cells;
        let mut sums = vec![0.0f32; count];
        let mut hits = vec![0u32; count];
        for &(cell, p) in &self.taps {
            let q = h.apply(p);
            if !img.contains(q.x, q.y, 0.0) {
                return None;
            }
            sums[cell] += sample_bilinear(img, q.x, q.y);
            hits[cell] += 1;
        }
        let values: Vec<u8> = sums
            .iter()
            .zip(&hits)
            .map(|(&s, &k)| (s / k.max(1) as f32).round().clamp(0.0, 255.0) as u8)
            .collect();

        let inner: Vec<u8> = (self.border..self.border + self.marker_size)
            .flat_map(|y| (self.border..self.border + self.marker_size).map(move |x| (x, y)))
            .map(|(x, y)| values[y * self.cells + x])
            .collect();
        // a flat interior carries no bits
        if std_dev(&inner) < self.min_std_dev {
            return None;
        }

        let t = otsu_threshold_from_samples(&values);
        let is_black = |v: u8| v <= t;

        let mut border_errors = 0usize;
        for y in 0..self.cells {
            for x in 0..self.cells {
                let on_border = x < self.border
                    || y < self.border
                    || x >= self.cells - self.border
                    || y >= self.cells - self.border;
                if on_border && !is_black(values[y * self.cells + x]) {
                    border_errors += 1;
                }
            }
        }
        if border_errors > self.max_border_errors {
            return None;
        }

        let code = inner
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, &v)| acc | ((is_black(v) as u64) << i));
        Some(BitReading {
            code,
            border_errors,
        })
    }
}
