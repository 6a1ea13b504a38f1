//! Rasterization of ideal boards, for printing and synthetic tests.

use charuco_live_core::Homography;
use image::{GrayImage, Luma};
use nalgebra::{Matrix3, Point2};

use crate::CharucoBoard;

const BLACK: f32 = 0.0;
const WHITE: f32 = 255.0;

impl CharucoBoard {
    /// Intensity of the printed board at a board-plane point, `None` off the board.
    pub fn intensity_at(&self, p: Point2<f32>) -> Option<u8> {
        let (w, h) = self.size();
        if p.x < 0.0 || p.y < 0.0 || p.x >= w || p.y >= h {
            return None;
        }
        let c = self.spec().cell_size;
        let sx = ((p.x / c) as u32).min(self.spec().cols - 1);
        let sy = ((p.y / c) as u32).min(self.spec().rows - 1);
        let Some(id) = self.marker_at(sx, sy) else {
            // squares without a marker are the black ones
            return Some(BLACK as u8);
        };
        let Some(code) = self.marker_code(id) else {
            return Some(WHITE as u8);
        };

        let m = self.marker_side();
        let off = 0.5 * (c - m);
        let u = p.x - sx as f32 * c - off;
        let v = p.y - sy as f32 * c - off;
        if u < 0.0 || v < 0.0 || u >= m || v >= m {
            return Some(WHITE as u8);
        }
        let n = self.dictionary().marker_size;
        let cells = n + 2;
        let cx = ((u / m * cells as f32) as usize).min(cells - 1);
        let cy = ((v / m * cells as f32) as usize).min(cells - 1);
        let border = cx == 0 || cy == 0 || cx == cells - 1 || cy == cells - 1;
        let black = border || (code >> ((cy - 1) * n + (cx - 1))) & 1 == 1;
        Some(if black { BLACK as u8 } else { WHITE as u8 })
    }

    /// Fronto-parallel rendering with `px_per_square` pixels per square and
    /// a white margin around the board.
    pub fn render(&self, px_per_square: f32, margin_px: u32) -> GrayImage {
        let (bw, bh) = self.size();
        let scale = px_per_square / self.spec().cell_size;
        let w = (bw * scale).round() as u32 + 2 * margin_px;
        let h = (bh * scale).round() as u32 + 2 * margin_px;
        let m = margin_px as f64;
        let s = scale as f64;
        // pixel centers sit at integer coordinates, so the board's top-left
        // corner lands on the edge of pixel `margin_px`
        let board_to_image = Homography::new(Matrix3::new(
            s, 0.0, m - 0.5, //
            0.0, s, m - 0.5, //
            0.0, 0.0, 1.0,
        ));
        self.render_warped(w, h, &board_to_image)
    }

    /// Render the board seen through `board_to_image` onto a white canvas,
    /// 4x4 supersampled.
    ///
    /// Returns a blank canvas if the homography is singular.
    pub fn render_warped(&self, width: u32, height: u32, board_to_image: &Homography) -> GrayImage {
        let Some(inv) = board_to_image.inverse() else {
            return GrayImage::from_pixel(width, height, Luma([WHITE as u8]));
        };
        const SS: usize = 4;
        let offsets: Vec<f32> = (0..SS).map(|k| (k as f32 + 0.5) / SS as f32 - 0.5).collect();

        GrayImage::from_fn(width, height, |x, y| {
            let mut acc = 0.0f32;
            for &dy in &offsets {
                for &dx in &offsets {
                    let p = inv.apply(Point2::new(x as f32 + dx, y as f32 + dy));
                    acc += self.intensity_at(p).map_or(WHITE, f32::from);
                }
            }
            Luma([(acc / (SS * SS) as f32).round() as u8])
        })
    }
}
