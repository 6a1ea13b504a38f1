//! Iterative saddle/corner refinement.
//!
//! For every pixel `q` in a window around the estimate `p`, the image
//! gradient `g(q)` is orthogonal to `q - p` when `p` is the true corner.
//! Solving `sum(g g^T) p = sum(g g^T q)` and iterating converges to it.

use nalgebra::{Matrix2, Point2, Vector2};

use crate::image::{sample_bilinear, GrayImageView};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubpixParams {
    /// Window is `(2 * half_window + 1)^2` pixels.
    pub half_window: usize,
    pub max_iters: usize,
    /// Stop once an update moves the point less than this (pixels).
    pub epsilon: f32,
}

impl Default for SubpixParams {
    fn default() -> Self {
        Self {
            half_window: 5,
            max_iters: 30,
            epsilon: 0.1,
        }
    }
}

/// Refine `start` to subpixel accuracy.
///
/// Returns `None` when the gradient system is degenerate or the estimate
/// wanders outside the search window.
pub fn refine_corner_subpix(
    img: &GrayImageView<'_>,
    start: Point2<f32>,
    params: &SubpixParams,
) -> Option<Point2<f32>> {
    if params.half_window == 0 || img.width < 3 || img.height < 3 {
        return Some(start);
    }
    let hw = params.half_window as i32;
    let sigma = params.half_window as f32 * 0.5 + 0.5;
    let inv_two_sigma2 = 1.0 / (2.0 * sigma * sigma);
    let eps2 = params.epsilon * params.epsilon;

    let mut p = start;
    for _ in 0..params.max_iters.max(1) {
        let mut a = Matrix2::<f32>::zeros();
        let mut b = Vector2::<f32>::zeros();

        for dy in -hw..=hw {
            for dx in -hw..=hw {
                let qx = p.x + dx as f32;
                let qy = p.y + dy as f32;
                let gx = 0.5
                    * (sample_bilinear(img, qx + 1.0, qy) - sample_bilinear(img, qx - 1.0, qy));
                let gy = 0.5
                    * (sample_bilinear(img, qx, qy + 1.0) - sample_bilinear(img, qx, qy - 1.0));
                let w = (-((dx * dx + dy * dy) as f32) * inv_two_sigma2).exp();

                let gxx = w * gx * gx;
                let gxy = w * gx * gy;
                let gyy = w * gy * gy;
                a[(0, 0)] += gxx;
                a[(0, 1)] += gxy;
                a[(1, 0)] += gxy;
                a[(1, 1)] += gyy;
                b[0] += gxx * qx + gxy * qy;
                b[1] += gxy * qx + gyy * qy;
            }
        }

        if a.determinant().abs() < 1e-6 {
            return None;
        }
        let next = a.try_inverse()? * b;
        let next = Point2::new(next[0], next[1]);
        let step = (next - p).norm_squared();
        p = next;

        if (p - start).abs().max() > params.half_window as f32 {
            return None;
        }
        if step < eps2 {
            break;
        }
    }

    p.coords.iter().all(|v| v.is_finite()).then_some(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Checkerboard junction at (cx, cy) with a smooth 1px ramp.
    fn junction(w: usize, h: usize, cx: f32, cy: f32) -> Vec<u8> {
        let mut out = vec![0u8; w * h];
        for y in 0..h {
            for x in 0..w {
                let sx = ((x as f32 + 0.5 - cx) * 1.5).clamp(-1.0, 1.0);
                let sy = ((y as f32 + 0.5 - cy) * 1.5).clamp(-1.0, 1.0);
                out[y * w + x] = (127.5 + 127.5 * sx * sy) as u8;
            }
        }
        out
    }

    #[test]
    fn converges_to_junction() {
        let (w, h) = (40, 40);
        let data = junction(w, h, 20.3, 19.6);
        let img = GrayImageView::new(w, h, &data).unwrap();
        let p = refine_corner_subpix(&img, Point2::new(21.5, 18.5), &SubpixParams::default())
            .expect("refined");
        assert!((p.x - 19.8).abs() < 0.35, "x = {}", p.x);
        assert!((p.y - 19.1).abs() < 0.35, "y = {}", p.y);
    }

    #[test]
    fn flat_patch_is_rejected() {
        let data = vec![128u8; 30 * 30];
        let img = GrayImageView::new(30, 30, &data).unwrap();
        let p = refine_corner_subpix(&img, Point2::new(15.0, 15.0), &SubpixParams::default());
        assert!(p.is_none());
    }
}
