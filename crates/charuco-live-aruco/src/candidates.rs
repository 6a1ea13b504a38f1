//! Quadrilateral marker candidates from thresholded contours.

use charuco_live_core::{
    is_convex, mean_corner_distance, orient_clockwise, quad_perimeter, rotate_quad, Quad,
};
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use nalgebra::Point2;

use crate::threshold::adaptive_threshold_inv;
use crate::DetectorParams;

/// A convex quad, clockwise on screen, starting at the corner nearest the
/// image origin.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Candidate {
    pub corners: Quad,
    pub perimeter: f32,
}

/// Collect candidates over all threshold windows and merge duplicates.
pub(crate) fn find_candidates(img: &GrayImage, params: &DetectorParams) -> Vec<Candidate> {
    let max_dim = img.width().max(img.height()) as f32;
    let min_perimeter = params.min_marker_perimeter_rate * max_dim;
    let max_perimeter = params.max_marker_perimeter_rate * max_dim;

    let mut all = Vec::new();
    for win in params.threshold_windows() {
        let bin = adaptive_threshold_inv(img, win, params.adaptive_thresh_constant);
        let before = all.len();
        // dark blobs are foreground; their outer borders are the marker outlines
        for contour in find_contours::<i32>(&bin) {
            if contour.border_type != BorderType::Outer {
                continue;
            }
            let n = contour.points.len() as f32;
            if n < min_perimeter || n > max_perimeter {
                continue;
            }
            if let Some(c) = quad_from_contour(&contour.points, img, params) {
                all.push(c);
            }
        }
        log::trace!("threshold window {win}: {} quads", all.len() - before);
    }

    merge_close(all, params.min_marker_distance_rate)
}

fn quad_from_contour(
    points: &[Point<i32>],
    img: &GrayImage,
    params: &DetectorParams,
) -> Option<Candidate> {
    let eps = arc_length(points, true) * params.polygonal_approx_accuracy_rate as f64;
    let poly = approximate_closed(points, eps)?;
    if poly.len() != 4 || !is_convex(&poly) {
        return None;
    }
    let quad: Quad = [poly[0], poly[1], poly[2], poly[3]];
    let perimeter = quad_perimeter(&quad);

    let min_side = params.min_corner_distance_rate * perimeter;
    for i in 0..4 {
        if (quad[(i + 1) % 4] - quad[i]).norm() < min_side {
            return None;
        }
    }

    let margin = params.min_distance_to_border as f32;
    let (w, h) = (img.width() as f32, img.height() as f32);
    if quad
        .iter()
        .any(|p| p.x < margin || p.y < margin || p.x > w - 1.0 - margin || p.y > h - 1.0 - margin)
    {
        return None;
    }

    let quad = orient_clockwise(quad);
    let start = (0..4)
        .min_by(|&a, &b| (quad[a].x + quad[a].y).total_cmp(&(quad[b].x + quad[b].y)))
        .unwrap_or(0);
    Some(Candidate {
        corners: rotate_quad(&quad, start),
        perimeter,
    })
}

/// Douglas-Peucker on a closed contour.
///
/// The contour is split at two extreme points (the farthest point from the
/// start, then the farthest from that) so both halves start and end at
/// true vertices.
fn approximate_closed(points: &[Point<i32>], eps: f64) -> Option<Vec<Point2<f32>>> {
    if points.len() < 4 || eps <= 0.0 {
        return None;
    }
    let farthest_from = |i: usize| -> usize {
        let o = points[i];
        let mut best = (0i64, i);
        for (j, p) in points.iter().enumerate() {
            let dx = (p.x - o.x) as i64;
            let dy = (p.y - o.y) as i64;
            let d = dx * dx + dy * dy;
            if d > best.0 {
                best = (d, j);
            }
        }
        best.1
    };
    let a = farthest_from(0);
    let b = farthest_from(a);
    if a == b {
        return None;
    }

    let n = points.len();
    let walk = |from: usize, to: usize| -> Vec<Point<i32>> {
        let len = (to + n - from) % n;
        (0..=len).map(|k| points[(from + k) % n]).collect()
    };
    let first = approximate_polygon_dp(&walk(a, b), eps, false);
    let second = approximate_polygon_dp(&walk(b, a), eps, false);

    // each half ends where the other begins
    let out = first[..first.len() - 1]
        .iter()
        .chain(&second[..second.len() - 1])
        .map(|p| Point2::new(p.x as f32, p.y as f32))
        .collect();
    Some(out)
}

/// Merge candidates describing the same marker, keeping the larger one.
fn merge_close(mut cands: Vec<Candidate>, rate: f32) -> Vec<Candidate> {
    cands.sort_by(|a, b| b.perimeter.total_cmp(&a.perimeter));
    let mut kept: Vec<Candidate> = Vec::with_capacity(cands.len());
    'outer: for c in cands {
        for k in &kept {
            let limit = rate * c.perimeter.min(k.perimeter);
            let d = (0..4)
                .map(|r| mean_corner_distance(&rotate_quad(&c.corners, r), &k.corners))
                .fold(f32::INFINITY, f32::min);
            if d < limit {
                continue 'outer;
            }
        }
        kept.push(c);
    }
    kept
}
