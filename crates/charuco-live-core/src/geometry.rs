use nalgebra::Point2;

/// Four image points of a marker outline.
pub type Quad = [Point2<f32>; 4];

/// Shoelace sum of a closed polygon (twice the signed area).
///
/// In image coordinates (y down) a positive value means the points run
/// clockwise on screen.
pub fn signed_area(pts: &[Point2<f32>]) -> f32 {
    let n = pts.len();
    let mut acc = 0.0f32;
    for i in 0..n {
        let a = pts[i];
        let b = pts[(i + 1) % n];
        acc += a.x * b.y - b.x * a.y;
    }
    0.5 * acc
}

pub fn quad_perimeter(q: &Quad) -> f32 {
    (0..4).map(|i| (q[(i + 1) % 4] - q[i]).norm()).sum()
}

pub fn min_side_length(q: &Quad) -> f32 {
    (0..4)
        .map(|i| (q[(i + 1) % 4] - q[i]).norm())
        .fold(f32::INFINITY, f32::min)
}

/// Reverse the winding if needed so the quad runs clockwise on screen.
pub fn orient_clockwise(mut q: Quad) -> Quad {
    if signed_area(&q) < 0.0 {
        q.swap(1, 3);
    }
    q
}

/// Cyclic shift: `out[k] = q[(k + r) % 4]`.
pub fn rotate_quad(q: &Quad, r: usize) -> Quad {
    std::array::from_fn(|k| q[(k + r) % 4])
}

/// Strict convexity test for a closed polygon.
pub fn is_convex(pts: &[Point2<f32>]) -> bool {
    let n = pts.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0f32;
    for i in 0..n {
        let a = pts[i];
        let b = pts[(i + 1) % n];
        let c = pts[(i + 2) % n];
        let cross = (b - a).perp(&(c - b));
        if cross == 0.0 {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

/// Mean distance between corresponding corners of two quads.
pub fn mean_corner_distance(a: &Quad, b: &Quad) -> f32 {
    a.iter().zip(b).map(|(p, q)| (p - q).norm()).sum::<f32>() / 4.0
}
