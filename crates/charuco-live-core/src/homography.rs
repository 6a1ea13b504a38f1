use nalgebra::{DMatrix, Matrix3, Point2, SMatrix, SVector, Vector3};

/// Planar projective transform `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        Point2::new((v[0] / w) as f32, (v[1] / w) as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }

    /// Estimate `H` such that `dst ~ H * src`.
    ///
    /// Four correspondences are solved exactly; more use a normalized DLT
    /// (least squares via SVD).
    pub fn estimate(src: &[Point2<f32>], dst: &[Point2<f32>]) -> Option<Self> {
        if src.len() != dst.len() || src.len() < 4 {
            return None;
        }
        if src.len() == 4 {
            let s: &[Point2<f32>; 4] = src.try_into().ok()?;
            let d: &[Point2<f32>; 4] = dst.try_into().ok()?;
            return Self::from_4pt(s, d);
        }

        let (s, ts) = normalize_points(src);
        let (d, td) = normalize_points(dst);

        let n = src.len();
        let mut a = DMatrix::<f64>::zeros(2 * n, 9);
        for k in 0..n {
            let (x, y) = (s[k].x, s[k].y);
            let (u, v) = (d[k].x, d[k].y);

            // [ -x -y -1   0  0  0   u*x u*y u ]
            a[(2 * k, 0)] = -x;
            a[(2 * k, 1)] = -y;
            a[(2 * k, 2)] = -1.0;
            a[(2 * k, 6)] = u * x;
            a[(2 * k, 7)] = u * y;
            a[(2 * k, 8)] = u;

            // [ 0  0  0  -x -y -1   v*x v*y v ]
            a[(2 * k + 1, 3)] = -x;
            a[(2 * k + 1, 4)] = -y;
            a[(2 * k + 1, 5)] = -1.0;
            a[(2 * k + 1, 6)] = v * x;
            a[(2 * k + 1, 7)] = v * y;
            a[(2 * k + 1, 8)] = v;
        }

        // Ah = 0: h is the right singular vector of the smallest singular value.
        // n >= 5 gives at least 10 rows, so V^T is the full 9x9.
        let svd = a.svd(false, true);
        let vt = svd.v_t?;
        let (min_idx, _) = svd
            .singular_values
            .iter()
            .enumerate()
            .min_by(|x, y| x.1.total_cmp(y.1))?;
        let h = vt.row(min_idx);
        let hn = Matrix3::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

        denormalize(hn, ts, td).map(Self::new)
    }

    /// Exact homography from four correspondences (corner order must agree).
    pub fn from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Self> {
        // Unknowns: [h11 h12 h13 h21 h22 h23 h31 h32], with h33 = 1
        let (s, ts) = normalize_points(src);
        let (d, td) = normalize_points(dst);

        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();
        for k in 0..4 {
            let (x, y) = (s[k].x, s[k].y);
            let (u, v) = (d[k].x, d[k].y);

            let r0 = 2 * k;
            a[(r0, 0)] = x;
            a[(r0, 1)] = y;
            a[(r0, 2)] = 1.0;
            a[(r0, 6)] = -u * x;
            a[(r0, 7)] = -u * y;
            b[r0] = u;

            let r1 = 2 * k + 1;
            a[(r1, 3)] = x;
            a[(r1, 4)] = y;
            a[(r1, 5)] = 1.0;
            a[(r1, 6)] = -v * x;
            a[(r1, 7)] = -v * y;
            b[r1] = v;
        }

        let x = a.lu().solve(&b)?;
        let hn = Matrix3::new(
            x[0], x[1], x[2], //
            x[3], x[4], x[5], //
            x[6], x[7], 1.0,
        );

        denormalize(hn, ts, td).map(Self::new)
    }

    /// Euclidean distance between `H * src` and `dst`.
    #[inline]
    pub fn reprojection_error(&self, src: Point2<f32>, dst: Point2<f32>) -> f32 {
        let p = self.apply(src);
        (p - dst).norm()
    }
}

// Hartley normalization: centroid at the origin, mean distance sqrt(2).
fn normalize_points(pts: &[Point2<f32>]) -> (Vec<Point2<f64>>, Matrix3<f64>) {
    let n = pts.len().max(1) as f64;
    let (mut cx, mut cy) = (0.0, 0.0);
    for p in pts {
        cx += p.x as f64;
        cy += p.y as f64;
    }
    cx /= n;
    cy /= n;

    let mut mean_dist = 0.0;
    for p in pts {
        let dx = p.x as f64 - cx;
        let dy = p.y as f64 - cy;
        mean_dist += (dx * dx + dy * dy).sqrt();
    }
    mean_dist /= n;

    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);

    let out = pts
        .iter()
        .map(|p| {
            let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
            Point2::new(v[0], v[1])
        })
        .collect();
    (out, t)
}

// H = Td^{-1} * Hn * Ts, scaled so that h33 = 1.
fn denormalize(hn: Matrix3<f64>, ts: Matrix3<f64>, td: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let h = td.try_inverse()? * hn * ts;
    let s = h[(2, 2)];
    if !s.is_finite() || s.abs() < 1e-12 {
        return None;
    }
    Some(h / s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point2<f32>, b: Point2<f32>, tol: f32) {
        assert!(
            (a.x - b.x).abs() < tol && (a.y - b.y).abs() < tol,
            "expected ({:.4},{:.4}) ~ ({:.4},{:.4}) within {}",
            a.x,
            a.y,
            b.x,
            b.y,
            tol
        );
    }

    fn ground_truth() -> Homography {
        Homography::new(Matrix3::new(
            0.8, 0.05, 120.0, //
            -0.02, 1.1, 80.0, //
            0.0009, -0.0004, 1.0,
        ))
    }

    #[test]
    fn inverse_maps_points_back() {
        let h = ground_truth();
        let inv = h.inverse().expect("invertible");
        for p in [
            Point2::new(0.0_f32, 0.0),
            Point2::new(50.0, -20.0),
            Point2::new(320.0, 200.0),
        ] {
            assert_close(inv.apply(h.apply(p)), p, 1e-3);
        }
    }

    #[test]
    fn four_points_recover_exact_transform() {
        let gt = ground_truth();
        let src = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(180.0, 0.0),
            Point2::new(180.0, 130.0),
            Point2::new(0.0, 130.0),
        ];
        let dst = src.map(|p| gt.apply(p));
        let h = Homography::from_4pt(&src, &dst).expect("solvable");
        for p in [Point2::new(60.0_f32, 40.0), Point2::new(150.0, 120.0)] {
            assert_close(h.apply(p), gt.apply(p), 1e-3);
        }
    }

    #[test]
    fn least_squares_fits_grid_of_points() {
        let gt = ground_truth();
        let src: Vec<Point2<f32>> = (0..3)
            .flat_map(|y| (0..4).map(move |x| Point2::new(x as f32 * 40.0, y as f32 * 50.0)))
            .collect();
        let dst: Vec<Point2<f32>> = src.iter().map(|&p| gt.apply(p)).collect();
        let h = Homography::estimate(&src, &dst).expect("estimate");
        for (s, d) in src.iter().zip(&dst) {
            assert!(h.reprojection_error(*s, *d) < 1e-2);
        }
    }

    #[test]
    fn five_points_take_the_dlt_path() {
        let gt = ground_truth();
        let src = vec![
            Point2::new(0.0_f32, 0.0),
            Point2::new(100.0, 0.0),
            Point2::new(100.0, 100.0),
            Point2::new(0.0, 100.0),
            Point2::new(30.0, 60.0),
        ];
        let dst: Vec<Point2<f32>> = src.iter().map(|&p| gt.apply(p)).collect();
        let h = Homography::estimate(&src, &dst).expect("estimate");
        assert_close(h.apply(Point2::new(50.0, 50.0)), gt.apply(Point2::new(50.0, 50.0)), 1e-2);
    }

    #[test]
    fn mismatched_inputs_fail() {
        let src = [Point2::new(0.0_f32, 0.0); 4];
        let dst = [Point2::new(1.0_f32, 1.0); 3];
        assert!(Homography::estimate(&src, &dst).is_none());
    }
}
