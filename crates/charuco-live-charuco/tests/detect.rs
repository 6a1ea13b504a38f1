use charuco_live_aruco::builtins;
use charuco_live_charuco::{
    BoardDetection, CharucoBoard, CharucoBoardSpec, CharucoDetector, CharucoDetectorParams,
    Dictionary, Homography, MarkerLayout,
};
use image::{GrayImage, Luma};
use nalgebra::{Matrix3, Point2};

const COLS: u32 = 7;
const ROWS: u32 = 5;

fn board() -> CharucoBoard {
    let dict = Dictionary::generate("board-tests", 4, 40, 11).expect("dictionary");
    let spec = CharucoBoardSpec {
        rows: ROWS,
        cols: COLS,
        cell_size: 1.0,
        marker_size_rel: 0.75,
        marker_layout: MarkerLayout::OpenCvCharuco,
    };
    CharucoBoard::new(spec, dict).expect("board")
}

fn detector() -> CharucoDetector {
    CharucoDetector::new(board(), CharucoDetectorParams::default()).expect("detector")
}

/// Board-to-image homography used by `CharucoBoard::render`.
fn fronto(px_per_square: f64, margin: f64) -> Homography {
    Homography::new(Matrix3::new(
        px_per_square, 0.0, margin - 0.5, //
        0.0, px_per_square, margin - 0.5, //
        0.0, 0.0, 1.0,
    ))
}

fn rotated(scale: f64, angle_deg: f64, center: (f64, f64)) -> Homography {
    let (s, c) = angle_deg.to_radians().sin_cos();
    let (bx, by) = (COLS as f64 / 2.0, ROWS as f64 / 2.0);
    let tx = center.0 - scale * (c * bx - s * by);
    let ty = center.1 - scale * (s * bx + c * by);
    Homography::new(Matrix3::new(
        scale * c, -scale * s, tx, //
        scale * s, scale * c, ty, //
        0.0, 0.0, 1.0,
    ))
}

fn board_outline() -> [Point2<f32>; 4] {
    let (w, h) = (COLS as f32, ROWS as f32);
    [
        Point2::new(0.0, 0.0),
        Point2::new(w, 0.0),
        Point2::new(w, h),
        Point2::new(0.0, h),
    ]
}

fn assert_corners_within(res: &BoardDetection, truth: &Homography, tol: f32) {
    for c in &res.corners {
        let expected = truth.apply(c.board);
        let err = (c.position - expected).norm();
        assert!(
            err < tol,
            "corner {} at {:?}, expected {:?} (error {err:.3}px)",
            c.id,
            c.position,
            expected
        );
    }
}

fn assert_sorted_unique(res: &BoardDetection) {
    assert!(res.markers.windows(2).all(|w| w[0].id < w[1].id));
    assert!(res.corners.windows(2).all(|w| w[0].id < w[1].id));
}

#[test]
fn fronto_parallel_board_is_fully_detected() {
    let det = detector();
    let img = det.board().render(60.0, 30);
    let res = det.detect(&img);

    assert_eq!(res.markers.len(), det.board().marker_count());
    assert_eq!(res.corners.len(), det.board().corner_count());
    assert_eq!(res.recovered_markers, 0);
    assert_sorted_unique(&res);

    let truth = fronto(60.0, 30.0);
    assert_corners_within(&res, &truth, 0.5);
    assert_eq!(res.top_left().map(|c| c.id), Some(0));
    assert_eq!(
        res.bottom_right().map(|c| c.id),
        Some(det.board().corner_count() as u32 - 1)
    );

    let pose = res.pose.expect("pose");
    for p in board_outline() {
        assert!((pose.apply(p) - truth.apply(p)).norm() < 1.5);
    }
}

#[test]
fn default_board_with_builtin_dictionary_is_fully_detected() {
    let dict = builtins::builtin_dictionary("LIVE_4X4_1000").expect("builtin dict");
    let board = CharucoBoard::new(CharucoBoardSpec::default(), dict).expect("board");
    let det = CharucoDetector::new(board, CharucoDetectorParams::default()).expect("detector");
    let img = det.board().render(40.0, 30);
    let res = det.detect(&img);

    assert_eq!(res.markers.len(), 36);
    assert_eq!(res.corners.len(), 55);
    assert_sorted_unique(&res);
    assert_corners_within(&res, &fronto(40.0, 30.0), 1.0);
}

#[test]
fn blurred_default_board_keeps_every_corner() {
    let dict = Dictionary::generate("blurred", 4, 40, 11).expect("dictionary");
    let board = CharucoBoard::new(CharucoBoardSpec::default(), dict).expect("board");
    let det = CharucoDetector::new(board, CharucoDetectorParams::default()).expect("detector");
    let sharp = det.board().render(40.0, 30);
    let img = image::imageops::blur(&sharp, 1.2);
    let res = det.detect(&img);

    assert_eq!(res.markers.len(), 36, "markers: {}", res.markers.len());
    assert_eq!(res.corners.len(), 55, "corners: {}", res.corners.len());
    assert_sorted_unique(&res);
    assert_corners_within(&res, &fronto(40.0, 30.0), 3.0);
}

#[test]
fn rotated_board_keeps_corner_ids() {
    let det = detector();
    let truth = rotated(55.0, 25.0, (300.0, 260.0));
    let img = det.board().render_warped(600, 520, &truth);
    let res = det.detect(&img);

    assert!(res.markers.len() >= 15, "markers: {}", res.markers.len());
    assert!(res.corners.len() >= 20, "corners: {}", res.corners.len());
    assert_sorted_unique(&res);
    assert_corners_within(&res, &truth, 0.75);
}

#[test]
fn perspective_view_is_detected() {
    let det = detector();
    let image_quad = [
        Point2::new(80.0, 60.0),
        Point2::new(560.0, 90.0),
        Point2::new(540.0, 420.0),
        Point2::new(100.0, 400.0),
    ];
    let truth = Homography::estimate(&board_outline(), &image_quad).expect("homography");
    let img = det.board().render_warped(640, 480, &truth);
    let res = det.detect(&img);

    assert!(res.markers.len() >= 15, "markers: {}", res.markers.len());
    assert!(res.corners.len() >= 20, "corners: {}", res.corners.len());
    assert!(res.pose.is_some());
    assert_corners_within(&res, &truth, 1.0);
}

#[test]
fn occluded_columns_only_lose_their_own_corners() {
    let det = detector();
    let mut img = det.board().render(60.0, 30);
    // whiten square columns 5 and 6
    let x0 = 30 + 5 * 60;
    for y in 0..img.height() {
        for x in x0..img.width() {
            img.put_pixel(x, y, Luma([255]));
        }
    }
    let res = det.detect(&img);

    assert!(!res.markers.is_empty());
    for m in &res.markers {
        let (sx, _) = det.board().marker_cell(m.id).expect("cell");
        assert!(sx < 5, "marker {} in occluded column {sx}", m.id);
    }
    for c in &res.corners {
        let (ix, _) = det.board().corner_intersection(c.id).expect("intersection");
        assert!(ix <= 4, "corner {} beyond the occluder", c.id);
    }
    assert!(res.corners.len() >= 14, "corners: {}", res.corners.len());
    assert_corners_within(&res, &fronto(60.0, 30.0), 0.5);
}

#[test]
fn blank_frame_yields_empty_result() {
    let det = detector();
    let img = GrayImage::from_pixel(320, 240, Luma([255]));
    let res = det.detect(&img);
    assert!(res.is_empty());
    assert!(res.pose.is_none());
    assert_eq!(res, BoardDetection::default());
}

#[test]
fn tiny_frame_does_not_panic() {
    let det = detector();
    let img = GrayImage::from_pixel(3, 2, Luma([0]));
    assert!(det.detect(&img).is_empty());
}

#[test]
fn detection_is_deterministic() {
    let det = detector();
    let truth = rotated(50.0, -10.0, (260.0, 200.0));
    let img = det.board().render_warped(520, 400, &truth);
    assert_eq!(det.detect(&img), det.detect(&img));
}

#[test]
fn invalid_params_are_rejected() {
    let params = CharucoDetectorParams {
        max_reprojection_error_rel: 0.0,
        ..CharucoDetectorParams::default()
    };
    assert!(CharucoDetector::new(board(), params).is_err());
}
