use std::collections::VecDeque;
use std::fs;
use std::time::Duration;

use charuco_live::camera::{open_camera, AcquisitionError, CameraSelector, FrameSource};
use charuco_live::charuco::{
    CharucoBoard, CharucoBoardSpec, CharucoDetector, CharucoDetectorParams, Dictionary,
    MarkerLayout,
};
use charuco_live::display::{Display, DisplayError, KeyCommand};
use charuco_live::session::{self, SessionError, SessionOptions, SessionSummary};
use charuco_live::{Frame, SnapshotWriter};
use image::{DynamicImage, Rgb, RgbImage};

fn board() -> CharucoBoard {
    let dict = Dictionary::generate("session", 4, 40, 3).expect("dictionary");
    let spec = CharucoBoardSpec {
        rows: 5,
        cols: 7,
        cell_size: 1.0,
        marker_size_rel: 0.75,
        marker_layout: MarkerLayout::OpenCvCharuco,
    };
    CharucoBoard::new(spec, dict).expect("board")
}

fn detector() -> CharucoDetector {
    CharucoDetector::new(board(), CharucoDetectorParams::default()).expect("detector")
}

fn board_frame() -> RgbImage {
    DynamicImage::ImageLuma8(board().render(60.0, 30)).to_rgb8()
}

fn blank_frame(v: u8) -> RgbImage {
    RgbImage::from_pixel(64, 48, Rgb([v, v, v]))
}

/// Serves a fixed list of results and counts grabs.
struct ScriptedSource {
    items: VecDeque<Result<RgbImage, AcquisitionError>>,
    grabbed: usize,
}

impl ScriptedSource {
    fn frames(images: Vec<RgbImage>) -> Self {
        Self {
            items: images.into_iter().map(Ok).collect(),
            grabbed: 0,
        }
    }
}

impl FrameSource for ScriptedSource {
    fn serial(&self) -> &str {
        "cam-01"
    }

    fn grab(&mut self) -> Result<Frame, AcquisitionError> {
        let item = self.items.pop_front().unwrap_or(Err(AcquisitionError::EndOfStream))?;
        let frame = Frame::new(self.grabbed as u64, item);
        self.grabbed += 1;
        Ok(frame)
    }
}

/// Records what was shown; delivers scripted keys after each frame.
#[derive(Default)]
struct ScriptedDisplay {
    keys_per_frame: VecDeque<Vec<KeyCommand>>,
    pending: VecDeque<KeyCommand>,
    shown: Vec<(String, RgbImage)>,
    close_after: Option<usize>,
}

impl ScriptedDisplay {
    fn with_keys(keys: Vec<Vec<KeyCommand>>) -> Self {
        Self {
            keys_per_frame: keys.into(),
            ..Self::default()
        }
    }
}

impl Display for ScriptedDisplay {
    fn show(&mut self, title: &str, image: &RgbImage) -> Result<(), DisplayError> {
        self.shown.push((title.to_string(), image.clone()));
        if let Some(keys) = self.keys_per_frame.pop_front() {
            self.pending.extend(keys);
        }
        Ok(())
    }

    fn poll_key(&mut self) -> Option<KeyCommand> {
        self.pending.pop_front()
    }

    fn is_open(&self) -> bool {
        self.close_after.is_none_or(|n| self.shown.len() < n)
    }
}

fn run(
    source: &mut ScriptedSource,
    display: &mut ScriptedDisplay,
    snapshots: &SnapshotWriter,
    options: SessionOptions,
) -> Result<SessionSummary, SessionError> {
    session::run(source, &detector(), display, snapshots, options)
}

const STOP_AT_END: SessionOptions = SessionOptions {
    save_annotated: false,
    stop_at_end_of_stream: true,
};

#[test]
fn quit_ends_the_loop_before_the_next_grab() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut source = ScriptedSource::frames(vec![blank_frame(200); 5]);
    let mut display = ScriptedDisplay::with_keys(vec![vec![], vec![KeyCommand::Quit]]);
    let snapshots = SnapshotWriter::new(dir.path(), source.serial());

    let summary =
        run(&mut source, &mut display, &snapshots, SessionOptions::default()).expect("run");
    assert_eq!(summary.frames, 2);
    assert_eq!(source.grabbed, 2);
    assert_eq!(display.shown.len(), 2);
}

#[test]
fn save_writes_exactly_one_lossless_raw_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let raw = board_frame();
    let mut source = ScriptedSource::frames(vec![raw.clone(), blank_frame(10)]);
    let mut display =
        ScriptedDisplay::with_keys(vec![vec![KeyCommand::Save], vec![KeyCommand::Quit]]);
    let snapshots = SnapshotWriter::new(dir.path(), source.serial());

    let summary =
        run(&mut source, &mut display, &snapshots, SessionOptions::default()).expect("run");
    assert_eq!(summary.snapshots, 1);
    assert_eq!(summary.saved, vec![dir.path().join("cam-01.raw.0000.png")]);

    let files: Vec<_> = fs::read_dir(dir.path())
        .expect("ls")
        .map(|e| e.expect("entry").path())
        .collect();
    assert_eq!(files.len(), 1);
    assert_eq!(
        files[0].file_name().and_then(|n| n.to_str()),
        Some("cam-01.raw.0000.png")
    );
    // the raw frame is saved, not the annotated one
    let back = image::open(&files[0]).expect("reload").to_rgb8();
    assert_eq!(back, raw);
    assert_ne!(display.shown[0].1, raw);
}

#[test]
fn save_and_quit_in_one_frame_saves_then_quits() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut source = ScriptedSource::frames(vec![blank_frame(50); 3]);
    let mut display =
        ScriptedDisplay::with_keys(vec![vec![KeyCommand::Save, KeyCommand::Quit]]);
    let snapshots = SnapshotWriter::new(dir.path(), source.serial());

    let summary =
        run(&mut source, &mut display, &snapshots, SessionOptions::default()).expect("run");
    assert_eq!((summary.frames, summary.snapshots), (1, 1));
}

#[test]
fn annotated_snapshot_only_with_a_board() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut source = ScriptedSource::frames(vec![blank_frame(90), board_frame()]);
    let mut display = ScriptedDisplay::with_keys(vec![
        vec![KeyCommand::Save],
        vec![KeyCommand::Save, KeyCommand::Quit],
    ]);
    let snapshots = SnapshotWriter::new(dir.path(), source.serial());
    let options = SessionOptions {
        save_annotated: true,
        ..SessionOptions::default()
    };

    let summary = run(&mut source, &mut display, &snapshots, options).expect("run");
    assert_eq!(summary.snapshots, 2);
    assert_eq!(summary.frames_with_board, 1);
    assert!(dir.path().join("cam-01.raw.0000.png").is_file());
    assert!(!dir.path().join("cam-01.charuco.0000.png").exists());
    assert!(dir.path().join("cam-01.raw.0001.png").is_file());
    assert!(dir.path().join("cam-01.charuco.0001.png").is_file());
    assert_eq!(
        summary.saved,
        vec![
            dir.path().join("cam-01.raw.0000.png"),
            dir.path().join("cam-01.raw.0001.png"),
            dir.path().join("cam-01.charuco.0001.png"),
        ]
    );
}

#[test]
fn frames_without_a_board_are_shown_unmodified() {
    let dir = tempfile::tempdir().expect("tempdir");
    let frames = vec![blank_frame(30), blank_frame(220)];
    let mut source = ScriptedSource::frames(frames.clone());
    let mut display = ScriptedDisplay::default();
    let snapshots = SnapshotWriter::new(dir.path(), source.serial());

    let summary = run(&mut source, &mut display, &snapshots, STOP_AT_END).expect("run");
    assert_eq!(summary.frames, 2);
    assert_eq!(summary.frames_with_board, 0);
    let shown: Vec<RgbImage> = display.shown.into_iter().map(|(_, img)| img).collect();
    assert_eq!(shown, frames);
}

#[test]
fn board_frames_are_annotated_and_counted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let raw = board_frame();
    let mut source = ScriptedSource::frames(vec![raw.clone()]);
    let mut display = ScriptedDisplay::default();
    let snapshots = SnapshotWriter::new(dir.path(), source.serial());

    let summary = run(&mut source, &mut display, &snapshots, STOP_AT_END).expect("run");
    assert_eq!(summary.frames_with_board, 1);
    assert_ne!(display.shown[0].1, raw);
}

#[test]
fn window_title_carries_serial_and_illumination() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut source = ScriptedSource::frames(vec![blank_frame(100)]);
    let mut display = ScriptedDisplay::default();
    let snapshots = SnapshotWriter::new(dir.path(), source.serial());

    run(&mut source, &mut display, &snapshots, STOP_AT_END).expect("run");
    assert_eq!(
        display.shown[0].0,
        "Camera cam-01 | 5% / 50% / 95%: 100.0 / 100.0 / 100.0"
    );
}

#[test]
fn acquisition_failure_is_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut source = ScriptedSource {
        items: VecDeque::from(vec![
            Ok(blank_frame(1)),
            Err(AcquisitionError::Timeout(Duration::from_millis(5000))),
            Ok(blank_frame(2)),
        ]),
        grabbed: 0,
    };
    let mut display = ScriptedDisplay::default();
    let snapshots = SnapshotWriter::new(dir.path(), source.serial());

    let err = run(&mut source, &mut display, &snapshots, STOP_AT_END).expect_err("timeout");
    assert!(matches!(
        err,
        SessionError::Acquisition(AcquisitionError::Timeout(_))
    ));
    assert_eq!(display.shown.len(), 1);
    assert_eq!(source.items.len(), 1);
}

#[test]
fn end_of_stream_is_fatal_unless_expected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let snapshots = SnapshotWriter::new(dir.path(), "cam-01");

    let mut source = ScriptedSource::frames(vec![blank_frame(5)]);
    let err = run(
        &mut source,
        &mut ScriptedDisplay::default(),
        &snapshots,
        SessionOptions::default(),
    )
    .expect_err("end of stream");
    assert!(matches!(
        err,
        SessionError::Acquisition(AcquisitionError::EndOfStream)
    ));

    let mut source = ScriptedSource::frames(vec![blank_frame(5)]);
    let summary = run(
        &mut source,
        &mut ScriptedDisplay::default(),
        &snapshots,
        STOP_AT_END,
    )
    .expect("clean end");
    assert_eq!(summary.frames, 1);
}

#[test]
fn snapshot_failure_is_reported_and_the_loop_continues() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, b"x").expect("write");
    let mut source = ScriptedSource::frames(vec![blank_frame(7); 3]);
    let mut display = ScriptedDisplay::with_keys(vec![
        vec![KeyCommand::Save],
        vec![],
        vec![KeyCommand::Quit],
    ]);
    let snapshots = SnapshotWriter::new(&blocker, source.serial());

    let summary =
        run(&mut source, &mut display, &snapshots, SessionOptions::default()).expect("run");
    assert_eq!(summary.snapshot_failures, 1);
    assert!(summary.saved.is_empty());
    assert_eq!(summary.snapshots, 0);
    assert_eq!(summary.frames, 3);
}

#[test]
fn closing_the_window_stops_grabbing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut source = ScriptedSource::frames(vec![blank_frame(9); 10]);
    let mut display = ScriptedDisplay {
        close_after: Some(4),
        ..ScriptedDisplay::default()
    };
    let snapshots = SnapshotWriter::new(dir.path(), source.serial());

    let summary =
        run(&mut source, &mut display, &snapshots, SessionOptions::default()).expect("run");
    assert_eq!(summary.frames, 4);
    assert_eq!(source.grabbed, 4);
}

#[test]
fn identical_frames_give_identical_overlays() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut source = ScriptedSource::frames(vec![board_frame(), board_frame()]);
    let mut display = ScriptedDisplay::default();
    let snapshots = SnapshotWriter::new(dir.path(), source.serial());

    run(&mut source, &mut display, &snapshots, STOP_AT_END).expect("run");
    assert_eq!(display.shown[0].1, display.shown[1].1);
}

#[test]
fn unknown_camera_fails_before_any_frame() {
    let selector = CameraSelector::Serial("no-such-camera-0000".into());
    assert!(open_camera(&selector, Duration::from_millis(10)).is_err());
}
