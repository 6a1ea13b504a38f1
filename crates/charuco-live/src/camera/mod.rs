//! Frame sources: V4L2 cameras (feature `v4l`) and image-directory replay.
//!
//! Sources own their device handle; dropping a source releases it.

use std::path::PathBuf;
use std::time::Duration;

use crate::Frame;

mod replay;
#[cfg(feature = "v4l")]
mod v4l2;

pub use replay::ReplaySource;

/// Default frame grab timeout.
pub const DEFAULT_GRAB_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(thiserror::Error, Debug)]
pub enum AcquisitionError {
    #[error("no cameras attached")]
    NoCameras,
    #[error("no camera with serial {serial:?}")]
    NotFound { serial: String },
    #[error("no frame within {0:?}")]
    Timeout(Duration),
    #[error("camera {serial} disconnected: {reason}")]
    Disconnected { serial: String, reason: String },
    #[error("unsupported pixel format {0}")]
    UnsupportedFormat(String),
    #[error("failed to decode frame: {0}")]
    Decode(String),
    #[error("end of stream")]
    EndOfStream,
    #[error("camera support not built in (enable the `v4l` feature)")]
    BackendUnavailable,
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Anything that yields frames one at a time.
pub trait FrameSource {
    /// Identifier used in window titles and snapshot names.
    fn serial(&self) -> &str;

    /// Block until the next frame is available.
    fn grab(&mut self) -> Result<Frame, AcquisitionError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn serial(&self) -> &str {
        (**self).serial()
    }

    fn grab(&mut self) -> Result<Frame, AcquisitionError> {
        (**self).grab()
    }
}

/// Which attached camera to open.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CameraSelector {
    #[default]
    First,
    Serial(String),
}

impl CameraSelector {
    pub fn from_serial(serial: Option<String>) -> Self {
        serial.map_or(Self::First, Self::Serial)
    }

    pub fn matches(&self, info: &CameraInfo) -> bool {
        match self {
            Self::First => true,
            Self::Serial(s) => info.serial == *s,
        }
    }
}

/// An attached capture device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraInfo {
    pub serial: String,
    pub name: String,
    pub path: PathBuf,
}

/// Attached capture devices, in device-node order.
pub fn list_cameras() -> Result<Vec<CameraInfo>, AcquisitionError> {
    #[cfg(feature = "v4l")]
    {
        v4l2::list()
    }
    #[cfg(not(feature = "v4l"))]
    {
        Err(AcquisitionError::BackendUnavailable)
    }
}

/// Open the selected camera. Fails before any frame is grabbed when the
/// selection matches nothing.
pub fn open_camera(
    selector: &CameraSelector,
    timeout: Duration,
) -> Result<Box<dyn FrameSource>, AcquisitionError> {
    #[cfg(feature = "v4l")]
    {
        let camera = v4l2::V4lCamera::open(selector, timeout)?;
        Ok(Box::new(camera))
    }
    #[cfg(not(feature = "v4l"))]
    {
        log::error!("cannot open {selector:?} with a {timeout:?} timeout: no camera backend");
        Err(AcquisitionError::BackendUnavailable)
    }
}

/// Pick the device `selector` asks for.
#[cfg_attr(not(feature = "v4l"), allow(dead_code))]
pub(crate) fn select<'a>(
    selector: &CameraSelector,
    cameras: &'a [CameraInfo],
) -> Result<&'a CameraInfo, AcquisitionError> {
    if cameras.is_empty() {
        return Err(AcquisitionError::NoCameras);
    }
    cameras
        .iter()
        .find(|c| selector.matches(c))
        .ok_or_else(|| match selector {
            CameraSelector::Serial(serial) => AcquisitionError::NotFound {
                serial: serial.clone(),
            },
            CameraSelector::First => AcquisitionError::NoCameras,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cam(serial: &str) -> CameraInfo {
        CameraInfo {
            serial: serial.to_string(),
            name: "test".to_string(),
            path: PathBuf::from(format!("/dev/{serial}")),
        }
    }

    #[test]
    fn selects_first_or_by_serial() {
        let cams = [cam("a1"), cam("b2")];
        let first = select(&CameraSelector::First, &cams).expect("first");
        assert_eq!(first.serial, "a1");
        let by_serial = select(&CameraSelector::Serial("b2".into()), &cams).expect("b2");
        assert_eq!(by_serial.serial, "b2");
    }

    #[test]
    fn unknown_serial_or_no_devices_fail() {
        let cams = [cam("a1")];
        let err = select(&CameraSelector::Serial("zz".into()), &cams).expect_err("missing");
        assert!(matches!(err, AcquisitionError::NotFound { ref serial } if serial == "zz"));
        let err = select(&CameraSelector::First, &[]).expect_err("empty");
        assert!(matches!(err, AcquisitionError::NoCameras));
    }

    #[test]
    fn selector_from_optional_serial() {
        assert_eq!(CameraSelector::from_serial(None), CameraSelector::First);
        assert_eq!(
            CameraSelector::from_serial(Some("x".into())),
            CameraSelector::Serial("x".into())
        );
    }
}
