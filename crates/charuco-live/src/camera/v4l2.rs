//! V4L2 capture through the `v4l` crate.

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use image::{ImageFormat, RgbImage};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

use super::{select, AcquisitionError, CameraInfo, CameraSelector, FrameSource};
use crate::Frame;

/// Pixel formats we can convert, in order of preference.
const PREFERRED: [&[u8; 4]; 4] = [b"MJPG", b"YUYV", b"GREY", b"RGB3"];
const BUFFERS: u32 = 4;

pub(crate) fn list() -> Result<Vec<CameraInfo>, AcquisitionError> {
    let mut out = Vec::new();
    for node in v4l::context::enum_devices() {
        let path = node.path().to_path_buf();
        let Ok(dev) = Device::with_path(&path) else {
            log::debug!("{}: cannot open, skipped", path.display());
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        if !caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE)
        {
            continue;
        }
        let serial = usb_serial(&path).unwrap_or_else(|| caps.bus.clone());
        out.push(CameraInfo {
            serial,
            name: caps.card.clone(),
            path,
        });
    }
    Ok(out)
}

/// USB serial number of the device behind `/dev/videoN`, from sysfs.
fn usb_serial(dev_path: &Path) -> Option<String> {
    let node = dev_path.file_name()?.to_str()?;
    let sysfs = format!("/sys/class/video4linux/{node}/device/../serial");
    let raw = fs::read_to_string(sysfs).ok()?;
    let serial = raw.trim();
    (!serial.is_empty()).then(|| serial.to_string())
}

/// An open, streaming V4L2 camera.
pub(crate) struct V4lCamera {
    // declared before the device so streaming stops before it closes
    stream: MmapStream<'static>,
    _device: Device,
    info: CameraInfo,
    fourcc: FourCC,
    width: u32,
    height: u32,
    timeout: Duration,
    sequence: u64,
}

impl V4lCamera {
    pub(crate) fn open(
        selector: &CameraSelector,
        timeout: Duration,
    ) -> Result<Self, AcquisitionError> {
        let cameras = list()?;
        let info = select(selector, &cameras)?.clone();
        let io_err = |source: io::Error| AcquisitionError::Io {
            path: info.path.clone(),
            source,
        };

        let device = Device::with_path(&info.path).map_err(io_err)?;
        let available: Vec<FourCC> = device
            .enum_formats()
            .map_err(io_err)?
            .into_iter()
            .map(|d| d.fourcc)
            .collect();
        let wanted = PREFERRED
            .iter()
            .map(|c| FourCC::new(c))
            .find(|c| available.contains(c))
            .ok_or_else(|| AcquisitionError::UnsupportedFormat(fourcc_list(&available)))?;

        let mut fmt = device.format().map_err(io_err)?;
        fmt.fourcc = wanted;
        let fmt = device.set_format(&fmt).map_err(io_err)?;
        if !PREFERRED.iter().any(|c| FourCC::new(c) == fmt.fourcc) {
            return Err(AcquisitionError::UnsupportedFormat(fmt.fourcc.to_string()));
        }

        let mut stream =
            MmapStream::with_buffers(&device, Type::VideoCapture, BUFFERS).map_err(io_err)?;
        stream.set_timeout(timeout);

        log::info!(
            "opened camera {} ({}) at {}: {}x{} {}",
            info.serial,
            info.name,
            info.path.display(),
            fmt.width,
            fmt.height,
            fmt.fourcc
        );
        Ok(Self {
            stream,
            _device: device,
            info,
            fourcc: fmt.fourcc,
            width: fmt.width,
            height: fmt.height,
            timeout,
            sequence: 0,
        })
    }
}

impl FrameSource for V4lCamera {
    fn serial(&self) -> &str {
        &self.info.serial
    }

    fn grab(&mut self) -> Result<Frame, AcquisitionError> {
        let (buf, meta) = match self.stream.next() {
            Ok(next) => next,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                return Err(AcquisitionError::Timeout(self.timeout));
            }
            Err(e) => {
                return Err(AcquisitionError::Disconnected {
                    serial: self.info.serial.clone(),
                    reason: e.to_string(),
                });
            }
        };
        let used = (meta.bytesused as usize).min(buf.len());
        let data = if used == 0 { buf } else { &buf[..used] };
        let image = to_rgb(&self.fourcc.repr, self.width, self.height, data)?;
        let frame = Frame::new(self.sequence, image);
        self.sequence += 1;
        Ok(frame)
    }
}

impl Drop for V4lCamera {
    fn drop(&mut self) {
        log::info!(
            "releasing camera {} at {}",
            self.info.serial,
            self.info.path.display()
        );
    }
}

fn fourcc_list(codes: &[FourCC]) -> String {
    codes
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn to_rgb(
    fourcc: &[u8; 4],
    width: u32,
    height: u32,
    data: &[u8],
) -> Result<RgbImage, AcquisitionError> {
    let pixels = width as usize * height as usize;
    let short =
        |need: usize| AcquisitionError::Decode(format!("{} bytes, expected {need}", data.len()));
    match fourcc {
        b"MJPG" => image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .map(|img| img.to_rgb8())
            .map_err(|e| AcquisitionError::Decode(e.to_string())),
        b"RGB3" => {
            let need = pixels * 3;
            let bytes = data.get(..need).ok_or_else(|| short(need))?;
            RgbImage::from_raw(width, height, bytes.to_vec()).ok_or_else(|| short(need))
        }
        b"GREY" => {
            let bytes = data.get(..pixels).ok_or_else(|| short(pixels))?;
            let rgb = bytes.iter().flat_map(|&v| [v, v, v]).collect();
            RgbImage::from_raw(width, height, rgb).ok_or_else(|| short(pixels))
        }
        b"YUYV" => {
            let need = pixels * 2;
            let bytes = data.get(..need).ok_or_else(|| short(need))?;
            let mut rgb = Vec::with_capacity(pixels * 3);
            for q in bytes.chunks_exact(4) {
                let (y0, u, y1, v) = (q[0], q[1], q[2], q[3]);
                rgb.extend_from_slice(&yuv_to_rgb(y0, u, v));
                rgb.extend_from_slice(&yuv_to_rgb(y1, u, v));
            }
            RgbImage::from_raw(width, height, rgb).ok_or_else(|| short(need))
        }
        other => Err(AcquisitionError::UnsupportedFormat(
            String::from_utf8_lossy(other).into_owned(),
        )),
    }
}

/// BT.601 limited-range conversion.
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = (y as f32 - 16.0) * 1.164;
    let d = u as f32 - 128.0;
    let e = v as f32 - 128.0;
    let clamp = |x: f32| x.round().clamp(0.0, 255.0) as u8;
    [
        clamp(c + 1.596 * e),
        clamp(c - 0.392 * d - 0.813 * e),
        clamp(c + 2.017 * d),
    ]
}
