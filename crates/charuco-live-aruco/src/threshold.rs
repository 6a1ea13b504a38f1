//! Thresholding for candidate search and bit decoding.

use image::{GrayImage, Luma};
use imageproc::filter::box_filter;

/// Inverted local-mean threshold: dark pixels (`v <= mean - c`) become 255.
///
/// `win_size` is the full window side; even sizes are rounded up.
pub(crate) fn adaptive_threshold_inv(img: &GrayImage, win_size: u32, c: f32) -> GrayImage {
    let radius = (win_size.max(3) | 1) / 2;
    let mean = box_filter(img, radius, radius);
    let mut out = GrayImage::new(img.width(), img.height());
    for ((o, s), m) in out.pixels_mut().zip(img.pixels()).zip(mean.pixels()) {
        let t = m.0[0] as f32 - c;
        *o = Luma([if (s.0[0] as f32) <= t { 255 } else { 0 }]);
    }
    out
}

/// Otsu threshold from a set of sample intensities.
pub(crate) fn otsu_threshold_from_samples(samples: &[u8]) -> u8 {
    let Some((&lo, &hi)) = samples.iter().min().zip(samples.iter().max()) else {
        return 127;
    };
    if lo == hi {
        return lo;
    }

    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    if hist.iter().filter(|&&h| h > 0).count() <= 2 {
        return ((lo as u16 + hi as u16) / 2) as u8;
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let (mut sum_b, mut w_b) = (0.0f64, 0.0f64);
    let mut best = (-1.0f64, 127u8);
    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }
        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;
        let between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if between > best.0 {
            best = (between, t as u8);
        }
    }
    best.1
}

/// Population standard deviation.
pub(crate) fn std_dev(samples: &[u8]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let n = samples.len() as f32;
    let mean = samples.iter().map(|&v| v as f32).sum::<f32>() / n;
    let var = samples
        .iter()
        .map(|&v| {
            let d = v as f32 - mean;
            d * d
        })
        .sum::<f32>()
        / n;
    var.sqrt()
}
