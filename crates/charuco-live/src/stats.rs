//! Illumination statistics shown in the window title.

use std::fmt;

use image::RgbImage;

/// 5th, 50th and 95th percentiles of all channel samples of a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IlluminationStats {
    pub p5: f32,
    pub p50: f32,
    pub p95: f32,
}

impl IlluminationStats {
    /// `None` for an empty image.
    pub fn from_image(image: &RgbImage) -> Option<Self> {
        Self::from_samples(image.as_raw())
    }

    pub fn from_samples(samples: &[u8]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut hist = [0usize; 256];
        for &s in samples {
            hist[s as usize] += 1;
        }
        Some(Self {
            p5: percentile(&hist, samples.len(), 5.0),
            p50: percentile(&hist, samples.len(), 50.0),
            p95: percentile(&hist, samples.len(), 95.0),
        })
    }
}

impl fmt::Display for IlluminationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "5% / 50% / 95%: {:.1} / {:.1} / {:.1}",
            self.p5, self.p50, self.p95
        )
    }
}

/// Percentile with linear interpolation between order statistics.
fn percentile(hist: &[usize; 256], n: usize, q: f32) -> f32 {
    let rank = q / 100.0 * (n - 1) as f32;
    let lo = rank.floor() as usize;
    let frac = rank - lo as f32;
    let a = order_statistic(hist, lo) as f32;
    if frac == 0.0 {
        return a;
    }
    let b = order_statistic(hist, (lo + 1).min(n - 1)) as f32;
    a + frac * (b - a)
}

/// Value of the `k`-th smallest sample (0-based).
fn order_statistic(hist: &[usize; 256], k: usize) -> u8 {
    let mut seen = 0usize;
    for (v, &count) in hist.iter().enumerate() {
        seen += count;
        if seen > k {
            return v as u8;
        }
    }
    u8::MAX
}
