/// Borrowed 8-bit grayscale image, row-major.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

impl<'a> GrayImageView<'a> {
    /// Wrap a row-major buffer. Returns `None` if the length does not match.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Option<Self> {
        if width.checked_mul(height)? != data.len() {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<u8> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(self.data[y as usize * self.width + x as usize])
    }

    /// True if `(x, y)` lies at least `margin` pixels inside the image.
    #[inline]
    pub fn contains(&self, x: f32, y: f32, margin: f32) -> bool {
        x >= margin
            && y >= margin
            && x < self.width as f32 - 1.0 - margin
            && y < self.height as f32 - 1.0 - margin
    }
}

#[inline]
fn get_clamped(src: &GrayImageView<'_>, x: i32, y: i32) -> f32 {
    let x = x.clamp(0, src.width as i32 - 1);
    let y = y.clamp(0, src.height as i32 - 1);
    src.data[y as usize * src.width + x as usize] as f32
}

/// Bilinear sample with edge clamping. The image must be non-empty.
#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_clamped(src, x0, y0);
    let p10 = get_clamped(src, x0 + 1, y0);
    let p01 = get_clamped(src, x0, y0 + 1);
    let p11 = get_clamped(src, x0 + 1, y0 + 1);

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rejects_mismatched_buffer() {
        let data = vec![0u8; 11];
        assert!(GrayImageView::new(4, 3, &data).is_none());
        assert!(GrayImageView::new(4, 3, &data[..]).is_none());
        let data = vec![0u8; 12];
        assert!(GrayImageView::new(4, 3, &data).is_some());
    }

    #[test]
    fn bilinear_interpolates_between_pixels() {
        let data = [0u8, 100, 200, 100];
        let view = GrayImageView::new(2, 2, &data).unwrap();
        assert_relative_eq!(sample_bilinear(&view, 0.5, 0.0), 50.0);
        assert_relative_eq!(sample_bilinear(&view, 0.0, 0.5), 100.0);
        assert_relative_eq!(sample_bilinear(&view, 0.5, 0.5), 100.0);
        // clamped outside
        assert_relative_eq!(sample_bilinear(&view, -3.0, -3.0), 0.0);
    }
}
