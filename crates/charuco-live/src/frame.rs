use image::{GrayImage, RgbImage};

/// One captured image with its acquisition sequence number.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub sequence: u64,
    pub image: RgbImage,
}

impl Frame {
    pub fn new(sequence: u64, image: RgbImage) -> Self {
        Self { sequence, image }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Luma copy used for detection.
    pub fn to_gray(&self) -> GrayImage {
        image::imageops::grayscale(&self.image)
    }
}
