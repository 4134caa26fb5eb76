//! Working pixel buffer for the pipeline.
//!
//! The pipeline only ever operates on 8-bit grayscale or 8-bit 3-channel
//! color. [`PixelBuffer`] makes that a closed set: anything else has to go
//! through [`PixelBuffer::normalize`] first.

use image::{DynamicImage, GrayImage, RgbImage};

/// An owned 8-bit image in one of the two supported color modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelBuffer {
    /// Single-channel grayscale.
    Gray(GrayImage),
    /// Three-channel color.
    Rgb(RgbImage),
}

impl PixelBuffer {
    /// Convert a decoded image into a supported mode.
    ///
    /// `Luma8` and `Rgb8` are moved through without copying; every other
    /// mode is converted to 8-bit RGB, dropping alpha.
    #[must_use]
    pub fn normalize(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(gray) => Self::Gray(gray),
            DynamicImage::ImageRgb8(rgb) => Self::Rgb(rgb),
            other => Self::Rgb(other.to_rgb8()),
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.dimensions().0
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.dimensions().1
    }

    /// `(width, height)` in pixels.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Gray(img) => img.dimensions(),
            Self::Rgb(img) => img.dimensions(),
        }
    }

    /// Samples per pixel: 1 for grayscale, 3 for color.
    #[must_use]
    pub fn channels(&self) -> u8 {
        match self {
            Self::Gray(_) => 1,
            Self::Rgb(_) => 3,
        }
    }

    /// Hand the buffer back as a [`DynamicImage`] for encoding.
    #[must_use]
    pub fn into_dynamic(self) -> DynamicImage {
        match self {
            Self::Gray(img) => DynamicImage::ImageLuma8(img),
            Self::Rgb(img) => DynamicImage::ImageRgb8(img),
        }
    }
}

impl From<DynamicImage> for PixelBuffer {
    fn from(image: DynamicImage) -> Self {
        Self::normalize(image)
    }
}

impl From<PixelBuffer> for DynamicImage {
    fn from(buffer: PixelBuffer) -> Self {
        buffer.into_dynamic()
    }
}
