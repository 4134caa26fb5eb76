//! Lanczos-3 resampling of the working buffer.
//!
//! A thin layer over [`image::imageops::resize`] that takes ownership of the
//! buffer and rejects empty extents instead of producing empty images. The
//! kernel's ringing is clamped to `[0, 255]` by `image` when it converts
//! back to `u8` samples, and the kernel window is clipped at the edges, the
//! same way for upscale and downscale.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Pixel};

use crate::error::{Error, Result};

/// Resize an 8-bit image to `width x height` with a Lanczos-3 kernel.
///
/// The input buffer is consumed; requesting the current size returns it
/// unchanged. Every output sample is clamped into `[0, 255]`.
///
/// # Errors
///
/// Returns [`Error::InvalidDimension`] if either target dimension is zero or
/// the source image has zero area.
pub fn resize<P>(
    image: ImageBuffer<P, Vec<u8>>,
    width: u32,
    height: u32,
) -> Result<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimension { width, height });
    }
    let (src_w, src_h) = image.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(Error::InvalidDimension {
            width: src_w,
            height: src_h,
        });
    }
    if (src_w, src_h) == (width, height) {
        return Ok(image);
    }

    Ok(imageops::resize(&image, width, height, FilterType::Lanczos3))
}
