//! Square-window median filter.
//!
//! Each channel is filtered independently. Coordinates outside the image
//! are clamped to the nearest edge pixel, so every window holds exactly
//! `window_size * window_size` samples, even on images smaller than the
//! window.

use image::{ImageBuffer, Pixel};

use crate::error::{Error, Result};

/// Replace every sample with the median of its `window_size x window_size`
/// neighborhood.
///
/// # Errors
///
/// Returns [`Error::InvalidDimension`] if `window_size` is zero or even.
pub fn median_filter<P>(
    image: ImageBuffer<P, Vec<u8>>,
    window_size: u32,
) -> Result<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8>,
{
    if window_size == 0 || window_size % 2 == 0 {
        return Err(Error::InvalidDimension {
            width: window_size,
            height: window_size,
        });
    }

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Ok(image);
    }

    let channels = usize::from(P::CHANNEL_COUNT);
    let (w, h) = (width as usize, height as usize);
    let size = window_size as usize;
    let radius = size / 2;
    let rank = size * size / 2;

    let src = image.as_raw();
    let mut out = vec![0_u8; src.len()];
    let mut window = Vec::with_capacity(size * size);

    // Edge-clamped source column for each (x, dx) so the inner loop is a
    // plain index.
    let columns: Vec<usize> = (0..w)
        .flat_map(|x| (0..size).map(move |dx| (x + dx).saturating_sub(radius).min(w - 1)))
        .collect();

    for y in 0..h {
        let rows: Vec<usize> = (0..size)
            .map(|dy| (y + dy).saturating_sub(radius).min(h - 1) * w)
            .collect();

        for x in 0..w {
            let cols = &columns[x * size..(x + 1) * size];
            for c in 0..channels {
                window.clear();
                for &row in &rows {
                    window.extend(cols.iter().map(|&col| src[(row + col) * channels + c]));
                }
                let (_, median, _) = window.select_nth_unstable(rank);
                out[(y * w + x) * channels + c] = *median;
            }
        }
    }

    ImageBuffer::from_raw(width, height, out).ok_or(Error::InvalidDimension { width, height })
}
