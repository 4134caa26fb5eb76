//! The iterative degradation pipeline.
//!
//! One iteration is: normalize color mode, upscale 4x with Lanczos, 5x5
//! median filter, additive Gaussian noise, Lanczos downscale back to the
//! size the iteration started at. The output of one iteration is the input
//! of the next, so dimensions never drift.
//!
//! Peak memory per run is the 4x upscaled intermediate, i.e. sixteen times
//! the input buffer.

use image::{DynamicImage, ImageBuffer, Pixel};
use tracing::{debug, trace};

use crate::buffer::PixelBuffer;
use crate::error::{Error, Result, Stage};
use crate::median::median_filter;
use crate::noise::{add_noise, GaussianSource};
use crate::resample::resize;

/// Fewest iterations accepted.
pub const MIN_ITERATIONS: u32 = 1;
/// Most iterations accepted.
pub const MAX_ITERATIONS: u32 = 10;
/// Lowest intensity accepted.
pub const MIN_INTENSITY: f32 = 0.1;
/// Highest intensity accepted.
pub const MAX_INTENSITY: f32 = 2.0;

/// Per-axis upscale factor applied at the start of each iteration.
pub const UPSCALE_FACTOR: u32 = 4;
/// Median filter window (radius 2).
pub const MEDIAN_WINDOW: u32 = 5;
/// Noise level, in percent of 255, at intensity 1.0.
pub const BASE_NOISE_PERCENTAGE: f32 = 4.0;
/// Lower clamp for the derived noise level.
pub const MIN_NOISE_PERCENTAGE: f32 = 1.0;
/// Upper clamp for the derived noise level.
pub const MAX_NOISE_PERCENTAGE: f32 = 10.0;

/// Noise level for a given intensity: `clamp(4 * intensity, 1, 10)`.
#[must_use]
pub fn noise_percentage(intensity: f32) -> f32 {
    (BASE_NOISE_PERCENTAGE * intensity).clamp(MIN_NOISE_PERCENTAGE, MAX_NOISE_PERCENTAGE)
}

/// Validated inputs for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Params {
    iterations: u32,
    intensity: f32,
}

impl Params {
    /// Check both values against their accepted ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `iterations` is outside
    /// `1..=10` or `intensity` is outside `0.1..=2.0` (NaN included).
    pub fn new(iterations: u32, intensity: f32) -> Result<Self> {
        if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&iterations) {
            return Err(Error::InvalidParameter {
                field: "iterations",
                value: f64::from(iterations),
            });
        }
        if !(MIN_INTENSITY..=MAX_INTENSITY).contains(&intensity) {
            return Err(Error::InvalidParameter {
                field: "intensity",
                value: f64::from(intensity),
            });
        }
        Ok(Self {
            iterations,
            intensity,
        })
    }

    /// Number of iterations.
    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Noise intensity multiplier.
    #[must_use]
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Noise level derived from the intensity.
    #[must_use]
    pub fn noise_percentage(&self) -> f32 {
        noise_percentage(self.intensity)
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            iterations: 1,
            intensity: 1.0,
        }
    }
}

/// Validate `iterations` and `intensity`, then run the pipeline.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] before any work is done if either
/// value is out of range, or [`Error::Processing`] if a step fails.
pub fn process<G>(
    image: DynamicImage,
    iterations: u32,
    intensity: f32,
    noise: &mut G,
) -> Result<DynamicImage>
where
    G: GaussianSource + ?Sized,
{
    let params = Params::new(iterations, intensity)?;
    process_with(image, params, noise)
}

/// Run the pipeline with already validated parameters.
///
/// Grayscale and RGB inputs keep their mode; any other mode comes back as
/// 8-bit RGB.
///
/// # Errors
///
/// Returns [`Error::Processing`] tagged with the failing [`Stage`], e.g. a
/// zero-area image fails at [`Stage::Upscale`]. No partial result is
/// returned.
pub fn process_with<G>(
    image: DynamicImage,
    params: Params,
    noise: &mut G,
) -> Result<DynamicImage>
where
    G: GaussianSource + ?Sized,
{
    let percentage = params.noise_percentage();
    let mut current = image;

    for i in 0..params.iterations {
        // Normalized every iteration, not just once up front.
        let buffer = PixelBuffer::normalize(current);
        debug!(
            iteration = i + 1,
            total = params.iterations,
            width = buffer.width(),
            height = buffer.height(),
            channels = buffer.channels(),
            noise_percentage = percentage,
            "pipeline iteration"
        );

        let buffer = match buffer {
            PixelBuffer::Gray(img) => PixelBuffer::Gray(iterate(img, percentage, noise)?),
            PixelBuffer::Rgb(img) => PixelBuffer::Rgb(iterate(img, percentage, noise)?),
        };
        current = buffer.into_dynamic();
    }

    Ok(current)
}

/// One upscale / median / noise / downscale pass.
fn iterate<P, G>(
    image: ImageBuffer<P, Vec<u8>>,
    noise_percentage: f32,
    noise: &mut G,
) -> Result<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8> + 'static,
    G: GaussianSource + ?Sized,
{
    let (width, height) = image.dimensions();
    let (up_w, up_h) = upscaled_size(width, height)?;

    let upscaled = resize(image, up_w, up_h).map_err(|e| e.at(Stage::Upscale))?;
    trace!(width = up_w, height = up_h, "upscaled");

    let filtered = median_filter(upscaled, MEDIAN_WINDOW).map_err(|e| e.at(Stage::Median))?;
    trace!(window = MEDIAN_WINDOW, "median filtered");

    let noisy = add_noise(filtered, noise_percentage, noise).map_err(|e| e.at(Stage::Noise))?;
    trace!(noise_percentage, "noise added");

    resize(noisy, width, height).map_err(|e| e.at(Stage::Downscale))
}

fn upscaled_size(width: u32, height: u32) -> Result<(u32, u32)> {
    match (
        width.checked_mul(UPSCALE_FACTOR),
        height.checked_mul(UPSCALE_FACTOR),
    ) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(Error::Processing {
            stage: Stage::Upscale,
            reason: format!("{width}x{height} overflows when scaled by {UPSCALE_FACTOR}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::BoxMuller;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    /// Noise-free source, for checking the deterministic steps.
    struct Silent;

    impl GaussianSource for Silent {
        fn sample(&mut self, mean: f64, _std_dev: f64) -> f64 {
            mean
        }
    }

    fn checker(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgb([220, 40, 90])
            } else {
                Rgb([30, 180, 250])
            }
        })
    }

    #[test]
    fn noise_percentage_derivation() {
        assert!((noise_percentage(1.0) - 4.0).abs() < 1e-6);
        assert!((noise_percentage(0.1) - 1.0).abs() < 1e-6);
        assert!((noise_percentage(2.0) - 8.0).abs() < 1e-6);
        assert!((noise_percentage(0.5) - 2.0).abs() < 1e-6);
        // Beyond the accepted intensity range the clamp still holds.
        assert!((noise_percentage(3.0) - 10.0).abs() < 1e-6);
    }

    #[test]
    fn params_accept_range_bounds() {
        assert!(Params::new(1, 0.1).is_ok());
        assert!(Params::new(10, 2.0).is_ok());
        let params = Params::new(3, 1.5).unwrap();
        assert_eq!(params.iterations(), 3);
        assert!((params.intensity() - 1.5).abs() < f32::EPSILON);
        assert!((params.noise_percentage() - 6.0).abs() < 1e-6);
    }

    #[test]
    fn params_reject_out_of_range() {
        for iterations in [0, 11, 100] {
            let err = Params::new(iterations, 1.0).unwrap_err();
            assert!(matches!(
                err,
                Error::InvalidParameter {
                    field: "iterations",
                    ..
                }
            ));
        }
        for intensity in [0.05, 2.01, 3.0, -1.0, f32::NAN, f32::INFINITY] {
            let err = Params::new(1, intensity).unwrap_err();
            assert!(matches!(
                err,
                Error::InvalidParameter {
                    field: "intensity",
                    ..
                }
            ));
        }
    }

    #[test]
    fn default_params_match_request_defaults() {
        let params = Params::default();
        assert_eq!(params.iterations(), 1);
        assert!((params.noise_percentage() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn process_rejects_before_touching_noise() {
        struct Forbidden;
        impl GaussianSource for Forbidden {
            fn sample(&mut self, _: f64, _: f64) -> f64 {
                panic!("noise drawn for rejected parameters")
            }
        }

        let img = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        assert!(process(img.clone(), 0, 1.0, &mut Forbidden).is_err());
        assert!(process(img, 1, 3.0, &mut Forbidden).is_err());
    }

    #[test]
    fn rgb_keeps_dimensions_and_mode() {
        let img = DynamicImage::ImageRgb8(checker(23, 17));
        let out = process(img, 2, 1.0, &mut BoxMuller::seeded(5)).unwrap();
        assert_eq!((out.width(), out.height()), (23, 17));
        assert_eq!(out.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn gray_keeps_dimensions_and_mode() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_fn(12, 9, |x, _| {
            Luma([if x < 6 { 20 } else { 230 }])
        }));
        let out = process(img, 1, 0.5, &mut BoxMuller::seeded(5)).unwrap();
        assert_eq!((out.width(), out.height()), (12, 9));
        assert_eq!(out.color(), image::ColorType::L8);
    }

    #[test]
    fn rgba_comes_back_as_rgb() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([9, 99, 199, 50])));
        let out = process(img, 1, 1.0, &mut BoxMuller::seeded(1)).unwrap();
        assert_eq!(out.color(), image::ColorType::Rgb8);
        assert_eq!((out.width(), out.height()), (8, 8));
    }

    #[test]
    fn uniform_image_is_fixed_point_without_noise() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 6, Rgb([60, 120, 180])));
        let out = process(img.clone(), 3, 1.0, &mut Silent).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn seeded_runs_are_identical() {
        let img = DynamicImage::ImageRgb8(checker(16, 16));
        let a = process(img.clone(), 2, 1.2, &mut BoxMuller::seeded(99)).unwrap();
        let b = process(img.clone(), 2, 1.2, &mut BoxMuller::seeded(99)).unwrap();
        let c = process(img, 2, 1.2, &mut BoxMuller::seeded(100)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn zero_area_fails_at_upscale() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        let err = process(img, 1, 1.0, &mut BoxMuller::seeded(1)).unwrap_err();
        assert!(matches!(
            err,
            Error::Processing {
                stage: Stage::Upscale,
                ..
            }
        ));
    }

    #[test]
    fn upscale_overflow_is_reported() {
        let err = upscaled_size(u32::MAX / 2, 10).unwrap_err();
        assert!(matches!(
            err,
            Error::Processing {
                stage: Stage::Upscale,
                ..
            }
        ));
        assert_eq!(upscaled_size(25, 40).unwrap(), (100, 160));
    }
}
