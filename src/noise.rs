//! Additive Gaussian noise.
//!
//! The random source is injected through [`GaussianSource`] so that tests
//! and callers wanting reproducible output can supply a seeded generator,
//! while production runs draw a fresh OS-seeded stream per call.

use std::f64::consts::TAU;

use image::{ImageBuffer, Pixel};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};

/// A generator of normally distributed samples.
pub trait GaussianSource {
    /// Draw one sample from `N(mean, std_dev^2)`.
    fn sample(&mut self, mean: f64, std_dev: f64) -> f64;
}

impl<G: GaussianSource + ?Sized> GaussianSource for &mut G {
    fn sample(&mut self, mean: f64, std_dev: f64) -> f64 {
        (**self).sample(mean, std_dev)
    }
}

/// Box-Muller transform over any `rand` generator.
///
/// Each pair of uniform draws yields two independent normal variates; the
/// second one is kept for the next call.
#[derive(Debug, Clone)]
pub struct BoxMuller<R> {
    rng: R,
    spare: Option<f64>,
}

impl<R: Rng> BoxMuller<R> {
    /// Wrap an existing generator.
    #[must_use]
    pub fn new(rng: R) -> Self {
        Self { rng, spare: None }
    }

    fn standard_normal(&mut self) -> f64 {
        if let Some(z) = self.spare.take() {
            return z;
        }

        // u1 must be strictly positive for the logarithm.
        let u1 = loop {
            let u: f64 = self.rng.random();
            if u > f64::MIN_POSITIVE {
                break u;
            }
        };
        let u2: f64 = self.rng.random();

        let r = (-2.0 * u1.ln()).sqrt();
        let theta = TAU * u2;
        self.spare = Some(r * theta.sin());
        r * theta.cos()
    }
}

impl BoxMuller<StdRng> {
    /// Deterministic stream: the same seed always produces the same noise.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Fresh stream seeded from the operating system.
    #[must_use]
    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }
}

impl<R: Rng> GaussianSource for BoxMuller<R> {
    fn sample(&mut self, mean: f64, std_dev: f64) -> f64 {
        mean + std_dev * self.standard_normal()
    }
}

/// Standard deviation, in sample units, for a noise level given as a
/// percentage of the full `0..=255` range.
#[must_use]
pub(crate) fn std_dev_for(noise_percentage: f32) -> f64 {
    f64::from(noise_percentage) / 100.0 * 255.0
}

/// Add zero-mean Gaussian noise to every sample of `image`.
///
/// The standard deviation is `noise_percentage` percent of 255. Each noisy
/// sample is clipped to `[0, 255]` and truncated toward zero.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `noise_percentage` is negative or
/// not a number.
pub fn add_noise<P, G>(
    mut image: ImageBuffer<P, Vec<u8>>,
    noise_percentage: f32,
    source: &mut G,
) -> Result<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8>,
    G: GaussianSource + ?Sized,
{
    if noise_percentage.is_nan() || noise_percentage < 0.0 {
        return Err(Error::InvalidParameter {
            field: "noise_percentage",
            value: f64::from(noise_percentage),
        });
    }

    let std_dev = std_dev_for(noise_percentage);
    for sample in image.iter_mut() {
        let noisy = f64::from(*sample) + source.sample(0.0, std_dev);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            *sample = noisy.clamp(0.0, 255.0) as u8;
        }
    }

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    /// Always returns `mean + offset`, ignoring the deviation.
    struct Constant(f64);

    impl GaussianSource for Constant {
        fn sample(&mut self, mean: f64, _std_dev: f64) -> f64 {
            mean + self.0
        }
    }

    #[test]
    fn std_dev_is_percentage_of_full_range() {
        assert!((std_dev_for(4.0) - 10.2).abs() < 1e-6);
        assert!((std_dev_for(10.0) - 25.5).abs() < 1e-6);
        assert!(std_dev_for(0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sums_are_clipped_and_truncated() {
        let img = GrayImage::from_pixel(3, 3, Luma([100]));

        let high = add_noise(img.clone(), 4.0, &mut Constant(400.0)).unwrap();
        assert!(high.pixels().all(|p| p[0] == 255));

        let low = add_noise(img.clone(), 4.0, &mut Constant(-400.0)).unwrap();
        assert!(low.pixels().all(|p| p[0] == 0));

        let frac = add_noise(img, 4.0, &mut Constant(10.7)).unwrap();
        assert!(frac.pixels().all(|p| p[0] == 110));
    }

    #[test]
    fn zero_percentage_leaves_image_unchanged() {
        let img = RgbImage::from_fn(8, 8, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = (x * 30 + y) as u8;
            Rgb([v, 255 - v, 7])
        });
        let out = add_noise(img.clone(), 0.0, &mut BoxMuller::seeded(1)).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn negative_percentage_is_rejected() {
        let img = GrayImage::new(2, 2);
        let err = add_noise(img, -0.5, &mut BoxMuller::seeded(1)).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidParameter {
                field: "noise_percentage",
                ..
            }
        ));
    }

    #[test]
    fn nan_percentage_is_rejected() {
        let img = GrayImage::new(2, 2);
        assert!(add_noise(img, f32::NAN, &mut BoxMuller::seeded(1)).is_err());
    }

    #[test]
    fn same_seed_same_noise() {
        let img = RgbImage::from_pixel(16, 16, Rgb([128, 128, 128]));
        let a = add_noise(img.clone(), 8.0, &mut BoxMuller::seeded(42)).unwrap();
        let b = add_noise(img.clone(), 8.0, &mut BoxMuller::seeded(42)).unwrap();
        let c = add_noise(img, 8.0, &mut BoxMuller::seeded(43)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn noise_changes_dimensions_never() {
        let img = RgbImage::new(5, 7);
        let out = add_noise(img, 10.0, &mut BoxMuller::seeded(9)).unwrap();
        assert_eq!(out.dimensions(), (5, 7));
        assert_eq!(out.as_raw().len(), 5 * 7 * 3);
    }

    #[test]
    fn box_muller_moments() {
        let mut source = BoxMuller::seeded(7);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| source.sample(3.0, 2.0)).collect();

        let mean = samples.iter().sum::<f64>() / f64::from(n);
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / f64::from(n);

        assert!((mean - 3.0).abs() < 0.1, "mean {mean}");
        assert!((var.sqrt() - 2.0).abs() < 0.1, "std dev {}", var.sqrt());
    }

    #[test]
    fn borrowed_source_is_a_source() {
        fn draw<G: GaussianSource>(mut source: G) -> f64 {
            source.sample(2.0, 5.0)
        }

        let mut inner = Constant(1.0);
        assert!((draw(&mut inner) - 3.0).abs() < f64::EPSILON);
    }
}
