//! Error types for the deaify crate.

use std::fmt;

/// A step of the per-iteration pipeline, used to tag [`Error::Processing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Color mode normalization at the start of an iteration.
    Normalize,
    /// 4x Lanczos upscale.
    Upscale,
    /// 5x5 median filter.
    Median,
    /// Gaussian noise injection.
    Noise,
    /// Lanczos downscale back to the iteration's starting size.
    Downscale,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Normalize => "normalize",
            Self::Upscale => "upscale",
            Self::Median => "median",
            Self::Noise => "noise",
            Self::Downscale => "downscale",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while processing images.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A processing parameter is outside its accepted range.
    #[error("invalid parameter `{field}`: {value}")]
    InvalidParameter {
        /// Name of the offending parameter.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A resize target, source extent or filter window is unusable.
    #[error("invalid dimension {width}x{height}")]
    InvalidDimension {
        /// Width in pixels (or window size).
        width: u32,
        /// Height in pixels (or window size).
        height: u32,
    },

    /// A pipeline step failed; the whole run is aborted.
    #[error("{stage} step failed: {reason}")]
    Processing {
        /// The step that failed.
        stage: Stage,
        /// Description of the underlying failure.
        reason: String,
    },

    /// The decoded image exceeds the configured pixel budget.
    #[error("image too large ({width}x{height}), limit is {max_pixels} pixels")]
    ImageTooLarge {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Configured maximum pixel count.
        max_pixels: u64,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input is not image data, or the output format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image decoding or encoding.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Tag a step failure with the stage it came from.
    pub(crate) fn at(self, stage: Stage) -> Self {
        Self::Processing {
            stage,
            reason: self.to_string(),
        }
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
