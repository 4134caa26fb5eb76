//! File-level processing: load, run the pipeline, save.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use tracing::debug;

use crate::error::{Error, Result};
use crate::noise::BoxMuller;
use crate::pipeline::{self, Params};

/// JPEG quality used when the output is JPEG.
pub const JPEG_QUALITY: u8 = 95;

/// Default pixel budget per image (16 megapixels).
///
/// A run holds the 4x upscaled buffer, the median output of the same size
/// and the resampler's `f32` RGBA intermediate at once, roughly 115 bytes
/// per input pixel for RGB. 16 MP therefore peaks near 1.8 GB.
pub const DEFAULT_MAX_PIXELS: u64 = 16_000_000;

/// Options controlling image processing behavior.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Number of pipeline iterations (1-10).
    pub iterations: u32,
    /// Noise intensity multiplier (0.1-2.0).
    pub intensity: f32,
    /// Fixed noise seed for reproducible output.
    pub seed: Option<u64>,
    /// Reject images with more pixels than this.
    pub max_pixels: Option<u64>,
    /// Enable verbose logging.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            iterations: 1,
            intensity: 1.0,
            seed: None,
            max_pixels: Some(DEFAULT_MAX_PIXELS),
            verbose: false,
            quiet: false,
        }
    }
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the input file.
    pub path: PathBuf,
    /// Where the processed image was written, if it was.
    pub output: Option<PathBuf>,
    /// Whether processing succeeded.
    pub success: bool,
    /// Human-readable status message.
    pub message: String,
}

impl ProcessResult {
    fn failed(path: &Path, message: String) -> Self {
        Self {
            path: path.to_path_buf(),
            output: None,
            success: false,
            message,
        }
    }
}

/// Basic facts about an image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    /// Container format sniffed from the file contents.
    pub format: Option<ImageFormat>,
    /// Color type as stored in the file.
    pub color: ColorType,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Size of the file on disk.
    pub file_size_bytes: u64,
}

/// Runs the pipeline over images and files with a fixed configuration.
///
/// Parameters are validated once in [`Engine::new`]. Every call gets its own
/// noise stream, so an engine can be shared across threads.
#[derive(Debug, Clone)]
pub struct Engine {
    params: Params,
    seed: Option<u64>,
    max_pixels: Option<u64>,
}

impl Engine {
    /// Create an engine from options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the iteration count or
    /// intensity is out of range.
    pub fn new(opts: &ProcessOptions) -> Result<Self> {
        Ok(Self {
            params: Params::new(opts.iterations, opts.intensity)?,
            seed: opts.seed,
            max_pixels: opts.max_pixels,
        })
    }

    /// The validated pipeline parameters.
    #[must_use]
    pub fn params(&self) -> Params {
        self.params
    }

    /// Process a decoded image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageTooLarge`] if the image exceeds the pixel
    /// budget, or [`Error::Processing`] if a pipeline step fails.
    pub fn process_image(&self, image: DynamicImage) -> Result<DynamicImage> {
        check_budget(image.width(), image.height(), self.max_pixels)?;

        let mut noise = match self.seed {
            Some(seed) => BoxMuller::seeded(seed),
            None => BoxMuller::from_os_rng(),
        };
        pipeline::process_with(image, self.params, &mut noise)
    }

    /// Process a single image file: load, run the pipeline, save.
    ///
    /// The input is recognized by its contents, not its extension. The
    /// output format follows the output path's extension.
    #[must_use]
    pub fn process_file(&self, input: &Path, output: &Path) -> ProcessResult {
        match self.try_process_file(input, output) {
            Ok((width, height)) => ProcessResult {
                path: input.to_path_buf(),
                output: Some(output.to_path_buf()),
                success: true,
                message: format!(
                    "Processed {width}x{height}, {} iteration(s) at {:.0}% noise",
                    self.params.iterations(),
                    self.params.noise_percentage()
                ),
            },
            Err(e) => ProcessResult::failed(input, e.to_string()),
        }
    }

    fn try_process_file(&self, input: &Path, output: &Path) -> Result<(u32, u32)> {
        let image = load_image_within(input, self.max_pixels)?;
        let (width, height) = (image.width(), image.height());
        debug!(path = %input.display(), width, height, "loaded");

        let processed = self.process_image(image)?;

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        save_image(&processed, output)?;
        debug!(path = %output.display(), "saved");

        Ok((width, height))
    }

    /// Process all supported images in a directory.
    ///
    /// Outputs land in `output_dir` under [`output_file_name`]. When two
    /// inputs map to the same output name (`a.png` and `a.bmp`), the one
    /// whose name is unchanged wins, otherwise the first in path order; the
    /// others are reported as failed instead of overwriting it. Uses
    /// parallel iteration when the `cli` feature is enabled (via rayon).
    #[must_use]
    pub fn process_directory(&self, input_dir: &Path, output_dir: &Path) -> Vec<ProcessResult> {
        let mut entries: Vec<PathBuf> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|p| is_supported_image(p))
                .collect(),
            Err(e) => {
                return vec![ProcessResult::failed(
                    input_dir,
                    format!("Failed to read directory: {e}"),
                )];
            }
        };

        if !output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(output_dir) {
                return vec![ProcessResult::failed(
                    output_dir,
                    format!("Failed to create output directory: {e}"),
                )];
            }
        }

        entries.sort_by_cached_key(|p| (!keeps_name(p), p.clone()));
        let (jobs, mut conflicts) = claim_output_names(entries, output_dir);

        let process_one = |(input, output): &(PathBuf, PathBuf)| self.process_file(input, output);

        #[cfg(feature = "cli")]
        let mut results: Vec<ProcessResult> = {
            use rayon::prelude::*;
            jobs.par_iter().map(process_one).collect()
        };

        #[cfg(not(feature = "cli"))]
        let mut results: Vec<ProcessResult> = jobs.iter().map(process_one).collect();

        results.append(&mut conflicts);
        results
    }
}

/// Whether an input keeps its own file name in an output directory.
fn keeps_name(input: &Path) -> bool {
    input
        .file_name()
        .is_some_and(|name| name.to_string_lossy() == output_file_name(input))
}

/// Pair each input with its output path, refusing any input whose output
/// name is already taken. Names compare case-insensitively.
fn claim_output_names(
    inputs: Vec<PathBuf>,
    output_dir: &Path,
) -> (Vec<(PathBuf, PathBuf)>, Vec<ProcessResult>) {
    let mut claimed: HashMap<String, PathBuf> = HashMap::new();
    let mut jobs = Vec::with_capacity(inputs.len());
    let mut conflicts = Vec::new();

    for input in inputs {
        let name = output_file_name(&input);
        match claimed.entry(name.to_lowercase()) {
            Entry::Occupied(owner) => conflicts.push(ProcessResult::failed(
                &input,
                format!(
                    "Output {name} already claimed by {}",
                    owner.get().display()
                ),
            )),
            Entry::Vacant(slot) => {
                slot.insert(input.clone());
                jobs.push((input, output_dir.join(name)));
            }
        }
    }

    (jobs, conflicts)
}

fn check_budget(width: u32, height: u32, max_pixels: Option<u64>) -> Result<()> {
    match max_pixels {
        Some(max_pixels) if u64::from(width) * u64::from(height) > max_pixels => {
            Err(Error::ImageTooLarge {
                width,
                height,
                max_pixels,
            })
        }
        _ => Ok(()),
    }
}

/// Decode an image, sniffing the format from its contents.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] if the data is not a recognized
/// image, or an I/O or decode error.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    load_image_within(path, None)
}

/// Decode an image, refusing it before any pixel data is decoded when its
/// header reports more than `max_pixels` pixels.
///
/// # Errors
///
/// Returns [`Error::ImageTooLarge`] if the header exceeds the budget, plus
/// everything [`load_image`] can return.
pub fn load_image_within(path: &Path, max_pixels: Option<u64>) -> Result<DynamicImage> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    if reader.format().is_none() {
        return Err(Error::UnsupportedFormat(format!(
            "{} is not image data",
            path.display()
        )));
    }

    let decoder = reader.into_decoder()?;
    let (width, height) = decoder.dimensions();
    check_budget(width, height, max_pixels)?;
    Ok(DynamicImage::from_decoder(decoder)?)
}

/// Read format, color type and dimensions without decoding pixel data.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] if the data is not a recognized
/// image, or an I/O or decode error.
pub fn inspect_file(path: &Path) -> Result<ImageInfo> {
    let file_size_bytes = std::fs::metadata(path)?.len();
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let Some(format) = reader.format() else {
        return Err(Error::UnsupportedFormat(format!(
            "{} is not image data",
            path.display()
        )));
    };

    let decoder = reader.into_decoder()?;
    let (width, height) = decoder.dimensions();
    Ok(ImageInfo {
        format: Some(format),
        color: decoder.color_type(),
        width,
        height,
        file_size_bytes,
    })
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "jpg" | "jpeg"))
}

/// Output extension for an input: JPEG stays JPEG, everything else is PNG.
#[must_use]
pub fn output_extension(input: &Path) -> &'static str {
    if is_jpeg(input) {
        "jpg"
    } else {
        "png"
    }
}

/// File name used for an input when writing into an output directory.
///
/// Example: `"photo.webp"` becomes `"photo.png"`.
#[must_use]
pub fn output_file_name(input: &Path) -> String {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    format!("{stem}.{}", output_extension(input))
}

/// Generate a default output path from an input path.
///
/// Example: `"photo.jpg"` becomes `"photo_processed.jpg"`, `"art.webp"`
/// becomes `"art_processed.png"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_processed.{}", output_extension(input)))
}

/// Save an image with format-specific quality settings.
///
/// JPEG is written at [`JPEG_QUALITY`]; PNG, WebP and BMP are lossless.
/// Images with an alpha channel or more than 8 bits are converted to RGB8
/// first.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(img: &DynamicImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    let converted;
    let img = match img.color() {
        ColorType::L8 | ColorType::Rgb8 => img,
        _ => {
            converted = DynamicImage::ImageRgb8(img.to_rgb8());
            &converted
        }
    };

    match format {
        ImageFormat::Jpeg => {
            let writer = BufWriter::new(File::create(path)?);
            img.write_with_encoder(JpegEncoder::new_with_quality(writer, JPEG_QUALITY))?;
        }
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp => {
            img.save_with_format(path, format)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(())
}
