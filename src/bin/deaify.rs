use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use deaify::{
    default_output_path, inspect_file, Engine, ProcessOptions, ProcessResult, DEFAULT_MAX_PIXELS,
};

#[derive(Parser)]
#[command(
    name = "deaify",
    about = "Make synthetic images read more like camera captures",
    version,
    after_help = "Simple usage: deaify <image>  (writes <name>_processed.<ext> next to it)\n\n\
                  Each iteration: 4x Lanczos upscale, 5x5 median, Gaussian noise, downscale.\n\
                  JPEG inputs are written as JPEG (quality 95), everything else as PNG."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input image file or directory
    input: String,

    /// Output file or directory (default: {name}_processed.{ext})
    #[arg(short, long)]
    output: Option<String>,

    /// Number of processing iterations (1-10)
    #[arg(short, long, default_value = "1")]
    iterations: u32,

    /// Noise intensity multiplier (0.1-2.0)
    #[arg(short = 'n', long, default_value = "1.0")]
    intensity: f32,

    /// Fixed noise seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Reject images with more pixels than this (0 disables the limit)
    #[arg(long, default_value_t = DEFAULT_MAX_PIXELS)]
    max_pixels: u64,

    /// Print format, mode and size of the input instead of processing it
    #[arg(long)]
    info: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn init_logging(opts: &ProcessOptions) {
    let default = if opts.quiet {
        "error"
    } else if opts.verbose {
        "deaify=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let opts = ProcessOptions {
        iterations: cli.iterations,
        intensity: cli.intensity,
        seed: cli.seed,
        max_pixels: (cli.max_pixels > 0).then_some(cli.max_pixels),
        verbose: cli.verbose,
        quiet: cli.quiet,
    };
    init_logging(&opts);

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }

    if cli.info {
        print_info(input_path);
        return;
    }

    let engine = match Engine::new(&opts) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Iterations must be between 1 and 10, intensity between 0.1 and 2.0");
            process::exit(1);
        }
    };

    if !opts.quiet {
        let params = engine.params();
        eprintln!(
            "{} iteration(s), intensity {:.2} ({:.1}% noise){}",
            params.iterations(),
            params.intensity(),
            params.noise_percentage(),
            opts.seed.map(|s| format!(", seed {s}")).unwrap_or_default()
        );
        eprintln!();
    }

    let results = if input_path.is_dir() {
        let output_dir = if let Some(o) = &cli.output {
            PathBuf::from(o)
        } else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: deaify <input_dir> -o <output_dir>");
            process::exit(1);
        };
        engine.process_directory(input_path, &output_dir)
    } else {
        let output_path = match &cli.output {
            Some(o) => PathBuf::from(o),
            None => default_output_path(input_path),
        };
        vec![engine.process_file(input_path, &output_path)]
    };

    let mut success_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, &opts);
        if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !opts.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn print_info(path: &Path) {
    match inspect_file(path) {
        Ok(info) => {
            let format = info
                .format
                .map_or_else(|| "unknown".to_string(), |f| format!("{f:?}"));
            println!("file:   {}", path.display());
            println!("format: {format}");
            println!("mode:   {:?}", info.color);
            println!("size:   {}x{}", info.width, info.height);
            println!("bytes:  {}", info.file_size_bytes);
        }
        Err(e) => {
            eprintln!("[FAIL] {}: {e}", path.display());
            process::exit(1);
        }
    }
}

fn print_result(result: &ProcessResult, opts: &ProcessOptions) {
    if opts.quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.success {
        match &result.output {
            Some(out) => eprintln!("[OK] {filename} -> {}", out.display()),
            None => eprintln!("[OK] {filename}"),
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    if opts.verbose && result.success && !result.message.is_empty() {
        eprintln!("  -> {}", result.message);
    }
}
