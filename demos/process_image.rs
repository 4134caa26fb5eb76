//! Run the pipeline over a single image.
//!
//! Usage:
//! ```sh
//! cargo run --example process_image -- input.jpg output.jpg [iterations] [intensity]
//! ```

use std::env;
use std::process;

use deaify::{Engine, ProcessOptions};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <input> <output> [iterations] [intensity]", args[0]);
        process::exit(1);
    }

    let input = &args[1];
    let output = &args[2];
    let iterations = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(1);
    let intensity = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(1.0);

    let opts = ProcessOptions {
        iterations,
        intensity,
        ..ProcessOptions::default()
    };
    let engine = Engine::new(&opts).expect("parameters out of range");
    let result = engine.process_file(input.as_ref(), output.as_ref());

    if result.success {
        println!("Done: {}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        process::exit(1);
    }
}
