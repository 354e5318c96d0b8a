//! Feature Matrix Creation Tool
//!
//! Reads every preprocessed flow file in the source directory, windows the
//! flows, extracts features in parallel and writes the labelled matrix.
//!
//! # Output Format
//!
//! - **Matrix**: `{out_dir}/{out_file}` - CSV with the 14-column header
//! - **NumPy** (optional): `features.npy`, `labels.npy`, `metadata.json`
//!
//! # Usage
//!
//! ```bash
//! # Default parameters (data/preprocessed -> data/features/features.csv)
//! cargo run --release --bin create_features -- --defaults
//!
//! # From TOML or JSON config
//! cargo run --release --bin create_features -- --config configs/features.toml
//!
//! # Generate sample config
//! cargo run --release --bin create_features -- --generate-config configs/features.toml
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use stream_feature_extractor::{Pipeline, PipelineConfig, PipelineOutput, FEATURE_COLUMNS};
use std::path::Path;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    match args[1].as_str() {
        "--config" => {
            if args.len() < 3 {
                eprintln!("Error: --config requires a path argument");
                std::process::exit(1);
            }
            match load_config(&args[2]) {
                Ok(config) => run(config),
                Err(e) => {
                    eprintln!("❌ Failed to load config {}: {}", args[2], e);
                    std::process::exit(1);
                }
            }
        }
        "--defaults" => run(PipelineConfig::default()),
        "--generate-config" => {
            if args.len() < 3 {
                eprintln!("Error: --generate-config requires a path argument");
                std::process::exit(1);
            }
            generate_sample_config(&args[2]);
        }
        "--help" | "-h" => {
            print_usage(&args[0]);
        }
        _ => {
            eprintln!("Unknown argument: {}", args[1]);
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!(
        r#"
Feature Matrix Creation Tool

Usage:
    {program} --config <path>            Run with a TOML or JSON config file
    {program} --defaults                 Run with default parameters
    {program} --generate-config <path>   Generate sample config file
    {program} --help                     Show this help

Examples:
    {program} --config configs/features.toml
    RUST_LOG=debug {program} --defaults
"#
    );
}

fn load_config(path: &str) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let is_json = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        PipelineConfig::load_json(path)
    } else {
        PipelineConfig::load_toml(path)
    }
}

fn generate_sample_config(path: &str) {
    let config = PipelineConfig::default();
    let saved = if path.ends_with(".json") {
        config.save_json(path)
    } else {
        config.save_toml(path)
    };

    match saved {
        Ok(()) => {
            println!("✅ Generated sample config: {}", path);
            println!("\nEdit the following fields before running:");
            println!("  - source_dir: Directory with preprocessed flow CSV files");
            println!("  - out_dir / out_file: Where the feature matrix is written");
            println!("  - chunk_size_ms: Window width");
        }
        Err(e) => {
            eprintln!("Error generating config: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(config: PipelineConfig) {
    print_config_summary(&config);

    let pipeline = match Pipeline::from_config(config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("❌ Configuration validation failed: {}", e);
            std::process::exit(1);
        }
    };

    match pipeline.run() {
        Ok(output) => print_output_summary(&output),
        Err(e) => {
            eprintln!("❌ Feature extraction failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_config_summary(config: &PipelineConfig) {
    println!("┌─ Configuration Summary ───────────────────────────────────────┐");
    println!("│ Source:          {}", config.source_dir.display());
    println!("│ File prefix:     {}", config.file_prefix);
    println!("│ Output:          {}", config.output_path().display());
    println!("│ Window:          {} ms", config.chunk_size_ms);
    println!(
        "│ Rolling delay:   {} ms / {} ms",
        config.features.rolling_window_1_ms, config.features.rolling_window_2_ms
    );
    println!(
        "│ Spectral:        {} ms buckets, {} Hz",
        config.features.resample_rate_ms, config.features.frequency
    );
    println!("│ Threads:         {}", config.batch.effective_threads());
    println!("└───────────────────────────────────────────────────────────────┘");
    println!();
}

fn print_output_summary(output: &PipelineOutput) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("Feature Extraction Complete");
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Flows:            {}", output.flows);
    println!("  Packets:          {}", output.packets);
    println!("  Windows:          {}", output.windows);
    println!("  Skipped windows:  {}", output.skipped);
    println!("  Incomplete rows:  {}", output.dropped_incomplete);
    println!("  Rows written:     {}", output.rows);
    println!("  Threads:          {}", output.threads);
    println!("  Total time:       {:?}", output.elapsed);
    if let Some(path) = &output.output_path {
        println!("  Output:           {}", path.display());
    }
    println!("  Columns:          {}", FEATURE_COLUMNS.join(", "));
    println!("═══════════════════════════════════════════════════════════════");
}
