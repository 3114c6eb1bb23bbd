//! terrain-erosion CLI - headless pipe-model erosion.
//!
//! Seeds a noise heightfield, runs a number of full erosion sweeps against an
//! in-memory height receiver, and exports the published terrain.

use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::Instant;

use terrain_erosion::erosion::{ErosionConfig, ErosionSimulator, Phase};
use terrain_erosion::export::{
    expected_file_size, export_heightfield_png, export_heightfield_raw, export_scalar_png,
    PngExportOptions, RawFormat,
};
use terrain_erosion::terrain::HeightfieldRecorder;

/// Pipe-model hydraulic erosion over a square heightfield.
#[derive(Parser)]
#[command(name = "terrain-erosion")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed a terrain, erode it, and export the result.
    Simulate(SimulateArgs),

    /// Display memory and file size estimates for a grid size.
    Info {
        /// Grid side length in cells.
        #[arg(short, long, default_value = "256")]
        size: usize,
    },
}

#[derive(Args)]
struct SimulateArgs {
    /// Grid side length in cells (e.g., 128, 256, 512).
    #[arg(short, long, default_value = "256")]
    size: usize,

    /// Noise seed offset for terrain and rain. Random if omitted.
    #[arg(long)]
    seed: Option<u32>,

    /// Number of full sweeps to run.
    #[arg(long, default_value = "200")]
    sweeps: usize,

    /// Frame delta time fed to every row step (scaled by the time multiplier).
    #[arg(long, default_value = "0.05")]
    dt: f32,

    /// Read the erosion constants from a JSON file (flags below override it).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective erosion constants to a JSON file.
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Output directory for generated files.
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,

    /// Base name for output files.
    #[arg(short, long, default_value = "terrain")]
    name: String,

    /// Export format of the heightfield.
    #[arg(short, long, default_value = "png")]
    format: ExportFormat,

    /// Export the final water depth as a PNG.
    #[arg(long)]
    water_map: bool,

    /// Export the final suspended sediment as a PNG.
    #[arg(long)]
    sediment_map: bool,

    /// Disable rainfall.
    #[arg(long)]
    no_rain: bool,

    #[command(flatten)]
    knobs: KnobArgs,
}

/// Overrides for individual erosion constants.
#[derive(Args)]
struct KnobArgs {
    /// Distance between cell centers.
    #[arg(long)]
    pipe_length: Option<f32>,

    /// Rain mask threshold (noise samples lie in [0, 0.5]).
    #[arg(long)]
    rain_threshold: Option<f32>,

    /// Rain intensity multiplier.
    #[arg(long)]
    rain_multiplier: Option<f32>,

    /// Rain pattern drift per sweep.
    #[arg(long)]
    seed_increment: Option<f32>,

    /// Sediment capacity constant.
    #[arg(long)]
    capacity: Option<f32>,

    /// Dissolving constant.
    #[arg(long)]
    dissolving: Option<f32>,

    /// Deposition constant.
    #[arg(long)]
    deposition: Option<f32>,

    /// Evaporation constant.
    #[arg(long)]
    evaporation: Option<f32>,

    /// Lower bound of the transport capacity.
    #[arg(long)]
    min_capacity: Option<f32>,

    /// Multiplier applied to --dt.
    #[arg(long)]
    time_multiplier: Option<f32>,

    /// Initial terrain height scale.
    #[arg(long)]
    height_amplitude: Option<f32>,
}

impl KnobArgs {
    fn apply(&self, config: &mut ErosionConfig) {
        let overrides = [
            (self.pipe_length, &mut config.pipe_length),
            (self.rain_threshold, &mut config.rain_threshold),
            (self.rain_multiplier, &mut config.rain_multiplier),
            (self.seed_increment, &mut config.seed_increment),
            (self.capacity, &mut config.sediment_capacity),
            (self.dissolving, &mut config.dissolving_rate),
            (self.deposition, &mut config.deposition_rate),
            (self.evaporation, &mut config.evaporation_rate),
            (self.min_capacity, &mut config.minimum_capacity),
            (self.time_multiplier, &mut config.time_multiplier),
            (self.height_amplitude, &mut config.height_amplitude),
        ];
        for (value, slot) in overrides {
            if let Some(v) = value {
                *slot = v;
            }
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    /// 16-bit PNG (universal compatibility).
    Png,
    /// 16-bit RAW little-endian (Unity).
    Raw,
    /// 32-bit float RAW (high precision).
    RawFloat,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate(args) => run_simulate(args),
        Commands::Info { size } => run_info(size),
    }
}

fn run_simulate(args: SimulateArgs) {
    // Validate parameters
    if args.size < 2 || args.size > 8192 {
        eprintln!("Error: Size must be between 2 and 8192");
        std::process::exit(1);
    }

    if args.sweeps == 0 {
        eprintln!("Error: At least one sweep is required to publish heights");
        std::process::exit(1);
    }

    if args.dt.is_nan() || args.dt <= 0.0 {
        eprintln!("Error: Delta time must be positive");
        std::process::exit(1);
    }

    let mut config = match &args.config {
        Some(path) => match ErosionConfig::load_json(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error reading config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => ErosionConfig::default(),
    };

    // Generate seed if neither the flags nor the config file provide one
    let seed = match (args.seed, &args.config) {
        (Some(seed), _) => seed as f32,
        (None, Some(_)) => config.noise_seed,
        (None, None) => rand::rng().random_range(0..10_000u32) as f32,
    };
    config.noise_seed = seed;
    args.knobs.apply(&mut config);
    if args.no_rain {
        config = config.without_rain();
    }

    if let Some(path) = &args.save_config {
        if let Err(e) = config.save_json(path) {
            eprintln!("Error writing config {}: {}", path.display(), e);
            std::process::exit(1);
        }
        println!("Saved configuration to {}", path.display());
    }

    println!("terrain-erosion - Pipe-Model Hydraulic Erosion");
    println!("==============================================");
    println!("Grid: {}x{}", args.size, args.size);
    println!("Seed: {}", seed);
    println!("Sweeps: {} (dt {} x {})", args.sweeps, args.dt, config.time_multiplier);
    println!("Output: {}", args.output.display());

    let start = Instant::now();

    println!("\nSeeding terrain...");
    let mut sim = match ErosionSimulator::new(config, args.size) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let initial = sim.stats();

    println!("Running erosion...");
    let mut recorder = HeightfieldRecorder::new(args.size);
    let report_every = (args.sweeps / 10).max(1);
    for sweep in 1..=args.sweeps {
        sim.run_full_sweep(args.dt, &mut recorder);
        if sweep % report_every == 0 || sweep == args.sweeps {
            let stats = sim.stats();
            println!(
                "  [{:>3}%] sweep {}/{}: water {:.3}, sediment {:.3}",
                sweep * 100 / args.sweeps,
                sweep,
                args.sweeps,
                stats.total_water,
                stats.total_sediment
            );
        }
    }

    let stats = sim.stats();
    println!("Completed {} sweeps in {:.2?}", sim.sweeps_completed(), start.elapsed());
    println!(
        "Terrain volume: {:.3} -> {:.3} (suspended {:.3})",
        initial.total_terrain, stats.total_terrain, stats.total_sediment
    );

    if let Err(e) = std::fs::create_dir_all(&args.output) {
        eprintln!("Error creating output directory: {}", e);
        std::process::exit(1);
    }

    let heightfield = recorder.into_heightfield();
    let (min_h, max_h) = heightfield.height_range();
    println!("\nHeight range: [{:.4}, {:.4}]", min_h, max_h);

    println!("Exporting...");
    let export_start = Instant::now();

    match args.format {
        ExportFormat::Png => {
            let options = PngExportOptions::auto_range(&heightfield);
            let path = args.output.join(format!("{}_height.png", args.name));
            if let Err(e) = export_heightfield_png(&heightfield, &path, &options) {
                eprintln!("Error exporting PNG: {}", e);
                std::process::exit(1);
            }
            println!("Exported {}", path.display());
        }
        ExportFormat::Raw | ExportFormat::RawFloat => {
            let raw_format = match args.format {
                ExportFormat::RawFloat => RawFormat::R32Float,
                _ => RawFormat::R16LittleEndian,
            };
            let path = args.output.join(format!("{}_height.raw", args.name));
            let max = if max_h > min_h { max_h } else { min_h + 1.0 };
            if let Err(e) = export_heightfield_raw(&heightfield, &path, raw_format, min_h, max) {
                eprintln!("Error exporting RAW: {}", e);
                std::process::exit(1);
            }
            println!("Exported {}", path.display());
        }
    }

    let layers = [
        (args.water_map, "water", sim.grid().water()),
        (args.sediment_map, "sediment", sim.grid().sediment()),
    ];
    for (enabled, label, data) in layers {
        if enabled {
            let path = args.output.join(format!("{}_{}.png", args.name, label));
            export_layer(args.size, data, &path, label);
        }
    }

    println!("Export completed in {:.2?}", export_start.elapsed());
    println!("\nTotal time: {:.2?}", start.elapsed());
}

fn export_layer(size: usize, data: &[f32], path: &Path, label: &str) {
    let options = PngExportOptions::auto_range_values(data);
    if let Err(e) = export_scalar_png(size, data, path, &options) {
        eprintln!("Error exporting {} map: {}", label, e);
        std::process::exit(1);
    }
    println!(
        "Exported {} ({} range [{:.4}, {:.4}])",
        path.display(),
        label,
        options.min_value,
        options.max_value
    );
}

fn run_info(size: usize) {
    let cells = (size as u64) * (size as u64);

    // Terrain, water and sediment keep a current and a previous value.
    let bytes_layers = cells * 4 * 2 * 3;
    let bytes_flux = cells * 4 * 4;
    let bytes_velocity = cells * 4 * 2;
    let bytes_published = cells * 4;
    let total_memory = bytes_layers + bytes_flux + bytes_velocity + bytes_published;
    let mb = |bytes: u64| bytes as f64 / 1024.0 / 1024.0;

    println!("terrain-erosion - Grid Info");
    println!("===========================");
    println!();
    println!("Grid: {}x{} ({} cells)", size, size, cells);
    println!("Row steps per sweep: {}", size * Phase::ALL.len());
    println!();
    println!("Memory usage (in-memory):");
    println!("  Scalar layers:   {:>12} bytes ({:.2} MB)", bytes_layers, mb(bytes_layers));
    println!("  Outflow flux:    {:>12} bytes ({:.2} MB)", bytes_flux, mb(bytes_flux));
    println!("  Velocity:        {:>12} bytes ({:.2} MB)", bytes_velocity, mb(bytes_velocity));
    println!("  Published:       {:>12} bytes ({:.2} MB)", bytes_published, mb(bytes_published));
    println!("  Total:           {:>12} bytes ({:.2} MB)", total_memory, mb(total_memory));
    println!();
    println!("Export file sizes:");
    for (label, format) in [
        ("RAW (R16)", RawFormat::R16LittleEndian),
        ("RAW (R32)", RawFormat::R32Float),
    ] {
        let bytes = expected_file_size(size, format);
        println!("  {:<14} {:>10} bytes ({:.2} MB)", label, bytes, mb(bytes));
    }
    println!("  {:<14} {:>10} bytes max, uncompressed", "PNG (16-bit)", cells * 2);
    println!();

    if is_power_of_two(size) {
        println!("Size is a power of 2 (engine friendly)");
    } else {
        println!("Note: many engines expect power-of-2 (or power-of-2 + 1) heightmaps");
    }
}

fn is_power_of_two(n: usize) -> bool {
    n > 0 && (n & (n - 1)) == 0
}
