//! terrasim CLI - procedural terrain generator.
//!
//! Runs the full pipeline (synthesis, geology, climate, erosion, rivers,
//! biomes) and writes heightfields, biome maps and river paths.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use terrasim::erosion::ErosionBackend;
use terrasim::export::{
    export_biome_map_png, export_biome_weights_raw, export_heightfield_png, export_heightfield_raw,
    export_mask_png_u8, export_rivers_json, expected_file_size, BiomeMapOptions, PngExportOptions, RawFormat,
};
use terrasim::pipeline::{Pipeline, TerrainConfig, World};
use terrasim::rivers::river_mask_from_accum;

const DEFAULT_LOG_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Procedural terrain generator.
#[derive(Parser)]
#[command(name = "terrasim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Grid erosion backend.
    #[arg(long, global = true, value_enum)]
    backend: Option<BackendArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate terrain and export it.
    Generate(GenerateArgs),

    /// Display memory and file size estimates for a configuration.
    Info {
        /// Cells per side; overrides the configuration.
        #[arg(short, long)]
        resolution: Option<u32>,

        /// JSON configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// JSON configuration file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Built-in configuration used when no file is given.
    #[arg(long, value_enum, default_value = "default")]
    preset: Preset,

    /// Cells per side (16-8192).
    #[arg(short, long)]
    resolution: Option<u32>,

    /// Random seed for reproducible generation.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Side length of the map in world units.
    #[arg(long)]
    world_size: Option<f32>,

    /// Season as a fraction of the year (0-1).
    #[arg(long)]
    season: Option<f32>,

    /// Number of erosion particles.
    #[arg(long)]
    particles: Option<u32>,

    /// Grid erosion iterations.
    #[arg(long)]
    grid_iterations: Option<u32>,

    /// Skip faults and volcanoes.
    #[arg(long)]
    skip_geology: bool,

    /// Skip river tracing and carving.
    #[arg(long)]
    skip_rivers: bool,

    /// Output directory for generated files.
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,

    /// Base name for output files.
    #[arg(short, long, default_value = "terrain")]
    name: String,

    /// Heightfield export format.
    #[arg(short, long, value_enum, default_value = "png")]
    format: ExportFormat,

    /// Export the dominant-biome preview map.
    #[arg(long)]
    biome_map: bool,

    /// Export raw biome weights.
    #[arg(long)]
    biome_weights: bool,

    /// Export river paths as JSON.
    #[arg(long)]
    rivers_json: bool,

    /// Export the flow-accumulation river mask.
    #[arg(long)]
    river_map: bool,

    /// Write the effective configuration next to the outputs.
    #[arg(long)]
    save_config: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Auto,
    Gpu,
    Cpu,
}

impl From<BackendArg> for ErosionBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Auto => ErosionBackend::Auto,
            BackendArg::Gpu => ErosionBackend::GpuOnly,
            BackendArg::Cpu => ErosionBackend::CpuOnly,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    Default,
    Rugged,
    Gentle,
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

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate(args) => run_generate(args, cli.backend),
        Commands::Info { resolution, config } => run_info(resolution, config.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>, preset: Preset) -> Result<TerrainConfig, Box<dyn Error>> {
    Ok(match path {
        Some(path) => TerrainConfig::from_json_file(path)?,
        None => match preset {
            Preset::Default => TerrainConfig::default(),
            Preset::Rugged => TerrainConfig::rugged(),
            Preset::Gentle => TerrainConfig::gentle(),
        },
    })
}

fn apply_overrides(config: &mut TerrainConfig, args: &GenerateArgs, backend: Option<BackendArg>) {
    if let Some(resolution) = args.resolution {
        config.resolution = resolution;
    }
    // A config file keeps its own seed unless one is given.
    match args.seed {
        Some(seed) => config.seed = seed,
        None if args.config.is_none() => config.seed = rand::random(),
        None => {}
    }
    if let Some(world_size) = args.world_size {
        config.world_size = world_size;
    }
    if let Some(season) = args.season {
        config.climate.season = season;
        config.biomes.season = season;
    }
    if let Some(count) = args.particles {
        config.erosion.particles.count = count;
    }
    if let Some(iterations) = args.grid_iterations {
        config.erosion.grid.iterations = iterations;
    }
    if let Some(backend) = backend {
        config.erosion.backend = backend.into();
    }
    if args.skip_geology {
        config.geology = None;
    }
    if args.skip_rivers {
        config.rivers = None;
    }
}

fn run_generate(args: GenerateArgs, backend: Option<BackendArg>) -> Result<(), Box<dyn Error>> {
    let mut config = load_config(args.config.as_deref(), args.preset)?;
    apply_overrides(&mut config, &args, backend);

    if !(16..=8192).contains(&config.resolution) {
        return Err("resolution must be between 16 and 8192".into());
    }
    config.validate()?;

    println!("terrasim - Procedural Terrain Generator");
    println!("=======================================");
    println!("Resolution: {}x{}", config.resolution, config.resolution);
    println!("Seed: {}", config.seed);
    println!("Output: {}", args.output.display());

    let start = Instant::now();
    let pipeline = Pipeline::standard(&config);
    let mut world = World::new();
    pipeline.run_with_callbacks(
        &mut world,
        |name, i, total| println!("  [{}/{}] Starting: {}", i + 1, total, name),
        |name, i, total| println!("  [{}/{}] Completed: {}", i + 1, total, name),
    )?;
    println!("Generation completed in {:.2?}", start.elapsed());

    let field = world.heightfield.as_ref().ok_or("pipeline produced no heightfield")?;
    let (min_h, max_h) = field.height_range();
    println!("Height range: [{:.4}, {:.4}]", min_h, max_h);
    if let Some(report) = &world.erosion {
        info!(
            backend = %report.backend,
            particles = report.particles_spawned,
            lost_sediment = report.lost_sediment,
            "erosion summary"
        );
    }

    std::fs::create_dir_all(&args.output)?;
    let name = &args.name;

    match args.format {
        ExportFormat::Png => {
            let path = args.output.join(format!("{}.png", name));
            export_heightfield_png(field, &path, &PngExportOptions::default())?;
            println!("  Exported {}", path.display());
        }
        ExportFormat::Raw | ExportFormat::RawFloat => {
            let format = match args.format {
                ExportFormat::RawFloat => RawFormat::R32Float,
                _ => RawFormat::R16LittleEndian,
            };
            let path = args.output.join(format!("{}.raw", name));
            export_heightfield_raw(field, &path, format, 0.0, 1.0)?;
            println!("  Exported {} ({:?})", path.display(), format);
        }
    }

    if args.biome_map || args.biome_weights {
        match &world.biome_weights {
            Some(weights) => {
                if args.biome_map {
                    let path = args.output.join(format!("{}_biomes.png", name));
                    export_biome_map_png(weights, &world.biomes, &path, &BiomeMapOptions::default())?;
                    println!("  Exported {}", path.display());
                }
                if args.biome_weights {
                    let path = args.output.join(format!("{}_biome_weights.raw", name));
                    export_biome_weights_raw(weights, &path)?;
                    println!("  Exported {} ({} biomes per cell)", path.display(), weights.biome_count());
                }
            }
            None => warn!("no biome weights to export"),
        }
    }

    if args.rivers_json {
        let path = args.output.join(format!("{}_rivers.json", name));
        export_rivers_json(&world.rivers, field.width(), field.height(), &path)?;
        println!("  Exported {} ({} rivers)", path.display(), world.rivers.len());
    }

    if args.river_map {
        match (&world.flow_accumulation, &config.rivers) {
            (Some(accum), Some(rivers)) => {
                let mask = river_mask_from_accum(accum, rivers.accumulation_threshold);
                let path = args.output.join(format!("{}_river_mask.png", name));
                export_mask_png_u8(field.width(), field.height(), &mask, &path)?;
                println!("  Exported {}", path.display());
            }
            _ => warn!("rivers were skipped; no river mask to export"),
        }
    }

    if args.save_config {
        let path = args.output.join(format!("{}_config.json", name));
        std::fs::write(&path, config.to_json_string()?)?;
        println!("  Exported {}", path.display());
    }

    Ok(())
}

fn mb(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

fn run_info(resolution: Option<u32>, config_path: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let mut config = load_config(config_path, Preset::Default)?;
    if let Some(resolution) = resolution {
        config.resolution = resolution;
    }
    let estimate = config.memory_estimate();
    let res = config.resolution;

    println!("terrasim - Configuration Info");
    println!("=============================");
    println!();
    println!("Resolution: {}x{} ({} cells)", res, res, estimate.cells);
    println!("Biomes: {}", config.biomes.biomes.len());
    println!();
    println!("Memory usage (in-memory):");
    println!("  Heightfield:        {:>12} bytes ({:.2} MB)", estimate.heightfield_bytes, mb(estimate.heightfield_bytes));
    println!("  Climate grids:      {:>12} bytes ({:.2} MB)", estimate.climate_bytes, mb(estimate.climate_bytes));
    println!(
        "  Erosion working set:{:>12} bytes ({:.2} MB)",
        estimate.erosion_working_set_bytes,
        mb(estimate.erosion_working_set_bytes)
    );
    println!("  Biome weights:      {:>12} bytes ({:.2} MB)", estimate.biome_weight_bytes, mb(estimate.biome_weight_bytes));
    println!("  Peak:               {:>12} bytes ({:.2} MB)", estimate.peak_bytes(), mb(estimate.peak_bytes()));
    println!();
    println!("Export file sizes:");
    for (label, format) in [
        ("RAW (R16)", RawFormat::R16LittleEndian),
        ("RAW (R32)", RawFormat::R32Float),
    ] {
        let bytes = expected_file_size(res, res, format);
        println!("  {}:  {:>12} bytes ({:.2} MB)", label, bytes, mb(bytes));
    }
    println!();

    // Engine compatibility notes
    println!("Engine compatibility notes:");
    if res.is_power_of_two() {
        println!("  Unity:    OK (power of 2)");
        println!("  Godot:    OK (power of 2)");
    } else {
        println!("  Unity:    May require power-of-2 resolution");
        println!("  Godot:    May require power-of-2 resolution");
    }
    if (res.saturating_sub(1)).is_power_of_two() {
        println!("  Unreal:   OK (power-of-2 + 1)");
    } else {
        println!("  Unreal:   Recommended resolution {}", res.next_power_of_two() + 1);
    }

    Ok(())
}
