//! hypersam CLI - Hyperspectral radiance to surface classification

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use hypersam_algorithms::atmosphere::{
    cost_reflectance, dark_object_values, DarkObjectParams, EmptyBandPolicy, SceneGeometry,
};
use hypersam_algorithms::imagery::{rgb_composite, stretch_raster, StretchParams};
use hypersam_algorithms::pipeline::{run_pipeline, PipelineParams};
use hypersam_algorithms::spectral::sam_classify;
use hypersam_core::io::{
    read_cube, read_solar_spectrum, read_spectral_library, write_classification, write_cube,
    write_dark_objects, write_quicklook, write_quicklook_rgb,
};
use hypersam_core::{Cube, Raster, SpectralLibrary};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "hypersam")]
#[command(author, version, about = "Hyperspectral reflectance correction and spectral angle mapping", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// A cube GeoTIFF and the table naming its bands
#[derive(Args)]
struct CubeArgs {
    /// Input cube (GeoTIFF, one page or sample per band)
    input: PathBuf,
    /// Band table CSV (`band,wavelength`)
    #[arg(short, long)]
    bands: PathBuf,
}

/// Sun–target geometry, from a JSON scene file and/or flags (flags win)
#[derive(Args)]
struct SceneArgs {
    /// JSON scene file: {"earth_sun_distance": .., "sun_elevation": ..}
    #[arg(long)]
    scene: Option<PathBuf>,
    /// Earth–Sun distance in AU
    #[arg(short, long)]
    distance: Option<f64>,
    /// Sun elevation in degrees above the horizon
    #[arg(short = 'e', long)]
    sun_elevation: Option<f64>,
}

#[derive(Args)]
struct DarkObjectArgs {
    /// Percentile of positive radiance used as the dark object
    #[arg(short, long, default_value = "0.5")]
    percentile: f64,
    /// Fail on bands with no positive values instead of using 0
    #[arg(long)]
    fail_on_empty: bool,
}

impl DarkObjectArgs {
    fn params(&self) -> DarkObjectParams {
        DarkObjectParams {
            percentile: self.percentile,
            empty_band: if self.fail_on_empty {
                EmptyBandPolicy::Fail
            } else {
                EmptyBandPolicy::Zero
            },
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a hyperspectral cube
    Info {
        #[command(flatten)]
        cube: CubeArgs,
    },
    /// Percentile-stretch one band into an 8-bit greyscale quicklook
    Stretch {
        #[command(flatten)]
        cube: CubeArgs,
        /// Output file
        output: PathBuf,
        /// Band label (defaults to the band nearest --wavelength)
        #[arg(long)]
        band: Option<u16>,
        /// Wavelength in nm used to pick the band
        #[arg(short, long, default_value = "650")]
        wavelength: f64,
        /// Lower percentile
        #[arg(long, default_value = "2")]
        pmin: f64,
        /// Upper percentile
        #[arg(long, default_value = "98")]
        pmax: f64,
    },
    /// Stretch three bands into an 8-bit RGB quicklook
    Composite {
        #[command(flatten)]
        cube: CubeArgs,
        /// Output file
        output: PathBuf,
        /// Red, green, blue band labels, e.g. "29,20,11"
        #[arg(long, default_value = "29,20,11")]
        rgb: String,
        /// Lower percentile
        #[arg(long, default_value = "2")]
        pmin: f64,
        /// Upper percentile
        #[arg(long, default_value = "98")]
        pmax: f64,
    },
    /// Estimate per-band dark-object radiance
    DarkObject {
        #[command(flatten)]
        cube: CubeArgs,
        /// Output CSV (`band,wavelength,dark`)
        output: PathBuf,
        #[command(flatten)]
        dark: DarkObjectArgs,
    },
    /// Convert radiance to COST surface reflectance
    Correct {
        #[command(flatten)]
        cube: CubeArgs,
        /// Output reflectance cube
        output: PathBuf,
        /// Solar irradiance CSV (`wavelength,irradiance`, W/m²/nm)
        #[arg(short, long)]
        solar: PathBuf,
        #[command(flatten)]
        scene: SceneArgs,
        #[command(flatten)]
        dark: DarkObjectArgs,
        /// Also write the dark objects to this CSV
        #[arg(long)]
        dark_output: Option<PathBuf>,
    },
    /// Classify a reflectance cube against a spectral library
    Sam {
        #[command(flatten)]
        cube: CubeArgs,
        /// Output classification (8-bit GeoTIFF, 255 = no-data)
        output: PathBuf,
        /// Spectral library CSV (`wavelength,<name>,...`)
        #[arg(short, long)]
        library: PathBuf,
        /// Comma-separated end members to use, in class order
        #[arg(long)]
        end_members: Option<String>,
        /// Radiance cube the no-data mask is read from (defaults to the input)
        #[arg(long)]
        radiance: Option<PathBuf>,
        /// Band whose zero value marks no-data (defaults to the first band)
        #[arg(long)]
        nodata_band: Option<u16>,
    },
    /// Radiance to classification: dark objects, COST and SAM in one run
    Classify {
        #[command(flatten)]
        cube: CubeArgs,
        /// Output classification (8-bit GeoTIFF, 255 = no-data)
        output: PathBuf,
        /// Solar irradiance CSV (`wavelength,irradiance`, W/m²/nm)
        #[arg(short, long)]
        solar: PathBuf,
        /// Spectral library CSV (`wavelength,<name>,...`)
        #[arg(short, long)]
        library: PathBuf,
        #[command(flatten)]
        scene: SceneArgs,
        #[command(flatten)]
        dark: DarkObjectArgs,
        /// Comma-separated end members to use, in class order
        #[arg(long)]
        end_members: Option<String>,
        /// Band whose zero radiance marks no-data (defaults to the first band)
        #[arg(long)]
        nodata_band: Option<u16>,
        /// Also write the reflectance cube
        #[arg(long)]
        reflectance_output: Option<PathBuf>,
        /// Also write the dark objects to this CSV
        #[arg(long)]
        dark_output: Option<PathBuf>,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set up logging")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_cube(args: &CubeArgs) -> Result<Cube> {
    let pb = spinner("Reading cube...");
    let cube = read_cube(&args.input, &args.bands)
        .with_context(|| format!("Failed to read cube {}", args.input.display()))?;
    pb.finish_and_clear();
    info!(
        "Input: {} x {}, {} bands",
        cube.cols(),
        cube.rows(),
        cube.n_bands()
    );
    Ok(cube)
}

fn load_library(path: &Path, end_members: Option<&str>) -> Result<SpectralLibrary> {
    let library = read_spectral_library(path).context("Failed to read spectral library")?;
    match end_members {
        Some(names) => {
            let names = parse_names(names);
            library.select(&names).context("Invalid end member selection")
        }
        None => Ok(library),
    }
}

fn write_reflectance(cube: &Cube, path: &Path) -> Result<()> {
    let pb = spinner("Writing reflectance...");
    write_cube(cube, path).context("Failed to write reflectance cube")?;
    pb.finish_and_clear();
    Ok(())
}

fn write_classes(classes: &Raster<u8>, template: &Path, path: &Path) -> Result<()> {
    let pb = spinner("Writing classification...");
    write_classification(classes, template, path).context("Failed to write classification")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn print_class_counts(classes: &Raster<u8>, names: &[String]) {
    let total = classes.len().max(1) as f64;
    for (class, count) in classes.class_counts() {
        let name = names.get(class as usize).map(String::as_str).unwrap_or("?");
        println!(
            "  {:>3} {:<20} {:>10} ({:.1}%)",
            class,
            name,
            count,
            100.0 * count as f64 / total
        );
    }
}

fn parse_names(s: &str) -> Vec<String> {
    s.split(',')
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

fn parse_rgb(s: &str) -> Result<[u16; 3]> {
    let labels = s
        .split(',')
        .map(|p| p.trim().parse::<u16>().with_context(|| format!("Invalid band label: {}", p)))
        .collect::<Result<Vec<u16>>>()?;
    match labels.as_slice() {
        &[r, g, b] => Ok([r, g, b]),
        _ => anyhow::bail!("RGB bands must be three labels 'r,g,b', got: {}", s),
    }
}

#[derive(Debug, Default, Deserialize)]
struct SceneFile {
    earth_sun_distance: Option<f64>,
    sun_elevation: Option<f64>,
}

fn resolve_scene(args: &SceneArgs) -> Result<SceneGeometry> {
    let file = match &args.scene {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read scene file {}", path.display()))?;
            serde_json::from_str::<SceneFile>(&text).context("Invalid scene file")?
        }
        None => SceneFile::default(),
    };
    let distance = args.distance.or(file.earth_sun_distance).unwrap_or_else(|| {
        info!("No Earth-Sun distance given, using 1 AU");
        1.0
    });
    let elevation = args
        .sun_elevation
        .or(file.sun_elevation)
        .context("Sun elevation is required (--sun-elevation or a scene file)")?;
    let scene = SceneGeometry::from_sun_elevation(distance, elevation).context("Invalid scene geometry")?;
    info!("Scene: d = {} AU, sun elevation {}°", distance, elevation);
    Ok(scene)
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { cube: args } => {
            let cube = load_cube(&args)?;
            let (n_bands, rows, cols) = cube.dim();
            let labels = cube.labels();
            let wavelengths = cube.wavelengths();
            let first = cube.band_raster(labels[0])?;
            let bounds = first.bounds();

            println!("File: {}", args.input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, rows * cols);
            println!("Bands: {} (labels {}..{})", n_bands, labels[0], labels[n_bands - 1]);
            println!(
                "Wavelengths: {:.2} - {:.2} nm",
                wavelengths[0],
                wavelengths[n_bands - 1]
            );
            println!("Cell size: {}", first.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = cube.crs() {
                println!("CRS: {}", crs);
            }
            let stats = first.statistics();
            println!(
                "  Valid cells (band {}): {} ({:.1}%)",
                labels[0],
                stats.valid_count,
                100.0 * stats.valid_count as f64 / first.len().max(1) as f64
            );
        }

        // ── Display ──────────────────────────────────────────────────
        Commands::Stretch {
            cube: args,
            output,
            band,
            wavelength,
            pmin,
            pmax,
        } => {
            let cube = load_cube(&args)?;
            let label = band.unwrap_or_else(|| cube.nearest_band(wavelength));
            info!("Band {} ({} nm)", label, cube.wavelength(label)?);
            let start = Instant::now();
            let stretched = stretch_raster(&cube.band_raster(label)?, StretchParams { pmin, pmax })
                .context("Stretch failed")?;
            let elapsed = start.elapsed();
            write_quicklook(stretched.data(), stretched.transform(), stretched.crs(), &output)
                .context("Failed to write quicklook")?;
            done("Stretch", &output, elapsed);
        }

        Commands::Composite {
            cube: args,
            output,
            rgb,
            pmin,
            pmax,
        } => {
            let bands = parse_rgb(&rgb)?;
            let cube = load_cube(&args)?;
            let start = Instant::now();
            let composite = rgb_composite(&cube, bands, StretchParams { pmin, pmax })
                .context("Composite failed")?;
            let elapsed = start.elapsed();
            write_quicklook_rgb(&composite, cube.transform(), cube.crs(), &output)
                .context("Failed to write quicklook")?;
            done("Composite", &output, elapsed);
        }

        // ── Atmosphere ───────────────────────────────────────────────
        Commands::DarkObject {
            cube: args,
            output,
            dark,
        } => {
            let cube = load_cube(&args)?;
            let start = Instant::now();
            let values = dark_object_values(&cube, &dark.params())?;
            let elapsed = start.elapsed();
            write_dark_objects(&output, cube.labels(), cube.wavelengths(), &values)
                .context("Failed to write dark objects")?;
            done("Dark objects", &output, elapsed);
        }

        Commands::Correct {
            cube: args,
            output,
            solar,
            scene,
            dark,
            dark_output,
        } => {
            let scene = resolve_scene(&scene)?;
            let solar = read_solar_spectrum(&solar).context("Failed to read solar spectrum")?;
            let radiance = load_cube(&args)?;

            let start = Instant::now();
            let dark_objects = dark_object_values(&radiance, &dark.params())?;
            let irradiance = solar.band_irradiance(radiance.wavelengths())?;
            let reflectance = cost_reflectance(&radiance, &dark_objects, &irradiance, &scene)?;
            let elapsed = start.elapsed();

            if let Some(path) = dark_output {
                write_dark_objects(&path, radiance.labels(), radiance.wavelengths(), &dark_objects)
                    .context("Failed to write dark objects")?;
            }
            write_reflectance(&reflectance, &output)?;
            done("Reflectance", &output, elapsed);
        }

        // ── Classification ───────────────────────────────────────────
        Commands::Sam {
            cube: args,
            output,
            library,
            end_members,
            radiance,
            nodata_band,
        } => {
            let library = load_library(&library, end_members.as_deref())?;
            let reflectance = load_cube(&args)?;
            let nodata_source = match &radiance {
                Some(path) => read_cube(path, &args.bands)
                    .with_context(|| format!("Failed to read radiance {}", path.display()))?,
                None => reflectance.clone(),
            };
            let nodata_band = nodata_band.unwrap_or(reflectance.labels()[0]);

            let start = Instant::now();
            let classes = sam_classify(&reflectance, &library, nodata_band, &nodata_source)?;
            let elapsed = start.elapsed();

            write_classes(&classes, &args.input, &output)?;
            print_class_counts(&classes, library.names());
            done("Classification", &output, elapsed);
        }

        Commands::Classify {
            cube: args,
            output,
            solar,
            library,
            scene,
            dark,
            end_members,
            nodata_band,
            reflectance_output,
            dark_output,
        } => {
            let params = PipelineParams {
                dark_object: dark.params(),
                scene: resolve_scene(&scene)?,
                end_members: end_members.as_deref().map(parse_names),
                nodata_band,
            };
            let solar = read_solar_spectrum(&solar).context("Failed to read solar spectrum")?;
            let library = load_library(&library, None)?;
            let radiance = load_cube(&args)?;

            let start = Instant::now();
            let out = run_pipeline(&radiance, &solar, &library, &params)?;
            let elapsed = start.elapsed();

            if let Some(path) = dark_output {
                write_dark_objects(&path, radiance.labels(), radiance.wavelengths(), &out.dark_objects)
                    .context("Failed to write dark objects")?;
            }
            if let Some(path) = reflectance_output {
                write_reflectance(&out.reflectance, &path)?;
            }
            write_classes(&out.classification, &args.input, &output)?;
            print_class_counts(&out.classification, &out.end_members);
            done("Classification", &output, elapsed);
        }
    }

    Ok(())
}
