use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use crism_color::logger;
use crism_color::spectral_pipeline::{
    CalibrationLookup, Camera, CameraPipeline, CameraRequest, ColorConfig, ColorPipeline, ConversionReport,
    Illuminant, LuminanceWeighting, NamedColourSystem, ReferenceTables, StretchMode, TiffCompression, TiffConfig,
    WindowRequest,
};

#[derive(Parser)]
#[command(name = "crism_color", version, about = "Colour reconstruction from CRISM MTRDR reflectance cubes")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log stage timings and debug detail
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct CommonArgs {
    /// PDS3 label of the input cube
    #[arg(short, long)]
    file: PathBuf,

    /// Output base name; images are written as <NAME>_<LABEL>.tiff
    #[arg(short, long)]
    name: PathBuf,

    /// Directory holding the band axis, matching-function, calibration and filter tables
    #[arg(long, default_value = "matching_functions")]
    tables_dir: PathBuf,

    /// none, lzw, deflate-fast, deflate or deflate-best
    #[arg(long, default_value = "deflate")]
    compression: TiffCompression,

    /// Use horizontal differencing before compression
    #[arg(long)]
    predictor: bool,
}

impl CommonArgs {
    fn tiff_config(&self) -> TiffConfig {
        TiffConfig::builder()
            .compression(self.compression)
            .predictor(self.predictor.then_some(2))
            .build()
    }
}

#[derive(Args)]
struct ColorArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Named window: VIS, FAL, FEM, MAF, PHY, FAR or CAR (repeatable)
    #[arg(long = "window")]
    windows: Vec<String>,

    /// Custom window as LOW,HIGH in nanometres (repeatable)
    #[arg(long = "custom")]
    custom: Vec<String>,

    /// raw keeps channel balance, wb stretches each channel on its own
    #[arg(long, default_value = "raw")]
    mode: StretchMode,

    /// flat or tristimulus luminance weights
    #[arg(long, default_value = "flat")]
    weighting: LuminanceWeighting,

    /// srgb, hdtv or smpte
    #[arg(long, default_value = "srgb")]
    colour_system: NamedColourSystem,

    /// d50, d55, d65 or d75
    #[arg(long, default_value = "d55")]
    white_point: Illuminant,

    /// Look calibration entries up on the 380 nm + 5 nm grid instead of band centres
    #[arg(long)]
    nominal_calibration_grid: bool,
}

#[derive(Args)]
struct CameraArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Colour composite keyword, e.g. IPB, IRB, ENH, RGB
    #[arg(long)]
    color: Option<String>,

    /// Also write each filter as a single-channel image
    #[arg(long)]
    singles: Option<bool>,
}

#[derive(Subcommand)]
enum Command {
    /// Perceptual colour of one or more wavelength windows
    Color(ColorArgs),
    /// ExoMars TGO CaSSIS filters
    Cassis(CameraArgs),
    /// MRO HiRISE filters
    Hirise(CameraArgs),
    /// Mars Express HRSC filters
    Hrsc(CameraArgs),
    /// MSL Mastcam filters
    Mastcam(CameraArgs),
    /// Mars 2020 Mastcam-Z filters
    Mastcamz(CameraArgs),
    /// MER Pancam filters
    Pancam(CameraArgs),
}

fn run_color(args: &ColorArgs) -> anyhow::Result<ConversionReport> {
    let tables = ReferenceTables::from_dir(&args.common.tables_dir);
    let references = tables.load().context("Failed to load reference tables")?;

    let lookup = if args.nominal_calibration_grid {
        CalibrationLookup::REFERENCE_GRID
    } else {
        CalibrationLookup::BandCenters
    };
    let config = ColorConfig::builder()
        .mode(args.mode)
        .weighting(args.weighting)
        .colour_system(args.colour_system)
        .white_point(args.white_point.chromaticity())
        .calibration_lookup(lookup)
        .tiff(args.common.tiff_config())
        .build();

    let mut requests: Vec<WindowRequest> = args.windows.iter().cloned().map(WindowRequest::Named).collect();
    requests.extend(args.custom.iter().cloned().map(WindowRequest::Custom));
    if requests.is_empty() {
        requests.push(WindowRequest::Named("VIS".to_string()));
    }

    let pipeline = ColorPipeline::new(config, references)?;
    info!("Colour pipeline initialized");
    info!("Mode: {}", pipeline.config().mode);
    info!("Colour system: {} with white point {}", pipeline.config().colour_system, args.white_point);

    pipeline
        .convert_file(&args.common.file, &args.common.name, &requests)
        .with_context(|| format!("Failed to convert {}", args.common.file.display()))
}

fn run_camera(camera: Camera, args: &CameraArgs) -> anyhow::Result<ConversionReport> {
    let tables = ReferenceTables::from_dir(&args.common.tables_dir);
    let pipeline = CameraPipeline::new(camera, &tables, args.common.tiff_config())
        .with_context(|| format!("Failed to load {} tables", camera))?;
    info!("{} pipeline initialized", camera);

    let request = CameraRequest {
        color: args.color.clone(),
        singles: args.singles,
    };
    pipeline
        .convert_file(&args.common.file, &args.common.name, &request)
        .with_context(|| format!("Failed to convert {}", args.common.file.display()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init(if cli.verbose { "debug" } else { "info" });

    info!("Starting crism_color...");

    let report = match &cli.command {
        Command::Color(args) => run_color(args)?,
        Command::Cassis(args) => run_camera(Camera::Cassis, args)?,
        Command::Hirise(args) => run_camera(Camera::Hirise, args)?,
        Command::Hrsc(args) => run_camera(Camera::Hrsc, args)?,
        Command::Mastcam(args) => run_camera(Camera::Mastcam, args)?,
        Command::Mastcamz(args) => run_camera(Camera::Mastcamz, args)?,
        Command::Pancam(args) => run_camera(Camera::Pancam, args)?,
    };

    for rejected in &report.rejected {
        warn!("Skipped {}", rejected);
    }
    if !report.produced_any() {
        bail!("No output was produced");
    }
    info!(written = report.written.len(), "Conversion successful!");
    Ok(())
}
