//! lidem CLI - LiDAR point clouds to digital elevation models

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use lidem_algorithms::conversion::{rasterize_with_report, ConversionParams, ConversionReport};
use lidem_algorithms::pointcloud::{ClassFilter, PointCloudDataSource};
use lidem_core::geo::parse_rectangle_coordinates;
use lidem_core::io::{create_and_write, Driver, GeoTiffOptions, TiffSample, TiffValue};
use lidem_core::{DataType, Raster, RasterElement, ReferenceSystem};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "lidem")]
#[command(author, version, about = "Convert LiDAR point clouds to DEM rasters", long_about = None)]
struct Cli {
    /// Point cloud files, directories or glob patterns, comma separated
    #[arg(long)]
    pointcloud: String,

    /// Output raster file
    #[arg(short, long)]
    output_file: PathBuf,

    /// Calculation window as "ulx,uly,width,height"
    #[arg(long, allow_hyphen_values = true)]
    calc_win: String,

    /// Classification codes to keep, comma separated (e.g. "2,9")
    #[arg(long)]
    classes: String,

    /// Points this far outside the window still enter the triangulation
    #[arg(long, alias = "include_points_buffer", allow_negative_numbers = true)]
    include_points_buffer: f64,

    /// Output cell size
    #[arg(long)]
    resolution: f64,

    /// Reference system: WKT or "EPSG:<code>"
    #[arg(long)]
    refsys: String,

    /// Output driver
    #[arg(long, default_value = "gtiff")]
    output_format: String,

    /// Output cell type: byte, uint16, uint32, float32, float64
    #[arg(long, default_value = "float32")]
    output_type: String,

    /// No-data value of cells outside the point coverage
    #[arg(long, default_value = "9999", allow_negative_numbers = true)]
    nodata: f64,

    /// GeoTIFF rows per strip
    #[arg(long, default_value = "16")]
    block_rows: u32,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Everything a run needs, validated before any point file is opened
struct Job {
    params: ConversionParams,
    driver: Driver,
    data_type: DataType,
    options: GeoTiffOptions,
    output: PathBuf,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn parse_classes(s: &str) -> Result<Vec<u8>> {
    let filter = ClassFilter::from_params(s).context("Invalid --classes")?;
    Ok(filter.classes().collect())
}

fn build_job(cli: &Cli) -> Result<Job> {
    let driver: Driver = cli
        .output_format
        .parse()
        .with_context(|| format!("Unknown output format: {}", cli.output_format))?;
    driver.check_creatable()?;
    let data_type: DataType = cli
        .output_type
        .parse()
        .with_context(|| format!("Unknown output type: {}", cli.output_type))?;
    if cli.block_rows == 0 {
        anyhow::bail!("--block-rows must be at least 1");
    }

    let crs = ReferenceSystem::new(&cli.refsys);
    if !crs.is_defined() {
        anyhow::bail!("Could not resolve reference system: {}", cli.refsys);
    }
    let calc_window =
        parse_rectangle_coordinates(&cli.calc_win, crs).context("Invalid --calc-win")?;

    let params = ConversionParams {
        calc_window,
        include_points_buffer: cli.include_points_buffer,
        resolution: cli.resolution,
        classes: parse_classes(&cli.classes)?,
        nodata: cli.nodata,
    };
    params.validate().context("Invalid conversion parameters")?;

    Ok(Job {
        params,
        driver,
        data_type,
        options: GeoTiffOptions {
            rows_per_strip: cli.block_rows,
        },
        output: cli.output_file.clone(),
    })
}

fn print_report(report: &ConversionReport) {
    println!("Files read: {} ({} skipped)", report.files_read, report.files_skipped);
    println!(
        "Points: {} read, {} kept, {} in TIN",
        report.points_read, report.points_kept, report.tin_points
    );
    println!(
        "Cells: {} filled, {} without data",
        report.cells_filled, report.cells_empty
    );
}

fn print_statistics<T: TiffSample>(dem: &Raster<T>) {
    let stats = dem.statistics();
    if let (Some(min), Some(max)) = (
        stats.min.and_then(RasterElement::to_f64),
        stats.max.and_then(RasterElement::to_f64),
    ) {
        println!("Elevation: {:.3} .. {:.3}", min, max);
    }
    if let Some(mean) = stats.mean {
        println!("  Mean: {:.3}", mean);
    }
}

fn run<T>(job: &Job, source: &mut PointCloudDataSource) -> Result<()>
where
    T: TiffSample,
    [T]: TiffValue,
{
    let start = Instant::now();
    let (dem, report) =
        rasterize_with_report::<T>(&job.params, source).context("Conversion failed")?;

    let pb = spinner("Writing output...");
    create_and_write(&dem, &job.output, job.driver, &job.options)
        .with_context(|| format!("Failed to write {}", job.output.display()))?;
    pb.finish_and_clear();

    print_report(&report);
    print_statistics(&dem);
    done("DEM", &job.output, start.elapsed());
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let job = build_job(&cli)?;
    let mut source = PointCloudDataSource::from_descriptor(&cli.pointcloud)
        .context("Failed to open point cloud source")?;
    info!(
        "{} point cloud file(s), {} x {} output as {} ({})",
        source.files().len(),
        job.params.raster_area()?.pixel_width(),
        job.params.raster_area()?.pixel_height(),
        job.data_type,
        job.driver
    );

    match job.data_type {
        DataType::Byte => run::<u8>(&job, &mut source),
        DataType::UInt16 => run::<u16>(&job, &mut source),
        DataType::UInt32 => run::<u32>(&job, &mut source),
        DataType::Float32 => run::<f32>(&job, &mut source),
        DataType::Float64 => run::<f64>(&job, &mut source),
    }
}
