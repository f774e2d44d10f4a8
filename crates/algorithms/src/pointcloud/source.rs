//! Multi-file point cloud source

use glob::glob;
use lidem_core::geo::GeoCoordinate;
use lidem_core::{Error, Result};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::filter::FilterPipeline;
use super::{open_reader, PointFormat};
use crate::interpolation::NaturalNeighborInterpolator;

/// Counters of one ingestion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub files_read: usize,
    /// Files rejected by their bounding box without reading any point
    pub files_skipped: usize,
    pub points_read: u64,
    pub points_kept: u64,
}

/// A list of point cloud files plus the filters applied while reading them
#[derive(Debug, Default)]
pub struct PointCloudDataSource {
    files: Vec<PathBuf>,
    filters: FilterPipeline,
}

impl PointCloudDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a comma separated list of files, directories and glob
    /// patterns.
    ///
    /// Directories contribute their supported files (not recursively);
    /// patterns contribute their supported matches. Naming a file of an
    /// unsupported type is an error.
    pub fn from_descriptor(descriptor: &str) -> Result<Self> {
        let mut source = Self::new();
        for entry in descriptor.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            source.add_entry(entry)?;
        }
        if source.files.is_empty() {
            return Err(Error::invalid_parameter(
                "pointcloud",
                descriptor,
                "no point cloud files found",
            ));
        }
        Ok(source)
    }

    fn add_entry(&mut self, entry: &str) -> Result<()> {
        if entry.contains(['*', '?', '[']) {
            let paths = glob(entry).map_err(|e| {
                Error::invalid_parameter("pointcloud", entry, e.to_string())
            })?;
            for path in paths {
                let path = path
                    .map_err(|e| Error::Io(io::Error::new(e.error().kind(), e.to_string())))?;
                if path.is_file() {
                    self.add_if_supported(path);
                }
            }
            return Ok(());
        }

        let path = Path::new(entry);
        if path.is_file() {
            self.add_file(path)
        } else if path.is_dir() {
            for dir_entry in WalkDir::new(path)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
            {
                let dir_entry = dir_entry.map_err(|e| {
                    Error::invalid_parameter("pointcloud", entry, e.to_string())
                })?;
                if dir_entry.file_type().is_file() {
                    self.add_if_supported(dir_entry.into_path());
                }
            }
            Ok(())
        } else {
            Err(Error::invalid_parameter(
                "pointcloud",
                entry,
                "no such file, directory or pattern",
            ))
        }
    }

    fn add_if_supported(&mut self, path: PathBuf) {
        if PointFormat::from_path(&path).is_some() {
            debug!("add point cloud file - {}", path.display());
            self.files.push(path);
        } else {
            debug!("ignoring {}: not a point cloud file", path.display());
        }
    }

    /// Add one file; its type must be supported
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if PointFormat::from_path(path).is_none() {
            return Err(Error::UnsupportedFormat(format!(
                "unknown point cloud file type: {}",
                path.display()
            )));
        }
        debug!("add point cloud file - {}", path.display());
        self.files.push(path.to_path_buf());
        Ok(())
    }

    /// Add a named filter (`keep_window` or `keep_classes`)
    pub fn add_filter(&mut self, name: &str, params: &str) -> Result<()> {
        self.filters.add_named(name, params)
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn filters(&self) -> &FilterPipeline {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut FilterPipeline {
        &mut self.filters
    }

    /// Read every file, inserting the points that pass the filters.
    ///
    /// A file whose declared bounds miss the window filter is skipped
    /// unread. Any read error aborts the ingestion.
    pub fn ingest(&self, interpolator: &mut NaturalNeighborInterpolator) -> Result<IngestReport> {
        for d in self.filters.describe() {
            debug!("filter: {}", d);
        }
        let mut report = IngestReport::default();
        for path in &self.files {
            info!("Importing points from the file '{}'", path.display());
            let mut reader = open_reader(path)?;

            if let Some(window) = self.filters.window() {
                if !reader.bounds().overlaps(window) {
                    info!("  Bounds {} miss the window, skipped.", reader.bounds());
                    report.files_skipped += 1;
                    continue;
                }
            }

            let total = reader.point_count();
            let mut reported = 0u64;
            let (mut read, mut kept) = (0u64, 0u64);
            while let Some(point) = reader.next_point() {
                let point = point?;
                read += 1;
                if self.filters.keep(&point) {
                    interpolator.insert_point(GeoCoordinate::new(point.x, point.y), point.z)?;
                    kept += 1;
                }
                if total > 0 {
                    let step = (read * 10 / total).min(10);
                    if step > reported {
                        reported = step;
                        info!("  {} %", step * 10);
                    }
                }
            }

            if kept == 0 {
                info!("  No matching points.");
            } else {
                info!("  Added {} of {} points to the TIN.", kept, read);
            }
            report.files_read += 1;
            report.points_read += read;
            report.points_kept += kept;
        }
        info!(
            "Created a TIN interpolator from {} points.",
            interpolator.number_of_points()
        );
        Ok(report)
    }
}
