//! Point cloud to DEM conversion
//!
//! Ties the pieces together: window and class filters on a
//! [`PointCloudDataSource`], a natural-neighbour TIN built from the kept
//! points, and a raster filled from it on the grid of the calculation
//! window.

use lidem_core::{Area, Error, Raster, RasterArea, RasterElement, Result};
use tracing::info;

use crate::interpolation::{fill_raster, FillReport, NaturalNeighborInterpolator};
use crate::pointcloud::{ClassFilter, IngestReport, PointCloudDataSource, WindowFilter};

/// No-data value of the generated DEM unless configured otherwise
pub const DEFAULT_NODATA: f64 = 9999.0;

/// Parameters for a conversion
#[derive(Debug, Clone)]
pub struct ConversionParams {
    /// Area to compute, with its reference system
    pub calc_window: Area,
    /// Margin around the window whose points still enter the TIN
    pub include_points_buffer: f64,
    /// Cell size of the output grid
    pub resolution: f64,
    /// Classification codes to keep; empty keeps every class
    pub classes: Vec<u8>,
    pub nodata: f64,
}

impl Default for ConversionParams {
    fn default() -> Self {
        Self {
            calc_window: Area::default(),
            include_points_buffer: 0.0,
            resolution: 1.0,
            classes: Vec::new(),
            nodata: DEFAULT_NODATA,
        }
    }
}

impl ConversionParams {
    /// Check every parameter before any point file is opened
    pub fn validate(&self) -> Result<()> {
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(Error::invalid_parameter(
                "resolution",
                self.resolution,
                "must be a positive number",
            ));
        }
        if !self.include_points_buffer.is_finite() {
            return Err(Error::invalid_parameter(
                "include_points_buffer",
                self.include_points_buffer,
                "must be a finite number",
            ));
        }
        if !self.nodata.is_finite() {
            return Err(Error::invalid_parameter("nodata", self.nodata, "must be a finite number"));
        }
        if !self.calc_window.crs().is_defined() {
            return Err(Error::invalid_parameter(
                "refsys",
                "(undefined)",
                "the reference system could not be resolved",
            ));
        }
        self.keep_window()?;
        self.raster_area()?;
        Ok(())
    }

    /// Calculation window grown by the point buffer
    pub fn keep_window(&self) -> Result<Area> {
        self.calc_window.with_halo(self.include_points_buffer)
    }

    /// Output grid over the calculation window
    pub fn raster_area(&self) -> Result<RasterArea> {
        RasterArea::from_area(&self.calc_window, self.resolution)
    }
}

/// Summary of a conversion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionReport {
    pub files_read: usize,
    pub files_skipped: usize,
    pub points_read: u64,
    pub points_kept: u64,
    /// Distinct locations in the TIN
    pub tin_points: usize,
    pub cells_filled: usize,
    pub cells_empty: usize,
}

impl ConversionReport {
    fn new(ingest: IngestReport, tin_points: usize, fill: FillReport) -> Self {
        Self {
            files_read: ingest.files_read,
            files_skipped: ingest.files_skipped,
            points_read: ingest.points_read,
            points_kept: ingest.points_kept,
            tin_points,
            cells_filled: fill.filled,
            cells_empty: fill.empty,
        }
    }
}

/// Convert the points of `source` into a DEM over `params.calc_window`.
pub fn rasterize<T: RasterElement>(
    params: &ConversionParams,
    source: &mut PointCloudDataSource,
) -> Result<Raster<T>> {
    rasterize_with_report(params, source).map(|(raster, _)| raster)
}

/// [`rasterize`], also returning the run summary
pub fn rasterize_with_report<T: RasterElement>(
    params: &ConversionParams,
    source: &mut PointCloudDataSource,
) -> Result<(Raster<T>, ConversionReport)> {
    params.validate()?;
    let nodata = T::from_f64(params.nodata).ok_or_else(|| {
        Error::invalid_parameter(
            "nodata",
            params.nodata,
            format!("does not fit the {} band", T::DATA_TYPE),
        )
    })?;

    source
        .filters_mut()
        .add_window(WindowFilter::new(params.keep_window()?));
    if !params.classes.is_empty() {
        source
            .filters_mut()
            .add(ClassFilter::new(params.classes.iter().copied()));
    }

    let area = params.raster_area()?;
    let mut dem = Raster::new("DEM", area).with_nodata(nodata);
    dem.format()?;

    let mut interpolator = NaturalNeighborInterpolator::new();
    let ingest = source.ingest(&mut interpolator)?;

    info!(
        "Starting to interpolate to {} x {} grid.",
        dem.cols(),
        dem.rows()
    );
    let fill = fill_raster(&interpolator, &mut dem)?;

    let report = ConversionReport::new(ingest, interpolator.number_of_points(), fill);
    Ok((dem, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lidem_core::geo::parse_rectangle_coordinates;
    use lidem_core::ReferenceSystem;

    fn params(window: &str) -> ConversionParams {
        ConversionParams {
            calc_window: parse_rectangle_coordinates(window, ReferenceSystem::new("EPSG:25832"))
                .unwrap(),
            resolution: 2.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_validate() {
        assert!(params("0,10,10,10").validate().is_ok());

        let mut p = params("0,10,10,10");
        p.resolution = 0.0;
        assert!(p.validate().is_err());

        let mut p = params("0,10,10,10");
        p.include_points_buffer = -6.0;
        assert!(p.validate().is_err());

        let mut p = params("0,10,10,10");
        p.calc_window.set_crs(ReferenceSystem::new("not a reference system"));
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_grid_rounds_to_nearest_cell_count() {
        let mut p = params("100,200,10.9,7.1");
        p.resolution = 2.0;
        let area = p.raster_area().unwrap();
        assert_eq!((area.pixel_width(), area.pixel_height()), (5, 4));
        assert!((area.area().width() - 10.9).abs() < p.resolution);
        assert!((area.area().height() - 7.1).abs() < p.resolution);
    }

    #[test]
    fn test_keep_window_includes_buffer() {
        let mut p = params("0,10,10,10");
        p.include_points_buffer = 2.5;
        let w = p.keep_window().unwrap();
        assert_eq!((w.left(), w.top(), w.right(), w.bottom()), (-2.5, 12.5, 12.5, -2.5));
    }

    #[test]
    fn test_nodata_must_fit_band() {
        let mut p = params("0,10,10,10");
        p.nodata = 9999.0;
        let mut source = PointCloudDataSource::new();
        let err = rasterize::<u8>(&p, &mut source).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "nodata", .. }));
    }
}
