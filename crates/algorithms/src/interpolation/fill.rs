//! Raster fill driver
//!
//! Evaluates an interpolator at every cell centre of a raster, row by row,
//! with the two-level [`ScanHint`] so that consecutive queries start their
//! point location next to the previous answer.

use crate::maybe_rayon::*;
use lidem_core::geo::{GeoCoordinate, RasterCoordinate};
use lidem_core::{Error, Raster, RasterElement, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

use super::natural_neighbor::{NaturalNeighborInterpolator, ScanHint};

/// Outcome of a raster fill
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Cells that received an interpolated value
    pub filled: usize,
    /// Cells left untouched because no neighbours were found
    pub empty: usize,
}

impl FillReport {
    fn merge(self, other: FillReport) -> FillReport {
        FillReport {
            filled: self.filled + other.filled,
            empty: self.empty + other.empty,
        }
    }
}

/// Logs coarse progress, once per 10% of the rows
struct RowProgress {
    total: usize,
    done: AtomicUsize,
}

impl RowProgress {
    fn new(total: usize) -> Self {
        Self {
            total,
            done: AtomicUsize::new(0),
        }
    }

    fn row_done(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if done * 10 / self.total > (done - 1) * 10 / self.total {
            info!("Interpolated {}% of the rows ({}/{})", done * 100 / self.total, done, self.total);
        }
    }
}

/// Fill `raster` from `interpolator`.
///
/// Cells whose centre cannot be interpolated (outside the data hull) keep
/// their current value, normally the no-data value set by
/// [`Raster::format`]. Any other interpolation error aborts the fill.
///
/// With the `parallel` feature the rows are split into contiguous bands,
/// one per worker, each with its own hint state over the shared
/// triangulation.
pub fn fill_raster<T: RasterElement>(
    interpolator: &NaturalNeighborInterpolator,
    raster: &mut Raster<T>,
) -> Result<FillReport> {
    let (rows, cols) = raster.shape();
    if rows == 0 || cols == 0 {
        return Ok(FillReport::default());
    }
    let area = raster.area().clone();
    let current = raster
        .as_slice()
        .ok_or_else(|| Error::Other(format!("raster '{}' is not contiguous", raster.name())))?;

    let bands = worker_count().clamp(1, rows);
    let band_rows = rows.div_ceil(bands);
    let progress = RowProgress::new(rows);

    let results: Vec<(Vec<T>, FillReport)> = (0..bands)
        .into_par_iter()
        .map(|band| {
            let first = (band * band_rows).min(rows);
            let last = ((band + 1) * band_rows).min(rows);
            let mut values = current[first * cols..last * cols].to_vec();
            let mut report = FillReport::default();
            let mut hint = ScanHint::new();

            for row in first..last {
                for col in 0..cols {
                    let center = area.to_geocoordinate(RasterCoordinate::new(col as u32, row as u32));
                    match interpolator.value_at(GeoCoordinate::from(center), hint.for_column(col)) {
                        Ok(found) => {
                            hint.update(col, found.face);
                            let value = T::from_f64(found.value).ok_or_else(|| {
                                Error::invalid_parameter(
                                    "cell value",
                                    found.value,
                                    format!("does not fit the {} band", T::DATA_TYPE),
                                )
                            })?;
                            values[(row - first) * cols + col] = value;
                            report.filled += 1;
                        }
                        Err(e) if e.is_insufficient_data() => {
                            debug!("No data for cell ({}, {})", row, col);
                            report.empty += 1;
                        }
                        Err(e) => return Err(e),
                    }
                }
                progress.row_done();
            }
            Ok((values, report))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut data = Vec::with_capacity(rows * cols);
    let mut report = FillReport::default();
    for (values, band_report) in results {
        data.extend(values);
        report = report.merge(band_report);
    }
    raster.set_data(data)?;

    info!(
        "Filled {} of {} cells ({} without data)",
        report.filled,
        rows * cols,
        report.empty
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use lidem_core::geo::{PixelCenterCoordinate, RasterArea, RasterDims};
    use lidem_core::ReferenceSystem;

    fn grid(ulx: f64, uly: f64, cols: u32, rows: u32, cs: f64) -> Raster<f32> {
        let area = RasterArea::from_center(
            PixelCenterCoordinate::new(ulx, uly),
            RasterDims::new(cols, rows),
            cs,
            ReferenceSystem::not_defined(),
        )
        .unwrap();
        let mut raster = Raster::new("dem", area).with_nodata(9999.0);
        raster.format().unwrap();
        raster
    }

    fn plane() -> NaturalNeighborInterpolator {
        let mut nn = NaturalNeighborInterpolator::new();
        for i in 0..=10 {
            for j in 0..=10 {
                let (x, y) = (i as f64 * 10.0, j as f64 * 10.0);
                nn.insert_point(GeoCoordinate::new(x, y), 0.5 * x + 0.25 * y).unwrap();
            }
        }
        nn
    }

    #[test]
    fn test_fill_plane() {
        let nn = plane();
        let mut raster = grid(2.5, 97.5, 40, 40, 2.5);
        let report = fill_raster(&nn, &mut raster).unwrap();
        assert_eq!(report, FillReport { filled: 1600, empty: 0 });
        for row in 0..40 {
            for col in 0..40 {
                let c = raster.area().to_geocoordinate(RasterCoordinate::new(col, row));
                let v = raster.get(row as usize, col as usize).unwrap();
                assert_abs_diff_eq!(v as f64, 0.5 * c.x + 0.25 * c.y, epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn test_cells_outside_hull_keep_nodata() {
        let nn = plane();
        // half of the grid lies right of x = 100
        let mut raster = grid(55.0, 50.0, 10, 2, 10.0);
        let report = fill_raster(&nn, &mut raster).unwrap();
        assert_eq!(report.filled, 10);
        assert_eq!(report.empty, 10);
        assert_eq!(raster.get(0, 9).unwrap(), 9999.0);
        assert_ne!(raster.get(1, 0).unwrap(), 9999.0);
    }

    #[test]
    fn test_empty_interpolator_leaves_everything() {
        let nn = NaturalNeighborInterpolator::new();
        let mut raster = grid(0.0, 0.0, 3, 3, 1.0);
        let report = fill_raster(&nn, &mut raster).unwrap();
        assert_eq!(report.filled, 0);
        assert_eq!(report.empty, 9);
        assert_eq!(raster.statistics().valid_count, 0);
    }

    #[test]
    fn test_value_out_of_band_range_fails() {
        let mut nn = NaturalNeighborInterpolator::new();
        for (x, y) in [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0)] {
            nn.insert_point(GeoCoordinate::new(x, y), 1000.0).unwrap();
        }
        let area = RasterArea::from_center(
            PixelCenterCoordinate::new(5.0, 5.0),
            RasterDims::new(1, 1),
            1.0,
            ReferenceSystem::not_defined(),
        )
        .unwrap();
        let mut raster: Raster<u8> = Raster::new("dem", area);
        assert!(fill_raster(&nn, &mut raster).is_err());
    }
}
