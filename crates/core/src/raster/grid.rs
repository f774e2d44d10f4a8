//! Main Raster type

use crate::error::{Error, Result};
use crate::geo::{PixelCenterCoordinate, RasterArea, RasterCoordinate};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut2};

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores `pixel_width * pixel_height` values of type `T` in
/// row-major order (row 0 is the top row) on the grid of its [`RasterArea`].
///
/// # Example
///
/// ```ignore
/// use lidem_core::Raster;
///
/// let mut raster: Raster<f32> = Raster::new("dem", area).with_nodata(9999.0);
/// raster.format()?;
/// raster.set(10, 20, 42.0)?;
/// let value = raster.get(10, 20)?;
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    /// Grid geometry and reference system
    area: RasterArea,
    /// Band name, used in diagnostics
    name: String,
    /// No-data value
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a raster on `area` filled with zeros
    pub fn new(name: impl Into<String>, area: RasterArea) -> Self {
        Self::filled(name, area, T::zero())
    }

    /// Create a raster on `area` filled with a specific value
    pub fn filled(name: impl Into<String>, area: RasterArea, value: T) -> Self {
        let shape = (area.pixel_height() as usize, area.pixel_width() as usize);
        Self {
            data: Array2::from_elem(shape, value),
            area,
            name: name.into(),
            nodata: None,
        }
    }

    /// Create a raster from an existing array, which must match the grid
    pub fn from_array(name: impl Into<String>, area: RasterArea, data: Array2<T>) -> Result<Self> {
        let expected = (area.pixel_height() as usize, area.pixel_width() as usize);
        if data.dim() != expected {
            return Err(Error::SizeMismatch {
                er: expected.0,
                ec: expected.1,
                ar: data.nrows(),
                ac: data.ncols(),
            });
        }
        Ok(Self {
            data: data.as_standard_layout().into_owned(),
            area,
            name: name.into(),
            nodata: None,
        })
    }

    /// Builder form of [`Raster::set_nodata`]
    pub fn with_nodata(mut self, nodata: T) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// Fill every cell with `value`
    pub fn format_with(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Fill every cell with the no-data value
    pub fn format(&mut self) -> Result<()> {
        match self.nodata {
            Some(nd) => {
                self.format_with(nd);
                Ok(())
            }
            None => Err(Error::NoDataNotSet(self.name.clone())),
        }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        let (rows, cols) = self.shape();
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfBounds {
                row,
                col,
                rows,
                cols,
            }),
        }
    }

    /// Value of the cell whose centre is nearest to `c`
    pub fn value_at(&self, c: PixelCenterCoordinate) -> Result<T> {
        let RasterCoordinate { col, row } = self.area.to_raster_coordinate(c)?;
        self.get(row as usize, col as usize)
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    /// Get a mutable view of the underlying data
    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, T> {
        self.data.view_mut()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Replace all cells with row-major `values`
    pub fn set_data(&mut self, values: Vec<T>) -> Result<()> {
        let (rows, cols) = self.shape();
        if values.len() != rows * cols {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: values.len() / cols.max(1),
                ac: cols,
            });
        }
        self.data = Array2::from_shape_vec((rows, cols), values)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(())
    }

    /// Flat row-major cells. Always `Some` for rasters built by this type.
    pub fn as_slice(&self) -> Option<&[T]> {
        self.data.as_slice()
    }

    /// Flat row-major cells, mutable. Always `Some` for rasters built by this type.
    pub fn as_slice_mut(&mut self) -> Option<&mut [T]> {
        self.data.as_slice_mut()
    }

    /// Get a row
    pub fn row(&self, row: usize) -> Result<ArrayView1<'_, T>> {
        if row >= self.rows() {
            return Err(Error::IndexOutOfBounds {
                row,
                col: 0,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        Ok(self.data.row(row))
    }

    // Metadata

    /// Grid geometry
    pub fn area(&self) -> &RasterArea {
        &self.area
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// North-up affine transform of the grid
    pub fn transform(&self) -> GeoTransform {
        self.area.geo_transform()
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (square cells)
    pub fn cell_size(&self) -> f64 {
        self.area.cell_size()
    }

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    // Statistics

    /// Calculate basic statistics (min, max, mean, count of valid cells)
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut min: Option<T> = None;
        let mut max: Option<T> = None;
        let mut sum: f64 = 0.0;
        let mut count: usize = 0;

        for &value in self.data.iter() {
            if self.is_nodata(value) {
                continue;
            }
            if min.map_or(true, |m| value < m) {
                min = Some(value);
            }
            if max.map_or(true, |m| value > m) {
                max = Some(value);
            }
            if let Some(v) = value.to_f64() {
                sum += v;
                count += 1;
            }
        }

        let mean = if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        };

        RasterStatistics {
            min,
            max,
            mean,
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::ReferenceSystem;
    use crate::geo::{PixelTopLeftCoordinate, RasterDims};

    fn area(cols: u32, rows: u32) -> RasterArea {
        RasterArea::from_top_left(
            PixelTopLeftCoordinate::new(0.0, rows as f64),
            RasterDims::new(cols, rows),
            1.0,
            ReferenceSystem::not_defined(),
        )
        .unwrap()
    }

    #[test]
    fn test_raster_creation() {
        let raster: Raster<f32> = Raster::new("r", area(200, 100));
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
        assert!(raster.as_slice().is_some());
    }

    #[test]
    fn test_raster_access() {
        let mut raster: Raster<f32> = Raster::new("r", area(10, 10));
        raster.set(5, 5, 42.0).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 42.0);
        assert!(raster.set(10, 0, 1.0).is_err());
    }

    #[test]
    fn test_format() {
        let mut raster: Raster<f32> = Raster::new("dem", area(4, 3));
        let err = raster.format().unwrap_err();
        assert!(matches!(err, Error::NoDataNotSet(ref n) if n == "dem"));

        let mut raster = raster.with_nodata(9999.0);
        raster.format().unwrap();
        assert!(raster.data().iter().all(|&v| v == 9999.0));
        assert_eq!(raster.statistics().valid_count, 0);

        raster.format_with(1.5);
        assert!(raster.data().iter().all(|&v| v == 1.5));
    }

    #[test]
    fn test_value_at() {
        let mut raster: Raster<f32> = Raster::new("r", area(4, 3));
        raster.set(1, 2, 7.0).unwrap();
        // centre of (col 2, row 1) is (2.5, 1.5)
        let v = raster.value_at(PixelCenterCoordinate::new(2.5, 1.5)).unwrap();
        assert_eq!(v, 7.0);
        assert!(raster.value_at(PixelCenterCoordinate::new(-3.0, 1.5)).is_err());
        assert!(raster.value_at(PixelCenterCoordinate::new(20.5, 1.5)).is_err());
    }

    #[test]
    fn test_from_array_shape_checked() {
        let data = Array2::<f32>::zeros((3, 5));
        assert!(Raster::from_array("r", area(4, 3), data).is_err());
        let data = Array2::<f32>::zeros((3, 4));
        assert!(Raster::from_array("r", area(4, 3), data).is_ok());
    }

    #[test]
    fn test_raster_statistics() {
        let mut raster: Raster<f32> = Raster::new("r", area(10, 10)).with_nodata(-1.0);
        for i in 0..10 {
            for j in 0..10 {
                raster.set(i, j, (i * 10 + j) as f32).unwrap();
            }
        }
        raster.set(0, 0, -1.0).unwrap();

        let stats = raster.statistics();
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(99.0));
        assert_eq!(stats.valid_count, 99);
        assert_eq!(stats.nodata_count, 1);
    }
}
