//! Coordinate kinds
//!
//! Three kinds of real-valued coordinates share the same `(x, y)` layout but
//! mean different things:
//!
//! - [`GeoCoordinate`]: an arbitrary location in a reference system
//! - [`PixelCenterCoordinate`]: the centre of a raster cell
//! - [`PixelTopLeftCoordinate`]: the top-left corner of a raster cell
//!
//! They are distinct types so a centre can never be passed where a corner is
//! expected. Moving between the two pixel kinds needs the cell size.
//!
//! Integer pixel positions use [`RasterCoordinate`] and [`RasterDims`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer type used for pixel indices and pixel counts
pub type PixelIndex = u32;

/// A location in a reference system.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub x: f64,
    pub y: f64,
}

impl GeoCoordinate {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<PixelCenterCoordinate> for GeoCoordinate {
    fn from(c: PixelCenterCoordinate) -> Self {
        Self { x: c.x, y: c.y }
    }
}

impl fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// The centre of a raster cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelCenterCoordinate {
    pub x: f64,
    pub y: f64,
}

impl PixelCenterCoordinate {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Top-left corner of the cell of size `cell_size` centred here
    pub fn to_top_left(self, cell_size: f64) -> PixelTopLeftCoordinate {
        PixelTopLeftCoordinate::new(self.x - cell_size / 2.0, self.y + cell_size / 2.0)
    }
}

/// The top-left corner of a raster cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelTopLeftCoordinate {
    pub x: f64,
    pub y: f64,
}

impl PixelTopLeftCoordinate {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Centre of the cell of size `cell_size` whose corner this is
    pub fn to_center(self, cell_size: f64) -> PixelCenterCoordinate {
        PixelCenterCoordinate::new(self.x + cell_size / 2.0, self.y - cell_size / 2.0)
    }

    pub(crate) fn to_geo(self) -> GeoCoordinate {
        GeoCoordinate::new(self.x, self.y)
    }
}

/// Real-valued extent of an area
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoDims {
    pub width: f64,
    pub height: f64,
}

impl GeoDims {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Integer pixel position, column first. Row 0 is the top row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RasterCoordinate {
    pub col: PixelIndex,
    pub row: PixelIndex,
}

impl RasterCoordinate {
    pub const fn new(col: PixelIndex, row: PixelIndex) -> Self {
        Self { col, row }
    }
}

/// Integer pixel extent, columns first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RasterDims {
    pub cols: PixelIndex,
    pub rows: PixelIndex,
}

impl RasterDims {
    pub const fn new(cols: PixelIndex, rows: PixelIndex) -> Self {
        Self { cols, rows }
    }

    /// Build from unbounded counts, failing if either exceeds the pixel index range.
    pub fn create(cols: usize, rows: usize) -> Result<Self> {
        let c = PixelIndex::try_from(cols);
        let r = PixelIndex::try_from(rows);
        match (c, r) {
            (Ok(cols), Ok(rows)) => Ok(Self { cols, rows }),
            _ => Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            }),
        }
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for RasterDims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {}", self.cols, self.rows)
    }
}

/// Flat row-major index of `(col, row)` in a grid `width` cells wide
#[inline]
pub fn to_raster_index(col: usize, row: usize, width: usize) -> usize {
    row * width + col
}
