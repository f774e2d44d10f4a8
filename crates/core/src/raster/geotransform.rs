//! Affine geotransformation for north-up rasters

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Affine transformation of a north-up raster.
///
/// Pixel indices (col, row) relate to map coordinates of the top-left corner
/// of the cell by:
/// ```text
/// x = origin_x + col * pixel_width
/// y = origin_y + row * pixel_height
/// ```
///
/// `pixel_height` is negative, since row 0 is the top row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Cell size in X
    pub pixel_width: f64,
    /// Cell size in Y, negative for north-up grids
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Rebuild from the GeoTIFF `ModelPixelScale` and `ModelTiepoint` tags.
    ///
    /// The tiepoint maps raster position `(i, j)` to model position `(x, y)`.
    pub fn from_tiff_tags(scale: &[f64], tiepoint: &[f64]) -> Result<Self> {
        if scale.len() < 2 || tiepoint.len() < 6 {
            return Err(Error::Codec(format!(
                "malformed georeferencing tags: {} scale values, {} tiepoint values",
                scale.len(),
                tiepoint.len()
            )));
        }
        let (sx, sy) = (scale[0], scale[1]);
        let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
        Ok(Self::new(x - i * sx, y + j * sy, sx, -sy))
    }

    /// `ModelPixelScale` tag values
    pub fn tiff_pixel_scale(&self) -> [f64; 3] {
        [self.pixel_width, -self.pixel_height, 0.0]
    }

    /// `ModelTiepoint` tag values, tying raster (0, 0) to the origin
    pub fn tiff_tiepoint(&self) -> [f64; 6] {
        [0.0, 0.0, 0.0, self.origin_x, self.origin_y, 0.0]
    }

    /// Cell size (square cells)
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
