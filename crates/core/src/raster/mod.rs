//! Raster buffers and their cell types

mod element;
mod geotransform;
mod grid;

pub use element::{DataType, RasterElement};
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
