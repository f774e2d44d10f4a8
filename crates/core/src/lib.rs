//! # lidem core
//!
//! Georeferenced raster model and raster I/O for the lidem point cloud to
//! DEM converter.
//!
//! This crate provides:
//! - Coordinate kinds that keep pixel centres and pixel corners apart
//! - `Area` and `RasterArea`: georeferenced rectangles and their pixel grids
//! - `ReferenceSystem`: WKT / EPSG spatial reference handling
//! - `Raster<T>`: a row-major raster buffer bound to a `RasterArea`
//! - Block-oriented raster I/O with in-memory and GeoTIFF drivers

pub mod crs;
pub mod error;
pub mod geo;
pub mod io;
pub mod raster;

pub use crs::ReferenceSystem;
pub use error::{Error, Result};
pub use geo::{Area, RasterArea};
pub use raster::{DataType, GeoTransform, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::ReferenceSystem;
    pub use crate::error::{Error, Result};
    pub use crate::geo::{
        Area, GeoCoordinate, GeoDims, PixelCenterCoordinate, PixelTopLeftCoordinate, RasterArea,
        RasterCoordinate, RasterDims,
    };
    pub use crate::raster::{DataType, GeoTransform, Raster, RasterElement};
}
