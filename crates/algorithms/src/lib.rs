//! # lidem algorithms
//!
//! Point cloud to DEM conversion for lidem.
//!
//! ## Modules
//!
//! - **pointcloud**: LAS/LAZ and XYZ readers, point filters, multi-file sources
//! - **interpolation**: Delaunay TIN, natural-neighbour interpolation, raster fill
//! - **conversion**: the end-to-end point cloud to raster pipeline

pub mod conversion;
pub mod interpolation;
pub(crate) mod maybe_rayon;
pub mod pointcloud;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::conversion::{
        rasterize, rasterize_with_report, ConversionParams, ConversionReport, DEFAULT_NODATA,
    };
    pub use crate::interpolation::{
        fill_raster, FillReport, Interpolated, NaturalNeighborInterpolator, ScanHint, Tin,
    };
    pub use crate::pointcloud::{
        ClassFilter, FilterPipeline, PointCloudDataSource, PointFilter, PointReader, PointRecord,
        WindowFilter,
    };
    pub use lidem_core::prelude::*;
}
