//! Georeferenced geometry: coordinate kinds, areas and rasterized areas

mod area;
mod coordinates;
mod raster_area;

pub use area::{parse_doubles, parse_rectangle_coordinates, Area};
pub use coordinates::{
    to_raster_index, GeoCoordinate, GeoDims, PixelCenterCoordinate, PixelIndex,
    PixelTopLeftCoordinate, RasterCoordinate, RasterDims,
};
pub use raster_area::{Adjusted, RasterArea, SIGNIFICANT_SHIFT};
