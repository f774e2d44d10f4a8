//! Surface interpolation
//!
//! - TIN: incremental Delaunay triangulation with hinted point location
//! - Natural Neighbor: Sibson interpolation over the TIN
//! - Fill: evaluate an interpolator on every cell of a raster

mod fill;
mod natural_neighbor;
pub mod tin;

pub use fill::{fill_raster, FillReport};
pub use natural_neighbor::{Interpolated, NaturalNeighborInterpolator, ScanHint};
pub use tin::{FaceHint, NaturalCoordinates, Tin, VertexId};
