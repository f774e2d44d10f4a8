//! Natural Neighbor (Sibson) Interpolation
//!
//! Elevation surface over a [`Tin`]: every distinct location carries one
//! elevation, and queries combine the elevations of the query's natural
//! neighbours with Sibson weights (the share of the query's Voronoi cell
//! taken from each neighbour's cell).
//!
//! Properties:
//! - Exact at data sites
//! - Reproduces linear fields exactly
//! - Undefined outside the convex hull of the data
//!
//! Reference:
//! Sibson, R. (1981). "A brief description of natural neighbour interpolation."
//! In Interpreting Multivariate Data, pp. 21–36.

use lidem_core::geo::GeoCoordinate;
use lidem_core::Result;

use super::tin::{FaceHint, Tin};

/// Result of one interpolation query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interpolated {
    pub value: f64,
    /// Face where the query was located; pass it as the hint of the next query
    pub face: FaceHint,
}

/// Two-level locality hint for row-major scans.
///
/// The first cell of a row starts from the face found for the first cell of
/// the previous row; every other cell starts from the previous cell's face.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanHint {
    pub row_begin: Option<FaceHint>,
    pub cursor: Option<FaceHint>,
}

impl ScanHint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hint for the cell at `col` of the current row
    pub fn for_column(&self, col: usize) -> Option<FaceHint> {
        if col == 0 {
            self.row_begin
        } else {
            self.cursor
        }
    }

    /// Record the face found for the cell at `col`
    pub fn update(&mut self, col: usize, face: FaceHint) {
        if col == 0 {
            self.row_begin = Some(face);
        }
        self.cursor = Some(face);
    }
}

/// Natural-neighbour interpolator over a growing point set
#[derive(Debug, Clone, Default)]
pub struct NaturalNeighborInterpolator {
    tin: Tin,
    elevations: Vec<f64>,
}

impl NaturalNeighborInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a point; re-inserting a location overwrites its elevation.
    pub fn insert_point(&mut self, location: GeoCoordinate, z: f64) -> Result<()> {
        let v = self.tin.insert(location.x, location.y)?;
        if v == self.elevations.len() {
            self.elevations.push(z);
        } else {
            self.elevations[v] = z;
        }
        Ok(())
    }

    /// Number of distinct point locations
    pub fn number_of_points(&self) -> usize {
        self.tin.number_of_points()
    }

    /// The underlying triangulation
    pub fn tin(&self) -> &Tin {
        &self.tin
    }

    /// Interpolate at `location`, starting the point location from `hint`.
    ///
    /// Fails with `InsufficientData` outside the convex hull of the data or
    /// while the data does not span a plane.
    pub fn value_at(&self, location: GeoCoordinate, hint: Option<FaceHint>) -> Result<Interpolated> {
        let coords = self.tin.natural_coordinates(location.x, location.y, hint)?;
        let value = coords
            .neighbors
            .iter()
            .map(|&(v, w)| w * self.elevations[v])
            .sum();
        Ok(Interpolated {
            value,
            face: coords.face,
        })
    }
}
