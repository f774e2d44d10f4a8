//! Point cloud sources
//!
//! Readers stream [`PointRecord`]s out of point cloud files and declare a
//! coarse bounding box and point count up front, so a source can be
//! rejected without reading it and ingestion progress can be scaled.
//!
//! Supported formats:
//! - LAS / LAZ (`.las`, `.laz`)
//! - ASCII XYZ (`.xyz`, `.txt`, `.csv`): `x y z [class]` per line

pub mod filter;
mod las_file;
mod source;
mod xyz;

pub use self::filter::{ClassFilter, FilterPipeline, PointFilter, WindowFilter};
pub use self::las_file::LasPointReader;
pub use self::source::{IngestReport, PointCloudDataSource};
pub use self::xyz::XyzPointReader;

use lidem_core::{Area, Error, Result};
use std::fmt;
use std::path::Path;

/// One point of a cloud
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointRecord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// ASPRS classification code
    pub classification: u8,
}

impl PointRecord {
    pub fn new(x: f64, y: f64, z: f64, classification: u8) -> Self {
        Self {
            x,
            y,
            z,
            classification,
        }
    }
}

/// Axis-aligned 2-D extent of a set of points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingBox {
    /// A box containing nothing; any added point becomes its extent
    pub fn empty() -> Self {
        Self {
            min_x: f64::MAX,
            min_y: f64::MAX,
            max_x: f64::MIN,
            max_y: f64::MIN,
        }
    }

    pub fn from_corners(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        let mut bb = Self::empty();
        bb.add(min_x, min_y);
        bb.add(max_x, max_y);
        bb
    }

    pub fn add(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Inclusive overlap test
    pub fn overlaps(&self, area: &Area) -> bool {
        !(self.min_x > area.right()
            || self.max_x < area.left()
            || self.max_y < area.bottom()
            || self.min_y > area.top())
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "[empty]");
        }
        write!(
            f,
            "[{:.3}:{:.3}] x [{:.3}:{:.3}]",
            self.min_x, self.max_x, self.min_y, self.max_y
        )
    }
}

/// Sequential access to the points of one file
pub trait PointReader {
    /// Declared extent of the file's points
    fn bounds(&self) -> BoundingBox;

    /// Declared number of points, used to scale progress reports
    fn point_count(&self) -> u64;

    /// Next point, `None` at the end of the file
    fn next_point(&mut self) -> Option<Result<PointRecord>>;
}

/// Point cloud file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointFormat {
    Las,
    Xyz,
}

impl PointFormat {
    /// Format implied by the file extension, if supported
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "las" | "laz" => Some(PointFormat::Las),
            "xyz" | "txt" | "csv" => Some(PointFormat::Xyz),
            _ => None,
        }
    }
}

/// Open `path` with the reader matching its extension
pub fn open_reader(path: &Path) -> Result<Box<dyn PointReader>> {
    match PointFormat::from_path(path) {
        Some(PointFormat::Las) => Ok(Box::new(LasPointReader::open(path)?)),
        Some(PointFormat::Xyz) => Ok(Box::new(XyzPointReader::open(path)?)),
        None => Err(Error::UnsupportedFormat(format!(
            "unknown point cloud file type: {}",
            path.display()
        ))),
    }
}

pub(crate) fn source_error(path: &Path, reason: impl ToString) -> Error {
    Error::PointSource {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lidem_core::geo::{GeoCoordinate, GeoDims};
    use lidem_core::ReferenceSystem;

    fn window(ulx: f64, uly: f64, w: f64, h: f64) -> Area {
        Area::new(
            GeoCoordinate::new(ulx, uly),
            GeoDims::new(w, h),
            ReferenceSystem::not_defined(),
        )
    }

    #[test]
    fn test_bounding_box_overlap_is_inclusive() {
        let bb = BoundingBox::from_corners(0.0, 0.0, 10.0, 10.0);
        assert!(bb.overlaps(&window(5.0, 15.0, 10.0, 10.0)));
        // touching edge
        assert!(bb.overlaps(&window(10.0, 20.0, 5.0, 5.0)));
        assert!(!bb.overlaps(&window(10.5, 20.0, 5.0, 5.0)));
        assert!(!bb.overlaps(&window(0.0, -1.0, 5.0, 5.0)));
    }

    #[test]
    fn test_empty_box() {
        let mut bb = BoundingBox::empty();
        assert!(bb.is_empty());
        assert!(!bb.overlaps(&window(0.0, 10.0, 10.0, 10.0)));
        bb.add(3.0, 4.0);
        assert!(!bb.is_empty());
        assert_eq!(bb.to_string(), "[3.000:3.000] x [4.000:4.000]");
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(PointFormat::from_path(Path::new("a/b.LAZ")), Some(PointFormat::Las));
        assert_eq!(PointFormat::from_path(Path::new("b.xyz")), Some(PointFormat::Xyz));
        assert_eq!(PointFormat::from_path(Path::new("b.tif")), None);
        assert_eq!(PointFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_open_unknown_format() {
        let err = open_reader(Path::new("cloud.ply")).err().unwrap();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }
}
