//! LAS / LAZ reader

use las::Read as _;
use lidem_core::Result;
use std::path::{Path, PathBuf};

use super::{source_error, BoundingBox, PointReader, PointRecord};

/// Streams points out of a LAS or LAZ file.
///
/// Bounds and point count come from the file header.
pub struct LasPointReader {
    path: PathBuf,
    reader: Box<dyn las::Read>,
    bounds: BoundingBox,
    count: u64,
}

impl LasPointReader {
    pub fn open(path: &Path) -> Result<Self> {
        let reader = las::Reader::from_path(path).map_err(|e| source_error(path, e))?;
        let header = reader.header();
        let b = header.bounds();
        let bounds = BoundingBox::from_corners(b.min.x, b.min.y, b.max.x, b.max.y);
        let count = header.number_of_points();
        Ok(Self {
            path: path.to_path_buf(),
            reader: Box::new(reader),
            bounds,
            count,
        })
    }
}

impl PointReader for LasPointReader {
    fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    fn point_count(&self) -> u64 {
        self.count
    }

    fn next_point(&mut self) -> Option<Result<PointRecord>> {
        let point = self.reader.read()?;
        Some(
            point
                .map(|p| PointRecord::new(p.x, p.y, p.z, u8::from(p.classification)))
                .map_err(|e| source_error(&self.path, e)),
        )
    }
}
