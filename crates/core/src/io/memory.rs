//! In-memory block store (`mem` driver)

use crate::error::{Error, Result};
use crate::geo::RasterDims;
use crate::io::block::{BlockStore, RasterBlock};
use crate::raster::RasterElement;

/// A band held entirely in memory, split into blocks of arbitrary size.
#[derive(Debug, Clone)]
pub struct MemoryBand<T> {
    dims: RasterDims,
    block_dims: RasterDims,
    fill: T,
    blocks: Vec<Option<RasterBlock<T>>>,
    writes: usize,
}

impl<T: RasterElement> MemoryBand<T> {
    /// Band of `dims` pixels, every sample set to `fill`
    pub fn new(dims: RasterDims, block_dims: RasterDims, fill: T) -> Result<Self> {
        if block_dims.cols == 0 || block_dims.rows == 0 {
            return Err(Error::InvalidDimensions {
                width: block_dims.cols as usize,
                height: block_dims.rows as usize,
            });
        }
        let n = dims.cols.div_ceil(block_dims.cols) as usize * dims.rows.div_ceil(block_dims.rows) as usize;
        Ok(Self {
            dims,
            block_dims,
            fill,
            blocks: (0..n).map(|_| Some(RasterBlock::new(block_dims.len(), fill))).collect(),
            writes: 0,
        })
    }

    /// Sample at pixel (col, row)
    pub fn get(&self, col: u32, row: u32) -> Result<T> {
        if col >= self.dims.cols || row >= self.dims.rows {
            return Err(Error::IndexOutOfBounds {
                row: row as usize,
                col: col as usize,
                rows: self.dims.rows as usize,
                cols: self.dims.cols as usize,
            });
        }
        let idx = self.block_index(col / self.block_dims.cols, row / self.block_dims.rows);
        let offset = (row % self.block_dims.rows) as usize * self.block_dims.cols as usize
            + (col % self.block_dims.cols) as usize;
        match &self.blocks[idx] {
            Some(block) => Ok(block.data()[offset]),
            None => Err(Error::Block {
                x: col / self.block_dims.cols,
                y: row / self.block_dims.rows,
                reason: "block is locked".into(),
            }),
        }
    }

    /// Number of dirty blocks handed back so far
    pub fn blocks_written(&self) -> usize {
        self.writes
    }

    fn block_index(&self, bx: u32, by: u32) -> usize {
        by as usize * self.dims.cols.div_ceil(self.block_dims.cols) as usize + bx as usize
    }

    fn check_block(&self, bx: u32, by: u32) -> Result<usize> {
        let count = self.block_count();
        if bx >= count.cols || by >= count.rows {
            return Err(Error::Block {
                x: bx,
                y: by,
                reason: format!("outside the {} block grid", count),
            });
        }
        Ok(self.block_index(bx, by))
    }
}

impl<T: RasterElement> BlockStore<T> for MemoryBand<T> {
    fn raster_dims(&self) -> RasterDims {
        self.dims
    }

    fn block_dims(&self) -> RasterDims {
        self.block_dims
    }

    fn lock_block(&mut self, bx: u32, by: u32, just_init: bool) -> Result<RasterBlock<T>> {
        let idx = self.check_block(bx, by)?;
        let block = self.blocks[idx].take().ok_or_else(|| Error::Block {
            x: bx,
            y: by,
            reason: "block is already locked".into(),
        })?;
        if just_init {
            // Content is about to be overwritten wholesale.
            return Ok(RasterBlock::new(block.data().len(), self.fill));
        }
        Ok(block)
    }

    fn unlock_block(&mut self, bx: u32, by: u32, mut block: RasterBlock<T>) -> Result<()> {
        let idx = self.check_block(bx, by)?;
        if self.blocks[idx].is_some() {
            return Err(Error::Block {
                x: bx,
                y: by,
                reason: "block was not locked".into(),
            });
        }
        if block.data().len() != self.block_dims.len() {
            return Err(Error::Block {
                x: bx,
                y: by,
                reason: format!(
                    "expected {} samples, got {}",
                    self.block_dims.len(),
                    block.data().len()
                ),
            });
        }
        if block.is_dirty() {
            self.writes += 1;
            block.clear_dirty();
        }
        self.blocks[idx] = Some(block);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::ReferenceSystem;
    use crate::geo::{PixelTopLeftCoordinate, RasterArea};
    use crate::io::block::{array_file_rw, read_blocks, write_blocks, BlockBuffer, BlockLock};
    use crate::raster::Raster;

    fn raster(cols: u32, rows: u32) -> Raster<f32> {
        let area = RasterArea::from_top_left(
            PixelTopLeftCoordinate::new(0.0, 0.0),
            RasterDims::new(cols, rows),
            1.0,
            ReferenceSystem::not_defined(),
        )
        .unwrap();
        let mut r = Raster::new("r", area);
        for row in 0..rows as usize {
            for col in 0..cols as usize {
                r.set(row, col, (row * 100 + col) as f32).unwrap();
            }
        }
        r
    }

    #[test]
    fn test_write_then_read_with_uneven_blocks() {
        let src = raster(10, 7);
        let mut band = MemoryBand::new(RasterDims::new(10, 7), RasterDims::new(4, 3), -1.0).unwrap();
        let report = write_blocks(&src, &mut band).unwrap();
        // 3 x 3 blocks, only (0,0) and (1,0), (0,1), (1,1) are complete
        assert_eq!(report.blocks, 9);
        assert_eq!(report.initialized, 4);
        assert_eq!(band.blocks_written(), 9);
        assert_eq!(band.get(9, 6).unwrap(), 609.0);

        let mut dst = raster(10, 7);
        dst.format_with(0.0);
        read_blocks(&mut dst, &mut band).unwrap();
        assert_eq!(dst.data(), src.data());
    }

    #[test]
    fn test_edge_blocks_keep_pixels_outside_active_extent() {
        // Band is larger than the buffer: the buffer covers 5 x 5 of a 8 x 8 band.
        let mut band = MemoryBand::new(RasterDims::new(8, 8), RasterDims::new(4, 4), 42.0).unwrap();
        let src = raster(5, 5);
        let report = write_blocks(&src, &mut band).unwrap();
        assert_eq!(report.blocks, 4);
        assert_eq!(report.initialized, 1);

        assert_eq!(band.get(4, 4).unwrap(), 404.0);
        // same block as (4, 4) but outside the active extent
        assert_eq!(band.get(5, 4).unwrap(), 42.0);
        assert_eq!(band.get(4, 5).unwrap(), 42.0);
        assert_eq!(band.get(7, 7).unwrap(), 42.0);
    }

    #[test]
    fn test_read_requires_band_to_cover_buffer() {
        let mut band = MemoryBand::new(RasterDims::new(4, 4), RasterDims::new(2, 2), 0.0f32).unwrap();
        let mut dst = raster(5, 5);
        assert!(read_blocks(&mut dst, &mut band).is_err());
    }

    #[test]
    fn test_write_requires_band_to_cover_buffer() {
        let mut band = MemoryBand::new(RasterDims::new(4, 4), RasterDims::new(2, 2), 7.0f32).unwrap();
        let err = write_blocks(&raster(5, 4), &mut band).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { er: 4, ec: 4, ar: 4, ac: 5 }));
        assert!(write_blocks(&raster(4, 5), &mut band).is_err());
        // nothing was written
        assert_eq!(band.blocks_written(), 0);
        assert_eq!(band.get(0, 0).unwrap(), 7.0);
    }

    #[test]
    fn test_buffer_must_match_area() {
        let mut band = MemoryBand::new(RasterDims::new(4, 4), RasterDims::new(2, 2), 0.0f32).unwrap();
        let src = raster(4, 4);
        let other = raster(3, 3);
        let err = array_file_rw(BlockBuffer::Write(src.view()), other.area(), &mut band).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { .. }));
    }

    #[test]
    fn test_lock_guard_releases_on_drop() {
        let mut band = MemoryBand::new(RasterDims::new(4, 4), RasterDims::new(2, 2), 0.0f32).unwrap();
        {
            let mut lock = BlockLock::acquire(&mut band, 1, 1, false).unwrap();
            lock.data_mut()[3] = 5.0;
            lock.mark_dirty();
        }
        assert_eq!(band.get(3, 3).unwrap(), 5.0);
        assert_eq!(band.blocks_written(), 1);

        let _held = band.lock_block(0, 0, false).unwrap();
        assert!(band.lock_block(0, 0, false).is_err());
        assert!(band.lock_block(2, 0, false).is_err());
    }
}
