//! Block-oriented raster transfer
//!
//! Raster files store a band as a grid of native blocks (tiles or strips).
//! [`array_file_rw`] moves an in-memory buffer to or from such a band one
//! block at a time, touching only the blocks that intersect the buffer's
//! extent (the *active extent*, anchored at the band's pixel (0, 0)).

use crate::error::{Error, Result};
use crate::geo::{RasterArea, RasterCoordinate, RasterDims};
use crate::raster::{Raster, RasterElement};
use ndarray::{ArrayView2, ArrayViewMut2};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use tracing::{error, trace};

/// Transfer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RwMode {
    Read,
    Write,
}

/// Samples of one block, row-major with `block_dims().cols` samples per row.
#[derive(Debug, Clone)]
pub struct RasterBlock<T> {
    data: Vec<T>,
    dirty: bool,
}

impl<T: Copy> RasterBlock<T> {
    pub fn new(len: usize, fill: T) -> Self {
        Self {
            data: vec![fill; len],
            dirty: false,
        }
    }

    pub fn from_vec(data: Vec<T>) -> Self {
        Self { data, dirty: false }
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Flag the block as modified so the store persists it on release
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn into_vec(self) -> Vec<T> {
        self.data
    }
}

/// A raster band accessed block by block.
///
/// A locked block is owned by the caller until it is handed back through
/// [`BlockStore::unlock_block`]; stores persist dirty blocks at that point.
pub trait BlockStore<T: RasterElement> {
    /// Pixel extent of the band
    fn raster_dims(&self) -> RasterDims;

    /// Pixel extent of one native block
    fn block_dims(&self) -> RasterDims;

    /// Acquire block `(bx, by)`.
    ///
    /// With `just_init` the store may skip loading the current content; the
    /// caller promises to overwrite every sample of the block.
    fn lock_block(&mut self, bx: u32, by: u32, just_init: bool) -> Result<RasterBlock<T>>;

    /// Release a block obtained from [`BlockStore::lock_block`]
    fn unlock_block(&mut self, bx: u32, by: u32, block: RasterBlock<T>) -> Result<()>;

    /// Number of blocks along each axis
    fn block_count(&self) -> RasterDims {
        let raster = self.raster_dims();
        let block = self.block_dims();
        RasterDims::new(
            raster.cols.div_ceil(block.cols.max(1)),
            raster.rows.div_ceil(block.rows.max(1)),
        )
    }
}

/// Scoped lock on one block, released on every exit path.
///
/// Dropping the guard releases the block and logs a failure; call
/// [`BlockLock::release`] to observe the error instead.
pub struct BlockLock<'a, T: RasterElement, S: BlockStore<T> + ?Sized> {
    store: &'a mut S,
    bx: u32,
    by: u32,
    block: Option<RasterBlock<T>>,
    _marker: PhantomData<T>,
}

impl<'a, T: RasterElement, S: BlockStore<T> + ?Sized> BlockLock<'a, T, S> {
    pub fn acquire(store: &'a mut S, bx: u32, by: u32, just_init: bool) -> Result<Self> {
        let block = store.lock_block(bx, by, just_init)?;
        Ok(Self {
            store,
            bx,
            by,
            block: Some(block),
            _marker: PhantomData,
        })
    }

    pub fn release(mut self) -> Result<()> {
        match self.block.take() {
            Some(block) => self.store.unlock_block(self.bx, self.by, block),
            None => Ok(()),
        }
    }
}

impl<T: RasterElement, S: BlockStore<T> + ?Sized> Deref for BlockLock<'_, T, S> {
    type Target = RasterBlock<T>;

    fn deref(&self) -> &RasterBlock<T> {
        // Only `release` and `drop` take the block out, both consuming the guard.
        match &self.block {
            Some(block) => block,
            None => unreachable!("block lock used after release"),
        }
    }
}

impl<T: RasterElement, S: BlockStore<T> + ?Sized> DerefMut for BlockLock<'_, T, S> {
    fn deref_mut(&mut self) -> &mut RasterBlock<T> {
        match &mut self.block {
            Some(block) => block,
            None => unreachable!("block lock used after release"),
        }
    }
}

impl<T: RasterElement, S: BlockStore<T> + ?Sized> Drop for BlockLock<'_, T, S> {
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            if let Err(e) = self.store.unlock_block(self.bx, self.by, block) {
                error!("Failed to release the block ({}, {}): {}", self.bx, self.by, e);
            }
        }
    }
}

/// In-memory side of a transfer
pub enum BlockBuffer<'a, T> {
    /// Blocks are copied into this buffer
    Read(ArrayViewMut2<'a, T>),
    /// This buffer is copied into the blocks
    Write(ArrayView2<'a, T>),
}

impl<T> BlockBuffer<'_, T> {
    pub fn mode(&self) -> RwMode {
        match self {
            BlockBuffer::Read(_) => RwMode::Read,
            BlockBuffer::Write(_) => RwMode::Write,
        }
    }

    fn dim(&self) -> (usize, usize) {
        match self {
            BlockBuffer::Read(v) => v.dim(),
            BlockBuffer::Write(v) => v.dim(),
        }
    }
}

/// Counters of one transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockTransfer {
    /// Blocks locked and copied
    pub blocks: usize,
    /// Blocks acquired without loading their previous content
    pub initialized: usize,
}

/// Transfer `buffer`, laid out on `area`, to or from `store`.
///
/// The band must cover the buffer in both directions. Only blocks
/// intersecting the active extent are locked. Write transfers
/// skip loading a block only when the block lies entirely inside the active
/// extent; edge blocks are loaded first so pixels outside the extent keep
/// their content.
pub fn array_file_rw<T, S>(
    mut buffer: BlockBuffer<'_, T>,
    area: &RasterArea,
    store: &mut S,
) -> Result<BlockTransfer>
where
    T: RasterElement,
    S: BlockStore<T> + ?Sized,
{
    let (rows, cols) = buffer.dim();
    if (rows, cols) != (area.pixel_height() as usize, area.pixel_width() as usize) {
        return Err(Error::SizeMismatch {
            er: area.pixel_height() as usize,
            ec: area.pixel_width() as usize,
            ar: rows,
            ac: cols,
        });
    }
    let mode = buffer.mode();
    let band = store.raster_dims();
    let bsize = store.block_dims();
    if bsize.cols == 0 || bsize.rows == 0 {
        return Err(Error::InvalidDimensions {
            width: bsize.cols as usize,
            height: bsize.rows as usize,
        });
    }
    let n_blocks = store.block_count();

    // Active extent, exclusive
    let fx_max = area.pixel_width();
    let fy_max = area.pixel_height();
    if fx_max > band.cols || fy_max > band.rows {
        return Err(Error::SizeMismatch {
            er: band.rows as usize,
            ec: band.cols as usize,
            ar: fy_max as usize,
            ac: fx_max as usize,
        });
    }

    let x_block_max = n_blocks.cols.min(fx_max.div_ceil(bsize.cols));
    let y_block_max = n_blocks.rows.min(fy_max.div_ceil(bsize.rows));

    let mut report = BlockTransfer::default();
    for by in 0..y_block_max {
        for bx in 0..x_block_max {
            let fx_min = bx * bsize.cols;
            let fy_min = by * bsize.rows;
            let width = bsize.cols.min(fx_max - fx_min);
            let height = bsize.rows.min(fy_max - fy_min);
            let just_init = mode == RwMode::Write && width == bsize.cols && height == bsize.rows;

            if tracing::enabled!(tracing::Level::TRACE) {
                let footprint =
                    area.sub_area(RasterCoordinate::new(fx_min, fy_min), RasterDims::new(width, height))?;
                trace!(
                    "block ({}, {}) covers ({:.3}, {:.3})-({:.3}, {:.3})",
                    bx,
                    by,
                    footprint.left(),
                    footprint.top(),
                    footprint.right(),
                    footprint.bottom()
                );
            }

            let mut block = BlockLock::acquire(&mut *store, bx, by, just_init).map_err(|e| {
                Error::Block {
                    x: bx,
                    y: by,
                    reason: e.to_string(),
                }
            })?;
            let block_cols = bsize.cols as usize;
            let (x0, w) = (fx_min as usize, width as usize);
            for row in 0..height as usize {
                let ay = fy_min as usize + row;
                let b_off = row * block_cols;
                let samples = &mut block.data_mut()[b_off..b_off + w];
                match &mut buffer {
                    BlockBuffer::Read(view) => {
                        for (dst, src) in view.row_mut(ay).iter_mut().skip(x0).zip(samples.iter()) {
                            *dst = *src;
                        }
                    }
                    BlockBuffer::Write(view) => {
                        for (dst, src) in samples.iter_mut().zip(view.row(ay).iter().skip(x0)) {
                            *dst = *src;
                        }
                    }
                }
            }
            if mode == RwMode::Write {
                block.mark_dirty();
            }
            block.release()?;

            report.blocks += 1;
            if just_init {
                report.initialized += 1;
            }
        }
    }
    Ok(report)
}

/// Copy the whole raster into `store`
pub fn write_blocks<T, S>(raster: &Raster<T>, store: &mut S) -> Result<BlockTransfer>
where
    T: RasterElement,
    S: BlockStore<T> + ?Sized,
{
    array_file_rw(BlockBuffer::Write(raster.view()), raster.area(), store)
}

/// Fill the whole raster from `store`
pub fn read_blocks<T, S>(raster: &mut Raster<T>, store: &mut S) -> Result<BlockTransfer>
where
    T: RasterElement,
    S: BlockStore<T> + ?Sized,
{
    let area = raster.area().clone();
    array_file_rw(BlockBuffer::Read(raster.view_mut()), &area, store)
}
