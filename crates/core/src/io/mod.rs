//! Raster file I/O
//!
//! Rasters reach files through block stores: [`block::array_file_rw`] moves
//! a buffer to or from any [`BlockStore`], and each driver provides one.

pub mod block;
mod geotiff;
mod memory;

pub use block::{
    array_file_rw, read_blocks, write_blocks, BlockBuffer, BlockLock, BlockStore, BlockTransfer,
    RasterBlock, RwMode,
};
pub use geotiff::{encode_geotiff, read_geotiff, write_geotiff, GeoTiffOptions, StripTiffBand, TiffSample};
pub use memory::MemoryBand;

use crate::error::{Error, Result};
use crate::raster::Raster;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
pub use tiff::encoder::TiffValue;

/// Raster format driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    /// GeoTIFF file, written in strips
    GTiff,
    /// In-memory band, no file representation
    Mem,
}

impl Driver {
    pub fn name(self) -> &'static str {
        match self {
            Driver::GTiff => "GTiff",
            Driver::Mem => "MEM",
        }
    }

    /// Whether the driver creates files on disk
    pub fn creates_files(self) -> bool {
        matches!(self, Driver::GTiff)
    }

    /// Fail before any I/O if the driver cannot create files
    pub fn check_creatable(self) -> Result<()> {
        if self.creates_files() {
            Ok(())
        } else {
            Err(Error::UnsupportedFormat(format!(
                "driver '{}' cannot create files",
                self.name()
            )))
        }
    }
}

impl FromStr for Driver {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gtiff" | "geotiff" | "tif" | "tiff" => Ok(Driver::GTiff),
            "mem" | "memory" => Ok(Driver::Mem),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Create a raster file with `driver` and stream `raster` into it.
///
/// Georeferencing (origin, cell size, reference system, no-data) is attached
/// once at creation from the raster's grid.
pub fn create_and_write<T, P>(
    raster: &Raster<T>,
    path: P,
    driver: Driver,
    options: &GeoTiffOptions,
) -> Result<()>
where
    T: TiffSample,
    [T]: TiffValue,
    P: AsRef<Path>,
{
    driver.check_creatable()?;
    match driver {
        Driver::GTiff => write_geotiff(raster, path, options),
        Driver::Mem => Err(Error::UnsupportedFormat(driver.name().to_string())),
    }
}
