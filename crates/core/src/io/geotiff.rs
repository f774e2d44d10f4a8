//! GeoTIFF reading/writing (`gtiff` driver)
//!
//! Uses the `tiff` crate. Bands are written as strips of `rows_per_strip`
//! rows; georeferencing goes into the GeoTIFF tags at creation.

use crate::crs::ReferenceSystem;
use crate::error::{Error, Result};
use crate::geo::{PixelTopLeftCoordinate, RasterArea, RasterDims};
use crate::io::block::{BlockStore, RasterBlock};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{ColorType, Gray16, Gray32, Gray32Float, Gray64Float, Gray8};
use tiff::encoder::{ImageEncoder, TiffEncoder, TiffKindStandard, TiffValue};
use tiff::tags::Tag;
use tracing::debug;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GEO_ASCII_PARAMS: u16 = 34737;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GT_CITATION: u16 = 1026;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;

/// Cell types with a native TIFF sample layout
pub trait TiffSample: RasterElement {
    type Color: ColorType<Inner = Self>;
}

impl TiffSample for u8 {
    type Color = Gray8;
}

impl TiffSample for u16 {
    type Color = Gray16;
}

impl TiffSample for u32 {
    type Color = Gray32;
}

impl TiffSample for f32 {
    type Color = Gray32Float;
}

impl TiffSample for f64 {
    type Color = Gray64Float;
}

/// Options for writing GeoTIFF files
#[derive(Debug, Clone)]
pub struct GeoTiffOptions {
    /// Rows per strip, the native block height
    pub rows_per_strip: u32,
}

impl Default for GeoTiffOptions {
    fn default() -> Self {
        Self { rows_per_strip: 16 }
    }
}

fn codec_err(what: &str) -> impl FnOnce(tiff::TiffError) -> Error + '_ {
    move |e| Error::Codec(format!("{}: {}", what, e))
}

/// Write-only band over a TIFF image being encoded.
///
/// One block is one strip. Only the strip being filled is held in memory,
/// and strips must be handed back in order.
pub struct StripTiffBand<'a, W: Write + Seek, T: TiffSample> {
    image: ImageEncoder<'a, W, T::Color, TiffKindStandard>,
    dims: RasterDims,
    rows_per_strip: u32,
    next_strip: u32,
    fill: T,
}

impl<'a, W, T> StripTiffBand<'a, W, T>
where
    W: Write + Seek,
    T: TiffSample,
    [T]: TiffValue,
{
    fn new(
        mut image: ImageEncoder<'a, W, T::Color, TiffKindStandard>,
        dims: RasterDims,
        rows_per_strip: u32,
        fill: T,
    ) -> Result<Self> {
        image
            .rows_per_strip(rows_per_strip)
            .map_err(codec_err("Cannot set rows per strip"))?;
        Ok(Self {
            image,
            dims,
            rows_per_strip,
            next_strip: 0,
            fill,
        })
    }

    fn strip_count(&self) -> u32 {
        self.dims.rows.div_ceil(self.rows_per_strip)
    }

    /// Pad any strips never written and close the image
    fn finish(mut self) -> Result<()> {
        while self.next_strip < self.strip_count() {
            let by = self.next_strip;
            let mut block = RasterBlock::new(self.block_dims().len(), self.fill);
            block.mark_dirty();
            self.unlock_block(0, by, block)?;
        }
        self.image.finish().map_err(codec_err("Cannot finish TIFF image"))
    }
}

impl<W, T> BlockStore<T> for StripTiffBand<'_, W, T>
where
    W: Write + Seek,
    T: TiffSample,
    [T]: TiffValue,
{
    fn raster_dims(&self) -> RasterDims {
        self.dims
    }

    fn block_dims(&self) -> RasterDims {
        RasterDims::new(self.dims.cols, self.rows_per_strip)
    }

    fn lock_block(&mut self, bx: u32, by: u32, _just_init: bool) -> Result<RasterBlock<T>> {
        if bx != 0 || by != self.next_strip || by >= self.strip_count() {
            return Err(Error::Block {
                x: bx,
                y: by,
                reason: format!("strips must be written in order, expected strip {}", self.next_strip),
            });
        }
        // Nothing on disk yet: both modes start from the fill value.
        Ok(RasterBlock::new(self.block_dims().len(), self.fill))
    }

    fn unlock_block(&mut self, bx: u32, by: u32, block: RasterBlock<T>) -> Result<()> {
        if bx != 0 || by != self.next_strip || by >= self.strip_count() {
            return Err(Error::Block {
                x: bx,
                y: by,
                reason: "released out of order".into(),
            });
        }
        if !block.is_dirty() {
            return Ok(());
        }
        let rows = self.rows_per_strip.min(self.dims.rows - by * self.rows_per_strip);
        let n = rows as usize * self.dims.cols as usize;
        let data = block.into_vec();
        if data.len() < n {
            return Err(Error::Block {
                x: bx,
                y: by,
                reason: format!("expected {} samples, got {}", n, data.len()),
            });
        }
        self.image
            .write_strip(&data[..n])
            .map_err(|e| Error::Block {
                x: bx,
                y: by,
                reason: e.to_string(),
            })?;
        self.next_strip += 1;
        Ok(())
    }
}

/// Write `raster` to a new GeoTIFF at `path`.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: &GeoTiffOptions) -> Result<()>
where
    T: TiffSample,
    [T]: TiffValue,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = BufWriter::new(File::create(path)?);
    encode_geotiff(raster, file, options)?;
    debug!("Wrote {} ({} x {})", path.display(), raster.cols(), raster.rows());
    Ok(())
}

/// Encode `raster` as GeoTIFF into any `Write + Seek` sink
pub fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, options: &GeoTiffOptions) -> Result<()>
where
    T: TiffSample,
    [T]: TiffValue,
    W: Write + Seek,
{
    if options.rows_per_strip == 0 {
        return Err(Error::invalid_parameter(
            "rows_per_strip",
            0,
            "must be at least 1",
        ));
    }
    let dims = raster.area().raster_dims();
    if dims.is_empty() {
        return Err(Error::InvalidDimensions {
            width: dims.cols as usize,
            height: dims.rows as usize,
        });
    }

    let mut encoder = TiffEncoder::new(writer).map_err(codec_err("TIFF encoder error"))?;
    let mut image = encoder
        .new_image::<T::Color>(dims.cols, dims.rows)
        .map_err(codec_err("Cannot create TIFF image"))?;

    write_georeferencing(&mut image, raster)?;

    let fill = raster.nodata().unwrap_or_else(T::zero);
    let mut band = StripTiffBand::new(image, dims, options.rows_per_strip, fill)?;
    crate::io::block::write_blocks(raster, &mut band)?;
    band.finish()
}

fn write_georeferencing<W, C, T>(
    image: &mut ImageEncoder<'_, W, C, TiffKindStandard>,
    raster: &Raster<T>,
) -> Result<()>
where
    W: Write + Seek,
    C: ColorType,
    T: RasterElement,
{
    let gt = raster.transform();
    let dir = image.encoder();
    dir.write_tag(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE), &gt.tiff_pixel_scale()[..])
        .map_err(codec_err("Cannot write scale tag"))?;
    dir.write_tag(Tag::from_u16_exhaustive(MODEL_TIEPOINT), &gt.tiff_tiepoint()[..])
        .map_err(codec_err("Cannot write tiepoint tag"))?;

    let crs = raster.area().crs();
    let mut keys: Vec<[u16; 4]> = Vec::new();
    let mut ascii = String::new();
    if crs.is_defined() {
        let geographic = is_geographic(crs.wkt());
        keys.push([GT_MODEL_TYPE, 0, 1, if geographic { 2 } else { 1 }]);
        keys.push([GT_RASTER_TYPE, 0, 1, 1]);
        ascii.push_str(crs.wkt());
        ascii.push('|');
        keys.push([GT_CITATION, GEO_ASCII_PARAMS, ascii.len() as u16, 0]);
        if let Some(code) = crs.epsg().and_then(|c| u16::try_from(c).ok()) {
            let key = if geographic { GEOGRAPHIC_TYPE } else { PROJECTED_CS_TYPE };
            keys.push([key, 0, 1, code]);
        }
    } else {
        keys.push([GT_RASTER_TYPE, 0, 1, 1]);
    }
    let mut directory: Vec<u16> = vec![1, 1, 0, keys.len() as u16];
    directory.extend(keys.iter().flatten());
    dir.write_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY), directory.as_slice())
        .map_err(codec_err("Cannot write geokey tag"))?;
    if !ascii.is_empty() {
        dir.write_tag(Tag::from_u16_exhaustive(GEO_ASCII_PARAMS), ascii.as_str())
            .map_err(codec_err("Cannot write geo ascii tag"))?;
    }

    if let Some(nd) = raster.nodata().and_then(|v| v.to_f64()) {
        dir.write_tag(Tag::from_u16_exhaustive(GDAL_NODATA), format!("{}", nd).as_str())
            .map_err(codec_err("Cannot write nodata tag"))?;
    }
    Ok(())
}

fn is_geographic(wkt: &str) -> bool {
    let root = wkt.trim_start().split(['[', '(']).next().unwrap_or("").trim();
    ["GEOGCS", "GEOGCRS", "GEOGRAPHICCRS"]
        .iter()
        .any(|k| k.eq_ignore_ascii_case(root))
}

/// Read a single-band GeoTIFF into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut decoder = Decoder::new(file).map_err(codec_err("TIFF decode error"))?;

    let (width, height) = decoder.dimensions().map_err(codec_err("Cannot read dimensions"))?;
    let rows = height as usize;
    let cols = width as usize;

    let scale = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE))
        .map_err(codec_err("No pixel scale tag"))?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TIEPOINT))
        .map_err(codec_err("No tiepoint tag"))?;
    let gt = GeoTransform::from_tiff_tags(&scale, &tiepoint)?;
    if (gt.pixel_width + gt.pixel_height).abs() > gt.pixel_width.abs() * 1e-9 {
        return Err(Error::GridMismatch(format!(
            "non-square cells {} x {} in {}",
            gt.pixel_width,
            -gt.pixel_height,
            path.display()
        )));
    }
    let crs = read_reference_system(&mut decoder);
    let nodata = decoder
        .get_tag_ascii_string(Tag::from_u16_exhaustive(GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim_end_matches('\0').trim().parse::<f64>().ok())
        .and_then(T::from_f64);

    let data: Vec<T> = match decoder.read_image().map_err(codec_err("Cannot read image data"))? {
        DecodingResult::U8(buf) => cast_samples(buf)?,
        DecodingResult::U16(buf) => cast_samples(buf)?,
        DecodingResult::U32(buf) => cast_samples(buf)?,
        DecodingResult::F32(buf) => cast_samples(buf)?,
        DecodingResult::F64(buf) => cast_samples(buf)?,
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };
    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let area = RasterArea::from_top_left(
        PixelTopLeftCoordinate::new(gt.origin_x, gt.origin_y),
        RasterDims::create(cols, rows)?,
        gt.cell_size(),
        crs,
    )?;
    let array = ndarray::Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut raster = Raster::from_array(name, area, array)?;
    raster.set_nodata(nodata);
    Ok(raster)
}

fn cast_samples<S: num_traits::NumCast, T: RasterElement>(buf: Vec<S>) -> Result<Vec<T>> {
    buf.into_iter()
        .map(|v| {
            num_traits::cast(v).ok_or_else(|| {
                Error::UnsupportedDataType(format!(
                    "stored sample does not fit the requested {} band",
                    T::DATA_TYPE
                ))
            })
        })
        .collect()
}

fn read_reference_system<R: std::io::Read + Seek>(decoder: &mut Decoder<R>) -> ReferenceSystem {
    if let Ok(ascii) = decoder.get_tag_ascii_string(Tag::from_u16_exhaustive(GEO_ASCII_PARAMS)) {
        let wkt = ascii.trim_end_matches('\0').trim_end_matches('|');
        if !wkt.is_empty() {
            return ReferenceSystem::new(wkt);
        }
    }
    if let Ok(keys) = decoder.get_tag_u16_vec(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY)) {
        for key in keys.chunks_exact(4).skip(1) {
            if (key[0] == PROJECTED_CS_TYPE || key[0] == GEOGRAPHIC_TYPE) && key[1] == 0 {
                if let Some(rs) = ReferenceSystem::from_epsg(key[3] as u32) {
                    return rs;
                }
            }
        }
    }
    ReferenceSystem::not_defined()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::PixelCenterCoordinate;
    use approx::assert_relative_eq;

    fn sample(crs: ReferenceSystem) -> Raster<f32> {
        let area = RasterArea::from_center(
            PixelCenterCoordinate::new(500_000.5, 6_000_000.5),
            RasterDims::new(7, 5),
            1.0,
            crs,
        )
        .unwrap();
        let mut r = Raster::new("dem", area).with_nodata(9999.0);
        for row in 0..5 {
            for col in 0..7 {
                r.set(row, col, (row * 7 + col) as f32 * 0.5).unwrap();
            }
        }
        r.set(2, 3, 9999.0).unwrap();
        r
    }

    #[test]
    fn test_roundtrip_with_partial_last_strip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dem.tif");
        let src = sample(ReferenceSystem::new("EPSG:25832"));
        write_geotiff(&src, &path, &GeoTiffOptions { rows_per_strip: 2 }).unwrap();

        let back: Raster<f32> = read_geotiff(&path).unwrap();
        assert_eq!(back.shape(), (5, 7));
        assert_eq!(back.data(), src.data());
        assert_eq!(back.nodata(), Some(9999.0));
        assert_relative_eq!(back.area().ulx(), 500_000.5);
        assert_relative_eq!(back.area().uly(), 6_000_000.5);
        assert_relative_eq!(back.cell_size(), 1.0);
        assert_eq!(back.area().crs(), src.area().crs());
        assert_eq!(back.area().crs().epsg(), Some(25832));
    }

    #[test]
    fn test_undefined_reference_system_is_kept_undefined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.tif");
        let src = sample(ReferenceSystem::not_defined());
        write_geotiff(&src, &path, &GeoTiffOptions::default()).unwrap();
        let back: Raster<f32> = read_geotiff(&path).unwrap();
        assert!(!back.area().crs().is_defined());
        assert_eq!(back.data(), src.data());
    }

    #[test]
    fn test_integer_band() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classes.tif");
        let area = RasterArea::from_center(
            PixelCenterCoordinate::new(0.5, 3.5),
            RasterDims::new(4, 4),
            1.0,
            ReferenceSystem::not_defined(),
        )
        .unwrap();
        let mut src: Raster<u16> = Raster::new("classes", area);
        src.set(3, 3, 65535).unwrap();
        write_geotiff(&src, &path, &GeoTiffOptions { rows_per_strip: 3 }).unwrap();
        let back: Raster<u16> = read_geotiff(&path).unwrap();
        assert_eq!(back.get(3, 3).unwrap(), 65535);
        assert_eq!(back.nodata(), None);
    }

    #[test]
    fn test_strips_in_order() {
        let mut buf = std::io::Cursor::new(Vec::new());
        let mut encoder = TiffEncoder::new(&mut buf).unwrap();
        let image = encoder.new_image::<Gray32Float>(4, 4).unwrap();
        let mut band = StripTiffBand::new(image, RasterDims::new(4, 4), 2, 0.0f32).unwrap();
        assert!(band.lock_block(0, 1, true).is_err());
        let mut block = band.lock_block(0, 0, true).unwrap();
        block.mark_dirty();
        band.unlock_block(0, 0, block).unwrap();
        assert!(band.lock_block(0, 1, true).is_ok());
    }
}
