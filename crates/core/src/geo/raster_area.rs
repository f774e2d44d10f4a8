//! Rasterized georeferenced areas
//!
//! ```text
//!       B-------+-------+      A = (ulx, uly), centre of the top-left pixel
//!       |       |       |      B = (ulx - cs/2, uly + cs/2) = (left, top)
//!       |   A   |       |
//!       |       |       |
//!       +-------+-------+
//!    y  |       |       |      C = (lrx, lry), centre of the bottom-right pixel
//!    ^  |       |   C   |      D = (lrx + cs/2, lry - cs/2) = (right, bottom)
//!    |  |       |       |
//!    |  +-------+-------D
//!    +----> x
//! ```
//!
//! The pixel counts and the distance between the outermost pixel centres are
//! related by `pixel_width * cell_size == center_span_width + cell_size`.

use crate::crs::ReferenceSystem;
use crate::error::{Error, Result};
use crate::geo::{
    Area, GeoCoordinate, GeoDims, PixelCenterCoordinate, PixelIndex, PixelTopLeftCoordinate,
    RasterCoordinate, RasterDims,
};
use crate::raster::GeoTransform;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Origin moves larger than this fraction of a cell are reported.
pub const SIGNIFICANT_SHIFT: f64 = 0.1;

/// Width-to-cell ratios this close to an integer count as whole cells
const WHOLE_CELL_EPS: f64 = 1e-9;

/// Whole cells needed to cover `ratio` cells, ignoring rounding noise
fn covering_cells(ratio: f64) -> f64 {
    let nearest = ratio.round();
    if (ratio - nearest).abs() <= WHOLE_CELL_EPS {
        nearest
    } else {
        ratio.ceil()
    }
}

/// A georeferenced rectangle refined into a grid of square cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterArea {
    area: Area,
    pixel_dims: RasterDims,
    cell_size: f64,
}

/// A [`RasterArea`] whose origin was snapped onto another grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjusted {
    pub area: RasterArea,
    /// Origin move in x, in map units
    pub shift_x: f64,
    /// Origin move in y, in map units
    pub shift_y: f64,
}

impl Adjusted {
    /// Whether the origin moved by more than [`SIGNIFICANT_SHIFT`] of a cell
    pub fn is_significant(&self) -> bool {
        let cs = self.area.cell_size();
        self.shift_x.abs() / cs > SIGNIFICANT_SHIFT || self.shift_y.abs() / cs > SIGNIFICANT_SHIFT
    }
}

fn check_cell_size(cell_size: f64) -> Result<()> {
    if cell_size.is_finite() && cell_size > 0.0 {
        Ok(())
    } else {
        Err(Error::invalid_parameter(
            "cell_size",
            cell_size,
            "must be a positive finite number",
        ))
    }
}

impl RasterArea {
    /// Grid whose top-left pixel is centred at `ul`.
    pub fn from_center(
        ul: PixelCenterCoordinate,
        dims: RasterDims,
        cell_size: f64,
        crs: ReferenceSystem,
    ) -> Result<Self> {
        Self::from_top_left(ul.to_top_left(cell_size), dims, cell_size, crs)
    }

    /// Grid whose top-left pixel has its corner at `ul`.
    pub fn from_top_left(
        ul: PixelTopLeftCoordinate,
        dims: RasterDims,
        cell_size: f64,
        crs: ReferenceSystem,
    ) -> Result<Self> {
        check_cell_size(cell_size)?;
        Ok(Self {
            area: Area::new(
                ul.to_geo(),
                GeoDims::new(dims.cols as f64 * cell_size, dims.rows as f64 * cell_size),
                crs,
            ),
            pixel_dims: dims,
            cell_size,
        })
    }

    /// Grid spanning from the pixel centred at `ul` to the pixel centred at `lr`.
    ///
    /// Fails if the centre-to-centre spans are not whole multiples of the cell size.
    pub fn from_corners(
        ul: PixelCenterCoordinate,
        lr: PixelCenterCoordinate,
        cell_size: f64,
        crs: ReferenceSystem,
    ) -> Result<Self> {
        check_cell_size(cell_size)?;
        let width = lr.x - ul.x;
        let height = ul.y - lr.y;
        if width < 0.0 || height < 0.0 {
            return Err(Error::GridMismatch(format!(
                "lower-right centre ({}, {}) is not below and right of upper-left centre ({}, {})",
                lr.x, lr.y, ul.x, ul.y
            )));
        }
        let n_cols = (width / cell_size).round();
        let n_rows = (height / cell_size).round();
        if (width - n_cols * cell_size).abs() > cell_size / 100.0
            || (height - n_rows * cell_size).abs() > cell_size / 100.0
        {
            return Err(Error::GridMismatch(
                "the given ul and lr points do not match the given cell size".into(),
            ));
        }
        let dims = RasterDims::create(n_cols as usize + 1, n_rows as usize + 1)?;
        Self::from_center(ul, dims, cell_size, crs)
    }

    /// Rasterize an arbitrary area. The extent is rounded to the nearest whole
    /// number of cells; the top-left corner is kept.
    pub fn from_area(area: &Area, cell_size: f64) -> Result<Self> {
        check_cell_size(cell_size)?;
        let pixel_dims = adjust_dims(area, cell_size)?;
        Ok(Self {
            area: Area::new(
                area.top_left(),
                GeoDims::new(
                    pixel_dims.cols as f64 * cell_size,
                    pixel_dims.rows as f64 * cell_size,
                ),
                area.crs().clone(),
            ),
            pixel_dims,
            cell_size,
        })
    }

    /// Rasterize `area` on the grid that has a pixel centred at `base`.
    ///
    /// The origin snaps to the nearest pixel centre of that grid; the returned
    /// shift tells how far it moved.
    pub fn aligned_to_center(
        area: &Area,
        base: PixelCenterCoordinate,
        cell_size: f64,
    ) -> Result<Adjusted> {
        let unaligned = Self::from_area(area, cell_size)?;
        let aligned = unaligned.adjust_to(base);
        Ok(aligned)
    }

    /// Rasterize `area` on the grid that has a pixel corner at `base`.
    pub fn aligned_to_top_left(
        area: &Area,
        base: PixelTopLeftCoordinate,
        cell_size: f64,
    ) -> Result<Adjusted> {
        Self::aligned_to_center(area, base.to_center(cell_size), cell_size)
    }

    /// Move the top-left pixel centre to the closest pixel centre of the grid
    /// through `base` with this area's cell size. Dimensions are unchanged.
    pub fn adjust_to(&self, base: PixelCenterCoordinate) -> Adjusted {
        let cs = self.cell_size;
        let new_ulx = base.x + ((self.ulx() - base.x) / cs).round() * cs;
        let new_uly = base.y + ((self.uly() - base.y) / cs).round() * cs;
        let shift_x = new_ulx - self.ulx();
        let shift_y = new_uly - self.uly();

        let mut area = self.clone();
        area.area.top_left = PixelCenterCoordinate::new(new_ulx, new_uly).to_top_left(cs).to_geo();
        let aligned = Adjusted {
            area,
            shift_x,
            shift_y,
        };
        if aligned.is_significant() {
            warn!("NOTE: adjusting RasterArea by ({}, {})", shift_x, shift_y);
        }
        aligned
    }

    /// Grow (`width > 0`) or shrink (`width < 0`) the grid on every side.
    ///
    /// The request is rounded outward to whole cells, so the geometric
    /// extent and the pixel grid change together.
    pub fn with_halo(&self, width: f64) -> Result<RasterArea> {
        if !width.is_finite() {
            return Err(Error::invalid_parameter("halo", width, "must be finite"));
        }
        let cs = self.cell_size;
        let cells = covering_cells(width.abs() / cs) as i64 * if width > 0.0 { 1 } else { -1 };
        let area = self.area.with_halo(cells as f64 * cs)?;
        let cols = self.pixel_dims.cols as i64 + 2 * cells;
        let rows = self.pixel_dims.rows as i64 + 2 * cells;
        if cols < 0 || rows < 0 {
            return Err(Error::InvalidHalo {
                halo: width,
                width: self.area.width(),
                height: self.area.height(),
            });
        }
        Ok(RasterArea {
            area,
            pixel_dims: RasterDims::create(cols as usize, rows as usize)?,
            cell_size: cs,
        })
    }

    // Dimensions

    pub fn pixel_width(&self) -> PixelIndex {
        self.pixel_dims.cols
    }

    pub fn pixel_height(&self) -> PixelIndex {
        self.pixel_dims.rows
    }

    pub fn raster_dims(&self) -> RasterDims {
        self.pixel_dims
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Distance between the centres of the first and last pixel in a row
    pub fn center_span_width(&self) -> f64 {
        (self.pixel_dims.cols as f64 - 1.0) * self.cell_size
    }

    /// Distance between the centres of the first and last pixel in a column
    pub fn center_span_height(&self) -> f64 {
        (self.pixel_dims.rows as f64 - 1.0) * self.cell_size
    }

    // Geometry

    /// The underlying geometric rectangle (outer cell edges)
    pub fn area(&self) -> &Area {
        &self.area
    }

    pub fn left(&self) -> f64 {
        self.area.left()
    }

    pub fn right(&self) -> f64 {
        self.area.right()
    }

    pub fn top(&self) -> f64 {
        self.area.top()
    }

    pub fn bottom(&self) -> f64 {
        self.area.bottom()
    }

    pub fn crs(&self) -> &ReferenceSystem {
        self.area.crs()
    }

    /// x of the top-left pixel centre
    pub fn ulx(&self) -> f64 {
        self.area.left() + self.cell_size / 2.0
    }

    /// y of the top-left pixel centre
    pub fn uly(&self) -> f64 {
        self.area.top() - self.cell_size / 2.0
    }

    /// x of the bottom-right pixel centre
    pub fn lrx(&self) -> f64 {
        self.ulx() + self.center_span_width()
    }

    /// y of the bottom-right pixel centre
    pub fn lry(&self) -> f64 {
        self.uly() - self.center_span_height()
    }

    /// Centre of the top-left pixel
    pub fn ul_corner(&self) -> PixelCenterCoordinate {
        PixelCenterCoordinate::new(self.ulx(), self.uly())
    }

    /// Grid phase: the top-left pixel centre reduced into `[0, cell_size)`.
    ///
    /// Two grids with the same cell size and base point share pixel centres.
    pub fn base_point(&self) -> PixelCenterCoordinate {
        let cs = self.cell_size;
        let reduce = |v: f64| v - (v / cs).floor() * cs;
        PixelCenterCoordinate::new(reduce(self.ulx()), reduce(self.uly()))
    }

    /// North-up affine transform of this grid
    pub fn geo_transform(&self) -> GeoTransform {
        GeoTransform::new(self.left(), self.top(), self.cell_size, -self.cell_size)
    }

    /// Inclusive containment test against the outer cell edges
    pub fn contains_center(&self, c: PixelCenterCoordinate) -> bool {
        self.area.contains_point(GeoCoordinate::from(c))
    }

    // Coordinate conversion

    /// Centre of the pixel at `c`
    pub fn to_geocoordinate(&self, c: RasterCoordinate) -> PixelCenterCoordinate {
        PixelCenterCoordinate::new(
            self.left() + (c.col as f64 + 0.5) * self.cell_size,
            self.top() - (c.row as f64 + 0.5) * self.cell_size,
        )
    }

    /// Pixel whose centre is nearest to `c`.
    ///
    /// Fails when the location lies left of or above the grid.
    pub fn to_raster_coordinate(&self, c: PixelCenterCoordinate) -> Result<RasterCoordinate> {
        let col = to_pixel_index(((c.x - self.ulx()) / self.cell_size).round(), "x")?;
        let row = to_pixel_index(((self.uly() - c.y) / self.cell_size).round(), "y")?;
        Ok(RasterCoordinate::new(col, row))
    }

    /// Rectangular window of this grid starting at pixel `origin`.
    pub fn sub_area(&self, origin: RasterCoordinate, dims: RasterDims) -> Result<RasterArea> {
        let col_end = origin.col as u64 + dims.cols as u64;
        let row_end = origin.row as u64 + dims.rows as u64;
        if col_end > self.pixel_dims.cols as u64 || row_end > self.pixel_dims.rows as u64 {
            return Err(Error::IndexOutOfBounds {
                row: row_end as usize,
                col: col_end as usize,
                rows: self.pixel_dims.rows as usize,
                cols: self.pixel_dims.cols as usize,
            });
        }
        let ul = PixelCenterCoordinate::new(
            self.ulx() + origin.col as f64 * self.cell_size,
            self.uly() - origin.row as f64 * self.cell_size,
        );
        RasterArea::from_center(ul, dims, self.cell_size, self.crs().clone())
    }
}

fn to_pixel_index(v: f64, axis: &'static str) -> Result<PixelIndex> {
    if v < 0.0 {
        return Err(Error::NegativeRasterCoordinate {
            axis,
            value: v as i64,
        });
    }
    if !(v <= PixelIndex::MAX as f64) {
        return Err(Error::invalid_parameter(
            "raster coordinate",
            v,
            format!("{} index exceeds the pixel index range", axis),
        ));
    }
    Ok(v as PixelIndex)
}

/// Whole number of cells nearest to the extent of `area`.
fn adjust_dims(area: &Area, cell_size: f64) -> Result<RasterDims> {
    let cols = (area.width() / cell_size).round();
    let rows = (area.height() / cell_size).round();
    if !(cols >= 0.0 && rows >= 0.0) {
        return Err(Error::invalid_parameter(
            "area",
            format!("{} x {}", area.width(), area.height()),
            "extent must not be negative",
        ));
    }
    if cols > PixelIndex::MAX as f64 || rows > PixelIndex::MAX as f64 {
        return Err(Error::InvalidDimensions {
            width: cols.min(usize::MAX as f64) as usize,
            height: rows.min(usize::MAX as f64) as usize,
        });
    }
    RasterDims::create(cols as usize, rows as usize)
}

impl fmt::Display for RasterArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RasterArea:")?;
        writeln!(
            f,
            "  (pwidth, pheight) = ({}px x {}px)",
            self.pixel_width(),
            self.pixel_height()
        )?;
        writeln!(f, "   pixel size: {}m", self.cell_size)?;
        writeln!(
            f,
            "  (width, height) = ({}m x {}m)",
            self.area.width(),
            self.area.height()
        )?;
        writeln!(
            f,
            "  (xmin, xmax, ymin, ymax) = ({:.6}, {:.6}, {:.6}, {:.6})",
            self.left(),
            self.right(),
            self.bottom(),
            self.top()
        )?;
        write!(f, "  (ulx,uly) = ({:.6}, {:.6})", self.ulx(), self.uly())
    }
}
