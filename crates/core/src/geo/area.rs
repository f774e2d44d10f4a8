//! Georeferenced rectangles
//!
//! ```text
//!       A---------------+      A = (left, top)
//!       |               |      B = (right, bottom)
//!       |               |
//!    y  |               |
//!    ^  |               |
//!    |  +---------------B
//!    +----> x
//! ```

use crate::crs::ReferenceSystem;
use crate::error::{Error, Result};
use crate::geo::{GeoCoordinate, GeoDims};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Area determined by georeferenced coordinates: top-left corner, extent and
/// reference system. `y` grows upward, so `bottom = top - height`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Area {
    pub(crate) top_left: GeoCoordinate,
    pub(crate) dims: GeoDims,
    pub(crate) crs: ReferenceSystem,
}

impl Area {
    pub fn new(top_left: GeoCoordinate, dims: GeoDims, crs: ReferenceSystem) -> Self {
        Self { top_left, dims, crs }
    }

    pub fn left(&self) -> f64 {
        self.top_left.x
    }

    pub fn right(&self) -> f64 {
        self.left() + self.dims.width
    }

    pub fn top(&self) -> f64 {
        self.top_left.y
    }

    pub fn bottom(&self) -> f64 {
        self.top() - self.dims.height
    }

    pub fn width(&self) -> f64 {
        self.dims.width
    }

    pub fn height(&self) -> f64 {
        self.dims.height
    }

    pub fn top_left(&self) -> GeoCoordinate {
        self.top_left
    }

    pub fn dims(&self) -> GeoDims {
        self.dims
    }

    pub fn crs(&self) -> &ReferenceSystem {
        &self.crs
    }

    pub fn set_crs(&mut self, crs: ReferenceSystem) {
        self.crs = crs;
    }

    /// Inclusive containment test
    pub fn contains_point(&self, c: GeoCoordinate) -> bool {
        c.x >= self.left() && c.x <= self.right() && c.y >= self.bottom() && c.y <= self.top()
    }

    /// Whether two areas share at least one point (touching edges count)
    pub fn overlaps(&self, other: &Area) -> bool {
        !(self.left() > other.right()
            || self.right() < other.left()
            || self.top() < other.bottom()
            || self.bottom() > other.top())
    }

    /// Grow (`width > 0`) or shrink (`width < 0`) the area by `width` on every side.
    ///
    /// Shrinking by more than half the width or height is an error.
    pub fn with_halo(&self, width: f64) -> Result<Area> {
        if !width.is_finite() {
            return Err(Error::invalid_parameter("halo", width, "must be finite"));
        }
        if width < 0.0 && (self.width() < (2.0 * width).abs() || self.height() < (2.0 * width).abs()) {
            return Err(Error::InvalidHalo {
                halo: width,
                width: self.width(),
                height: self.height(),
            });
        }
        Ok(Area {
            top_left: GeoCoordinate::new(self.top_left.x - width, self.top_left.y + width),
            dims: GeoDims::new(self.dims.width + 2.0 * width, self.dims.height + 2.0 * width),
            crs: self.crs.clone(),
        })
    }

    /// `[left, top, width, height]` printed with ten decimals
    pub fn to_vector_str(&self) -> Vec<String> {
        [self.left(), self.top(), self.width(), self.height()]
            .iter()
            .map(|v| format!("{:.10}", v))
            .collect()
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Area:")?;
        writeln!(f, "  (width, height) = ({}m x {}m)", self.width(), self.height())?;
        write!(
            f,
            "  (xmin, xmax, ymin, ymax) = ({:.6}, {:.6}, {:.6}, {:.6})",
            self.left(),
            self.right(),
            self.bottom(),
            self.top()
        )
    }
}

/// Parse a calculation window `ulx,uly,width,height`.
pub fn parse_rectangle_coordinates(s: &str, crs: ReferenceSystem) -> Result<Area> {
    let values = parse_doubles(s, "calc-win")?;
    if values.len() != 4 {
        return Err(Error::invalid_parameter(
            "calc-win",
            s,
            format!("expected 4 values (ulx,uly,width,height), got {}", values.len()),
        ));
    }
    if values[2] < 0.0 || values[3] < 0.0 {
        return Err(Error::invalid_parameter(
            "calc-win",
            s,
            "width and height must not be negative",
        ));
    }
    Ok(Area::new(
        GeoCoordinate::new(values[0], values[1]),
        GeoDims::new(values[2], values[3]),
        crs,
    ))
}

/// Split on commas and parse every entry as a finite `f64`.
pub fn parse_doubles(s: &str, name: &'static str) -> Result<Vec<f64>> {
    s.split(',')
        .map(|part| {
            let part = part.trim();
            match part.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(Error::invalid_parameter(
                    name,
                    s,
                    format!("cannot convert '{}' to a number", part),
                )),
            }
        })
        .collect()
}
