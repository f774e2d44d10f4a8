//! Raster cell types

use crate::error::{Error, Result};
use num_traits::{NumCast, Zero};
use std::fmt::{self, Debug};
use std::str::FromStr;

/// Scalar type of an output raster band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Byte,
    UInt16,
    UInt32,
    Float32,
    Float64,
}

impl DataType {
    pub fn name(self) -> &'static str {
        match self {
            DataType::Byte => "Byte",
            DataType::UInt16 => "UInt16",
            DataType::UInt32 => "UInt32",
            DataType::Float32 => "Float32",
            DataType::Float64 => "Float64",
        }
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "byte" | "uint8" | "u8" => Ok(DataType::Byte),
            "uint16" | "u16" => Ok(DataType::UInt16),
            "uint32" | "u32" => Ok(DataType::UInt32),
            "float32" | "f32" | "float" => Ok(DataType::Float32),
            "float64" | "f64" | "double" => Ok(DataType::Float64),
            _ => Err(Error::UnsupportedDataType(s.to_string())),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Trait for types that can be stored in a raster cell.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Band type this element is stored as
    const DATA_TYPE: DataType;

    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Convert from f64, `None` when the value does not fit
    fn from_f64(v: f64) -> Option<Self> {
        NumCast::from(v)
    }
}

macro_rules! impl_raster_element_int {
    ($t:ty, $dt:expr) => {
        impl RasterElement for $t {
            const DATA_TYPE: DataType = $dt;

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }
        }
    };
}

macro_rules! impl_raster_element_float {
    ($t:ty, $dt:expr) => {
        impl RasterElement for $t {
            const DATA_TYPE: DataType = $dt;

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) => *self == nd,
                    None => false,
                }
            }
        }
    };
}

impl_raster_element_int!(u8, DataType::Byte);
impl_raster_element_int!(u16, DataType::UInt16);
impl_raster_element_int!(u32, DataType::UInt32);
impl_raster_element_float!(f32, DataType::Float32);
impl_raster_element_float!(f64, DataType::Float64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_type() {
        assert_eq!("float32".parse::<DataType>().unwrap(), DataType::Float32);
        assert_eq!("Float32".parse::<DataType>().unwrap(), DataType::Float32);
        assert_eq!("f64".parse::<DataType>().unwrap(), DataType::Float64);
        assert_eq!("Byte".parse::<DataType>().unwrap(), DataType::Byte);
        let err = "complex64".parse::<DataType>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedDataType(_)));
    }

    #[test]
    fn test_nodata_checks() {
        assert!(9999.0f32.is_nodata(Some(9999.0)));
        assert!(f32::NAN.is_nodata(None));
        assert!(!1.0f32.is_nodata(Some(9999.0)));
        assert!(0u8.is_nodata(Some(0)));
        assert!(!0u8.is_nodata(None));
    }

    #[test]
    fn test_from_f64_range() {
        assert_eq!(u8::from_f64(300.0), None);
        assert_eq!(u8::from_f64(12.0), Some(12));
        assert_eq!(f32::DATA_TYPE, DataType::Float32);
    }
}
