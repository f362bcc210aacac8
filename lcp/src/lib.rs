//! Reader and writer for FARSITE v.4 landscape (`.lcp`) rasters.
//!
//! An LCP file is a 7316 byte little-endian header followed by band
//! interleaved `i16` samples. The header carries per-band units, statistics
//! and value classes; [`decode_header`] and [`encode_header`] handle it
//! directly, [`LcpDataset`] opens files and [`LcpWriter`] creates them from
//! any [`RasterSource`].

use std::fmt;

mod classify;
mod common;
mod consts;
mod decoder;
mod encoder;
mod latitude;
mod options;
mod raster;
mod reader;
mod srs;
pub mod units;
mod writer;

pub use classify::{classify_band, classify_rows, BandClasses, BandClassifier};
pub use common::{FieldValue, FieldWrite};
pub use consts::{LCP_HEADER_LENGTH, LCP_MAX_CLASSES, LCP_NO_DATA};
pub use decoder::{decode_header, has_lcp_extension, identify};
pub use encoder::{encode_header, encode_row, header_writes};
pub use latitude::{resolve_latitude, resolve_linear_unit};
pub use options::{CreationOptions, LinearUnitOption};
pub use raster::{
    compute_statistics, GeoTransform, InMemoryRaster, PixelType, ProgressSink, RasterSource,
    DEFAULT_GEO_TRANSFORM,
};
pub use reader::{BandDescriptor, LcpDataset};
pub use srs::{CoordinateTransform, LinearUnitDef, Proj4Transform, SpatialRef};
pub use writer::{create_copy, LcpWriter};

use consts::{FLAG_ABSENT, FLAG_PRESENT};

/// The semantic meaning of a band. Every role owns a fixed slot in each
/// per-role header region whether or not the schema carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BandRole {
    Elevation,
    Slope,
    Aspect,
    FuelModel,
    CanopyCover,
    CanopyHeight,
    CanopyBaseHeight,
    CanopyBulkDensity,
    Duff,
    CoarseWoodyDebris,
}

impl BandRole {
    pub const ALL: [BandRole; 10] = [
        Self::Elevation,
        Self::Slope,
        Self::Aspect,
        Self::FuelModel,
        Self::CanopyCover,
        Self::CanopyHeight,
        Self::CanopyBaseHeight,
        Self::CanopyBulkDensity,
        Self::Duff,
        Self::CoarseWoodyDebris,
    ];

    pub fn slot(self) -> usize {
        match self {
            Self::Elevation => 0,
            Self::Slope => 1,
            Self::Aspect => 2,
            Self::FuelModel => 3,
            Self::CanopyCover => 4,
            Self::CanopyHeight => 5,
            Self::CanopyBaseHeight => 6,
            Self::CanopyBulkDensity => 7,
            Self::Duff => 8,
            Self::CoarseWoodyDebris => 9,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Elevation => "Elevation",
            Self::Slope => "Slope",
            Self::Aspect => "Aspect",
            Self::FuelModel => "Fuel models",
            Self::CanopyCover => "Canopy cover",
            Self::CanopyHeight => "Canopy height",
            Self::CanopyBaseHeight => "Canopy base height",
            Self::CanopyBulkDensity => "Canopy bulk density",
            Self::Duff => "Duff",
            Self::CoarseWoodyDebris => "Coarse woody debris",
        }
    }

    /// Prefix of the band metadata keys (`<PREFIX>_MIN`, `<PREFIX>_FILE`, ...).
    pub fn metadata_prefix(self) -> &'static str {
        match self {
            Self::Elevation => "ELEVATION",
            Self::Slope => "SLOPE",
            Self::Aspect => "ASPECT",
            Self::FuelModel => "FUEL_MODEL",
            Self::CanopyCover => "CANOPY_COV",
            Self::CanopyHeight => "CANOPY_HT",
            Self::CanopyBaseHeight => "CBH",
            Self::CanopyBulkDensity => "CBD",
            Self::Duff => "DUFF",
            Self::CoarseWoodyDebris => "CWD",
        }
    }

    pub fn is_crown_fuel(self) -> bool {
        matches!(
            self,
            Self::CanopyHeight | Self::CanopyBaseHeight | Self::CanopyBulkDensity
        )
    }

    pub fn is_ground_fuel(self) -> bool {
        matches!(self, Self::Duff | Self::CoarseWoodyDebris)
    }
}

impl fmt::Display for BandRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Which optional fuel groups a file carries. Determines band count and the
/// role of each logical band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Schema {
    pub crown_fuels: bool,
    pub ground_fuels: bool,
}

impl Schema {
    pub const SUPPORTED_BAND_COUNTS: [usize; 4] = [5, 7, 8, 10];

    pub fn from_band_count(band_count: usize) -> Result<Self> {
        match band_count {
            5 => Ok(Self {
                crown_fuels: false,
                ground_fuels: false,
            }),
            7 => Ok(Self {
                crown_fuels: false,
                ground_fuels: true,
            }),
            8 => Ok(Self {
                crown_fuels: true,
                ground_fuels: false,
            }),
            10 => Ok(Self {
                crown_fuels: true,
                ground_fuels: true,
            }),
            _ => Err(LcpError::new(
                LcpErrorCode::UnsupportedSchema,
                format!("LCP doesn't support {band_count} bands. Must be 5, 7, 8 or 10 bands."),
            )),
        }
    }

    pub fn from_flags(crown_flag: i32, ground_flag: i32) -> Result<Self> {
        Ok(Self {
            crown_fuels: decode_flag(crown_flag, "crown fuels")?,
            ground_fuels: decode_flag(ground_flag, "ground fuels")?,
        })
    }

    pub fn crown_flag(self) -> i32 {
        encode_flag(self.crown_fuels)
    }

    pub fn ground_flag(self) -> i32 {
        encode_flag(self.ground_fuels)
    }

    pub fn band_count(self) -> usize {
        match (self.crown_fuels, self.ground_fuels) {
            (true, true) => 10,
            (true, false) => 8,
            (false, true) => 7,
            (false, false) => 5,
        }
    }

    /// Roles in logical band order (band 1 first).
    pub fn roles(self) -> Vec<BandRole> {
        BandRole::ALL
            .into_iter()
            .filter(|role| self.contains(*role))
            .collect()
    }

    pub fn role_at(self, band: usize) -> Option<BandRole> {
        band.checked_sub(1)
            .and_then(|index| self.roles().get(index).copied())
    }

    pub fn contains(self, role: BandRole) -> bool {
        if role.is_crown_fuel() {
            self.crown_fuels
        } else if role.is_ground_fuel() {
            self.ground_fuels
        } else {
            true
        }
    }
}

fn decode_flag(flag: i32, name: &str) -> Result<bool> {
    match flag {
        FLAG_ABSENT => Ok(false),
        FLAG_PRESENT => Ok(true),
        _ => Err(LcpError::new(
            LcpErrorCode::Format,
            format!("Invalid {name} flag {flag}, expected 20 or 21."),
        )),
    }
}

fn encode_flag(present: bool) -> i32 {
    if present {
        FLAG_PRESENT
    } else {
        FLAG_ABSENT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinearUnit {
    #[default]
    Meters,
    Feet,
    Kilometers,
}

impl LinearUnit {
    pub fn code(self) -> i32 {
        match self {
            Self::Meters => 0,
            Self::Feet => 1,
            Self::Kilometers => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Meters),
            1 => Some(Self::Feet),
            2 => Some(Self::Kilometers),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Meters => "Meters",
            Self::Feet => "Feet",
            Self::Kilometers => "Kilometers",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Extent {
    pub west: f64,
    pub east: f64,
    pub north: f64,
    pub south: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandInfo {
    pub role: BandRole,
    pub unit_code: u16,
    pub min: i32,
    pub max: i32,
    /// Distinct non-nodata values, or `-1` when there were too many to list.
    pub num_classes: i32,
    /// A leading `0` followed by the ascending distinct values.
    pub class_values: Vec<i32>,
    pub source_file_name: String,
}

impl BandInfo {
    pub fn new(role: BandRole, unit_code: u16) -> Self {
        Self {
            role,
            unit_code,
            min: 0,
            max: 0,
            num_classes: 0,
            class_values: vec![0],
            source_file_name: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LcpHeader {
    pub schema: Schema,
    pub latitude: i32,
    pub extent: Extent,
    pub cell_x: f64,
    pub cell_y: f64,
    pub width: i32,
    pub height: i32,
    pub linear_unit: LinearUnit,
    pub bands: Vec<BandInfo>,
    pub description: String,
}

impl LcpHeader {
    pub fn band_count(&self) -> usize {
        self.schema.band_count()
    }

    pub fn band(&self, role: BandRole) -> Option<&BandInfo> {
        self.bands.iter().find(|band| band.role == role)
    }

    pub fn geo_transform(&self) -> GeoTransform {
        [
            self.extent.west,
            self.cell_x,
            0.0,
            self.extent.north,
            0.0,
            -self.cell_y,
        ]
    }

    pub fn line_stride(&self) -> Result<usize> {
        let width = usize::try_from(self.width).map_err(|_| {
            LcpError::new(
                LcpErrorCode::Format,
                format!("Invalid raster width {}.", self.width),
            )
        })?;
        width
            .checked_mul(self.band_count() * 2)
            .ok_or_else(|| LcpError::new(LcpErrorCode::Format, "Line stride overflow."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LcpErrorCode {
    Format,
    UnsupportedSchema,
    InvalidOption,
    GeoReference,
    Io,
    Cancelled,
}

impl LcpErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Format => "FORMAT_ERROR",
            Self::UnsupportedSchema => "UNSUPPORTED_SCHEMA",
            Self::InvalidOption => "INVALID_OPTION",
            Self::GeoReference => "GEOREFERENCE_ERROR",
            Self::Io => "IO_ERROR",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for LcpErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct LcpError {
    pub code: LcpErrorCode,
    pub message: String,
    #[source]
    source: Option<std::io::Error>,
}

impl LcpError {
    pub fn new(code: LcpErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self {
            code: LcpErrorCode::Io,
            message: message.into(),
            source: Some(source),
        }
    }
}

impl From<std::io::Error> for LcpError {
    fn from(source: std::io::Error) -> Self {
        Self::io(source.to_string(), source)
    }
}

pub type Result<T> = std::result::Result<T, LcpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_band_counts_follow_flags() {
        let cases = [
            (20, 20, 5),
            (20, 21, 7),
            (21, 20, 8),
            (21, 21, 10),
        ];
        for (crown, ground, bands) in cases {
            let schema = Schema::from_flags(crown, ground).expect("valid flags");
            assert_eq!(schema.band_count(), bands);
            assert_eq!(schema.roles().len(), bands);
            assert_eq!(Schema::from_band_count(bands).expect("supported"), schema);
            assert_eq!((schema.crown_flag(), schema.ground_flag()), (crown, ground));
        }
    }

    #[test]
    fn ground_only_schema_puts_duff_sixth() {
        let schema = Schema::from_band_count(7).expect("supported");
        assert_eq!(schema.role_at(6), Some(BandRole::Duff));
        assert_eq!(schema.role_at(7), Some(BandRole::CoarseWoodyDebris));
        assert_eq!(schema.role_at(8), None);
        assert_eq!(schema.role_at(0), None);

        let full = Schema::from_band_count(10).expect("supported");
        assert_eq!(full.role_at(6), Some(BandRole::CanopyHeight));
        assert_eq!(full.role_at(9), Some(BandRole::Duff));
    }

    #[test]
    fn rejects_unsupported_band_count() {
        for count in [0, 1, 4, 6, 9, 11] {
            let error = Schema::from_band_count(count).expect_err("should reject");
            assert_eq!(error.code, LcpErrorCode::UnsupportedSchema);
        }
    }

    #[test]
    fn rejects_unknown_flag() {
        let error = Schema::from_flags(22, 20).expect_err("should reject");
        assert_eq!(error.code, LcpErrorCode::Format);
    }

    #[test]
    fn error_display_carries_code() {
        let error = LcpError::new(LcpErrorCode::InvalidOption, "bad value");
        assert_eq!(error.to_string(), "INVALID_OPTION: bad value");
    }
}
