use std::path::PathBuf;

use crate::consts::LCP_NO_DATA;
use crate::srs::SpatialRef;
use crate::{LcpError, LcpErrorCode, Result};

pub type GeoTransform = [f64; 6];

pub const DEFAULT_GEO_TRANSFORM: GeoTransform = [0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    Byte,
    Int16,
    UInt16,
    Int32,
    Float32,
    Float64,
}

/// Row oriented read access to a multi-band raster.
///
/// Bands are 1-based. Rows are always delivered as `i16`; sources with a
/// wider pixel type coerce on read.
pub trait RasterSource {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn band_count(&self) -> usize;
    fn pixel_type(&self, band: usize) -> PixelType;
    fn geo_transform(&self) -> Option<GeoTransform>;
    fn spatial_ref(&self) -> Option<&SpatialRef>;

    fn file_list(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    fn read_row(&self, band: usize, y: usize, row: &mut [i16]) -> Result<()>;

    /// Whole-band `(min, max)` ignoring nodata.
    fn statistics(&self, band: usize) -> Result<(f64, f64)> {
        compute_statistics(self, band)
    }
}

pub fn compute_statistics<S: RasterSource + ?Sized>(source: &S, band: usize) -> Result<(f64, f64)> {
    let mut row = vec![0_i16; source.width()];
    let mut range: Option<(i16, i16)> = None;
    for y in 0..source.height() {
        source.read_row(band, y, &mut row)?;
        for value in row.iter().copied().filter(|value| *value != LCP_NO_DATA) {
            range = Some(match range {
                Some((min, max)) => (min.min(value), max.max(value)),
                None => (value, value),
            });
        }
    }
    range
        .map(|(min, max)| (f64::from(min), f64::from(max)))
        .ok_or_else(|| {
            LcpError::new(
                LcpErrorCode::Format,
                format!("Band {band} has no valid pixels."),
            )
        })
}

pub trait ProgressSink {
    fn report(&mut self, fraction: f64) -> bool;
}

impl<F> ProgressSink for F
where
    F: FnMut(f64) -> bool,
{
    fn report(&mut self, fraction: f64) -> bool {
        self(fraction)
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryRaster {
    width: usize,
    height: usize,
    bands: Vec<Vec<i16>>,
    pixel_types: Vec<PixelType>,
    geo_transform: Option<GeoTransform>,
    spatial_ref: Option<SpatialRef>,
    file_list: Vec<PathBuf>,
}

impl InMemoryRaster {
    pub fn new(width: usize, height: usize, bands: Vec<Vec<i16>>) -> Result<Self> {
        let expected = width.checked_mul(height).ok_or_else(|| {
            LcpError::new(LcpErrorCode::Format, "Raster dimensions overflow.")
        })?;
        if let Some((index, band)) = bands
            .iter()
            .enumerate()
            .find(|(_, band)| band.len() != expected)
        {
            return Err(LcpError::new(
                LcpErrorCode::Format,
                format!(
                    "Band {} holds {} samples, expected {expected}.",
                    index + 1,
                    band.len()
                ),
            ));
        }
        let pixel_types = vec![PixelType::Int16; bands.len()];
        Ok(Self {
            width,
            height,
            bands,
            pixel_types,
            geo_transform: None,
            spatial_ref: None,
            file_list: Vec::new(),
        })
    }

    pub fn from_fn(
        width: usize,
        height: usize,
        band_count: usize,
        fill: impl Fn(usize, usize, usize) -> i16,
    ) -> Result<Self> {
        let bands: Vec<Vec<i16>> = (1..=band_count)
            .map(|band| {
                (0..height)
                    .flat_map(|y| (0..width).map(move |x| (x, y)))
                    .map(|(x, y)| fill(band, x, y))
                    .collect()
            })
            .collect();
        Self::new(width, height, bands)
    }

    pub fn with_geo_transform(mut self, geo_transform: GeoTransform) -> Self {
        self.geo_transform = Some(geo_transform);
        self
    }

    pub fn with_spatial_ref(mut self, spatial_ref: SpatialRef) -> Self {
        self.spatial_ref = Some(spatial_ref);
        self
    }

    pub fn with_pixel_type(mut self, band: usize, pixel_type: PixelType) -> Self {
        if let Some(slot) = band.checked_sub(1).and_then(|index| self.pixel_types.get_mut(index)) {
            *slot = pixel_type;
        }
        self
    }

    pub fn with_file_list(mut self, files: Vec<PathBuf>) -> Self {
        self.file_list = files;
        self
    }

    fn band_data(&self, band: usize) -> Result<&[i16]> {
        band.checked_sub(1)
            .and_then(|index| self.bands.get(index))
            .map(Vec::as_slice)
            .ok_or_else(|| {
                LcpError::new(
                    LcpErrorCode::Format,
                    format!("Band {band} is out of range 1..={}.", self.bands.len()),
                )
            })
    }
}

impl RasterSource for InMemoryRaster {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn pixel_type(&self, band: usize) -> PixelType {
        band.checked_sub(1)
            .and_then(|index| self.pixel_types.get(index).copied())
            .unwrap_or(PixelType::Int16)
    }

    fn geo_transform(&self) -> Option<GeoTransform> {
        self.geo_transform
    }

    fn spatial_ref(&self) -> Option<&SpatialRef> {
        self.spatial_ref.as_ref()
    }

    fn file_list(&self) -> Vec<PathBuf> {
        self.file_list.clone()
    }

    fn read_row(&self, band: usize, y: usize, row: &mut [i16]) -> Result<()> {
        let data = self.band_data(band)?;
        let start = y * self.width;
        let source = data.get(start..start + self.width).ok_or_else(|| {
            LcpError::new(
                LcpErrorCode::Io,
                format!("Row {y} is out of range 0..{}.", self.height),
            )
        })?;
        let row_len = row.len();
        let target = row.get_mut(..self.width).ok_or_else(|| {
            LcpError::new(
                LcpErrorCode::Io,
                format!("Row buffer holds {row_len} samples, need {}.", self.width),
            )
        })?;
        target.copy_from_slice(source);
        Ok(())
    }
}
