use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::consts::LCP_HEADER_LENGTH;
use crate::decoder::{decode_header, has_lcp_extension};
use crate::raster::{GeoTransform, PixelType, RasterSource};
use crate::srs::SpatialRef;
use crate::units;
use crate::{BandInfo, BandRole, LcpError, LcpErrorCode, LcpHeader, Result};

/// Where one logical band lives in the interleaved pixel records, plus the
/// metadata decoded for it.
#[derive(Debug, Clone, PartialEq)]
pub struct BandDescriptor {
    pub band: usize,
    pub role: BandRole,
    pub description: &'static str,
    pub data_offset: u64,
    pub pixel_stride: usize,
    pub line_stride: usize,
    pub metadata: Vec<(String, String)>,
}

impl BandDescriptor {
    fn new(band: usize, info: &BandInfo, band_count: usize, line_stride: usize) -> Self {
        let role = info.role;
        let prefix = role.metadata_prefix();

        let mut metadata = vec![(
            units::option_key(role).to_string(),
            info.unit_code.to_string(),
        )];
        if let (Some(key), Some(name)) = (
            units::name_key(role),
            units::display_name(role, info.unit_code),
        ) {
            metadata.push((key, name.to_string()));
        }
        metadata.push((format!("{prefix}_MIN"), info.min.to_string()));
        metadata.push((format!("{prefix}_MAX"), info.max.to_string()));
        metadata.push((format!("{prefix}_NUM_CLASSES"), info.num_classes.to_string()));
        if role == BandRole::FuelModel {
            let values = info
                .class_values
                .iter()
                .filter(|value| (info.min..=info.max).contains(*value))
                .map(i32::to_string)
                .collect::<Vec<_>>()
                .join(",");
            metadata.push(("FUEL_MODEL_VALUES".to_string(), values));
        }
        metadata.push((format!("{prefix}_FILE"), info.source_file_name.clone()));

        Self {
            band,
            role,
            description: role.description(),
            data_offset: (LCP_HEADER_LENGTH + (band - 1) * 2) as u64,
            pixel_stride: band_count * 2,
            line_stride,
            metadata,
        }
    }

    pub fn metadata_item(&self, key: &str) -> Option<&str> {
        find_item(&self.metadata, key)
    }
}

#[derive(Debug)]
pub struct LcpDataset {
    path: PathBuf,
    file: File,
    header: LcpHeader,
    bands: Vec<BandDescriptor>,
    metadata: Vec<(String, String)>,
    spatial_ref: Option<SpatialRef>,
    prj_path: Option<PathBuf>,
}

impl LcpDataset {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !has_lcp_extension(path) {
            return Err(LcpError::new(
                LcpErrorCode::Format,
                format!("{} does not have an .lcp extension.", path.display()),
            ));
        }
        Self::open_unchecked(path)
    }

    pub(crate) fn open_unchecked(path: &Path) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| LcpError::io(format!("Could not open {}.", path.display()), e))?;
        let file_length = file
            .metadata()
            .map_err(|e| LcpError::io(format!("Could not stat {}.", path.display()), e))?
            .len();
        if file_length < LCP_HEADER_LENGTH as u64 {
            return Err(LcpError::new(
                LcpErrorCode::Format,
                format!("File too short. expected>={LCP_HEADER_LENGTH} got={file_length}"),
            ));
        }

        let mut bytes = vec![0_u8; LCP_HEADER_LENGTH];
        file.read_exact(&mut bytes)
            .map_err(|e| LcpError::io("Could not read header.", e))?;
        let header = decode_header(&bytes)?;

        if header.width <= 0 || header.height <= 0 {
            return Err(LcpError::new(
                LcpErrorCode::Format,
                format!(
                    "Invalid raster dimensions {}x{}.",
                    header.width, header.height
                ),
            ));
        }
        let line_stride = header.line_stride()?;
        if i32::try_from(line_stride).is_err() {
            return Err(LcpError::new(
                LcpErrorCode::Format,
                format!("Line stride {line_stride} is too large."),
            ));
        }
        let expected_length = (line_stride as u64)
            .checked_mul(header.height as u64)
            .and_then(|pixels| pixels.checked_add(LCP_HEADER_LENGTH as u64))
            .ok_or_else(|| LcpError::new(LcpErrorCode::Format, "Pixel data size overflow."))?;
        if file_length < expected_length {
            return Err(LcpError::new(
                LcpErrorCode::Format,
                format!(
                    "File holds {file_length} bytes, {expected_length} needed for {}x{}x{}.",
                    header.width,
                    header.height,
                    header.band_count()
                ),
            ));
        }

        let band_count = header.band_count();
        let bands = header
            .bands
            .iter()
            .enumerate()
            .map(|(index, info)| BandDescriptor::new(index + 1, info, band_count, line_stride))
            .collect();

        let metadata = vec![
            ("LATITUDE".to_string(), header.latitude.to_string()),
            ("LINEAR_UNIT".to_string(), header.linear_unit.name().to_string()),
            ("DESCRIPTION".to_string(), header.description.clone()),
        ];

        let (spatial_ref, prj_path) = match load_sidecar(path) {
            Some((srs, prj_path)) => (Some(srs), Some(prj_path)),
            None => (None, None),
        };

        info!(
            "Opened {} ({}x{}, {} bands).",
            path.display(),
            header.width,
            header.height,
            band_count
        );
        debug!("{header:?}");

        Ok(Self {
            path: path.to_path_buf(),
            file,
            header,
            bands,
            metadata,
            spatial_ref,
            prj_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &LcpHeader {
        &self.header
    }

    pub fn bands(&self) -> &[BandDescriptor] {
        &self.bands
    }

    pub fn band(&self, band: usize) -> Option<&BandDescriptor> {
        band.checked_sub(1).and_then(|index| self.bands.get(index))
    }

    pub fn metadata(&self) -> &[(String, String)] {
        &self.metadata
    }

    pub fn metadata_item(&self, key: &str) -> Option<&str> {
        find_item(&self.metadata, key)
    }

    pub fn prj_path(&self) -> Option<&Path> {
        self.prj_path.as_deref()
    }

    fn descriptor(&self, band: usize) -> Result<&BandDescriptor> {
        self.band(band).ok_or_else(|| {
            LcpError::new(
                LcpErrorCode::Format,
                format!("Band {band} is out of range 1..={}.", self.bands.len()),
            )
        })
    }
}

impl RasterSource for LcpDataset {
    fn width(&self) -> usize {
        self.header.width as usize
    }

    fn height(&self) -> usize {
        self.header.height as usize
    }

    fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn pixel_type(&self, _band: usize) -> PixelType {
        PixelType::Int16
    }

    fn geo_transform(&self) -> Option<GeoTransform> {
        Some(self.header.geo_transform())
    }

    fn spatial_ref(&self) -> Option<&SpatialRef> {
        self.spatial_ref.as_ref()
    }

    fn file_list(&self) -> Vec<PathBuf> {
        let mut files = vec![self.path.clone()];
        files.extend(self.prj_path.clone());
        files
    }

    fn read_row(&self, band: usize, y: usize, row: &mut [i16]) -> Result<()> {
        let descriptor = self.descriptor(band)?;
        if y >= self.height() {
            return Err(LcpError::new(
                LcpErrorCode::Io,
                format!("Row {y} is out of range 0..{}.", self.height()),
            ));
        }

        let mut line = vec![0_u8; descriptor.line_stride];
        let offset = LCP_HEADER_LENGTH as u64 + (y * descriptor.line_stride) as u64;
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))
            .and_then(|_| file.read_exact(&mut line))
            .map_err(|e| LcpError::io(format!("Could not read row {y} of band {band}."), e))?;

        let start = (descriptor.data_offset - LCP_HEADER_LENGTH as u64) as usize;
        for (value, record) in row
            .iter_mut()
            .zip(line[start..].chunks(descriptor.pixel_stride))
        {
            *value = i16::from_le_bytes([record[0], record[1]]);
        }
        Ok(())
    }
}

fn find_item<'a>(items: &'a [(String, String)], key: &str) -> Option<&'a str> {
    items
        .iter()
        .find(|(existing, _)| existing == key)
        .map(|(_, value)| value.as_str())
}

fn load_sidecar(path: &Path) -> Option<(SpatialRef, PathBuf)> {
    let prj_path = ["prj", "PRJ"]
        .into_iter()
        .map(|extension| path.with_extension(extension))
        .find(|candidate| candidate.is_file())?;
    match fs::read_to_string(&prj_path) {
        Ok(text) if !text.trim().is_empty() => {
            debug!("Loaded SRS from {}.", prj_path.display());
            Some((SpatialRef::from_wkt(text.trim()), prj_path))
        }
        Ok(_) => {
            debug!("Ignoring empty {}.", prj_path.display());
            None
        }
        Err(error) => {
            debug!("Could not read {}: {error}", prj_path.display());
            None
        }
    }
}
