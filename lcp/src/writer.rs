use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{debug, info, warn};

use crate::classify::{classify_band, BandClasses};
use crate::common::truncate_to_bytes;
use crate::consts::{DESCRIPTION_LENGTH, FILE_NAME_LENGTH};
use crate::encoder::{encode_header, encode_row};
use crate::latitude::{resolve_latitude, resolve_linear_unit};
use crate::options::{CreationOptions, LinearUnitOption};
use crate::raster::{PixelType, ProgressSink, RasterSource, DEFAULT_GEO_TRANSFORM};
use crate::reader::LcpDataset;
use crate::srs::{CoordinateTransform, Proj4Transform};
use crate::units;
use crate::{
    BandInfo, BandRole, Extent, LcpError, LcpErrorCode, LcpHeader, LinearUnit, Result, Schema,
};

const DEFAULT_DESCRIPTION: &str = "LCP file created by farsite-lcp.";

/// Creates `.lcp` files from any [`RasterSource`].
///
/// Options, latitude and units are validated before the output file is
/// created. Once pixel copying has started a failure or cancellation leaves
/// the partial file on disk.
#[derive(Debug, Clone)]
pub struct LcpWriter<T = Proj4Transform> {
    options: CreationOptions,
    strict: bool,
    transform: T,
}

impl LcpWriter<Proj4Transform> {
    pub fn new(options: CreationOptions) -> Self {
        Self {
            options,
            strict: false,
            transform: Proj4Transform,
        }
    }
}

impl<T: CoordinateTransform> LcpWriter<T> {
    /// In strict mode pixel type coercion and unit fallbacks are errors.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_transform<U: CoordinateTransform>(self, transform: U) -> LcpWriter<U> {
        LcpWriter {
            options: self.options,
            strict: self.strict,
            transform,
        }
    }

    pub fn create_copy<S: RasterSource + ?Sized>(
        &self,
        path: impl AsRef<Path>,
        source: &S,
        progress: &mut dyn ProgressSink,
    ) -> Result<LcpDataset> {
        let path = path.as_ref();
        let header = self.build_header(source)?;

        info!(
            "Creating {} ({}x{}, {} bands).",
            path.display(),
            header.width,
            header.height,
            header.band_count()
        );
        let bytes = encode_header(&header)?;
        let file = File::create(path)
            .map_err(|e| LcpError::io(format!("Could not create {}.", path.display()), e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&bytes)
            .map_err(|e| LcpError::io("Could not write header.", e))?;

        copy_pixels(&mut writer, source, &header, progress)?;
        writer
            .flush()
            .map_err(|e| LcpError::io(format!("Could not flush {}.", path.display()), e))?;
        drop(writer);

        if let Some(wkt) = source.spatial_ref().and_then(|srs| srs.wkt()) {
            let prj_path = path.with_extension("prj");
            match fs::write(&prj_path, wkt) {
                Ok(()) => debug!("Wrote {}.", prj_path.display()),
                Err(error) => warn!("Could not write {}: {error}", prj_path.display()),
            }
        }

        LcpDataset::open_unchecked(path)
    }

    fn build_header<S: RasterSource + ?Sized>(&self, source: &S) -> Result<LcpHeader> {
        let schema = self.validate(source)?;
        let (width, height) = dimensions(source)?;

        let unit_codes = schema
            .roles()
            .into_iter()
            .map(|role| match role {
                BandRole::CoarseWoodyDebris => Ok((role, units::default_code(role))),
                _ => units::resolve_option(role, &self.options).map(|code| (role, code)),
            })
            .collect::<Result<Vec<_>>>()?;

        let geo_transform = source.geo_transform().unwrap_or(DEFAULT_GEO_TRANSFORM);
        let explicit_latitude = self.explicit_latitude()?;
        let latitude = resolve_latitude(
            explicit_latitude,
            source.spatial_ref(),
            &geo_transform,
            (source.width(), source.height()),
            &self.transform,
        )?;
        let linear_unit = self.linear_unit(source)?;
        let description = self.description();

        let bands = self.band_infos(source, &unit_codes);

        Ok(LcpHeader {
            schema,
            latitude: latitude.round() as i32,
            extent: Extent {
                west: geo_transform[0],
                east: geo_transform[0] + geo_transform[1] * f64::from(width),
                north: geo_transform[3],
                south: geo_transform[3] + geo_transform[5] * f64::from(height),
            },
            cell_x: geo_transform[1],
            cell_y: geo_transform[5].abs(),
            width,
            height,
            linear_unit,
            bands,
            description,
        })
    }

    fn validate<S: RasterSource + ?Sized>(&self, source: &S) -> Result<Schema> {
        let schema = Schema::from_band_count(source.band_count())?;
        let pixel_type = source.pixel_type(1);
        if pixel_type != PixelType::Int16 {
            if self.strict {
                return Err(LcpError::new(
                    LcpErrorCode::UnsupportedSchema,
                    format!("LCP only supports 16-bit signed integer data, got {pixel_type:?}."),
                ));
            }
            warn!("Setting data type to 16-bit integer.");
        }
        Ok(schema)
    }

    fn explicit_latitude(&self) -> Result<Option<i32>> {
        self.options
            .get("LATITUDE")
            .map(|value| {
                value.trim().parse::<i32>().map_err(|_| {
                    LcpError::new(
                        LcpErrorCode::InvalidOption,
                        format!("Invalid value ({value}) for LATITUDE."),
                    )
                })
            })
            .transpose()
    }

    fn linear_unit<S: RasterSource + ?Sized>(&self, source: &S) -> Result<LinearUnit> {
        let option = LinearUnitOption::from_options(&self.options)?;
        resolve_linear_unit(option, source.spatial_ref(), self.strict)
    }

    fn description(&self) -> String {
        let description = self.options.get("DESCRIPTION").unwrap_or(DEFAULT_DESCRIPTION);
        let kept = truncate_to_bytes(description, DESCRIPTION_LENGTH - 1);
        if kept.len() < description.len() {
            warn!(
                "Description is {} bytes, truncating to {}.",
                description.len(),
                kept.len()
            );
        }
        kept.to_string()
    }

    fn band_infos<S: RasterSource + ?Sized>(
        &self,
        source: &S,
        unit_codes: &[(BandRole, u16)],
    ) -> Vec<BandInfo> {
        let classify = self.options.get_bool("CLASSIFY_DATA", true);
        let mut calculate_stats = self.options.get_bool("CALCULATE_STATS", true);
        if classify && !calculate_stats {
            warn!("Ignoring request to not calculate statistics, because CLASSIFY_DATA was set to ON.");
            calculate_stats = true;
        }

        let source_file_name = source
            .file_list()
            .first()
            .map(|file| {
                let name = file.display().to_string();
                truncate_to_bytes(&name, FILE_NAME_LENGTH - 1).to_string()
            })
            .unwrap_or_default();

        unit_codes
            .iter()
            .enumerate()
            .map(|(index, (role, unit_code))| {
                let band = index + 1;
                let mut info = BandInfo::new(*role, *unit_code);
                info.source_file_name = source_file_name.clone();
                if !calculate_stats {
                    return info;
                }

                match source.statistics(band) {
                    Ok((min, max)) => {
                        info.min = min as i32;
                        info.max = max as i32;
                    }
                    Err(error) => warn!("Could not compute statistics of band {band}: {error}"),
                }

                let classes = if classify {
                    classify_band(source, band).unwrap_or_else(|error| {
                        warn!("Could not classify band {band}: {error}");
                        BandClasses::not_enumerated()
                    })
                } else {
                    BandClasses::not_enumerated()
                };
                debug!("Band {band} ({role}) has {} classes.", classes.num_classes);
                info.num_classes = classes.num_classes;
                info.class_values = classes.values;
                info
            })
            .collect()
    }
}

/// [`LcpWriter::create_copy`] with lenient handling and the proj4rs
/// transform.
pub fn create_copy<S: RasterSource + ?Sized>(
    path: impl AsRef<Path>,
    source: &S,
    options: &CreationOptions,
    progress: &mut dyn ProgressSink,
) -> Result<LcpDataset> {
    LcpWriter::new(options.clone()).create_copy(path, source, progress)
}

fn dimensions<S: RasterSource + ?Sized>(source: &S) -> Result<(i32, i32)> {
    let (width, height) = (source.width(), source.height());
    match (i32::try_from(width), i32::try_from(height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => {
            let band_count = i32::try_from(source.band_count()).unwrap_or(i32::MAX);
            if w.checked_mul(band_count * 2).is_none() {
                return Err(LcpError::new(
                    LcpErrorCode::Format,
                    format!("Width {width} is too large for {band_count} bands."),
                ));
            }
            Ok((w, h))
        }
        _ => Err(LcpError::new(
            LcpErrorCode::Format,
            format!("Invalid raster dimensions {width}x{height}."),
        )),
    }
}

fn copy_pixels<S: RasterSource + ?Sized, W: Write>(
    writer: &mut W,
    source: &S,
    header: &LcpHeader,
    progress: &mut dyn ProgressSink,
) -> Result<()> {
    let (width, height) = (source.width(), source.height());
    let mut band_rows = vec![vec![0_i16; width]; header.band_count()];
    let mut out = Vec::with_capacity(width * header.band_count() * 2);

    if !progress.report(0.0) {
        return cancelled(writer);
    }
    for y in 0..height {
        for (index, row) in band_rows.iter_mut().enumerate() {
            let band = index + 1;
            source.read_row(band, y, row).map_err(|error| {
                LcpError::new(
                    LcpErrorCode::Io,
                    format!("Could not read row {y} of band {band}: {}", error.message),
                )
            })?;
        }
        encode_row(&band_rows, &mut out);
        writer
            .write_all(&out)
            .map_err(|e| LcpError::io(format!("Could not write row {y}."), e))?;

        if !progress.report((y + 1) as f64 / height as f64) {
            return cancelled(writer);
        }
    }
    Ok(())
}

fn cancelled<W: Write>(writer: &mut W) -> Result<()> {
    if let Err(error) = writer.flush() {
        warn!("Could not flush partial output: {error}");
    }
    warn!("Copy cancelled, partial output left on disk.");
    Err(LcpError::new(
        LcpErrorCode::Cancelled,
        "User terminated the copy.",
    ))
}
