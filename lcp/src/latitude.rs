use log::{debug, warn};

use crate::options::LinearUnitOption;
use crate::raster::GeoTransform;
use crate::srs::{CoordinateTransform, SpatialRef};
use crate::{LcpError, LcpErrorCode, LinearUnit, Result};

/// Reference latitude for the header.
///
/// An explicit value wins. Otherwise the raster centre is reprojected from
/// `srs` to NAD83 and its latitude is returned.
pub fn resolve_latitude(
    explicit: Option<i32>,
    srs: Option<&SpatialRef>,
    geo_transform: &GeoTransform,
    (width, height): (usize, usize),
    transform: &dyn CoordinateTransform,
) -> Result<f64> {
    if let Some(latitude) = explicit {
        if !(-90..=90).contains(&latitude) {
            return Err(LcpError::new(
                LcpErrorCode::InvalidOption,
                format!("Invalid value ({latitude}) for LATITUDE."),
            ));
        }
        return Ok(f64::from(latitude));
    }

    let srs = srs.ok_or_else(|| {
        LcpError::new(
            LcpErrorCode::GeoReference,
            "Could not calculate latitude from spatial reference and LATITUDE was not set.",
        )
    })?;

    let half_width = width as f64 / 2.0;
    let half_height = height as f64 / 2.0;
    let x = geo_transform[0] + geo_transform[1] * half_width + geo_transform[2] * half_height;
    let y = geo_transform[3] + geo_transform[4] * half_width + geo_transform[5] * half_height;

    let nad83 = SpatialRef::nad83()?;
    let (_, latitude) = transform.transform(srs, &nad83, x, y).map_err(|error| {
        LcpError::new(
            LcpErrorCode::GeoReference,
            format!(
                "Could not calculate latitude from spatial reference and LATITUDE was not set. {}",
                error.message
            ),
        )
    })?;

    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(LcpError::new(
            LcpErrorCode::GeoReference,
            format!("Reprojected latitude {latitude} is not a valid latitude."),
        ));
    }
    debug!("Centre ({x}, {y}) is at latitude {latitude}.");
    Ok(latitude)
}

pub fn resolve_linear_unit(
    option: LinearUnitOption,
    srs: Option<&SpatialRef>,
    strict: bool,
) -> Result<LinearUnit> {
    let srs = match option {
        LinearUnitOption::Fixed(unit) => return Ok(unit),
        LinearUnitOption::FromSrs => srs,
    };

    let Some(srs) = srs else {
        return fallback(
            strict,
            "Could not parse linear unit from spatial reference and LINEAR_UNIT was not set.",
        );
    };

    let Some(unit) = srs.linear_unit() else {
        return fallback(strict, "Could not parse linear unit.");
    };

    debug!("Setting linear unit to {}.", unit.name);
    let name = unit.name.to_ascii_lowercase();
    let linear_unit = if name == "meter" || name == "metre" {
        LinearUnit::Meters
    } else if name == "foot" || name == "feet" {
        LinearUnit::Feet
    } else if name.starts_with("kilomet") {
        LinearUnit::Kilometers
    } else {
        warn!("Unsupported linear unit '{}', using meters.", unit.name);
        LinearUnit::Meters
    };

    if unit.scale != 1.0 {
        let message = format!("Unit scale is {} (!=1.0). It is not supported.", unit.scale);
        if strict {
            return Err(LcpError::new(LcpErrorCode::GeoReference, message));
        }
        warn!("{message} Ignoring.");
    }

    Ok(linear_unit)
}

fn fallback(strict: bool, message: &str) -> Result<LinearUnit> {
    if strict {
        return Err(LcpError::new(LcpErrorCode::GeoReference, message));
    }
    warn!("{message} Using meters.");
    Ok(LinearUnit::Meters)
}
