use std::path::Path;

use log::warn;

use crate::common::{read_f64_le, read_fixed_str, read_i32_le, read_u16_le};
use crate::consts::{
    DESCRIPTION_LENGTH, FILE_NAME_LENGTH, FLAG_ABSENT, FLAG_PRESENT, IDENTIFY_MIN_LENGTH,
    LCP_HEADER_LENGTH, LCP_MAX_CLASSES, OFFSET_CELL_X, OFFSET_CELL_Y, OFFSET_CROWN_FLAG,
    OFFSET_DESCRIPTION, OFFSET_GRID_EAST, OFFSET_GRID_NORTH, OFFSET_GRID_SOUTH, OFFSET_GRID_WEST,
    OFFSET_GROUND_FLAG, OFFSET_HEIGHT, OFFSET_LATITUDE, OFFSET_LINEAR_UNIT, OFFSET_WIDTH,
    ROLE_LAYOUTS,
};
use crate::{
    BandInfo, BandRole, Extent, LcpError, LcpErrorCode, LcpHeader, LinearUnit, Result, Schema,
};

/// Cheap check of the first three header fields. Needs only 50 bytes.
pub fn identify(bytes: &[u8]) -> bool {
    if bytes.len() < IDENTIFY_MIN_LENGTH {
        return false;
    }
    let is_flag = |offset| {
        matches!(
            read_i32_le(bytes, offset),
            Ok(FLAG_ABSENT) | Ok(FLAG_PRESENT)
        )
    };
    let latitude_ok = matches!(read_i32_le(bytes, OFFSET_LATITUDE), Ok(-90..=90));
    is_flag(OFFSET_CROWN_FLAG) && is_flag(OFFSET_GROUND_FLAG) && latitude_ok
}

pub fn has_lcp_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("lcp"))
}

pub fn decode_header(bytes: &[u8]) -> Result<LcpHeader> {
    if bytes.len() < LCP_HEADER_LENGTH {
        return Err(LcpError::new(
            LcpErrorCode::Format,
            format!(
                "File shorter than fixed header. expected={LCP_HEADER_LENGTH} got={}",
                bytes.len()
            ),
        ));
    }

    let schema = Schema::from_flags(
        read_i32_le(bytes, OFFSET_CROWN_FLAG)?,
        read_i32_le(bytes, OFFSET_GROUND_FLAG)?,
    )?;

    let latitude = read_i32_le(bytes, OFFSET_LATITUDE)?;
    if !(-90..=90).contains(&latitude) {
        return Err(LcpError::new(
            LcpErrorCode::Format,
            format!("Latitude {latitude} is outside [-90, 90]."),
        ));
    }

    let linear_unit_code = read_i32_le(bytes, OFFSET_LINEAR_UNIT)?;
    let linear_unit = LinearUnit::from_code(linear_unit_code).unwrap_or_else(|| {
        warn!("Unknown linear unit code {linear_unit_code}, treating as meters.");
        LinearUnit::Meters
    });

    let bands = schema
        .roles()
        .into_iter()
        .map(|role| decode_band(bytes, role))
        .collect::<Result<Vec<_>>>()?;

    Ok(LcpHeader {
        schema,
        latitude,
        extent: Extent {
            west: read_f64_le(bytes, OFFSET_GRID_WEST)?,
            east: read_f64_le(bytes, OFFSET_GRID_EAST)?,
            north: read_f64_le(bytes, OFFSET_GRID_NORTH)?,
            south: read_f64_le(bytes, OFFSET_GRID_SOUTH)?,
        },
        cell_x: read_f64_le(bytes, OFFSET_CELL_X)?,
        cell_y: read_f64_le(bytes, OFFSET_CELL_Y)?,
        width: read_i32_le(bytes, OFFSET_WIDTH)?,
        height: read_i32_le(bytes, OFFSET_HEIGHT)?,
        linear_unit,
        bands,
        description: read_fixed_str(bytes, OFFSET_DESCRIPTION, DESCRIPTION_LENGTH)?,
    })
}

fn decode_band(bytes: &[u8], role: BandRole) -> Result<BandInfo> {
    let layout = ROLE_LAYOUTS[role.slot()];
    let num_classes = read_i32_le(bytes, layout.num_classes)?;

    let class_values = match usize::try_from(num_classes) {
        Ok(count) if count <= LCP_MAX_CLASSES => (0..=count)
            .map(|index| read_i32_le(bytes, layout.classes + index * 4))
            .collect::<Result<Vec<_>>>()?,
        _ => Vec::new(),
    };

    Ok(BandInfo {
        role,
        unit_code: read_u16_le(bytes, layout.unit)?,
        min: read_i32_le(bytes, layout.min)?,
        max: read_i32_le(bytes, layout.max)?,
        num_classes,
        class_values,
        source_file_name: read_fixed_str(bytes, layout.file_name, FILE_NAME_LENGTH)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preamble(crown: i32, ground: i32, latitude: i32) -> Vec<u8> {
        let mut bytes = vec![0_u8; LCP_HEADER_LENGTH];
        bytes[0..4].copy_from_slice(&crown.to_le_bytes());
        bytes[4..8].copy_from_slice(&ground.to_le_bytes());
        bytes[8..12].copy_from_slice(&latitude.to_le_bytes());
        bytes
    }

    #[test]
    fn identify_accepts_valid_preamble() {
        assert!(identify(&preamble(21, 20, 45)[..50]));
        assert!(identify(&preamble(20, 21, -90)));
    }

    #[test]
    fn identify_rejects_short_or_invalid() {
        assert!(!identify(&preamble(21, 20, 45)[..49]));
        assert!(!identify(&preamble(19, 20, 45)));
        assert!(!identify(&preamble(21, 0, 45)));
        assert!(!identify(&preamble(21, 21, 91)));
        assert!(!identify(&preamble(21, 21, -91)));
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(has_lcp_extension(Path::new("/tmp/landscape.lcp")));
        assert!(has_lcp_extension(Path::new("LANDSCAPE.LCP")));
        assert!(!has_lcp_extension(Path::new("landscape.tif")));
        assert!(!has_lcp_extension(Path::new("lcp")));
    }

    #[test]
    fn decode_rejects_truncated_header() {
        let bytes = preamble(20, 20, 10);
        let error = decode_header(&bytes[..LCP_HEADER_LENGTH - 1]).expect_err("should fail");
        assert_eq!(error.code, LcpErrorCode::Format);
    }

    #[test]
    fn decode_rejects_bad_flags_and_latitude() {
        let error = decode_header(&preamble(7, 20, 10)).expect_err("should fail");
        assert_eq!(error.code, LcpErrorCode::Format);
        let error = decode_header(&preamble(20, 20, 120)).expect_err("should fail");
        assert_eq!(error.code, LcpErrorCode::Format);
    }

    #[test]
    fn decode_reads_roles_from_absolute_slots() {
        let mut bytes = preamble(20, 21, 33);
        // Duff sits in its own slot even though it is the sixth band.
        bytes[3340..3344].copy_from_slice(&5_i32.to_le_bytes());
        bytes[3344..3348].copy_from_slice(&70_i32.to_le_bytes());
        bytes[3348..3352].copy_from_slice(&(-1_i32).to_le_bytes());
        bytes[4240..4242].copy_from_slice(&2_u16.to_le_bytes());
        bytes[6292..6300].copy_from_slice(b"duff.asc");

        let header = decode_header(&bytes).expect("decode");
        assert_eq!(header.bands.len(), 7);
        let duff = &header.bands[5];
        assert_eq!(duff.role, BandRole::Duff);
        assert_eq!((duff.min, duff.max, duff.num_classes), (5, 70, -1));
        assert_eq!(duff.unit_code, 2);
        assert!(duff.class_values.is_empty());
        assert_eq!(duff.source_file_name, "duff.asc");
    }

    #[test]
    fn decode_reads_class_list_with_leading_zero() {
        let mut bytes = preamble(20, 20, 0);
        bytes[1288..1292].copy_from_slice(&3_i32.to_le_bytes());
        for (index, value) in [0_i32, 1, 91, 98].iter().enumerate() {
            let offset = 1292 + index * 4;
            bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }
        let header = decode_header(&bytes).expect("decode");
        let fuel = header.band(BandRole::FuelModel).expect("fuel band");
        assert_eq!(fuel.class_values, vec![0, 1, 91, 98]);
    }
}
