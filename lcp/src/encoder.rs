use crate::common::{FieldValue, FieldWrite};
use crate::consts::{
    CLASS_SLOTS, DESCRIPTION_LENGTH, FILE_NAME_CHECKPOINTS, FILE_NAME_LENGTH, LCP_HEADER_LENGTH,
    OFFSET_CELL_X, OFFSET_CELL_Y, OFFSET_CROWN_FLAG, OFFSET_DESCRIPTION, OFFSET_EAST,
    OFFSET_GRID_EAST, OFFSET_GRID_NORTH, OFFSET_GRID_SOUTH, OFFSET_GRID_WEST, OFFSET_GROUND_FLAG,
    OFFSET_HEIGHT, OFFSET_LATITUDE, OFFSET_LINEAR_UNIT, OFFSET_NORTH, OFFSET_SOUTH, OFFSET_WEST,
    OFFSET_WIDTH, ROLE_LAYOUTS, STATS_CHECKPOINTS,
};
use crate::units::placeholder_code;
use crate::{BandInfo, BandRole, LcpError, LcpErrorCode, LcpHeader, Result};

struct Regions {
    preamble: Vec<FieldWrite>,
    stats: Vec<FieldWrite>,
    grid: Vec<FieldWrite>,
    units: Vec<FieldWrite>,
    file_names: Vec<FieldWrite>,
    description: Vec<FieldWrite>,
}

impl Regions {
    fn into_writes(self) -> Vec<FieldWrite> {
        [
            self.preamble,
            self.stats,
            self.grid,
            self.units,
            self.file_names,
            self.description,
        ]
        .concat()
    }
}

/// The `(offset, value)` writes that make up `header`. Roles missing from
/// the schema produce no stats or file name writes, leaving their slots as
/// gaps.
pub fn header_writes(header: &LcpHeader) -> Vec<FieldWrite> {
    regions(header).into_writes()
}

pub fn encode_header(header: &LcpHeader) -> Result<Vec<u8>> {
    validate_header(header)?;

    let regions = regions(header);
    assert_checkpoint("stats", &regions.stats, &STATS_CHECKPOINTS);
    assert_checkpoint("file name", &regions.file_names, &FILE_NAME_CHECKPOINTS);

    let mut bytes = vec![0_u8; LCP_HEADER_LENGTH];
    for write in regions.into_writes() {
        write.apply(&mut bytes);
    }
    Ok(bytes)
}

pub fn encode_row(band_rows: &[Vec<i16>], out: &mut Vec<u8>) {
    out.clear();
    let width = band_rows.first().map_or(0, Vec::len);
    out.reserve(width * band_rows.len() * 2);
    for x in 0..width {
        for row in band_rows {
            out.extend_from_slice(&row[x].to_le_bytes());
        }
    }
}

fn validate_header(header: &LcpHeader) -> Result<()> {
    let expected_roles = header.schema.roles();
    let roles: Vec<BandRole> = header.bands.iter().map(|band| band.role).collect();
    if roles != expected_roles {
        return Err(LcpError::new(
            LcpErrorCode::Format,
            format!("Band roles {roles:?} do not match schema roles {expected_roles:?}."),
        ));
    }

    if !(-90..=90).contains(&header.latitude) {
        return Err(LcpError::new(
            LcpErrorCode::Format,
            format!("Latitude {} is outside [-90, 90].", header.latitude),
        ));
    }

    if header.width <= 0 || header.height <= 0 {
        return Err(LcpError::new(
            LcpErrorCode::Format,
            format!(
                "Raster dimensions must be > 0, got {}x{}.",
                header.width, header.height
            ),
        ));
    }

    for band in &header.bands {
        validate_classes(band)?;
    }

    Ok(())
}

fn validate_classes(band: &BandInfo) -> Result<()> {
    let len = band.class_values.len();
    if len > CLASS_SLOTS {
        return Err(LcpError::new(
            LcpErrorCode::Format,
            format!("{} has {len} class values, at most {CLASS_SLOTS} fit.", band.role),
        ));
    }

    let consistent = match band.num_classes {
        -1 => len == 0,
        count @ 0..=99 => len == count as usize + 1,
        _ => false,
    };
    if !consistent {
        return Err(LcpError::new(
            LcpErrorCode::Format,
            format!(
                "{} has num_classes {} but {len} class values.",
                band.role, band.num_classes
            ),
        ));
    }
    Ok(())
}

fn regions(header: &LcpHeader) -> Regions {
    let extent = header.extent;

    let preamble = vec![
        FieldWrite::new(OFFSET_CROWN_FLAG, FieldValue::I32(header.schema.crown_flag())),
        FieldWrite::new(OFFSET_GROUND_FLAG, FieldValue::I32(header.schema.ground_flag())),
        FieldWrite::new(OFFSET_LATITUDE, FieldValue::I32(header.latitude)),
        FieldWrite::new(OFFSET_EAST, FieldValue::F64(extent.east)),
        FieldWrite::new(OFFSET_WEST, FieldValue::F64(extent.west)),
        FieldWrite::new(OFFSET_NORTH, FieldValue::F64(extent.north)),
        FieldWrite::new(OFFSET_SOUTH, FieldValue::F64(extent.south)),
    ];

    let mut stats = Vec::with_capacity(header.bands.len() * 4);
    for band in &header.bands {
        let layout = ROLE_LAYOUTS[band.role.slot()];
        let mut classes = band.class_values.clone();
        classes.resize(CLASS_SLOTS, 0);
        stats.push(FieldWrite::new(layout.min, FieldValue::I32(band.min)));
        stats.push(FieldWrite::new(layout.max, FieldValue::I32(band.max)));
        stats.push(FieldWrite::new(
            layout.num_classes,
            FieldValue::I32(band.num_classes),
        ));
        stats.push(FieldWrite::new(layout.classes, FieldValue::I32s(classes)));
    }

    let grid = vec![
        FieldWrite::new(OFFSET_WIDTH, FieldValue::I32(header.width)),
        FieldWrite::new(OFFSET_HEIGHT, FieldValue::I32(header.height)),
        FieldWrite::new(OFFSET_GRID_EAST, FieldValue::F64(extent.east)),
        FieldWrite::new(OFFSET_GRID_WEST, FieldValue::F64(extent.west)),
        FieldWrite::new(OFFSET_GRID_NORTH, FieldValue::F64(extent.north)),
        FieldWrite::new(OFFSET_GRID_SOUTH, FieldValue::F64(extent.south)),
        FieldWrite::new(OFFSET_LINEAR_UNIT, FieldValue::I32(header.linear_unit.code())),
        FieldWrite::new(OFFSET_CELL_X, FieldValue::F64(header.cell_x)),
        FieldWrite::new(OFFSET_CELL_Y, FieldValue::F64(header.cell_y)),
    ];

    let units = BandRole::ALL
        .into_iter()
        .map(|role| {
            let code = header
                .band(role)
                .map_or_else(|| placeholder_code(role), |band| band.unit_code);
            FieldWrite::new(ROLE_LAYOUTS[role.slot()].unit, FieldValue::U16(code))
        })
        .collect();

    let file_names = header
        .bands
        .iter()
        .map(|band| {
            FieldWrite::new(
                ROLE_LAYOUTS[band.role.slot()].file_name,
                FieldValue::Text {
                    value: band.source_file_name.clone(),
                    width: FILE_NAME_LENGTH,
                },
            )
        })
        .collect();

    let description = vec![FieldWrite::new(
        OFFSET_DESCRIPTION,
        FieldValue::Text {
            value: header.description.clone(),
            width: DESCRIPTION_LENGTH,
        },
    )];

    Regions {
        preamble,
        stats,
        grid,
        units,
        file_names,
        description,
    }
}

fn assert_checkpoint(region: &str, writes: &[FieldWrite], checkpoints: &[usize]) {
    let cursor = writes.last().map_or(0, FieldWrite::end);
    assert!(
        checkpoints.contains(&cursor),
        "{region} region ended at offset {cursor}, expected one of {checkpoints:?}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode_header;
    use crate::{Extent, LinearUnit, Schema};

    fn header(band_count: usize) -> LcpHeader {
        let schema = Schema::from_band_count(band_count).expect("supported");
        let bands = schema
            .roles()
            .into_iter()
            .enumerate()
            .map(|(index, role)| {
                let mut band = BandInfo::new(role, crate::units::default_code(role));
                band.min = index as i32;
                band.max = 100 + index as i32;
                band.num_classes = 2;
                band.class_values = vec![0, index as i32, 100 + index as i32];
                band.source_file_name = format!("{}.asc", role.metadata_prefix());
                band
            })
            .collect();
        LcpHeader {
            schema,
            latitude: 46,
            extent: Extent {
                west: 500_000.0,
                east: 500_300.0,
                north: 5_100_000.0,
                south: 5_099_700.0,
            },
            cell_x: 30.0,
            cell_y: 30.0,
            width: 10,
            height: 10,
            linear_unit: LinearUnit::Meters,
            bands,
            description: "test landscape".to_string(),
        }
    }

    #[test]
    fn roundtrip_every_schema() {
        for band_count in [5, 7, 8, 10] {
            let original = header(band_count);
            let bytes = encode_header(&original).expect("encode header");
            assert_eq!(bytes.len(), LCP_HEADER_LENGTH);
            let decoded = decode_header(&bytes).expect("decode header");
            assert_eq!(decoded, original);
        }
    }

    #[test]
    fn absent_roles_leave_gaps() {
        let bytes = encode_header(&header(7)).expect("encode header");
        // Crown fuel stats and file names are untouched.
        assert!(bytes[2104..3340].iter().all(|byte| *byte == 0));
        assert!(bytes[5524..6292].iter().all(|byte| *byte == 0));
        // Duff is the sixth band but lands in its own slot.
        assert_eq!(&bytes[3340..3344], &5_i32.to_le_bytes());
        assert_eq!(&bytes[6292..6300], b"DUFF.asc");
        // Coarse woody debris keeps its own file name slot.
        assert_eq!(&bytes[6548..6555], b"CWD.asc");
    }

    #[test]
    fn unit_slots_are_always_written() {
        let bytes = encode_header(&header(5)).expect("encode header");
        let unit = |slot: usize| {
            let offset = 4224 + slot * 2;
            u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
        };
        assert_eq!(unit(2), 2);
        assert_eq!(unit(5), 3);
        assert_eq!(unit(7), 3);
        assert_eq!(unit(8), 1);
        assert_eq!(unit(9), 0);
    }

    #[test]
    fn bounds_are_written_twice() {
        let bytes = encode_header(&header(5)).expect("encode header");
        assert_eq!(&bytes[12..44], &bytes[4172..4204]);
        assert_eq!(&bytes[20..28], &500_000.0_f64.to_le_bytes());
    }

    #[test]
    fn writes_are_a_pure_function_of_the_header() {
        let writes = header_writes(&header(8));
        assert_eq!(writes, header_writes(&header(8)));
        assert!(writes.iter().all(|write| write.end() <= LCP_HEADER_LENGTH));
        assert!(!writes.iter().any(|write| (3340..4164).contains(&write.offset)));
    }

    #[test]
    fn rejects_bands_that_do_not_match_schema() {
        let mut malformed = header(8);
        malformed.bands.pop();
        let error = encode_header(&malformed).expect_err("should reject");
        assert_eq!(error.code, LcpErrorCode::Format);
    }

    #[test]
    fn rejects_oversized_class_list() {
        let mut malformed = header(5);
        malformed.bands[0].class_values = (0..=100).collect();
        let error = encode_header(&malformed).expect_err("should reject");
        assert_eq!(error.code, LcpErrorCode::Format);
    }

    #[test]
    fn rejects_class_count_that_disagrees_with_values() {
        let cases = [
            (3, vec![0, 7]),
            (-1, vec![0, 5, 6]),
            (0, vec![]),
            (-2, vec![]),
            (100, (0..=100).collect()),
        ];
        for (num_classes, class_values) in cases {
            let mut malformed = header(5);
            malformed.bands[3].num_classes = num_classes;
            malformed.bands[3].class_values = class_values;
            let error = encode_header(&malformed).expect_err("should reject");
            assert_eq!(error.code, LcpErrorCode::Format);
        }

        let mut consistent = header(5);
        consistent.bands[3].num_classes = -1;
        consistent.bands[3].class_values = Vec::new();
        consistent.bands[4].num_classes = 0;
        consistent.bands[4].class_values = vec![0];
        let bytes = encode_header(&consistent).expect("encode header");
        assert_eq!(decode_header(&bytes).expect("decode header"), consistent);
    }

    #[test]
    fn long_text_is_cut_on_a_character_boundary() {
        let mut long = header(5);
        long.description = format!("{}é", "d".repeat(DESCRIPTION_LENGTH - 2));
        long.bands[0].source_file_name = "ü".repeat(FILE_NAME_LENGTH);
        let decoded = decode_header(&encode_header(&long).expect("encode")).expect("decode");
        assert_eq!(decoded.description, "d".repeat(DESCRIPTION_LENGTH - 2));
        assert_eq!(decoded.bands[0].source_file_name, "ü".repeat(127));
    }

    #[test]
    fn rows_are_interleaved_little_endian() {
        let mut out = Vec::new();
        encode_row(&[vec![1, -2], vec![0x0304, 5]], &mut out);
        assert_eq!(out, vec![1, 0, 4, 3, 0xfe, 0xff, 5, 0]);
    }
}
