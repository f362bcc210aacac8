//! Per-role unit code tables.
//!
//! Each role maps creation option strings to the 16-bit code stored in the
//! header. Matching is case-insensitive and a few singular aliases are
//! accepted; [`option_name`] always returns the canonical spelling.

use crate::options::CreationOptions;
use crate::{BandRole, LcpError, LcpErrorCode, Result};

struct UnitEntry {
    code: u16,
    option: &'static str,
    aliases: &'static [&'static str],
    display: Option<&'static str>,
}

const fn entry(
    code: u16,
    option: &'static str,
    aliases: &'static [&'static str],
    display: Option<&'static str>,
) -> UnitEntry {
    UnitEntry {
        code,
        option,
        aliases,
        display,
    }
}

struct UnitTable {
    key: &'static str,
    default: &'static str,
    entries: &'static [UnitEntry],
}

const ELEVATION: UnitTable = UnitTable {
    key: "ELEVATION_UNIT",
    default: "METERS",
    entries: &[
        entry(0, "METERS", &["METER"], Some("Meters")),
        entry(1, "FEET", &["FOOT"], Some("Feet")),
    ],
};

const SLOPE: UnitTable = UnitTable {
    key: "SLOPE_UNIT",
    default: "DEGREES",
    entries: &[
        entry(0, "DEGREES", &[], Some("Degrees")),
        entry(1, "PERCENT", &[], Some("Percent")),
    ],
};

const ASPECT: UnitTable = UnitTable {
    key: "ASPECT_UNIT",
    default: "AZIMUTH_DEGREES",
    entries: &[
        entry(0, "GRASS_CATEGORIES", &[], Some("Grass categories")),
        entry(1, "GRASS_DEGREES", &[], Some("Grass degrees")),
        entry(2, "AZIMUTH_DEGREES", &[], Some("Azimuth degrees")),
    ],
};

const FUEL_MODEL: UnitTable = UnitTable {
    key: "FUEL_MODEL_OPTION",
    default: "NO_CUSTOM_AND_NO_FILE",
    entries: &[
        entry(
            0,
            "NO_CUSTOM_AND_NO_FILE",
            &[],
            Some("no custom models AND no conversion file needed"),
        ),
        entry(
            1,
            "CUSTOM_AND_NO_FILE",
            &[],
            Some("custom models BUT no conversion file needed"),
        ),
        entry(
            2,
            "NO_CUSTOM_AND_FILE",
            &[],
            Some("no custom models BUT conversion file needed"),
        ),
        entry(
            3,
            "CUSTOM_AND_FILE",
            &[],
            Some("custom models AND conversion file needed"),
        ),
    ],
};

const CANOPY_COVER: UnitTable = UnitTable {
    key: "CANOPY_COV_UNIT",
    default: "PERCENT",
    entries: &[
        entry(0, "CATEGORIES", &[], Some("Categories (0-4)")),
        entry(1, "PERCENT", &[], Some("Percent")),
    ],
};

const CANOPY_HEIGHT_ENTRIES: &[UnitEntry] = &[
    entry(1, "METERS", &["METER"], Some("Meters")),
    entry(2, "FEET", &["FOOT"], Some("Feet")),
    entry(3, "METERS_X_10", &["METER_X_10"], Some("Meters x 10")),
    entry(4, "FEET_X_10", &["FOOT_X_10"], Some("Feet x 10")),
];

const CANOPY_HEIGHT: UnitTable = UnitTable {
    key: "CANOPY_HT_UNIT",
    default: "METERS_X_10",
    entries: CANOPY_HEIGHT_ENTRIES,
};

const CANOPY_BASE_HEIGHT: UnitTable = UnitTable {
    key: "CBH_UNIT",
    default: "METERS_X_10",
    entries: CANOPY_HEIGHT_ENTRIES,
};

const CANOPY_BULK_DENSITY: UnitTable = UnitTable {
    key: "CBD_UNIT",
    default: "KG_PER_CUBIC_METER_X_100",
    entries: &[
        entry(1, "KG_PER_CUBIC_METER", &[], Some("kg/m^3")),
        entry(2, "POUND_PER_CUBIC_FOOT", &[], Some("lb/ft^3")),
        entry(3, "KG_PER_CUBIC_METER_X_100", &[], Some("kg/m^3 x 100")),
        entry(4, "POUND_PER_CUBIC_FOOT_X_1000", &[], Some("lb/ft^3 x 1000")),
    ],
};

const DUFF: UnitTable = UnitTable {
    key: "DUFF_UNIT",
    default: "MG_PER_HECTARE_X_10",
    entries: &[
        entry(1, "MG_PER_HECTARE_X_10", &[], Some("Mg/ha")),
        entry(2, "TONS_PER_ACRE_X_10", &[], Some("t/ac")),
    ],
};

const COARSE_WOODY_DEBRIS: UnitTable = UnitTable {
    key: "CWD_OPTION",
    default: "PRESENT",
    entries: &[entry(1, "PRESENT", &[], None)],
};

fn table(role: BandRole) -> &'static UnitTable {
    match role {
        BandRole::Elevation => &ELEVATION,
        BandRole::Slope => &SLOPE,
        BandRole::Aspect => &ASPECT,
        BandRole::FuelModel => &FUEL_MODEL,
        BandRole::CanopyCover => &CANOPY_COVER,
        BandRole::CanopyHeight => &CANOPY_HEIGHT,
        BandRole::CanopyBaseHeight => &CANOPY_BASE_HEIGHT,
        BandRole::CanopyBulkDensity => &CANOPY_BULK_DENSITY,
        BandRole::Duff => &DUFF,
        BandRole::CoarseWoodyDebris => &COARSE_WOODY_DEBRIS,
    }
}

pub fn option_key(role: BandRole) -> &'static str {
    table(role).key
}

pub fn name_key(role: BandRole) -> Option<String> {
    match role {
        BandRole::FuelModel => Some("FUEL_MODEL_OPTION_DESC".to_string()),
        BandRole::CoarseWoodyDebris => None,
        _ => Some(format!("{}_UNIT_NAME", role.metadata_prefix())),
    }
}

pub fn resolve(role: BandRole, value: &str) -> Result<u16> {
    let table = table(role);
    let value = value.trim();
    table
        .entries
        .iter()
        .find(|entry| {
            entry.option.eq_ignore_ascii_case(value)
                || entry
                    .aliases
                    .iter()
                    .any(|alias| alias.eq_ignore_ascii_case(value))
        })
        .map(|entry| entry.code)
        .ok_or_else(|| {
            LcpError::new(
                LcpErrorCode::InvalidOption,
                format!("Invalid value ({value}) for {}.", table.key),
            )
        })
}

pub fn option_name(role: BandRole, code: u16) -> Option<&'static str> {
    find_entry(role, code).map(|entry| entry.option)
}

pub fn display_name(role: BandRole, code: u16) -> Option<&'static str> {
    find_entry(role, code).and_then(|entry| entry.display)
}

pub fn default_option(role: BandRole) -> &'static str {
    table(role).default
}

pub fn default_code(role: BandRole) -> u16 {
    let default = default_option(role);
    table(role)
        .entries
        .iter()
        .find(|entry| entry.option == default)
        .map_or(0, |entry| entry.code)
}

/// Code from the role's creation option, or the role default when unset.
pub fn resolve_option(role: BandRole, options: &CreationOptions) -> Result<u16> {
    match options.get(option_key(role)) {
        Some(value) => resolve(role, value),
        None => Ok(default_code(role)),
    }
}

/// Code written into the unit slot of a role the schema does not carry.
pub(crate) fn placeholder_code(role: BandRole) -> u16 {
    match role {
        BandRole::CoarseWoodyDebris => 0,
        _ => default_code(role),
    }
}

fn find_entry(role: BandRole, code: u16) -> Option<&'static UnitEntry> {
    table(role).entries.iter().find(|entry| entry.code == code)
}
