pub const LCP_HEADER_LENGTH: usize = 7316;
pub const LCP_NO_DATA: i16 = -9999;
pub const LCP_MAX_CLASSES: usize = 99;

pub(crate) const IDENTIFY_MIN_LENGTH: usize = 50;

pub(crate) const FLAG_ABSENT: i32 = 20;
pub(crate) const FLAG_PRESENT: i32 = 21;

pub(crate) const CLASS_SLOTS: usize = LCP_MAX_CLASSES + 1;
pub(crate) const FILE_NAME_LENGTH: usize = 256;
pub(crate) const DESCRIPTION_LENGTH: usize = 512;

pub(crate) const OFFSET_CROWN_FLAG: usize = 0;
pub(crate) const OFFSET_GROUND_FLAG: usize = 4;
pub(crate) const OFFSET_LATITUDE: usize = 8;
pub(crate) const OFFSET_EAST: usize = 12;
pub(crate) const OFFSET_WEST: usize = 20;
pub(crate) const OFFSET_NORTH: usize = 28;
pub(crate) const OFFSET_SOUTH: usize = 36;
pub(crate) const OFFSET_WIDTH: usize = 4164;
pub(crate) const OFFSET_HEIGHT: usize = 4168;
pub(crate) const OFFSET_GRID_EAST: usize = 4172;
pub(crate) const OFFSET_GRID_WEST: usize = 4180;
pub(crate) const OFFSET_GRID_NORTH: usize = 4188;
pub(crate) const OFFSET_GRID_SOUTH: usize = 4196;
pub(crate) const OFFSET_LINEAR_UNIT: usize = 4204;
pub(crate) const OFFSET_CELL_X: usize = 4208;
pub(crate) const OFFSET_CELL_Y: usize = 4216;
pub(crate) const OFFSET_DESCRIPTION: usize = 6804;

/// Where the stats region may end: 5, 8, and 7/10 band schemas.
pub(crate) const STATS_CHECKPOINTS: [usize; 3] = [2104, 3340, 4164];
/// Where the file name region may end: 5, 8, and 7/10 band schemas.
pub(crate) const FILE_NAME_CHECKPOINTS: [usize; 3] = [5524, 6292, 6804];

/// Absolute offsets of every per-role field. Indexed by `BandRole::slot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RoleLayout {
    pub unit: usize,
    pub min: usize,
    pub max: usize,
    pub num_classes: usize,
    pub classes: usize,
    pub file_name: usize,
}

#[rustfmt::skip]
pub(crate) const ROLE_LAYOUTS: [RoleLayout; 10] = [
    // Elevation
    RoleLayout { unit: 4224, min: 44, max: 48, num_classes: 52, classes: 56, file_name: 4244 },
    // Slope
    RoleLayout { unit: 4226, min: 456, max: 460, num_classes: 464, classes: 468, file_name: 4500 },
    // Aspect
    RoleLayout { unit: 4228, min: 868, max: 872, num_classes: 876, classes: 880, file_name: 4756 },
    // Fuel models
    RoleLayout { unit: 4230, min: 1280, max: 1284, num_classes: 1288, classes: 1292, file_name: 5012 },
    // Canopy cover
    RoleLayout { unit: 4232, min: 1692, max: 1696, num_classes: 1700, classes: 1704, file_name: 5268 },
    // Canopy height
    RoleLayout { unit: 4234, min: 2104, max: 2108, num_classes: 2112, classes: 2116, file_name: 5524 },
    // Canopy base height
    RoleLayout { unit: 4236, min: 2516, max: 2520, num_classes: 2524, classes: 2528, file_name: 5780 },
    // Canopy bulk density
    RoleLayout { unit: 4238, min: 2928, max: 2932, num_classes: 2936, classes: 2940, file_name: 6036 },
    // Duff
    RoleLayout { unit: 4240, min: 3340, max: 3344, num_classes: 3348, classes: 3352, file_name: 6292 },
    // Coarse woody debris
    RoleLayout { unit: 4242, min: 3752, max: 3756, num_classes: 3760, classes: 3764, file_name: 6548 },
];

impl RoleLayout {
    pub(crate) fn stats_end(&self) -> usize {
        self.classes + CLASS_SLOTS * 4
    }

    pub(crate) fn file_name_end(&self) -> usize {
        self.file_name + FILE_NAME_LENGTH
    }
}
