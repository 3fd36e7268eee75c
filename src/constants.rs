//! Admin pcodes and season constants for the Niger flood AA framework.

/// Container blob names are namespaced under this prefix.
pub const PROJECT_PREFIX: &str = "pa-aa-ner-flooding";

// admin1 - région
pub const NIAMEY: &str = "NE008";
pub const TILLABERI: &str = "NE006";
pub const DOSSO: &str = "NE003";

/// Area-of-interest regions along the Niger river.
pub const ADM1_AOI_PCODES: [&str; 3] = [DOSSO, TILLABERI, NIAMEY];

// admin3 - commune, selected for the framework
pub const GAYA: &str = "NE003006003";
pub const TOUNOUGA: &str = "NE003006005";
pub const TANDA: &str = "NE003006004";
pub const KARMA: &str = "NE006008004";
pub const NDOUNGA: &str = "NE006008009";
pub const LIBORE: &str = "NE006008008";

pub const ADM3_AOI_PCODES: [&str; 6] = [GAYA, TOUNOUGA, TANDA, KARMA, NDOUNGA, LIBORE];

/// HydroRIVERS id of the Niger main stem.
pub const NIGER_MAINRIVER_ID: i64 = 10877687;

/// Start of the flood season is June 1 according to ABN.
pub const FLOODSEASON_START_MONTH: u32 = 6;
pub const FLOODSEASON_START_DAY: u32 = 1;

/// Day-of-season cutoff for peak/trigger searches; puts end of season at Nov 1.
pub const FLOODSEASON_ENDDAY: i32 = 153;
