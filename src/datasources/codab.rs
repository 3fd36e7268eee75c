//! CODAB administrative boundaries (COD-AB via fieldmaps.io).
//!
//! The source is a single zipped shapefile at admin level 3; coarser levels
//! are produced by dissolving on the corresponding pcode column.

use anyhow::{Context, Result, ensure};

use crate::admin::AdminLayer;
use crate::common::download::download_big_file;
use crate::common::fs::{extract_zip, find_file_with_extension};
use crate::config::Config;
use crate::constants::ADM1_AOI_PCODES;

pub const CODAB_URL: &str = "https://data.fieldmaps.io/cod/originals/ner.shp.zip";

/// Download the Niger COD-AB zipped shapefile into the raw data directory.
pub fn download_codab(cfg: &Config, force: bool, verbose: u8) -> Result<()> {
    let out_path = cfg.codab_raw_path();
    if verbose > 0 {
        eprintln!("[codab] {CODAB_URL} -> {}", out_path.display());
    }
    download_big_file(CODAB_URL, &out_path, force).context("[codab] boundary download failed")
}

/// Load the admin boundaries at the requested level (0-3).
///
/// `aoi_only` first restricts to the area-of-interest admin-1 regions.
/// Levels below 3 dissolve the admin-3 polygons on the coarser pcode and drop
/// the finer-level attribute columns.
pub fn load_codab(cfg: &Config, admin_level: u8, aoi_only: bool) -> Result<AdminLayer> {
    ensure!(admin_level <= 3, "[codab] admin level must be 0-3, got {admin_level}");

    let zip_path = cfg.codab_raw_path();
    let dir = tempfile::tempdir().context("[codab] create extraction dir")?;
    extract_zip(&zip_path, dir.path())
        .with_context(|| format!("[codab] run `download-codab` first; missing or bad {}", zip_path.display()))?;
    let shp_path = find_file_with_extension(dir.path(), "shp")?;

    let mut layer = AdminLayer::from_shapefile(&shp_path)?;
    if aoi_only {
        layer = layer.filter_in("ADM1_PCODE", &ADM1_AOI_PCODES)?;
    }

    match admin_level {
        3 => Ok(layer),
        2 => layer.dissolve_by("ADM2_PCODE", &["ADM3"]),
        1 => layer.dissolve_by("ADM1_PCODE", &["ADM3", "ADM2"]),
        _ => layer.dissolve_by("ADM0_PCODE", &["ADM3", "ADM2", "ADM1"]),
    }
}
