//! HydroSHEDS HydroRIVERS polylines for Africa, and the Niger main stem.

use std::path::Path;

use anyhow::{Context, Result, ensure};
use geo::MultiLineString;
use polars::prelude::*;

use crate::common::fs::find_file_with_extension;
use crate::common::shp::{
    dbf_table_builder, multilinestring_to_shp, read_shapefile, record_for_row,
    records_to_dataframe, shape_to_multilinestring,
};
use crate::config::Config;
use crate::constants::NIGER_MAINRIVER_ID;

const NIGER_RIVER_DIR: &str = "niger_river";

/// A river network: attribute table + one polyline per row.
#[derive(Debug, Clone)]
pub struct RiverLayer {
    pub data: DataFrame,
    pub geoms: Vec<MultiLineString<f64>>,
}

impl RiverLayer {
    pub fn new(data: DataFrame, geoms: Vec<MultiLineString<f64>>) -> Result<Self> {
        ensure!(
            data.height() == geoms.len(),
            "[hydrosheds] attribute table has {} rows but {} geometries",
            data.height(),
            geoms.len()
        );
        Ok(Self { data, geoms })
    }

    pub fn len(&self) -> usize {
        self.geoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geoms.is_empty()
    }

    pub fn from_shapefile(path: &Path) -> Result<RiverLayer> {
        let items = read_shapefile(path)?;
        let (shapes, records): (Vec<_>, Vec<_>) = items.into_iter().unzip();
        let geoms = shapes
            .iter()
            .map(shape_to_multilinestring)
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("[hydrosheds] bad geometry in {}", path.display()))?;
        let data = records_to_dataframe(&records)
            .with_context(|| format!("[hydrosheds] bad attribute table in {}", path.display()))?;
        RiverLayer::new(data, geoms)
    }

    pub fn write_shapefile(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            crate::common::fs::ensure_dir_exists(parent)
                .with_context(|| format!("[hydrosheds] create dir {}", parent.display()))?;
        }
        let (names, builder) = dbf_table_builder(&self.data)
            .with_context(|| format!("[hydrosheds] attribute table of {}", path.display()))?;
        let mut writer = shapefile::Writer::from_path(path, builder)
            .with_context(|| format!("[hydrosheds] create shapefile {}", path.display()))?;
        for (i, geom) in self.geoms.iter().enumerate() {
            let record = record_for_row(&self.data, &names, i)?;
            writer
                .write_shape_and_record(&multilinestring_to_shp(geom), &record)
                .with_context(|| format!("[hydrosheds] write feature {i}"))?;
        }
        Ok(())
    }

    /// Keep only rows whose numeric attribute `col` equals `value`.
    pub fn filter_eq(&self, col: &str, value: f64) -> Result<RiverLayer> {
        let values = self
            .data
            .column(col)
            .with_context(|| format!("[hydrosheds] missing column {col:?}"))?
            .f64()
            .with_context(|| format!("[hydrosheds] column {col:?} must be numeric"))?;
        let mask: Vec<bool> = values.into_iter().map(|v| v == Some(value)).collect();

        let mask_ca = BooleanChunked::from_slice("mask".into(), &mask);
        let data = self.data.filter(&mask_ca)?;
        let geoms = self
            .geoms
            .iter()
            .zip(&mask)
            .filter(|&(_, &keep)| keep)
            .map(|(geom, _)| geom.clone())
            .collect();
        RiverLayer::new(data, geoms)
    }
}

/// Load the full Africa HydroRIVERS shapefile.
pub fn load_all_rivers(cfg: &Config) -> Result<RiverLayer> {
    let shp_path = find_file_with_extension(&cfg.hydrosheds_raw_dir(), "shp")
        .context("[hydrosheds] HydroRIVERS shapefile not found under the raw dir")?;
    RiverLayer::from_shapefile(&shp_path)
}

/// Extract the Niger main stem and persist it as a shapefile.
pub fn extract_niger_river(cfg: &Config, verbose: u8) -> Result<std::path::PathBuf> {
    let rivers = load_all_rivers(cfg)?;
    let main_stem = rivers.filter_eq("MAIN_RIV", NIGER_MAINRIVER_ID as f64)?;
    ensure!(!main_stem.is_empty(), "[hydrosheds] no reaches with the Niger main river id");

    let out_path =
        cfg.hydrosheds_proc_dir().join(NIGER_RIVER_DIR).join("niger_river.shp");
    main_stem.write_shapefile(&out_path)?;
    if verbose > 0 {
        eprintln!(
            "[hydrosheds] wrote {} reaches to {}",
            main_stem.len(),
            out_path.display()
        );
    }
    Ok(out_path)
}

/// Load the extracted Niger main stem written by [`extract_niger_river`].
pub fn load_niger_river(cfg: &Config) -> Result<RiverLayer> {
    let path = cfg.hydrosheds_proc_dir().join(NIGER_RIVER_DIR).join("niger_river.shp");
    RiverLayer::from_shapefile(&path)
        .context("[hydrosheds] run `extract-river` first to produce the Niger main stem")
}
