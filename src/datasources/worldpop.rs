//! WorldPop gridded population (1km UN-adjusted, 2020).

use anyhow::{Context, Result};
use polars::prelude::*;

use crate::admin::AdminLayer;
use crate::config::Config;
use crate::datasources::codab;
use crate::io::{csv, geotiff};
use crate::raster::Raster2;
use crate::zonal::zonal_sum;

pub const ID_COL: &str = "ADM2_PCODE";

const ADM2_POP_FILENAME: &str = "ner_adm2_2020_1km_Aggregated_UNadj.csv";

/// Load the raw WorldPop GeoTIFF for Niger.
pub fn load_raw(cfg: &Config) -> Result<Raster2> {
    let path = cfg.worldpop_raw_path();
    geotiff::read_geotiff(&path)
        .with_context(|| format!("[worldpop] failed to read {}", path.display()))
}

/// Total population per admin polygon, as `total_pop` + pcode columns.
///
/// Only positive cells count; zero and negative pixels are treated as
/// uninhabited.
pub fn aggregate_population(pop: &Raster2, adm: &AdminLayer, id_col: &str) -> Result<DataFrame> {
    let mut pop = pop.clone();
    pop.mask_where(|v| v <= 0.0);
    let totals: Vec<f64> = adm.geoms.iter().map(|region| zonal_sum(&pop, region)).collect();
    DataFrame::new(vec![
        Column::new("total_pop".into(), totals),
        Column::new(id_col.into(), adm.ids(id_col)?),
    ])
    .context("[worldpop] failed to assemble population frame")
}

/// Aggregate WorldPop to admin-2 totals for the whole country and persist
/// them as CSV.
pub fn aggregate_to_adm2(cfg: &Config, verbose: u8) -> Result<std::path::PathBuf> {
    let pop = load_raw(cfg)?;
    let adm2 = codab::load_codab(cfg, 2, false)?;
    let df = aggregate_population(&pop, &adm2, ID_COL)?;

    let out_path = cfg.worldpop_proc_dir().join(ADM2_POP_FILENAME);
    csv::write_csv(&out_path, &df)?;
    if verbose > 0 {
        eprintln!("[worldpop] wrote {}", out_path.display());
    }
    Ok(out_path)
}

/// Load the processed admin-2 population CSV.
pub fn load_adm2(cfg: &Config) -> Result<DataFrame> {
    let path = cfg.worldpop_proc_dir().join(ADM2_POP_FILENAME);
    csv::read_csv(&path)
        .with_context(|| format!("[worldpop] run `aggregate-worldpop` first; missing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use geo::polygon;
    use ndarray::Array2;

    use super::*;
    use crate::raster::GeoTransform;

    #[test]
    fn population_sums_per_region() {
        let pop = Raster2 {
            grid: Array2::from_elem((4, 4), 10.0),
            transform: GeoTransform { x_origin: 0.0, y_origin: 4.0, x_res: 1.0, y_res: -1.0 },
        };
        let data = DataFrame::new(vec![Column::new(
            ID_COL.into(),
            vec!["NE00306", "NE00608"],
        )])
        .unwrap();
        let geoms = vec![
            geo::MultiPolygon(vec![polygon![
                (x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0),
            ]]),
            geo::MultiPolygon(vec![polygon![
                (x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0),
            ]]),
        ];
        let adm = AdminLayer::new(data, geoms).unwrap();

        let df = aggregate_population(&pop, &adm, ID_COL).unwrap();
        let totals: Vec<f64> =
            df.column("total_pop").unwrap().f64().unwrap().into_no_null_iter().collect();
        assert_eq!(totals, vec![40.0, 160.0]);
        assert_eq!(
            df.column(ID_COL).unwrap().str().unwrap().get(0).unwrap(),
            "NE00306"
        );
    }

    #[test]
    fn nodata_cells_do_not_count() {
        let mut grid = Array2::from_elem((2, 2), 5.0);
        grid[[0, 0]] = f64::NAN;
        let pop = Raster2 {
            grid,
            transform: GeoTransform { x_origin: 0.0, y_origin: 2.0, x_res: 1.0, y_res: -1.0 },
        };
        let adm = single_region_layer();

        let df = aggregate_population(&pop, &adm, ID_COL).unwrap();
        assert_eq!(df.column("total_pop").unwrap().f64().unwrap().get(0), Some(15.0));
    }

    #[test]
    fn negative_cells_do_not_count() {
        // Negative non-fill pixels are not people.
        let mut grid = Array2::from_elem((2, 2), 5.0);
        grid[[1, 1]] = -100.0;
        let pop = Raster2 {
            grid,
            transform: GeoTransform { x_origin: 0.0, y_origin: 2.0, x_res: 1.0, y_res: -1.0 },
        };
        let adm = single_region_layer();

        let df = aggregate_population(&pop, &adm, ID_COL).unwrap();
        assert_eq!(df.column("total_pop").unwrap().f64().unwrap().get(0), Some(15.0));
    }

    #[test]
    fn adm2_totals_cover_regions_outside_the_aoi() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = Config::with_data_dir(tmp.path());
        crate::testutil::seed_codab(&cfg);

        // Uniform 100 people/cell over lon 0..10, lat 0..10, one-degree cells.
        let data = vec![100.0f32; 100];
        crate::testutil::write_geotiff(&cfg.worldpop_raw_path(), 10, 10, 0.0, 10.0, 1.0, &data);

        let path = aggregate_to_adm2(&cfg, 0).unwrap();
        assert!(path.ends_with("ner_adm2_2020_1km_Aggregated_UNadj.csv"));

        let df = load_adm2(&cfg).unwrap();
        let ids: Vec<&str> =
            df.column(ID_COL).unwrap().str().unwrap().into_no_null_iter().collect();
        // NE00701 (Zinder) lies outside the AOI but must still be present.
        assert_eq!(ids, vec!["NE00306", "NE00701"]);
        let totals: Vec<f64> =
            df.column("total_pop").unwrap().f64().unwrap().into_no_null_iter().collect();
        // Two one-degree cells vs one.
        assert_eq!(totals, vec![200.0, 100.0]);
    }

    fn single_region_layer() -> AdminLayer {
        let data =
            DataFrame::new(vec![Column::new(ID_COL.into(), vec!["NE00306"])]).unwrap();
        let geoms = vec![geo::MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0),
        ]])];
        AdminLayer::new(data, geoms).unwrap()
    }
}
