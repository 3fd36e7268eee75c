//! FloodScan SFED: clipping, zonal statistics, and population exposure.
//!
//! The raw input is a global daily NetCDF stack of the satellite-derived
//! flood-extent fraction (SFED). It is clipped once to Niger, then reduced to
//! per-admin-unit time series.

use anyhow::{Context, Result, ensure};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

use crate::admin::AdminLayer;
use crate::common::fs::find_file_with_extension;
use crate::config::Config;
use crate::constants::ADM3_AOI_PCODES;
use crate::datasources::{codab, worldpop};
use crate::io::{csv, netcdf_io};
use crate::raster::{Raster2, RasterStack};
use crate::season::{SeasonAnchor, epoch_days_from_date, shift_to_floodseason};
use crate::zonal::zonal_stats;

pub const DATA_VAR: &str = "SFED_AREA";

/// Low percentiles of the SFED distribution, reported alongside mean/max/min.
pub const PERCENTILE_LIST: [f64; 6] = [2.0, 4.0, 6.0, 8.0, 10.0, 20.0];

/// Admin column used to label zonal outputs.
pub const ID_COL: &str = "ADM3_PCODE";

/// Clip the global SFED stack to the Niger admin-0 boundary and persist it.
///
/// Returns the path of the written NetCDF file.
pub fn clip_floodscan(cfg: &Config, verbose: u8) -> Result<std::path::PathBuf> {
    if verbose > 0 {
        eprintln!("[floodscan] reading {}", cfg.floodscan_raw_path().display());
    }
    let stack = load_raw(cfg)?;

    let adm0 = codab::load_codab(cfg, 0, false)?;
    ensure!(!adm0.is_empty(), "[floodscan] admin-0 layer is empty");

    let mut clipped = stack.clip_bbox(&adm0.bounds()?)?;
    clipped.clip_polygon(&adm0.geoms[0]);

    let (y0, y1) = year_span(&clipped.times)?;
    let out_path = cfg.floodscan_proc_dir().join(format!("ner_sfed_{y0}_{y1}.nc"));
    if verbose > 0 {
        eprintln!("[floodscan] writing {}", out_path.display());
    }
    netcdf_io::write_stack(&out_path, &clipped, DATA_VAR)?;
    Ok(out_path)
}

/// Load the raw global SFED stack.
pub fn load_raw(cfg: &Config) -> Result<RasterStack> {
    netcdf_io::read_stack(&cfg.floodscan_raw_path(), DATA_VAR)
}

/// Load the clipped Niger SFED stack written by [`clip_floodscan`].
pub fn load_clipped(cfg: &Config) -> Result<RasterStack> {
    let path = find_file_with_extension(&cfg.floodscan_proc_dir(), "nc")
        .context("[floodscan] no clipped stack found; run `clip-floodscan` first")?;
    netcdf_io::read_stack(&path, DATA_VAR)
}

/// Zonal SFED statistics for every time slice and admin polygon.
///
/// One output row per (date, admin unit), with mean/max/min cell statistics
/// and the [`PERCENTILE_LIST`] percentiles, sorted by date.
pub fn floodscan_stats(stack: &RasterStack, adm: &AdminLayer, verbose: u8) -> Result<DataFrame> {
    let ids = adm.ids(ID_COL)?;
    let n = stack.times.len() * ids.len();

    let mut out_ids: Vec<String> = Vec::with_capacity(n);
    let mut means: Vec<Option<f64>> = Vec::with_capacity(n);
    let mut maxs: Vec<Option<f64>> = Vec::with_capacity(n);
    let mut mins: Vec<Option<f64>> = Vec::with_capacity(n);
    let mut pct_cols: Vec<Vec<Option<f64>>> =
        PERCENTILE_LIST.iter().map(|_| Vec::with_capacity(n)).collect();
    let mut dates: Vec<i32> = Vec::with_capacity(n);

    for (t, &date) in stack.times.iter().enumerate() {
        if verbose > 0 {
            eprintln!("[floodscan] {date}");
        }
        let slice = stack.slice(t)?;
        let stats = zonal_stats(&slice, &adm.geoms, &PERCENTILE_LIST);
        for (id, region) in ids.iter().zip(stats) {
            out_ids.push(id.clone());
            means.push(region.mean);
            maxs.push(region.max);
            mins.push(region.min);
            for (col, value) in pct_cols.iter_mut().zip(region.percentiles) {
                col.push(value);
            }
            dates.push(epoch_days_from_date(date));
        }
    }

    let mut columns = vec![
        Column::new(ID_COL.into(), out_ids),
        Column::new("mean_cell".into(), means),
        Column::new("max_cell".into(), maxs),
        Column::new("min_cell".into(), mins),
    ];
    for (p, values) in PERCENTILE_LIST.iter().zip(pct_cols) {
        columns.push(Column::new(format!("percentile_{p}").as_str().into(), values));
    }
    columns.push(Series::new("date".into(), dates).cast(&DataType::Date)?.into());

    DataFrame::new(columns)?
        .sort(["date"], SortMultipleOptions::default())
        .context("[floodscan] failed to sort zonal stats by date")
}

/// Run the zonal statistics over the clipped stack and the AOI communes, and
/// persist them as CSV.
pub fn run_floodscan_stats(cfg: &Config, verbose: u8) -> Result<std::path::PathBuf> {
    let stack = load_clipped(cfg)?;
    let adm3 = codab::load_codab(cfg, 3, true)?.filter_in(ID_COL, &ADM3_AOI_PCODES)?;
    ensure!(!adm3.is_empty(), "[floodscan] no AOI communes in the admin layer");

    let df = floodscan_stats(&stack, &adm3, verbose)?;

    let (min_date, max_date) = date_span(&stack.times)?;
    let out_path = cfg.floodscan_proc_dir().join(format!(
        "ner_floodscan_stats_adm3_sel_{min_date}_to_{max_date}.csv"
    ));
    csv::write_csv(&out_path, &df)?;
    if verbose > 0 {
        eprintln!("[floodscan] wrote {}", out_path.display());
    }
    Ok(out_path)
}

/// Load the processed zonal-statistics CSV, season-aligned.
pub fn load_floodscan_stats(cfg: &Config) -> Result<DataFrame> {
    let path = find_processed_csv(cfg, "ner_floodscan_stats_adm3_sel")?;
    let df = csv::read_csv_with_dates(&path)?;
    shift_to_floodseason(df, "date", SeasonAnchor::default())
}

/// Daily flood exposure: population under flood per admin unit.
///
/// Each SFED slice is resampled (nearest neighbour) onto the population
/// grid, fractions outside (0, 1] are masked, and `population x fraction` is
/// summed over each admin polygon. Output columns: `time`, `total_exposed`,
/// admin pcode.
pub fn daily_exposure(
    stack: &RasterStack,
    pop: &Raster2,
    adm: &AdminLayer,
    verbose: u8,
) -> Result<DataFrame> {
    let ids = adm.ids(ID_COL)?;
    // Membership of population cells per admin polygon does not change over
    // time, so compute it once.
    let cells: Vec<Vec<(usize, usize)>> =
        adm.geoms.iter().map(|region| pop.cells_within(region)).collect();

    let n = stack.times.len() * ids.len();
    let mut times: Vec<i32> = Vec::with_capacity(n);
    let mut totals: Vec<i64> = Vec::with_capacity(n);
    let mut out_ids: Vec<String> = Vec::with_capacity(n);

    for (t, &date) in stack.times.iter().enumerate() {
        if verbose > 0 && date.ordinal() == 1 {
            eprintln!("[floodscan] exposure year {}", date.year());
        }
        let slice = stack.slice(t)?;
        for (id, region_cells) in ids.iter().zip(&cells) {
            let mut total = 0.0;
            for &(row, col) in region_cells {
                let population = pop.grid[[row, col]];
                if !population.is_finite() || population <= 0.0 {
                    continue;
                }
                let (x, y) = pop.transform.cell_center(row, col);
                let Some(frac) = slice.sample(x, y) else { continue };
                if frac > 0.0 && frac <= 1.0 {
                    total += population * frac;
                }
            }
            times.push(epoch_days_from_date(date));
            totals.push(total as i64);
            out_ids.push(id.clone());
        }
    }

    DataFrame::new(vec![
        Series::new("time".into(), times).cast(&DataType::Date)?.into(),
        Column::new("total_exposed".into(), totals),
        Column::new(ID_COL.into(), out_ids),
    ])
    .context("[floodscan] failed to assemble exposure frame")
}

/// Compute daily exposure over the clipped stack, WorldPop and the AOI
/// communes, and persist it as CSV.
pub fn calc_daily_exposure(cfg: &Config, verbose: u8) -> Result<std::path::PathBuf> {
    let stack = load_clipped(cfg)?;
    let pop = worldpop::load_raw(cfg)?;
    let adm3 = codab::load_codab(cfg, 3, true)?;

    let df = daily_exposure(&stack, &pop, &adm3, verbose)?;

    let (y0, y1) = year_span(&stack.times)?;
    let out_path = cfg
        .floodscan_proc_dir()
        .join(format!("ner_adm3_totalexposed_daily_{y0}_{y1}.csv"));
    csv::write_csv(&out_path, &df)?;
    if verbose > 0 {
        eprintln!("[floodscan] wrote {}", out_path.display());
    }
    Ok(out_path)
}

/// Load the processed daily-exposure CSV, parsing the time column.
pub fn load_daily_exposure(cfg: &Config) -> Result<DataFrame> {
    let path = find_processed_csv(cfg, "ner_adm3_totalexposed_daily")?;
    csv::read_csv_with_dates(&path)
}

fn find_processed_csv(cfg: &Config, prefix: &str) -> Result<std::path::PathBuf> {
    let dir = cfg.floodscan_proc_dir();
    let mut matches: Vec<_> = std::fs::read_dir(&dir)
        .with_context(|| format!("[floodscan] missing processed dir {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix) && n.ends_with(".csv"))
        })
        .collect();
    matches.sort();
    matches
        .into_iter()
        .next()
        .with_context(|| format!("[floodscan] no {prefix}*.csv under {}", dir.display()))
}

fn year_span(times: &[NaiveDate]) -> Result<(i32, i32)> {
    let min = times.iter().min().context("[floodscan] empty time axis")?;
    let max = times.iter().max().context("[floodscan] empty time axis")?;
    Ok((min.year(), max.year()))
}

fn date_span(times: &[NaiveDate]) -> Result<(String, String)> {
    let min = times.iter().min().context("[floodscan] empty time axis")?;
    let max = times.iter().max().context("[floodscan] empty time axis")?;
    Ok((min.format("%Y-%m-%d").to_string(), max.format("%Y-%m-%d").to_string()))
}

#[cfg(test)]
mod tests {
    use geo::polygon;
    use ndarray::Array3;

    use super::*;
    use crate::raster::GeoTransform;

    /// One 4x4 degree grid, two days; uniform fraction doubling on day two.
    fn fixture_stack() -> RasterStack {
        let data = Array3::from_shape_fn((2, 4, 4), |(t, _, _)| 0.25 * (t + 1) as f64);
        RasterStack::new(
            data,
            vec![
                NaiveDate::from_ymd_opt(2020, 6, 1).unwrap(),
                NaiveDate::from_ymd_opt(2020, 6, 2).unwrap(),
            ],
            vec![3.5, 2.5, 1.5, 0.5],
            vec![0.5, 1.5, 2.5, 3.5],
        )
        .unwrap()
    }

    fn fixture_layer() -> AdminLayer {
        let data = DataFrame::new(vec![Column::new(
            ID_COL.into(),
            vec!["NE003006003", "NE006008004"],
        )])
        .unwrap();
        let geoms = vec![
            geo::MultiPolygon(vec![polygon![
                (x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0),
            ]]),
            geo::MultiPolygon(vec![polygon![
                (x: 2.0, y: 2.0), (x: 4.0, y: 2.0), (x: 4.0, y: 4.0), (x: 2.0, y: 4.0),
            ]]),
        ];
        AdminLayer::new(data, geoms).unwrap()
    }

    #[test]
    fn stats_cover_every_slice_and_region() {
        let df = floodscan_stats(&fixture_stack(), &fixture_layer(), 0).unwrap();
        assert_eq!(df.height(), 4); // 2 dates x 2 regions
        assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);

        // Uniform slices: mean == max == min, day 2 is 0.5 everywhere.
        let means: Vec<f64> =
            df.column("mean_cell").unwrap().f64().unwrap().into_no_null_iter().collect();
        assert_eq!(means, vec![0.25, 0.25, 0.5, 0.5]);
        let p2: Vec<f64> =
            df.column("percentile_2").unwrap().f64().unwrap().into_no_null_iter().collect();
        assert_eq!(p2, vec![0.25, 0.25, 0.5, 0.5]);
    }

    #[test]
    fn exposure_multiplies_population_by_fraction() {
        let stack = fixture_stack();
        // 100 people in every cell of the same grid.
        let pop = Raster2 {
            grid: ndarray::Array2::from_elem((4, 4), 100.0),
            transform: GeoTransform { x_origin: 0.0, y_origin: 4.0, x_res: 1.0, y_res: -1.0 },
        };

        let df = daily_exposure(&stack, &pop, &fixture_layer(), 0).unwrap();
        assert_eq!(df.height(), 4);
        let totals: Vec<i64> =
            df.column("total_exposed").unwrap().i64().unwrap().into_no_null_iter().collect();
        // 4 cells/region x 100 people x fraction (0.25, then 0.5).
        assert_eq!(totals, vec![100, 100, 200, 200]);
    }

    #[test]
    fn exposure_skips_out_of_range_fractions() {
        let mut stack = fixture_stack();
        stack.data.fill(1.5); // not a valid flood fraction
        let pop = Raster2 {
            grid: ndarray::Array2::from_elem((4, 4), 100.0),
            transform: GeoTransform { x_origin: 0.0, y_origin: 4.0, x_res: 1.0, y_res: -1.0 },
        };
        let df = daily_exposure(&stack, &pop, &fixture_layer(), 0).unwrap();
        let totals: Vec<i64> =
            df.column("total_exposed").unwrap().i64().unwrap().into_no_null_iter().collect();
        assert_eq!(totals, vec![0, 0, 0, 0]);
    }
}
