//! Peak and trigger extraction over season-aligned time series.
//!
//! Both operations expect a frame that has been through
//! [`crate::season::shift_to_floodseason`], i.e. one that carries
//! `seasonyear` and `dayofseason` columns.

use anyhow::{Context, Result, ensure};
use polars::prelude::*;

use crate::constants::FLOODSEASON_ENDDAY;

/// Options for [`get_peak`].
#[derive(Debug, Clone)]
pub struct PeakOptions<'a> {
    /// Season column to group by.
    pub year_col: &'a str,
    /// Only rows with `dayofseason <= end_dayofseason` are considered.
    pub end_dayofseason: i32,
    /// Station or admin-unit column; ignored if the frame has no such column.
    pub agg_col: &'a str,
    /// Date column carried through to the output when present.
    pub date_col: &'a str,
}

impl Default for PeakOptions<'_> {
    fn default() -> Self {
        Self {
            year_col: "seasonyear",
            end_dayofseason: FLOODSEASON_ENDDAY,
            agg_col: "ADM3_PCODE",
            date_col: "date",
        }
    }
}

/// Find the seasonal maximum of `max_col` for each (season year, admin unit).
///
/// Only days up to `end_dayofseason` are searched. If several rows tie for the
/// maximum, the earliest date wins; without a date column, the first row in
/// input order wins. Rows with nulls in any selected column are dropped, and
/// the output has at most one row per group, sorted by season year.
pub fn get_peak(df: &DataFrame, max_col: &str, opts: &PeakOptions) -> Result<DataFrame> {
    ensure!(
        df.column("dayofseason").is_ok(),
        "[analysis] get_peak needs a dayofseason column; run shift_to_floodseason first"
    );

    let has_agg = df.column(opts.agg_col).is_ok();
    let has_date = df.column(opts.date_col).is_ok();

    let mut keys = vec![col(opts.year_col)];
    if has_agg {
        keys.push(col(opts.agg_col));
    }

    let mut selected = keys.clone();
    selected.push(col("dayofseason"));
    selected.push(col(max_col));
    if has_date {
        selected.push(col(opts.date_col));
    }

    // Sort by value descending (date ascending as tie-break), then keep the
    // first row of each group.
    let (sort_exprs, descending) = if has_date {
        (vec![col(max_col), col(opts.date_col)], vec![true, false])
    } else {
        (vec![col(max_col)], vec![true])
    };

    let mut firsts = vec![col("dayofseason").first(), col(max_col).first()];
    if has_date {
        firsts.push(col(opts.date_col).first());
    }

    df.clone()
        .lazy()
        .filter(col("dayofseason").lt_eq(lit(opts.end_dayofseason)))
        .select(selected)
        .drop_nulls(None)
        .sort_by_exprs(
            sort_exprs,
            SortMultipleOptions::default()
                .with_order_descending_multi(descending)
                .with_maintain_order(true),
        )
        .group_by_stable(keys)
        .agg(firsts)
        .sort([opts.year_col], SortMultipleOptions::default())
        .collect()
        .with_context(|| format!("[analysis] get_peak failed for value column {max_col:?}"))
}

/// Options for [`get_triggers`].
#[derive(Debug, Clone)]
pub struct TriggerOptions<'a> {
    pub trigger_col: &'a str,
    pub year_col: &'a str,
    pub date_col: &'a str,
    /// Only rows with `dayofseason < season_endday` are considered.
    pub season_endday: i32,
}

impl Default for TriggerOptions<'_> {
    fn default() -> Self {
        Self {
            trigger_col: "Water Level (cm)",
            year_col: "seasonyear",
            date_col: "date",
            season_endday: FLOODSEASON_ENDDAY,
        }
    }
}

/// For each season year, the first date whose value meets or exceeds
/// `threshold`, as columns (`seasonyear`, `t_date`).
///
/// Seasons with no exceedance before the cutoff produce no output row.
pub fn get_triggers(df: &DataFrame, threshold: f64, opts: &TriggerOptions) -> Result<DataFrame> {
    ensure!(
        df.column("dayofseason").is_ok(),
        "[analysis] get_triggers needs a dayofseason column; run shift_to_floodseason first"
    );

    df.clone()
        .lazy()
        .filter(
            col("dayofseason")
                .lt(lit(opts.season_endday))
                .and(col(opts.trigger_col).gt_eq(lit(threshold)))
                .and(col(opts.date_col).is_not_null()),
        )
        .sort([opts.date_col], SortMultipleOptions::default())
        .group_by_stable([col(opts.year_col)])
        .agg([col(opts.date_col).first().alias("t_date")])
        .sort([opts.year_col], SortMultipleOptions::default())
        .collect()
        .with_context(|| {
            format!("[analysis] get_triggers failed for column {:?}", opts.trigger_col)
        })
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate};

    use super::*;
    use crate::season::{SeasonAnchor, epoch_days_from_date, shift_to_floodseason};

    /// Daily frame over three seasons with one clear annual maximum each.
    fn three_season_frame() -> DataFrame {
        let mut dates = Vec::new();
        let mut values = Vec::new();
        let mut pcodes = Vec::new();
        let mut date = NaiveDate::from_ymd_opt(2018, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        while date < end {
            // Peaks planted on Aug 15 of 2018/2019/2020, growing each year.
            let peak_day = NaiveDate::from_ymd_opt(date.year(), 8, 15).unwrap();
            let v = if date == peak_day { 100.0 + date.year() as f64 } else { 1.0 };
            dates.push(epoch_days_from_date(date));
            values.push(v);
            pcodes.push("NE003006003");
            date = date.succ_opt().unwrap();
        }
        let date = Series::new("date".into(), dates).cast(&DataType::Date).unwrap();
        let df = DataFrame::new(vec![
            date.into(),
            Column::new("sfed".into(), values),
            Column::new("ADM3_PCODE".into(), pcodes),
        ])
        .unwrap();
        shift_to_floodseason(df, "date", SeasonAnchor::default()).unwrap()
    }

    #[test]
    fn peak_finds_one_maximum_per_season() {
        let df = three_season_frame();
        let peaks = get_peak(&df, "sfed", &PeakOptions::default()).unwrap();

        assert_eq!(peaks.height(), 3);
        let years: Vec<i32> =
            peaks.column("seasonyear").unwrap().i32().unwrap().into_no_null_iter().collect();
        assert_eq!(years, vec![2018, 2019, 2020]);
        let values: Vec<f64> =
            peaks.column("sfed").unwrap().f64().unwrap().into_no_null_iter().collect();
        assert_eq!(values, vec![2118.0, 2119.0, 2120.0]);
    }

    #[test]
    fn peak_respects_season_end_cutoff() {
        // Value past the cutoff is larger but must not be selected.
        let dates = [
            NaiveDate::from_ymd_opt(2019, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2019, 12, 1).unwrap(),
        ];
        let days: Vec<i32> = dates.iter().map(|&x| epoch_days_from_date(x)).collect();
        let date = Series::new("date".into(), days).cast(&DataType::Date).unwrap();
        let df = DataFrame::new(vec![
            date.into(),
            Column::new("sfed".into(), vec![5.0, 50.0]),
            Column::new("ADM3_PCODE".into(), vec!["NE003006003", "NE003006003"]),
        ])
        .unwrap();
        let df = shift_to_floodseason(df, "date", SeasonAnchor::default()).unwrap();

        let peaks = get_peak(&df, "sfed", &PeakOptions::default()).unwrap();
        assert_eq!(peaks.height(), 1);
        let v: f64 = peaks.column("sfed").unwrap().f64().unwrap().get(0).unwrap();
        assert_eq!(v, 5.0);
    }

    #[test]
    fn peak_tie_break_is_earliest_date() {
        let dates = [
            NaiveDate::from_ymd_opt(2019, 8, 1).unwrap(),
            NaiveDate::from_ymd_opt(2019, 7, 1).unwrap(),
        ];
        let days: Vec<i32> = dates.iter().map(|&x| epoch_days_from_date(x)).collect();
        let date = Series::new("date".into(), days).cast(&DataType::Date).unwrap();
        let df = DataFrame::new(vec![
            date.into(),
            Column::new("sfed".into(), vec![5.0, 5.0]),
            Column::new("ADM3_PCODE".into(), vec!["NE003006003", "NE003006003"]),
        ])
        .unwrap();
        let df = shift_to_floodseason(df, "date", SeasonAnchor::default()).unwrap();

        let peaks = get_peak(&df, "sfed", &PeakOptions::default()).unwrap();
        assert_eq!(peaks.height(), 1);
        let day: i32 = peaks.column("dayofseason").unwrap().i32().unwrap().get(0).unwrap();
        assert_eq!(day, 31); // July 1 is day 31 from June 1
    }

    #[test]
    fn peak_works_without_admin_column() {
        let df = three_season_frame().drop("ADM3_PCODE").unwrap();
        let peaks = get_peak(&df, "sfed", &PeakOptions::default()).unwrap();
        assert_eq!(peaks.height(), 3);
    }

    #[test]
    fn triggers_return_earliest_exceedance_per_season() {
        let df = three_season_frame();
        let opts = TriggerOptions { trigger_col: "sfed", ..Default::default() };
        let out = get_triggers(&df, 100.0, &opts).unwrap();

        // Every planted peak (Aug 15, dayofseason 76) exceeds the threshold.
        assert_eq!(out.height(), 3);
        let years: Vec<i32> =
            out.column("seasonyear").unwrap().i32().unwrap().into_no_null_iter().collect();
        assert_eq!(years, vec![2018, 2019, 2020]);
        for i in 0..3 {
            let days: i32 = out
                .column("t_date")
                .unwrap()
                .as_materialized_series()
                .date()
                .unwrap()
                .physical()
                .get(i)
                .unwrap();
            let date = crate::season::date_from_epoch_days(days).unwrap();
            assert_eq!((date.month(), date.day()), (8, 15));
        }
    }

    #[test]
    fn seasons_without_exceedance_are_omitted() {
        let df = three_season_frame();
        let opts = TriggerOptions { trigger_col: "sfed", ..Default::default() };
        let out = get_triggers(&df, 1e9, &opts).unwrap();
        assert_eq!(out.height(), 0);
    }
}
