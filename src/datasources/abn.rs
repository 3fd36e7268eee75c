//! ABN (Niger Basin Authority) river gauge observations.
//!
//! Two raw deliveries: an Excel workbook for the Niamey station and a
//! fixed-width tab-separated text export for the stations upstream of Niamey.

use anyhow::{Context, Result, ensure};
use chrono::NaiveDate;
use polars::prelude::*;

use crate::config::Config;
use crate::io::excel::read_excel;
use crate::season::epoch_days_from_date;

pub const LEVEL_COL: &str = "Water Level (cm)";
pub const DISCHARGE_COL: &str = "Discharges (m3/s)";

const NIAMEY_FILENAME: &str = "Données_ Niamey2005_2022.xlsx";
const UPSTREAM_FILENAME: &str = "Data_Stations_Amont Niamey.txt";

/// Load the Niamey workbook. Two title rows precede the header; the first
/// column is the observation date.
pub fn load_niamey(cfg: &Config) -> Result<DataFrame> {
    let path = cfg.abn_raw_dir().join(NIAMEY_FILENAME);
    let mut df = read_excel(&path, None, 2)?;

    let date_col = df
        .get_column_names_str()
        .first()
        .map(|s| s.to_string())
        .context("[abn] Niamey workbook has no columns")?;
    df.rename(&date_col, "date".into())?;
    parse_date_column(df, "date")
}

/// Load the upstream stations export.
///
/// One row per (station, date, variable). The first field is fixed width:
/// characters 11-39 hold the station name and the last character is the
/// variable code, `C` for water level in cm and `D` for discharge in m3/s.
/// Rows are pivoted to one row per (station, date) with both variables as
/// columns, sorted by station then date.
pub fn load_upstream(cfg: &Config) -> Result<DataFrame> {
    let path = cfg.abn_raw_dir().join(UPSTREAM_FILENAME);
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("[abn] failed to read {}", path.display()))?;
    parse_upstream(&text)
}

/// All stations in one frame: `date`, `station`, water level, discharge.
pub fn load_combined(cfg: &Config) -> Result<DataFrame> {
    let mut niamey = load_niamey(cfg)?;
    let height = niamey.height();
    niamey.with_column(Column::new("station".into(), vec!["Niamey"; height]))?;
    combine(niamey, load_upstream(cfg)?)
}

pub(crate) fn parse_upstream(text: &str) -> Result<DataFrame> {
    // Pivot via an ordered map so the output comes out sorted by
    // (station, date) without a second pass.
    let mut pivot: std::collections::BTreeMap<(String, NaiveDate), (Option<f64>, Option<f64>)> =
        std::collections::BTreeMap::new();

    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        ensure!(
            fields.len() >= 4,
            "[abn] line {}: expected 4 tab-separated fields, got {}",
            lineno + 1,
            fields.len()
        );
        // Blank-padded placeholder rows carry no value.
        if fields.iter().any(|f| f.trim().is_empty()) {
            continue;
        }

        let descriptor: Vec<char> = fields[0].chars().collect();
        ensure!(
            descriptor.len() >= 41,
            "[abn] line {}: station descriptor too short",
            lineno + 1
        );
        let station: String = descriptor[11..40].iter().collect::<String>().trim().to_string();
        let variable = descriptor[descriptor.len() - 1];

        let date = parse_dayfirst(fields[2].trim())
            .with_context(|| format!("[abn] line {}: bad date {:?}", lineno + 1, fields[2]))?;
        let value: f64 = fields[3]
            .trim()
            .parse()
            .with_context(|| format!("[abn] line {}: bad value {:?}", lineno + 1, fields[3]))?;

        let entry = pivot.entry((station, date)).or_insert((None, None));
        match variable {
            'C' => entry.0 = Some(value),
            'D' => entry.1 = Some(value),
            other => anyhow::bail!("[abn] line {}: unknown variable code {other:?}", lineno + 1),
        }
    }

    let mut dates: Vec<i32> = Vec::with_capacity(pivot.len());
    let mut stations: Vec<String> = Vec::with_capacity(pivot.len());
    let mut levels: Vec<Option<f64>> = Vec::with_capacity(pivot.len());
    let mut discharges: Vec<Option<f64>> = Vec::with_capacity(pivot.len());
    for ((station, date), (level, discharge)) in pivot {
        dates.push(epoch_days_from_date(date));
        stations.push(station);
        levels.push(level);
        discharges.push(discharge);
    }

    DataFrame::new(vec![
        Series::new("date".into(), dates).cast(&DataType::Date)?.into(),
        Column::new("station".into(), stations),
        Column::new(LEVEL_COL.into(), levels),
        Column::new(DISCHARGE_COL.into(), discharges),
    ])
    .context("[abn] failed to assemble upstream frame")
}

/// Stack the Niamey and upstream frames, aligning on the four shared columns
/// and padding variables a source does not report.
pub(crate) fn combine(mut niamey: DataFrame, upstream: DataFrame) -> Result<DataFrame> {
    for col in [LEVEL_COL, DISCHARGE_COL] {
        if niamey.column(col).is_err() {
            let height = niamey.height();
            niamey.with_column(Column::full_null(col.into(), height, &DataType::Float64))?;
        }
    }
    let niamey = niamey.select(["date", "station", LEVEL_COL, DISCHARGE_COL])?;
    niamey.vstack(&upstream.select(["date", "station", LEVEL_COL, DISCHARGE_COL])?)
        .context("[abn] failed to stack station frames")
}

/// The raw files carry day-first dates in a couple of separators.
fn parse_dayfirst(s: &str) -> Result<NaiveDate> {
    for fmt in ["%d/%m/%Y", "%d-%m-%Y", "%d/%m/%y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }
    anyhow::bail!("unrecognized day-first date {s:?}")
}

fn parse_date_column(df: DataFrame, col: &str) -> Result<DataFrame> {
    let raw: Vec<Option<String>> = df
        .column(col)?
        .str()
        .with_context(|| format!("[abn] column {col:?} must be text dates"))?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    let days: Vec<Option<i32>> = raw
        .iter()
        .map(|v| {
            v.as_deref()
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                .map(epoch_days_from_date)
        })
        .collect();
    let mut df = df;
    df.replace(col, Series::new(col.into(), days).cast(&DataType::Date)?)?;
    Ok(df)
}
