//! ANADIA flood-impact survey (historical flood events per commune).

use anyhow::{Context, Result};
use chrono::NaiveDate;
use polars::prelude::*;

use crate::config::Config;
use crate::io::{csv, excel};
use crate::season::epoch_days_from_date;

pub const ID_COL: &str = "rowcacode3";

/// Load the raw survey workbook.
pub fn load_raw(cfg: &Config) -> Result<DataFrame> {
    excel::read_excel(&cfg.anadia_raw_path(), None, 0)
}

/// Clean the raw survey and persist it as CSV.
///
/// Rows without a commune code or event date are dropped; the date column is
/// normalized to a proper date type.
pub fn process(cfg: &Config, verbose: u8) -> Result<std::path::PathBuf> {
    let df = process_frame(load_raw(cfg)?)?;
    let out_path = cfg.anadia_proc_path();
    csv::write_csv(&out_path, &df)?;
    if verbose > 0 {
        eprintln!("[anadia] wrote {} events to {}", df.height(), out_path.display());
    }
    Ok(out_path)
}

/// Load the processed survey, parsing dates and deriving `ADM3_PCODE`.
///
/// The survey codes communes as `rowcacode3` with an extra `R` marker
/// (`NER003...`); stripping it yields the COD-AB pcode.
pub fn load_processed(cfg: &Config) -> Result<DataFrame> {
    let path = cfg.anadia_proc_path();
    let df = csv::read_csv_with_dates(&path)
        .with_context(|| format!("[anadia] run `process-anadia` first; missing {}", path.display()))?;
    with_adm3_pcode(df)
}

pub(crate) fn process_frame(df: DataFrame) -> Result<DataFrame> {
    let keep: Vec<bool> = {
        let codes = df
            .column(ID_COL)
            .context("[anadia] workbook is missing the rowcacode3 column")?
            .str()
            .context("[anadia] rowcacode3 must be text")?;
        let dates = df
            .column("date")
            .context("[anadia] workbook is missing the date column")?
            .str()
            .context("[anadia] date must be text")?;
        codes
            .into_iter()
            .zip(dates)
            .map(|(code, date)| {
                code.is_some_and(|c| !c.trim().is_empty())
                    && date.and_then(parse_iso_date).is_some()
            })
            .collect()
    };
    let mask = BooleanChunked::from_slice("mask".into(), &keep);
    let mut df = df.filter(&mask)?;

    let days: Vec<Option<i32>> = df
        .column("date")?
        .str()?
        .into_iter()
        .map(|v| v.and_then(parse_iso_date).map(epoch_days_from_date))
        .collect();
    df.replace("date", Series::new("date".into(), days).cast(&DataType::Date)?)?;
    Ok(df)
}

pub(crate) fn with_adm3_pcode(mut df: DataFrame) -> Result<DataFrame> {
    let pcodes: Vec<Option<String>> = df
        .column(ID_COL)
        .context("[anadia] processed file is missing rowcacode3")?
        .str()
        .context("[anadia] rowcacode3 must be text")?
        .into_iter()
        .map(|v| v.map(|code| code.replace('R', "")))
        .collect();
    df.with_column(Column::new("ADM3_PCODE".into(), pcodes))?;
    Ok(df)
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new(ID_COL.into(), vec![Some("NER003006003"), Some(""), Some("NER006008004"), None]),
            Column::new("date".into(), vec![Some("2020-08-15"), Some("2020-08-16"), Some("not a date"), Some("2021-07-01")]),
            Column::new("degats".into(), vec![Some(12.0), Some(3.0), Some(5.0), Some(1.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn rows_missing_key_fields_are_dropped() {
        let df = process_frame(raw_frame()).unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);
        assert_eq!(df.column("degats").unwrap().f64().unwrap().get(0), Some(12.0));
    }

    #[test]
    fn adm3_pcode_strips_the_r_marker() {
        let df = with_adm3_pcode(
            DataFrame::new(vec![Column::new(ID_COL.into(), vec!["NER003006003"])]).unwrap(),
        )
        .unwrap();
        assert_eq!(
            df.column("ADM3_PCODE").unwrap().str().unwrap().get(0),
            Some("NE003006003")
        );
    }

    #[test]
    fn missing_columns_are_an_error() {
        let df = DataFrame::new(vec![Column::new("date".into(), vec!["2020-01-01"])]).unwrap();
        assert!(process_frame(df).is_err());
    }
}
