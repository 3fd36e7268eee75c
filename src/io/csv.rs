//! CSV reading and writing operations.

use std::{fs::File, io::Cursor, path::Path};

use anyhow::{Context, Result};
use polars::prelude::*;

/// Reads a CSV file from `path` into a Polars DataFrame.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("[io::csv] Failed to open CSV file: {}", path.display()))?;
    CsvReader::new(file)
        .finish()
        .with_context(|| format!("[io::csv] Failed to read CSV from {:?}", path))
}

/// Reads a CSV file, parsing date-like columns into the Date dtype.
pub fn read_csv_with_dates(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("[io::csv] Failed to open CSV file: {}", path.display()))?;
    CsvReadOptions::default()
        .map_parse_options(|po| po.with_try_parse_dates(true))
        .into_reader_with_file_handle(file)
        .finish()
        .with_context(|| format!("[io::csv] Failed to read CSV from {:?}", path))
}

/// Read DataFrame from CSV bytes (for blob payloads).
pub fn read_csv_bytes(bytes: &[u8]) -> Result<DataFrame> {
    CsvReader::new(Cursor::new(bytes))
        .finish()
        .context("[io::csv] Failed to read CSV from bytes")
}

/// Writes a Polars DataFrame to a CSV file at `path`, creating parent
/// directories as needed.
pub fn write_csv(path: &Path, df: &DataFrame) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("[io::csv] Failed to create directory {}", parent.display()))?;
    }
    let mut file = File::create(path)
        .with_context(|| format!("[io::csv] Failed to create CSV file: {}", path.display()))?;
    CsvWriter::new(&mut file)
        .finish(&mut df.clone())
        .with_context(|| format!("[io::csv] Failed to write CSV to {:?}", path))
}

/// Serialize a DataFrame to CSV bytes (for blob payloads).
pub fn write_csv_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .finish(&mut df.clone())
        .context("[io::csv] Failed to serialize CSV")?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::season::epoch_days_from_date;

    fn sample_frame() -> DataFrame {
        let days = vec![
            epoch_days_from_date(NaiveDate::from_ymd_opt(2020, 6, 1).unwrap()),
            epoch_days_from_date(NaiveDate::from_ymd_opt(2020, 6, 2).unwrap()),
        ];
        let date = Series::new("date".into(), days).cast(&DataType::Date).unwrap();
        DataFrame::new(vec![
            date.into(),
            Column::new("sfed".into(), vec![0.125, 0.5]),
            Column::new("ADM3_PCODE".into(), vec!["NE003006003", "NE006008004"]),
        ])
        .unwrap()
    }

    #[test]
    fn csv_round_trip_preserves_dates_and_values() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out/stats.csv");

        let df = sample_frame();
        write_csv(&path, &df).unwrap();
        let back = read_csv_with_dates(&path).unwrap();

        assert_eq!(back.shape(), df.shape());
        assert_eq!(back.column("date").unwrap().dtype(), &DataType::Date);
        assert!(back.equals(&df));
    }

    #[test]
    fn bytes_round_trip() {
        let df = sample_frame();
        let bytes = write_csv_bytes(&df).unwrap();
        let back = read_csv_bytes(&bytes).unwrap();
        assert_eq!(back.shape(), df.shape());
        let v: f64 = back.column("sfed").unwrap().f64().unwrap().get(1).unwrap();
        assert_eq!(v, 0.5);
    }
}
