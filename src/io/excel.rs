//! Excel workbook loading.
//!
//! Source spreadsheets (gauge records, survey entries, commune
//! classifications) arrive as `.xls`/`.xlsx` workbooks. They are read into a
//! DataFrame with a simple per-column type rule: columns whose first
//! non-empty cell is numeric become Float64, everything else becomes String.
//! Excel date cells are rendered as ISO `YYYY-MM-DD` strings so that the
//! normal CSV date parsing applies downstream.

use std::path::Path;

use anyhow::{Context, Result, bail};
use calamine::{Data, Range, Reader, open_workbook_auto};
use polars::prelude::*;

/// Read one sheet of a workbook into a DataFrame.
///
/// `sheet`: None picks the first sheet. `skip_rows` rows are discarded before
/// the header row.
pub fn read_excel(path: &Path, sheet: Option<&str>, skip_rows: usize) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("[io::excel] Failed to open workbook: {}", path.display()))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .with_context(|| format!("[io::excel] Workbook has no sheets: {}", path.display()))?,
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("[io::excel] Missing sheet {sheet_name:?} in {}", path.display()))?;

    range_to_dataframe(&range, skip_rows)
        .with_context(|| format!("[io::excel] Failed to read sheet {sheet_name:?} from {}", path.display()))
}

fn range_to_dataframe(range: &Range<Data>, skip_rows: usize) -> Result<DataFrame> {
    let mut rows = range.rows().skip(skip_rows);
    let Some(header) = rows.next() else {
        bail!("sheet has no header row after skipping {skip_rows} rows");
    };

    let names: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell_to_string(cell) {
            Some(name) if !name.is_empty() => name,
            _ => format!("column_{i}"),
        })
        .collect();

    let body: Vec<&[Data]> = rows.collect();

    let mut columns = Vec::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        let cells = body.iter().map(|row| row.get(i).unwrap_or(&Data::Empty));
        let numeric = cells
            .clone()
            .find(|cell| !matches!(cell, Data::Empty | Data::Error(_)))
            .is_some_and(|cell| matches!(cell, Data::Float(_) | Data::Int(_)));

        let column = if numeric {
            let values: Vec<Option<f64>> = cells.map(cell_to_f64).collect();
            Column::new(name.as_str().into(), values)
        } else {
            let values: Vec<Option<String>> = cells.map(cell_to_string).collect();
            Column::new(name.as_str().into(), values)
        };
        columns.push(column);
    }

    DataFrame::new(columns).context("failed to assemble DataFrame from sheet")
}

fn cell_to_f64(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(v) => Some(*v),
        Data::Int(v) => Some(*v as f64),
        Data::String(s) => s.trim().parse().ok(),
        Data::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Data::Float(v) => Some(v.to_string()),
        Data::Int(v) => Some(v.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => dt.as_datetime().map(|d| d.format("%Y-%m-%d").to_string()),
        Data::DateTimeIso(s) => Some(s.clone()),
        Data::Empty | Data::Error(_) | Data::DurationIso(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_column_detection() {
        assert_eq!(cell_to_f64(&Data::Float(2.5)), Some(2.5));
        assert_eq!(cell_to_f64(&Data::String(" 42 ".into())), Some(42.0));
        assert_eq!(cell_to_f64(&Data::Empty), None);
    }

    #[test]
    fn string_cells_are_trimmed_and_blank_is_null() {
        assert_eq!(cell_to_string(&Data::String("  Gaya ".into())), Some("Gaya".into()));
        assert_eq!(cell_to_string(&Data::String("   ".into())), None);
        assert_eq!(cell_to_string(&Data::Empty), None);
    }
}
