//! Parquet reading and writing operations.

use std::{fs::File, io::BufWriter, io::Cursor, path::Path};

use anyhow::{Context, Result};
use polars::prelude::*;

/// Reads a Polars DataFrame from a Parquet file at `path`.
pub fn read_parquet(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("[io::parquet] Failed to open parquet file: {}", path.display()))?;
    ParquetReader::new(file)
        .finish()
        .with_context(|| format!("[io::parquet] Failed to read parquet from {:?}", path))
}

/// Writes a Polars DataFrame to a Parquet file at `path`.
pub fn write_parquet(path: &Path, df: &DataFrame) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("[io::parquet] Failed to create directory {}", parent.display())
        })?;
    }
    let file = File::create(path)
        .with_context(|| format!("[io::parquet] Failed to create file: {}", path.display()))?;
    let writer: BufWriter<File> = BufWriter::new(file);
    ParquetWriter::new(writer)
        .finish(&mut df.clone())
        .with_context(|| format!("[io::parquet] Failed to write parquet to {:?}", path))?;
    Ok(())
}

/// Read DataFrame from parquet bytes (for blob payloads).
pub fn read_parquet_bytes(bytes: &[u8]) -> Result<DataFrame> {
    ParquetReader::new(Cursor::new(bytes))
        .finish()
        .context("[io::parquet] Failed to read parquet from bytes")
}

/// Serialize a DataFrame to parquet bytes (for blob payloads).
pub fn write_parquet_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ParquetWriter::new(Cursor::new(&mut buf))
        .finish(&mut df.clone())
        .context("[io::parquet] Failed to serialize parquet")?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parquet_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("data.parquet");

        let df = DataFrame::new(vec![
            Column::new("ADM2_PCODE".into(), vec!["NE003001", "NE003002"]),
            Column::new("total_pop".into(), vec![1234.0, 567.0]),
        ])
        .unwrap();

        write_parquet(&path, &df).unwrap();
        let back = read_parquet(&path).unwrap();
        assert!(back.equals(&df));

        let bytes = write_parquet_bytes(&df).unwrap();
        let back = read_parquet_bytes(&bytes).unwrap();
        assert!(back.equals(&df));
    }
}
