//! Typed payload helpers over [`BlobStore`](super::BlobStore): tabular data as
//! CSV or parquet, admin layers as zipped shapefiles.

use std::io::{Cursor, Read, Write};

use anyhow::{Context, Result};
use polars::frame::DataFrame;
use zip::{ZipArchive, ZipWriter, write::SimpleFileOptions};

use super::BlobStore;
use crate::admin::AdminLayer;
use crate::common::fs::find_file_with_extension;
use crate::io::{csv, parquet};

/// Upload a DataFrame as a CSV blob.
pub fn upload_csv(store: &dyn BlobStore, name: &str, df: &DataFrame) -> Result<()> {
    store.put(name, &csv::write_csv_bytes(df)?, "text/csv")
}

/// Download a CSV blob into a DataFrame.
pub fn download_csv(store: &dyn BlobStore, name: &str) -> Result<DataFrame> {
    csv::read_csv_bytes(&store.get(name)?)
}

/// Upload a DataFrame as a parquet blob.
pub fn upload_parquet(store: &dyn BlobStore, name: &str, df: &DataFrame) -> Result<()> {
    store.put(name, &parquet::write_parquet_bytes(df)?, "application/octet-stream")
}

/// Download a parquet blob into a DataFrame.
pub fn download_parquet(store: &dyn BlobStore, name: &str) -> Result<DataFrame> {
    parquet::read_parquet_bytes(&store.get(name)?)
}

/// Upload an admin layer as a zipped ESRI shapefile.
pub fn upload_admin_layer(store: &dyn BlobStore, name: &str, layer: &AdminLayer) -> Result<()> {
    let dir = tempfile::tempdir().context("[blob] create temp dir for shapefile")?;
    layer.write_shapefile(&dir.path().join("data.shp"))?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    let mut entries: Vec<_> = std::fs::read_dir(dir.path())
        .context("[blob] list shapefile parts")?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect();
    entries.sort();
    for path in entries {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        zip.start_file(file_name, options)
            .with_context(|| format!("[blob] zip entry {file_name}"))?;
        let bytes = std::fs::read(&path)
            .with_context(|| format!("[blob] read shapefile part {}", path.display()))?;
        zip.write_all(&bytes)?;
    }
    let cursor = zip.finish().context("[blob] finalize zip")?;

    store.put(name, &cursor.into_inner(), "application/zip")
}

/// Download a zipped-shapefile blob into an admin layer.
///
/// `shapefile`: name of the `.shp` member to read; None picks the first one.
pub fn download_admin_layer(
    store: &dyn BlobStore,
    name: &str,
    shapefile: Option<&str>,
) -> Result<AdminLayer> {
    let bytes = store.get(name)?;
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).with_context(|| format!("[blob] {name} is not a zip"))?;

    let dir = tempfile::tempdir().context("[blob] create temp dir for shapefile")?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(file_name) = entry.enclosed_name().and_then(|p| {
            p.file_name().map(|n| n.to_string_lossy().into_owned())
        }) else {
            continue;
        };
        let mut out = std::fs::File::create(dir.path().join(&file_name))
            .with_context(|| format!("[blob] extract {file_name}"))?;
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;
        out.write_all(&buf)?;
    }

    let shp_path = match shapefile {
        Some(member) => dir.path().join(member),
        None => find_file_with_extension(dir.path(), "shp")?,
    };
    AdminLayer::from_shapefile(&shp_path)
}

#[cfg(test)]
mod tests {
    use geo::polygon;
    use polars::prelude::*;

    use super::*;
    use crate::blob::MemStore;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new("seasonyear".into(), vec![2019i32, 2020]),
            Column::new("sfed".into(), vec![0.25, 0.75]),
        ])
        .unwrap()
    }

    #[test]
    fn csv_payload_round_trip() {
        let store = MemStore::default();
        upload_csv(&store, "t/peaks.csv", &frame()).unwrap();
        let back = download_csv(&store, "t/peaks.csv").unwrap();
        assert!(back.equals(&frame()));
    }

    #[test]
    fn parquet_payload_round_trip() {
        let store = MemStore::default();
        upload_parquet(&store, "t/peaks.parquet", &frame()).unwrap();
        let back = download_parquet(&store, "t/peaks.parquet").unwrap();
        assert!(back.equals(&frame()));
    }

    #[test]
    fn admin_layer_payload_round_trip() {
        let data = DataFrame::new(vec![Column::new(
            "ADM3_PCODE".into(),
            vec!["NE003006003", "NE006008004"],
        )])
        .unwrap();
        let geoms = vec![
            geo::MultiPolygon(vec![polygon![
                (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0),
            ]]),
            geo::MultiPolygon(vec![polygon![
                (x: 2.0, y: 2.0), (x: 3.0, y: 2.0), (x: 3.0, y: 3.0), (x: 2.0, y: 3.0),
            ]]),
        ];
        let layer = AdminLayer::new(data, geoms).unwrap();

        let store = MemStore::default();
        upload_admin_layer(&store, "t/adm3.zip", &layer).unwrap();
        let back = download_admin_layer(&store, "t/adm3.zip", None).unwrap();

        assert_eq!(back.len(), 2);
        assert_eq!(back.ids("ADM3_PCODE").unwrap(), vec!["NE003006003", "NE006008004"]);
    }
}
