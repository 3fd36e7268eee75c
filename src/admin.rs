//! Administrative boundary layers: attribute table + one multipolygon per row.

use std::path::Path;

use anyhow::{Context, Result, ensure};
use geo::{BooleanOps, MultiPolygon, Rect};
use polars::prelude::*;

use crate::common::shp::{
    dbf_table_builder, multipolygon_to_shp, read_shapefile, record_for_row,
    records_to_dataframe, shape_to_multipolygon,
};
use crate::raster::total_bounds;

/// An admin boundary dataset. Row `i` of `data` describes `geoms[i]`.
#[derive(Debug, Clone)]
pub struct AdminLayer {
    pub data: DataFrame,
    pub geoms: Vec<MultiPolygon<f64>>,
}

impl AdminLayer {
    pub fn new(data: DataFrame, geoms: Vec<MultiPolygon<f64>>) -> Result<Self> {
        ensure!(
            data.height() == geoms.len(),
            "[admin] attribute table has {} rows but {} geometries",
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

    /// The values of a string attribute column, in row order.
    pub fn ids(&self, col: &str) -> Result<Vec<String>> {
        Ok(self
            .data
            .column(col)
            .with_context(|| format!("[admin] missing id column {col:?}"))?
            .str()
            .with_context(|| format!("[admin] id column {col:?} must be String"))?
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect())
    }

    /// Keep only rows whose `col` value appears in `values`.
    pub fn filter_in(&self, col: &str, values: &[&str]) -> Result<AdminLayer> {
        let ids = self.ids(col)?;
        let mask: Vec<bool> = ids.iter().map(|id| values.contains(&id.as_str())).collect();

        let mask_ca = BooleanChunked::from_slice("mask".into(), &mask);
        let data = self.data.filter(&mask_ca)?;
        let geoms = self
            .geoms
            .iter()
            .zip(&mask)
            .filter(|&(_, &keep)| keep)
            .map(|(geom, _)| geom.clone())
            .collect();
        AdminLayer::new(data, geoms)
    }

    /// Dissolve rows sharing a `col` value into one row each, unioning their
    /// geometries.
    ///
    /// Groups keep their first-seen order and the attribute values of their
    /// first row; columns whose name contains any of `drop_markers` (the
    /// finer admin levels) are dropped.
    pub fn dissolve_by(&self, col: &str, drop_markers: &[&str]) -> Result<AdminLayer> {
        let ids = self.ids(col)?;

        let mut order: Vec<String> = Vec::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for (i, id) in ids.iter().enumerate() {
            match order.iter().position(|seen| seen == id) {
                Some(g) => groups[g].push(i),
                None => {
                    order.push(id.clone());
                    groups.push(vec![i]);
                }
            }
        }

        let mut geoms = Vec::with_capacity(groups.len());
        let mut first_rows: Vec<IdxSize> = Vec::with_capacity(groups.len());
        for group in &groups {
            let mut merged = self.geoms[group[0]].clone();
            for &i in &group[1..] {
                merged = merged.union(&self.geoms[i]);
            }
            geoms.push(merged);
            first_rows.push(group[0] as IdxSize);
        }

        let kept: Vec<&str> = self
            .data
            .get_column_names_str()
            .into_iter()
            .filter(|name| !drop_markers.iter().any(|marker| name.contains(marker)))
            .collect();
        let data = self
            .data
            .select(kept)?
            .take(&IdxCa::from_vec("idx".into(), first_rows))?;

        AdminLayer::new(data, geoms)
    }

    /// Axis-aligned bounds of all geometries.
    pub fn bounds(&self) -> Result<Rect<f64>> {
        total_bounds(&self.geoms)
    }

    /// Load a layer from a `.shp` file (plus its `.dbf` sidecar).
    pub fn from_shapefile(path: &Path) -> Result<AdminLayer> {
        let items = read_shapefile(path)?;
        let (shapes, records): (Vec<_>, Vec<_>) = items.into_iter().unzip();
        let geoms = shapes
            .iter()
            .map(shape_to_multipolygon)
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("[admin] bad geometry in {}", path.display()))?;
        let data = records_to_dataframe(&records)
            .with_context(|| format!("[admin] bad attribute table in {}", path.display()))?;
        AdminLayer::new(data, geoms)
    }

    /// Write the layer as an ESRI shapefile.
    ///
    /// String columns become character fields (dbase caps field names at 10
    /// characters), numeric columns become 20.6 numeric fields.
    pub fn write_shapefile(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            crate::common::fs::ensure_dir_exists(parent)
                .with_context(|| format!("[admin] create dir {}", parent.display()))?;
        }

        let (names, builder) = dbf_table_builder(&self.data)
            .with_context(|| format!("[admin] attribute table of {}", path.display()))?;
        let mut writer = shapefile::Writer::from_path(path, builder)
            .with_context(|| format!("[admin] create shapefile {}", path.display()))?;

        for (i, geom) in self.geoms.iter().enumerate() {
            let record = record_for_row(&self.data, &names, i)?;
            writer
                .write_shape_and_record(&multipolygon_to_shp(geom), &record)
                .with_context(|| format!("[admin] write feature {i}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use geo::{Area, polygon};

    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x0, y: y0), (x: x0 + size, y: y0), (x: x0 + size, y: y0 + size), (x: x0, y: y0 + size),
        ]])
    }

    fn layer() -> AdminLayer {
        let data = DataFrame::new(vec![
            Column::new("ADM2_PCODE".into(), vec!["NE00300", "NE00300", "NE00600"]),
            Column::new("ADM3_PCODE".into(), vec!["NE003001", "NE003002", "NE006001"]),
            Column::new("ADM3_FR".into(), vec!["a", "b", "c"]),
        ])
        .unwrap();
        // First two squares are adjacent, the third is far away.
        let geoms = vec![square(0.0, 0.0, 1.0), square(1.0, 0.0, 1.0), square(5.0, 5.0, 1.0)];
        AdminLayer::new(data, geoms).unwrap()
    }

    #[test]
    fn row_and_geometry_counts_must_match() {
        let data = DataFrame::new(vec![Column::new("ADM3_PCODE".into(), vec!["x"])]).unwrap();
        assert!(AdminLayer::new(data, vec![]).is_err());
    }

    #[test]
    fn filter_keeps_aligned_geometries() {
        let filtered = layer().filter_in("ADM3_PCODE", &["NE003002"]).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.ids("ADM3_FR").unwrap(), vec!["b"]);
        let min = filtered.bounds().unwrap().min();
        assert_eq!((min.x, min.y), (1.0, 0.0));
    }

    #[test]
    fn dissolve_unions_geometry_and_drops_finer_columns() {
        let dissolved = layer().dissolve_by("ADM2_PCODE", &["ADM3"]).unwrap();
        assert_eq!(dissolved.len(), 2);
        assert_eq!(dissolved.ids("ADM2_PCODE").unwrap(), vec!["NE00300", "NE00600"]);
        assert!(dissolved.data.column("ADM3_PCODE").is_err());
        // Two unit squares merged into a 2x1 rectangle.
        assert!((dissolved.geoms[0].unsigned_area() - 2.0).abs() < 1e-9);
        assert!((dissolved.geoms[1].unsigned_area() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn shapefile_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("layer.shp");

        let original = layer();
        original.write_shapefile(&path).unwrap();
        let back = AdminLayer::from_shapefile(&path).unwrap();

        assert_eq!(back.len(), original.len());
        assert_eq!(back.ids("ADM3_PCODE").unwrap(), original.ids("ADM3_PCODE").unwrap());
        for (a, b) in back.geoms.iter().zip(&original.geoms) {
            assert!((a.unsigned_area() - b.unsigned_area()).abs() < 1e-9);
        }
    }

    #[test]
    fn bounds_cover_all_rows() {
        let rect = layer().bounds().unwrap();
        assert_eq!((rect.min().x, rect.min().y), (0.0, 0.0));
        assert_eq!((rect.max().x, rect.max().y), (6.0, 6.0));
    }
}
