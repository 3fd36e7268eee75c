//! Shapefile access and shapefile <-> geo geometry conversion.

use std::path::Path;

use anyhow::{Context, Result, bail};
use polars::prelude::*;
use shapefile::dbase::{FieldValue, Record};
use shapefile::{Reader, Shape};

/// Reads all shapes + attribute records from a given `.shp` file path.
pub fn read_shapefile(path: &Path) -> Result<Vec<(Shape, Record)>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open shapefile: {}", path.display()))?;

    let mut items = Vec::with_capacity(reader.shape_count()?);
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.context("Error reading shape+record")?;
        items.push((shape, record));
    }
    Ok(items)
}

/// Get the value of a character field from a Record.
pub fn get_character_field(record: &Record, field: &str) -> Result<String> {
    match record.get(field) {
        Some(FieldValue::Character(Some(s))) => Ok(s.trim().to_string()),
        _ => bail!("missing or invalid character field: {}", field),
    }
}

/// Get the value of a numeric field from a Record.
pub fn get_numeric_field(record: &Record, field: &str) -> Result<f64> {
    match record.get(field) {
        Some(FieldValue::Numeric(Some(n))) => Ok(*n),
        Some(FieldValue::Float(Some(n))) => Ok(*n as f64),
        _ => bail!("missing or invalid numeric field: {}", field),
    }
}

/// Convert dbase attribute records into a DataFrame, one column per field.
///
/// Column order and the field set come from the first record. Character and
/// date fields become String columns, numeric fields Float64; missing values
/// become nulls.
pub fn records_to_dataframe(records: &[Record]) -> Result<DataFrame> {
    let Some(first) = records.first() else {
        bail!("cannot build a DataFrame from zero records");
    };

    let mut columns = Vec::new();
    for (field, probe) in first.clone() {
        let column = match probe {
            FieldValue::Numeric(_) | FieldValue::Float(_) | FieldValue::Integer(_)
            | FieldValue::Double(_) => {
                let values: Vec<Option<f64>> = records
                    .iter()
                    .map(|record| match record.get(&field) {
                        Some(FieldValue::Numeric(v)) => *v,
                        Some(FieldValue::Float(v)) => v.map(|x| x as f64),
                        Some(FieldValue::Integer(v)) => Some(*v as f64),
                        Some(FieldValue::Double(v)) => Some(*v),
                        _ => None,
                    })
                    .collect();
                Column::new(field.as_str().into(), values)
            }
            _ => {
                let values: Vec<Option<String>> = records
                    .iter()
                    .map(|record| match record.get(&field) {
                        Some(FieldValue::Character(v)) => {
                            v.as_ref().map(|s| s.trim().to_string())
                        }
                        Some(FieldValue::Date(v)) => v.map(|d| {
                            format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day())
                        }),
                        Some(FieldValue::Logical(v)) => v.map(|b| b.to_string()),
                        _ => None,
                    })
                    .collect();
                Column::new(field.as_str().into(), values)
            }
        };
        columns.push(column);
    }
    DataFrame::new(columns).context("failed to assemble DataFrame from dbase records")
}

/// Convert shapefile::Polygon to geo::MultiPolygon<f64>
pub fn shp_to_multipolygon(p: &shapefile::Polygon) -> geo::MultiPolygon<f64> {
    /// Ensure first and last are the same for geo::LineString coords
    fn ensure_closed(coords: &mut Vec<geo::Coord<f64>>) {
        if !coords.is_empty() && coords[0] != coords[coords.len() - 1] {
            coords.push(coords[0])
        }
    }

    /// Get the signed area of a geo::Coord list (negative for hole)
    fn signed_area(pts: &[geo::Coord<f64>]) -> f64 {
        let mut a = 0.0;
        for w in pts.windows(2) {
            a += w[0].x * w[1].y - w[1].x * w[0].y;
        }
        a / 2.0
    }

    // Convert each ring into a closed LineString; CW rings are exteriors in
    // the shapefile convention.
    let mut ls_rings: Vec<(geo::LineString<f64>, bool)> = Vec::with_capacity(p.rings().len());
    for ring in p.rings().iter() {
        let mut coords: Vec<geo::Coord<f64>> =
            ring.points().iter().map(|pt| geo::Coord { x: pt.x, y: pt.y }).collect();
        ensure_closed(&mut coords);
        let ls = geo::LineString(coords);
        let is_exterior = signed_area(&ls.0) < 0.0;
        ls_rings.push((ls, is_exterior));
    }

    // Group each exterior with its following holes (shapefiles store rings in
    // this order).
    let mut polys: Vec<geo::Polygon<f64>> = Vec::new();
    let mut current_exterior: Option<geo::LineString<f64>> = None;
    let mut current_holes: Vec<geo::LineString<f64>> = Vec::new();

    for (ls, is_exterior) in ls_rings {
        if is_exterior {
            if let Some(ext) = current_exterior.take() {
                polys.push(geo::Polygon::new(ext, current_holes));
                current_holes = Vec::new();
            }
            current_exterior = Some(ls);
        } else {
            current_holes.push(ls);
        }
    }
    if let Some(ext) = current_exterior {
        polys.push(geo::Polygon::new(ext, current_holes));
    }

    geo::MultiPolygon(polys)
}

/// Convert any polygonal Shape variant to geo::MultiPolygon<f64>.
pub fn shape_to_multipolygon(shape: &Shape) -> Result<geo::MultiPolygon<f64>> {
    match shape {
        Shape::Polygon(p) => Ok(shp_to_multipolygon(p)),
        other => bail!("expected polygon geometry, got {}", other.shapetype()),
    }
}

/// Convert any polyline Shape variant to geo::MultiLineString<f64>.
pub fn shape_to_multilinestring(shape: &Shape) -> Result<geo::MultiLineString<f64>> {
    match shape {
        Shape::Polyline(line) => Ok(geo::MultiLineString(
            line.parts()
                .iter()
                .map(|part| {
                    geo::LineString(
                        part.iter().map(|pt| geo::Coord { x: pt.x, y: pt.y }).collect(),
                    )
                })
                .collect(),
        )),
        other => bail!("expected polyline geometry, got {}", other.shapetype()),
    }
}

/// Convert geo::MultiPolygon<f64> to shapefile::Polygon.
pub fn multipolygon_to_shp(mp: &geo::MultiPolygon<f64>) -> shapefile::Polygon {
    use shapefile::{Point, PolygonRing};

    let mut rings: Vec<PolygonRing<Point>> = Vec::new();
    for poly in &mp.0 {
        rings.push(PolygonRing::Outer(
            poly.exterior().coords().map(|c| Point::new(c.x, c.y)).collect(),
        ));
        for hole in poly.interiors() {
            rings.push(PolygonRing::Inner(
                hole.coords().map(|c| Point::new(c.x, c.y)).collect(),
            ));
        }
    }
    shapefile::Polygon::with_rings(rings)
}

/// Build a dbase table writer for a DataFrame's columns.
///
/// Field names are capped at 10 characters (the dbf limit); the truncated
/// names are returned for use with [`record_for_row`]. String columns become
/// character fields, numeric columns 20.6 numeric fields.
pub fn dbf_table_builder(
    df: &DataFrame,
) -> Result<(Vec<String>, shapefile::dbase::TableWriterBuilder)> {
    use shapefile::dbase::{FieldName, TableWriterBuilder};

    let names: Vec<String> = df
        .get_column_names_str()
        .into_iter()
        .map(|name| name.chars().take(10).collect())
        .collect();

    let mut builder = TableWriterBuilder::new();
    for (name, column) in names.iter().zip(df.get_columns()) {
        let field = FieldName::try_from(name.as_str())
            .map_err(|e| anyhow::anyhow!("bad dbf field name {name:?}: {e:?}"))?;
        builder = match column.dtype() {
            DataType::String => builder.add_character_field(field, 100),
            DataType::Float64 | DataType::Int32 | DataType::Int64 => {
                builder.add_numeric_field(field, 20, 6)
            }
            other => bail!("cannot write column {name:?} of dtype {other} to dbf"),
        };
    }
    Ok((names, builder))
}

/// The attribute record for row `i`, using the field names from
/// [`dbf_table_builder`].
pub fn record_for_row(df: &DataFrame, names: &[String], i: usize) -> Result<Record> {
    let mut record = Record::default();
    for (name, column) in names.iter().zip(df.get_columns()) {
        let value = match column.dtype() {
            DataType::String => {
                FieldValue::Character(column.str()?.get(i).map(|s| s.to_string()))
            }
            DataType::Float64 => FieldValue::Numeric(column.f64()?.get(i)),
            DataType::Int32 => FieldValue::Numeric(column.i32()?.get(i).map(f64::from)),
            DataType::Int64 => FieldValue::Numeric(column.i64()?.get(i).map(|v| v as f64)),
            other => bail!("cannot write dtype {other} to dbf"),
        };
        record.insert(name.clone(), value);
    }
    Ok(record)
}

/// Convert geo::MultiLineString<f64> to shapefile::Polyline.
pub fn multilinestring_to_shp(mls: &geo::MultiLineString<f64>) -> shapefile::Polyline {
    let parts: Vec<Vec<shapefile::Point>> = mls
        .0
        .iter()
        .map(|ls| ls.coords().map(|c| shapefile::Point::new(c.x, c.y)).collect())
        .collect();
    shapefile::Polyline::with_parts(parts)
}
