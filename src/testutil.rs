//! Shared fixtures for datasource tests.

use std::path::Path;

use geo::polygon;
use polars::prelude::{Column, DataFrame};
use tiff::encoder::{TiffEncoder, colortype};
use tiff::tags::Tag;

use crate::admin::AdminLayer;
use crate::config::Config;

/// Three communes: two in Dosso (inside the AOI), one in Zinder (outside).
pub(crate) fn codab_fixture_layer() -> AdminLayer {
    let data = DataFrame::new(vec![
        Column::new("ADM0_PCODE".into(), vec!["NE", "NE", "NE"]),
        Column::new("ADM1_PCODE".into(), vec!["NE003", "NE003", "NE007"]),
        Column::new("ADM2_PCODE".into(), vec!["NE00306", "NE00306", "NE00701"]),
        Column::new("ADM3_PCODE".into(), vec!["NE003006003", "NE003006004", "NE007001001"]),
    ])
    .unwrap();
    let geoms = vec![
        geo::MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0),
        ]]),
        geo::MultiPolygon(vec![polygon![
            (x: 1.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0), (x: 1.0, y: 1.0),
        ]]),
        geo::MultiPolygon(vec![polygon![
            (x: 8.0, y: 8.0), (x: 9.0, y: 8.0), (x: 9.0, y: 9.0), (x: 8.0, y: 9.0),
        ]]),
    ];
    AdminLayer::new(data, geoms).unwrap()
}

/// Zip the fixture layer the way the fieldmaps archive is laid out and place
/// it at the config's raw codab path.
pub(crate) fn seed_codab(cfg: &Config) {
    let raw = cfg.codab_raw_path();
    std::fs::create_dir_all(raw.parent().unwrap()).unwrap();

    let shp_dir = cfg.data_dir.join("fixture_shp");
    codab_fixture_layer().write_shapefile(&shp_dir.join("ner_adm3.shp")).unwrap();

    let mut zip = zip::ZipWriter::new(std::fs::File::create(&raw).unwrap());
    for entry in std::fs::read_dir(&shp_dir).unwrap() {
        let path = entry.unwrap().path();
        let name = path.file_name().unwrap().to_str().unwrap().to_string();
        zip.start_file(name, zip::write::SimpleFileOptions::default()).unwrap();
        std::io::copy(&mut std::fs::File::open(&path).unwrap(), &mut zip).unwrap();
    }
    zip.finish().unwrap();
}

/// Write a single-band north-up GeoTIFF, row-major from the top-left cell.
pub(crate) fn write_geotiff(
    path: &Path,
    width: u32,
    height: u32,
    x_origin: f64,
    y_origin: f64,
    res: f64,
    data: &[f32],
) {
    assert_eq!(data.len(), (width * height) as usize);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(file).unwrap();
    let mut image = encoder.new_image::<colortype::Gray32Float>(width, height).unwrap();
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &[res, res, 0.0][..])
        .unwrap();
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &[0.0, 0.0, 0.0, x_origin, y_origin, 0.0][..])
        .unwrap();
    image.write_data(data).unwrap();
}
