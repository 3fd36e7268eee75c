//! GeoTIFF loading for population rasters.
//!
//! Reads single-band GeoTIFFs (WorldPop-style, EPSG:4326) with the
//! georeferencing taken from the ModelTiepoint/ModelPixelScale tags and the
//! nodata value from the GDAL nodata tag.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, bail, ensure};
use ndarray::Array2;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use crate::raster::{GeoTransform, Raster2};

/// Read a single-band GeoTIFF into a raster, masking nodata to NaN.
pub fn read_geotiff(path: &Path) -> Result<Raster2> {
    let file = File::open(path)
        .with_context(|| format!("[io::geotiff] Failed to open {}", path.display()))?;
    let mut decoder = Decoder::new(BufReader::new(file))
        .with_context(|| format!("[io::geotiff] Not a TIFF file: {}", path.display()))?;

    let (width, height) = decoder
        .dimensions()
        .with_context(|| format!("[io::geotiff] Cannot read dimensions of {}", path.display()))?;

    let transform = read_transform(&mut decoder)
        .with_context(|| format!("[io::geotiff] Missing georeferencing in {}", path.display()))?;
    let nodata = read_nodata(&mut decoder);

    let image = decoder
        .read_image()
        .with_context(|| format!("[io::geotiff] Failed to decode {}", path.display()))?;
    let mut values = decoded_to_f64(image)?;
    ensure!(
        values.len() == (width as usize) * (height as usize),
        "[io::geotiff] expected a single band of {}x{} pixels",
        width,
        height
    );

    if let Some(nodata) = nodata {
        for v in values.iter_mut() {
            if *v == nodata {
                *v = f64::NAN;
            }
        }
    }

    let grid = Array2::from_shape_vec((height as usize, width as usize), values)
        .context("[io::geotiff] pixel buffer does not match image shape")?;
    Ok(Raster2 { grid, transform })
}

fn read_transform(decoder: &mut Decoder<BufReader<File>>) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .context("no ModelPixelScale tag")?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .context("no ModelTiepoint tag")?;
    ensure!(scale.len() >= 2, "ModelPixelScale has {} entries", scale.len());
    ensure!(tiepoint.len() >= 6, "ModelTiepoint has {} entries", tiepoint.len());

    // Tiepoint maps raster position (i, j) to world (x, y); scale_y is
    // stored positive for north-up rasters.
    let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
    let (x_res, y_res) = (scale[0], -scale[1]);
    Ok(GeoTransform {
        x_origin: x - i * x_res,
        y_origin: y - j * y_res,
        x_res,
        y_res,
    })
}

fn read_nodata(decoder: &mut Decoder<BufReader<File>>) -> Option<f64> {
    decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()
        .and_then(|s| s.trim().trim_end_matches('\0').parse().ok())
}

fn decoded_to_f64(image: DecodingResult) -> Result<Vec<f64>> {
    Ok(match image {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
        _ => bail!("[io::geotiff] unsupported pixel format"),
    })
}
