//! Zonal statistics: aggregate raster cell values over polygon regions.
//!
//! A cell belongs to a region when its center falls inside the region's
//! polygon; NaN cells (nodata, masked) are excluded from the sample.

use geo::MultiPolygon;

use crate::raster::Raster2;

/// Aggregates for one region. All fields are None when no valid cell fell
/// inside the region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionStats {
    pub mean: Option<f64>,
    pub max: Option<f64>,
    pub min: Option<f64>,
    /// One entry per requested percentile, in request order.
    pub percentiles: Vec<Option<f64>>,
}

/// Compute mean/max/min plus the requested percentiles of `raster` over each
/// region.
///
/// Percentiles are in [0, 100] and interpolated linearly on the sorted
/// sample.
pub fn zonal_stats(
    raster: &Raster2,
    regions: &[MultiPolygon<f64>],
    percentiles: &[f64],
) -> Vec<RegionStats> {
    regions
        .iter()
        .map(|region| {
            let sample = region_sample(raster, region);
            region_stats(&sample, percentiles)
        })
        .collect()
}

/// Sum of valid cell values inside one region.
pub fn zonal_sum(raster: &Raster2, region: &MultiPolygon<f64>) -> f64 {
    region_sample(raster, region).iter().sum()
}

/// Valid (finite) cell values whose centers fall inside the region.
fn region_sample(raster: &Raster2, region: &MultiPolygon<f64>) -> Vec<f64> {
    raster
        .cells_within(region)
        .into_iter()
        .map(|(row, col)| raster.grid[[row, col]])
        .filter(|v| v.is_finite())
        .collect()
}

fn region_stats(sample: &[f64], percentiles: &[f64]) -> RegionStats {
    if sample.is_empty() {
        return RegionStats {
            mean: None,
            max: None,
            min: None,
            percentiles: vec![None; percentiles.len()],
        };
    }

    let mut sorted = sample.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let percentiles = percentiles.iter().map(|&p| Some(percentile(&sorted, p))).collect();

    RegionStats { mean: Some(mean), max: Some(max), min: Some(min), percentiles }
}

/// Linear-interpolation percentile of a sorted, non-empty sample.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let p = p.clamp(0.0, 100.0);
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}
