//! In-memory raster grids with simple north-up georeferencing.
//!
//! All rasters handled here are regular lat/lon grids (EPSG:4326); masked or
//! missing cells are NaN.

use anyhow::{Context, Result, bail, ensure};
use chrono::NaiveDate;
use geo::{Contains, Coord, MultiPolygon, Point, Rect};
use ndarray::{Array2, Array3, s};

/// Affine georeferencing for a north-up regular grid.
///
/// `(x_origin, y_origin)` is the outer corner of cell (0, 0); `y_res` is
/// negative for north-up grids.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub x_origin: f64,
    pub y_origin: f64,
    pub x_res: f64,
    pub y_res: f64,
}

impl GeoTransform {
    /// Center coordinates of cell (row, col).
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.x_origin + (col as f64 + 0.5) * self.x_res,
            self.y_origin + (row as f64 + 0.5) * self.y_res,
        )
    }

    /// Fractional (row, col) of a world coordinate; may be out of bounds.
    fn position(&self, x: f64, y: f64) -> (f64, f64) {
        ((y - self.y_origin) / self.y_res, (x - self.x_origin) / self.x_res)
    }

    /// Build a transform from cell-center coordinate axes.
    ///
    /// `lats` must be strictly descending (north-up), `lons` strictly
    /// ascending, both evenly spaced with at least two entries.
    pub fn from_axes(lats: &[f64], lons: &[f64]) -> Result<Self> {
        ensure!(lats.len() >= 2 && lons.len() >= 2, "[raster] need at least a 2x2 grid");
        let y_res = lats[1] - lats[0];
        let x_res = lons[1] - lons[0];
        ensure!(y_res < 0.0, "[raster] latitude axis must be descending (north-up)");
        ensure!(x_res > 0.0, "[raster] longitude axis must be ascending");
        Ok(Self {
            x_origin: lons[0] - x_res / 2.0,
            y_origin: lats[0] - y_res / 2.0,
            x_res,
            y_res,
        })
    }
}

/// A single 2-D grid plus its georeferencing.
#[derive(Debug, Clone)]
pub struct Raster2 {
    pub grid: Array2<f64>,
    pub transform: GeoTransform,
}

impl Raster2 {
    pub fn nrows(&self) -> usize {
        self.grid.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.grid.ncols()
    }

    /// Nearest-neighbour sample at a world coordinate; None outside the grid.
    pub fn sample(&self, x: f64, y: f64) -> Option<f64> {
        let (row, col) = self.transform.position(x, y);
        if row < 0.0 || col < 0.0 {
            return None;
        }
        let (row, col) = (row.floor() as usize, col.floor() as usize);
        if row >= self.nrows() || col >= self.ncols() {
            return None;
        }
        Some(self.grid[[row, col]])
    }

    /// Replace every cell for which `drop` returns true with NaN.
    pub fn mask_where(&mut self, drop: impl Fn(f64) -> bool) {
        self.grid.mapv_inplace(|v| if drop(v) { f64::NAN } else { v });
    }

    /// Sum of all finite cells.
    pub fn sum_valid(&self) -> f64 {
        self.grid.iter().copied().filter(|v| v.is_finite()).sum()
    }

    /// Row/col index window covering `rect`, clamped to the grid.
    ///
    /// Returns None when the rectangle misses the grid entirely.
    pub(crate) fn index_window(&self, rect: &Rect<f64>) -> Option<(usize, usize, usize, usize)> {
        let t = &self.transform;
        let (row_a, col_a) = t.position(rect.min().x, rect.max().y);
        let (row_b, col_b) = t.position(rect.max().x, rect.min().y);
        let row0 = row_a.floor().max(0.0) as usize;
        let col0 = col_a.floor().max(0.0) as usize;
        let row1 = (row_b.ceil() as isize).min(self.nrows() as isize) as usize;
        let col1 = (col_b.ceil() as isize).min(self.ncols() as isize) as usize;
        if row_b < 0.0 || col_b < 0.0 || row0 >= self.nrows() || col0 >= self.ncols() {
            return None;
        }
        Some((row0, row1, col0, col1))
    }

    /// Cell indices whose centers fall inside the region.
    pub fn cells_within(&self, region: &MultiPolygon<f64>) -> Vec<(usize, usize)> {
        use geo::BoundingRect;

        let Some(rect) = region.bounding_rect() else { return Vec::new() };
        let Some((row0, row1, col0, col1)) = self.index_window(&rect) else { return Vec::new() };

        let mut cells = Vec::new();
        for row in row0..row1 {
            for col in col0..col1 {
                let (x, y) = self.transform.cell_center(row, col);
                if region.contains(&Point::new(x, y)) {
                    cells.push((row, col));
                }
            }
        }
        cells
    }
}

/// A dated stack of 2-D slices sharing one grid (time x lat x lon).
#[derive(Debug, Clone)]
pub struct RasterStack {
    pub data: Array3<f64>,
    pub times: Vec<NaiveDate>,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
}

impl RasterStack {
    pub fn new(
        data: Array3<f64>,
        times: Vec<NaiveDate>,
        lats: Vec<f64>,
        lons: Vec<f64>,
    ) -> Result<Self> {
        let shape = data.shape();
        ensure!(
            shape == [times.len(), lats.len(), lons.len()],
            "[raster] stack shape {:?} does not match axes ({}, {}, {})",
            shape,
            times.len(),
            lats.len(),
            lons.len()
        );
        Ok(Self { data, times, lats, lons })
    }

    pub fn transform(&self) -> Result<GeoTransform> {
        GeoTransform::from_axes(&self.lats, &self.lons)
    }

    /// Copy out time slice `t` as a standalone raster.
    pub fn slice(&self, t: usize) -> Result<Raster2> {
        ensure!(t < self.times.len(), "[raster] time index {t} out of range");
        Ok(Raster2 {
            grid: self.data.slice(s![t, .., ..]).to_owned(),
            transform: self.transform()?,
        })
    }

    /// Restrict the stack to the cells whose centers fall inside `rect`.
    pub fn clip_bbox(&self, rect: &Rect<f64>) -> Result<RasterStack> {
        let lat_idx: Vec<usize> = self
            .lats
            .iter()
            .enumerate()
            .filter(|&(_, &lat)| lat >= rect.min().y && lat <= rect.max().y)
            .map(|(i, _)| i)
            .collect();
        let lon_idx: Vec<usize> = self
            .lons
            .iter()
            .enumerate()
            .filter(|&(_, &lon)| lon >= rect.min().x && lon <= rect.max().x)
            .map(|(i, _)| i)
            .collect();
        let (Some(&r0), Some(&r1)) = (lat_idx.first(), lat_idx.last()) else {
            bail!("[raster] clip box does not intersect the latitude axis");
        };
        let (Some(&c0), Some(&c1)) = (lon_idx.first(), lon_idx.last()) else {
            bail!("[raster] clip box does not intersect the longitude axis");
        };

        RasterStack::new(
            self.data.slice(s![.., r0..=r1, c0..=c1]).to_owned(),
            self.times.clone(),
            self.lats[r0..=r1].to_vec(),
            self.lons[c0..=c1].to_vec(),
        )
    }

    /// Mask out (set to NaN) every cell whose center is outside the region,
    /// on all time slices.
    pub fn clip_polygon(&mut self, region: &MultiPolygon<f64>) {
        for (row, &lat) in self.lats.iter().enumerate() {
            for (col, &lon) in self.lons.iter().enumerate() {
                if !region.contains(&Point::new(lon, lat)) {
                    self.data.slice_mut(s![.., row, col]).fill(f64::NAN);
                }
            }
        }
    }
}

/// Axis-aligned bounds of a set of regions, as a geo rectangle.
pub fn total_bounds(regions: &[MultiPolygon<f64>]) -> Result<Rect<f64>> {
    use geo::BoundingRect;

    let mut bounds: Option<Rect<f64>> = None;
    for region in regions {
        let Some(rect) = region.bounding_rect() else { continue };
        bounds = Some(match bounds {
            None => rect,
            Some(acc) => Rect::new(
                Coord {
                    x: acc.min().x.min(rect.min().x),
                    y: acc.min().y.min(rect.min().y),
                },
                Coord {
                    x: acc.max().x.max(rect.max().x),
                    y: acc.max().y.max(rect.max().y),
                },
            ),
        });
    }
    bounds.context("[raster] no non-empty regions to take bounds of")
}
