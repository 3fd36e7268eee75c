//! NetCDF raster-stack loading and writing.
//!
//! FloodScan SFED files are CF-style stacks with `time`/`lat`/`lon`
//! coordinate variables and a `days since <date>`-style time unit.

use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use chrono::NaiveDate;
use ndarray::Array3;
use regex::Regex;

use crate::raster::RasterStack;

/// Read a (time, lat, lon) variable from a NetCDF file into a raster stack.
///
/// The `_FillValue` attribute, when present, is masked to NaN.
pub fn read_stack(path: &Path, var_name: &str) -> Result<RasterStack> {
    let file = netcdf::open(path)
        .with_context(|| format!("[io::netcdf] Failed to open {}", path.display()))?;

    let var = file
        .variable(var_name)
        .with_context(|| format!("[io::netcdf] Missing variable {var_name:?} in {}", path.display()))?;

    let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    ensure!(
        dims == ["time", "lat", "lon"],
        "[io::netcdf] expected dimensions (time, lat, lon) for {var_name:?}, got {dims:?}"
    );
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

    let lats = read_axis(&file, "lat")?;
    let lons = read_axis(&file, "lon")?;
    let times = read_time_axis(&file)?;

    let mut values: Vec<f64> = var
        .get_values(..)
        .with_context(|| format!("[io::netcdf] Failed to read {var_name:?}"))?;
    if let Some(fill) = fill_value(&var) {
        for v in values.iter_mut() {
            if *v == fill {
                *v = f64::NAN;
            }
        }
    }

    let data = Array3::from_shape_vec((shape[0], shape[1], shape[2]), values)
        .context("[io::netcdf] variable data does not match its dimensions")?;
    RasterStack::new(data, times, lats, lons)
}

/// Write a raster stack as a CF-style NetCDF file.
pub fn write_stack(path: &Path, stack: &RasterStack, var_name: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("[io::netcdf] Failed to create directory {}", parent.display())
        })?;
    }
    let mut file = netcdf::create(path)
        .with_context(|| format!("[io::netcdf] Failed to create {}", path.display()))?;

    file.add_dimension("time", stack.times.len())?;
    file.add_dimension("lat", stack.lats.len())?;
    file.add_dimension("lon", stack.lons.len())?;

    let epoch = *stack
        .times
        .first()
        .context("[io::netcdf] refusing to write a stack with no time steps")?;
    let time_values: Vec<f64> =
        stack.times.iter().map(|&t| (t - epoch).num_days() as f64).collect();

    let mut time_var = file.add_variable::<f64>("time", &["time"])?;
    time_var.put_values(&time_values, ..)?;
    time_var.put_attribute("units", format!("days since {}", epoch.format("%Y-%m-%d")))?;

    let mut lat_var = file.add_variable::<f64>("lat", &["lat"])?;
    lat_var.put_values(&stack.lats, ..)?;
    lat_var.put_attribute("units", "degrees_north")?;

    let mut lon_var = file.add_variable::<f64>("lon", &["lon"])?;
    lon_var.put_values(&stack.lons, ..)?;
    lon_var.put_attribute("units", "degrees_east")?;

    let mut var = file.add_variable::<f64>(var_name, &["time", "lat", "lon"])?;
    let values: Vec<f64> = stack.data.iter().copied().collect();
    var.put_values(&values, ..)?;

    Ok(())
}

fn read_axis(file: &netcdf::File, name: &str) -> Result<Vec<f64>> {
    file.variable(name)
        .with_context(|| format!("[io::netcdf] Missing coordinate variable {name:?}"))?
        .get_values(..)
        .with_context(|| format!("[io::netcdf] Failed to read coordinate {name:?}"))
}

fn read_time_axis(file: &netcdf::File) -> Result<Vec<NaiveDate>> {
    let var = file
        .variable("time")
        .context("[io::netcdf] Missing coordinate variable \"time\"")?;
    let units = match var.attribute("units").map(|a| a.value()) {
        Some(Ok(netcdf::AttributeValue::Str(s))) => s,
        _ => bail!("[io::netcdf] time variable has no string \"units\" attribute"),
    };
    let (per_day, epoch) = parse_time_units(&units)?;

    let raw: Vec<f64> = var.get_values(..).context("[io::netcdf] Failed to read time axis")?;
    raw.iter()
        .map(|&v| {
            let days = (v / per_day).round() as i64;
            epoch
                .checked_add_signed(chrono::Duration::days(days))
                .with_context(|| format!("[io::netcdf] time value {v} out of range"))
        })
        .collect()
}

/// Parse a CF time unit like "days since 1998-01-12 00:00:00" into
/// (units per day, epoch date).
fn parse_time_units(units: &str) -> Result<(f64, NaiveDate)> {
    let re = Regex::new(r"^(days|hours|seconds) since (\d{4})-(\d{1,2})-(\d{1,2})")
        .expect("static regex");
    let caps = re
        .captures(units.trim())
        .with_context(|| format!("[io::netcdf] unsupported time units {units:?}"))?;

    let per_day = match &caps[1] {
        "days" => 1.0,
        "hours" => 24.0,
        _ => 86_400.0,
    };
    let epoch = NaiveDate::from_ymd_opt(
        caps[2].parse()?,
        caps[3].parse()?,
        caps[4].parse()?,
    )
    .with_context(|| format!("[io::netcdf] invalid epoch in time units {units:?}"))?;
    Ok((per_day, epoch))
}

fn fill_value(var: &netcdf::Variable) -> Option<f64> {
    match var.attribute("_FillValue")?.value().ok()? {
        netcdf::AttributeValue::Double(v) => Some(v),
        netcdf::AttributeValue::Float(v) => Some(v as f64),
        netcdf::AttributeValue::Int(v) => Some(v as f64),
        netcdf::AttributeValue::Short(v) => Some(v as f64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cf_time_units_parse() {
        let (per_day, epoch) = parse_time_units("days since 1998-01-12").unwrap();
        assert_eq!(per_day, 1.0);
        assert_eq!(epoch, NaiveDate::from_ymd_opt(1998, 1, 12).unwrap());

        let (per_day, epoch) = parse_time_units("hours since 2020-6-1 00:00:00").unwrap();
        assert_eq!(per_day, 24.0);
        assert_eq!(epoch, NaiveDate::from_ymd_opt(2020, 6, 1).unwrap());

        assert!(parse_time_units("fortnights since 2020-01-01").is_err());
    }

    #[test]
    fn netcdf_stack_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sfed.nc");

        let data = Array3::from_shape_fn((2, 3, 4), |(t, r, c)| (t * 12 + r * 4 + c) as f64);
        let stack = RasterStack::new(
            data,
            vec![
                NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
            ],
            vec![15.5, 14.5, 13.5],
            vec![0.5, 1.5, 2.5, 3.5],
        )
        .unwrap();

        write_stack(&path, &stack, "SFED_AREA").unwrap();
        let back = read_stack(&path, "SFED_AREA").unwrap();

        assert_eq!(back.times, stack.times);
        assert_eq!(back.lats, stack.lats);
        assert_eq!(back.lons, stack.lons);
        assert_eq!(back.data, stack.data);
    }
}
