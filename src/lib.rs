#![doc = "Data pipeline for flood anticipatory action in Niger"]
pub mod admin;
pub mod analysis;
pub mod blob;
pub mod cli;
pub mod commands;
pub mod common;
pub mod config;
pub mod constants;
pub mod datasources;
pub mod io;
pub mod raster;
pub mod season;
pub mod zonal;

#[cfg(test)]
mod testutil;

#[doc(inline)]
pub use admin::AdminLayer;

#[doc(inline)]
pub use config::Config;

#[doc(inline)]
pub use raster::{Raster2, RasterStack};

#[doc(inline)]
pub use season::{SeasonAnchor, shift_to_floodseason};

#[doc(inline)]
pub use analysis::{get_peak, get_triggers};
