pub mod download;
pub mod fs;
pub mod shp;
