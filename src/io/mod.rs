pub mod csv;
pub mod excel;
pub mod geotiff;
pub mod netcdf_io;
pub mod parquet;
