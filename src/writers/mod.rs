pub mod csv_writer;
pub mod parquet_writer;

pub use csv_writer::{encode_inventory, encode_registry, encode_year_log};
pub use parquet_writer::{observation_schema, ParquetFileInfo, ParquetWriter};
