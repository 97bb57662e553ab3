pub mod constants;
pub mod coordinates;
pub mod filename;
pub mod progress;
pub mod time;

pub use constants::*;
pub use filename::{dataset_key, generate_default_parquet_filename, parse_station_file_name};
pub use progress::ProgressReporter;
pub use time::{epoch, format_timestamp, parse_timestamp};
