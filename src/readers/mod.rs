pub mod inventory_reader;
pub mod op_reader;
pub mod station_reader;
pub mod year_log_reader;

pub use inventory_reader::InventoryReader;
pub use op_reader::{decode_payload, is_missing_value, OpReader};
pub use station_reader::StationReader;
pub use year_log_reader::parse_year_log;
