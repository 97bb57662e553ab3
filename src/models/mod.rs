pub mod inventory;
pub mod listing;
pub mod observation;
pub mod station;
pub mod year_log;

pub use inventory::{Inventory, InventoryRow, StationYearKey};
pub use listing::{ListingEntry, StationFile, YearListing};
pub use observation::{DailyObservation, WeatherEvents};
pub use station::{StationId, StationMetadata, StationRegistry};
pub use year_log::YearLog;
