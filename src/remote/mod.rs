pub mod http;
pub mod listing;

use crate::error::Result;
use crate::models::{ListingEntry, YearListing};
use async_trait::async_trait;
use std::fmt;

pub use http::HttpArchive;
pub use listing::parse_index_page;

/// Typed location of an upstream object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RemotePath {
    /// A station-year file inside a year directory of the GSOD tree
    YearFile { year: i32, file_name: String },
    /// `isd-history.csv`, the station registry
    StationHistory,
    /// `isd-inventory.csv`, used to bootstrap a fresh inventory
    StationInventory,
}

impl RemotePath {
    pub fn year_file(year: i32, file_name: impl Into<String>) -> Self {
        RemotePath::YearFile {
            year,
            file_name: file_name.into(),
        }
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemotePath::YearFile { year, file_name } => write!(f, "{}/{}", year, file_name),
            RemotePath::StationHistory => write!(f, "{}", crate::utils::STATION_HISTORY_FILE),
            RemotePath::StationInventory => write!(f, "{}", crate::utils::STATION_INVENTORY_FILE),
        }
    }
}

/// Read access to the upstream archive.
///
/// Implementations report network-level failures as `TransientFetch`; the
/// caller decides how often to retry.
#[async_trait]
pub trait RemoteArchive: Send + Sync {
    /// Year directories with their last-modified timestamps
    async fn list_years(&self) -> Result<Vec<YearListing>>;

    /// Every entry of one year directory, station files or not
    async fn list_year_files(&self, year: i32) -> Result<Vec<ListingEntry>>;

    async fn fetch(&self, path: &RemotePath) -> Result<Vec<u8>>;
}
