use chrono::{DateTime, Utc};

use crate::models::StationId;
use crate::utils::filename::parse_station_file_name;

/// One `(name, last-modified)` pair from an upstream directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub modified: DateTime<Utc>,
}

impl ListingEntry {
    pub fn new(name: impl Into<String>, modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            modified,
        }
    }
}

/// Upstream modification timestamp of a year directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearListing {
    pub year: i32,
    pub modified: DateTime<Utc>,
}

impl YearListing {
    /// Year directories are listed as `YYYY/`; anything else (readme files,
    /// tarballs) is not a year.
    pub fn from_entry(entry: &ListingEntry) -> Option<Self> {
        let name = entry.name.trim_end_matches('/');
        if name.len() != 4 || !name.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        Some(Self {
            year: name.parse().ok()?,
            modified: entry.modified,
        })
    }
}

/// A station-year file as published upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationFile {
    pub station: StationId,
    pub year: i32,
    pub file_name: String,
    pub modified: DateTime<Utc>,
}

impl StationFile {
    /// Interpret a per-year listing entry; returns `None` for entries that
    /// are not station files of `year` (e.g. `gsod_2010.tar`).
    pub fn from_entry(year: i32, entry: &ListingEntry) -> Option<Self> {
        let (station, file_year) = parse_station_file_name(&entry.name)?;
        if file_year != year {
            return None;
        }

        Some(Self {
            station,
            year,
            file_name: entry.name.clone(),
            modified: entry.modified,
        })
    }
}
