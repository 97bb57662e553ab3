use crate::models::{
    Inventory, ListingEntry, StationFile, StationId, StationYearKey, YearListing, YearLog,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// What one stale year needs: files to fetch, inventory rows to drop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearWorkSet {
    pub year: i32,
    /// Files newer than their inventory row, or with no row at all
    pub to_fetch: Vec<StationFile>,
    /// Inventory rows whose station is gone from the listing
    pub to_remove: Vec<StationYearKey>,
    pub up_to_date: usize,
    /// Every station present in the listing
    pub listed: BTreeSet<StationId>,
}

impl YearWorkSet {
    pub fn is_empty(&self) -> bool {
        self.to_fetch.is_empty() && self.to_remove.is_empty()
    }
}

/// Two-level diff between upstream listings and what has been mirrored.
#[derive(Debug, Clone, Default)]
pub struct StalenessDetector {
    from_year: Option<i32>,
    to_year: Option<i32>,
}

impl StalenessDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict year-level detection to an inclusive range
    pub fn with_year_range(mut self, from_year: Option<i32>, to_year: Option<i32>) -> Self {
        self.from_year = from_year;
        self.to_year = to_year;
        self
    }

    fn in_range(&self, year: i32) -> bool {
        self.from_year.map_or(true, |from| year >= from) && self.to_year.map_or(true, |to| year <= to)
    }

    /// Years whose logged timestamp is strictly older than upstream, ascending.
    /// Years never logged count as the epoch.
    pub fn stale_years(&self, log: &YearLog, listing: &[YearListing]) -> Vec<YearListing> {
        let mut newest: BTreeMap<i32, YearListing> = BTreeMap::new();
        for entry in listing.iter().filter(|y| self.in_range(y.year)) {
            match newest.get(&entry.year) {
                Some(seen) if seen.modified >= entry.modified => {}
                _ => {
                    newest.insert(entry.year, *entry);
                }
            }
        }

        newest
            .into_values()
            .filter(|y| log.logged(y.year) < y.modified)
            .collect()
    }

    /// Diff one year's upstream file listing against the inventory.
    ///
    /// Entries that are not station files of `year` are ignored. When two
    /// entries name the same station the newest one is kept, so each
    /// station-year appears at most once in `to_fetch`.
    pub fn stale_files(&self, year: i32, listing: &[ListingEntry], inventory: &Inventory) -> YearWorkSet {
        let mut files: BTreeMap<StationId, StationFile> = BTreeMap::new();
        for file in listing.iter().filter_map(|e| StationFile::from_entry(year, e)) {
            match files.get(&file.station) {
                Some(seen) if seen.modified >= file.modified => {}
                _ => {
                    files.insert(file.station.clone(), file);
                }
            }
        }

        let mut work = YearWorkSet {
            year,
            listed: files.keys().cloned().collect(),
            ..YearWorkSet::default()
        };

        for (station, file) in files {
            let key = StationYearKey::new(station, year);
            match inventory.get(&key) {
                Some(row) if row.last_updated >= file.modified => work.up_to_date += 1,
                _ => work.to_fetch.push(file),
            }
        }

        work.to_remove = inventory
            .rows_for_year(year)
            .filter(|row| !work.listed.contains(&row.station))
            .map(|row| row.key())
            .collect();

        debug!(
            year,
            fetch = work.to_fetch.len(),
            remove = work.to_remove.len(),
            up_to_date = work.up_to_date,
            "Diffed year listing"
        );

        work
    }
}
