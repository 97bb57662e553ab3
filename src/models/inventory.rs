use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::models::StationId;

/// Inventory primary key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StationYearKey {
    pub year: i32,
    pub station: StationId,
}

impl StationYearKey {
    pub fn new(station: StationId, year: i32) -> Self {
        Self { year, station }
    }
}

impl fmt::Display for StationYearKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.station, self.year)
    }
}

/// Monthly observation counts for one station-year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRow {
    pub station: StationId,
    pub year: i32,
    pub last_updated: DateTime<Utc>,
    pub monthly_counts: [u32; 12],
}

impl InventoryRow {
    pub fn key(&self) -> StationYearKey {
        StationYearKey::new(self.station.clone(), self.year)
    }

    pub fn total_count(&self) -> u64 {
        self.monthly_counts.iter().map(|c| *c as u64).sum()
    }
}

/// The persisted station-year inventory; at most one row per key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    rows: BTreeMap<StationYearKey, InventoryRow>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &StationYearKey) -> Option<&InventoryRow> {
        self.rows.get(key)
    }

    /// Insert or replace the row for its key.
    pub fn upsert(&mut self, row: InventoryRow) -> Option<InventoryRow> {
        self.rows.insert(row.key(), row)
    }

    pub fn remove(&mut self, key: &StationYearKey) -> Option<InventoryRow> {
        self.rows.remove(key)
    }

    pub fn rows_for_year(&self, year: i32) -> impl Iterator<Item = &InventoryRow> {
        self.rows
            .range(year_start(year)..)
            .take_while(move |(key, _)| key.year == year)
            .map(|(_, row)| row)
    }

    pub fn station_ids(&self) -> BTreeSet<StationId> {
        self.rows.keys().map(|k| k.station.clone()).collect()
    }

    pub fn years(&self) -> BTreeSet<i32> {
        self.rows.keys().map(|k| k.year).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InventoryRow> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<InventoryRow> for Inventory {
    fn from_iter<I: IntoIterator<Item = InventoryRow>>(iter: I) -> Self {
        let mut inventory = Inventory::new();
        for row in iter {
            inventory.upsert(row);
        }
        inventory
    }
}

// Smallest possible key of a year: keys order by year first, then station.
fn year_start(year: i32) -> StationYearKey {
    StationYearKey::new(StationId::new("", ""), year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::epoch;

    fn row(id: &str, year: i32, jan: u32) -> InventoryRow {
        let mut monthly_counts = [0; 12];
        monthly_counts[0] = jan;
        InventoryRow {
            station: id.parse().unwrap(),
            year,
            last_updated: epoch(),
            monthly_counts,
        }
    }

    #[test]
    fn test_upsert_replaces_row() {
        let mut inventory = Inventory::new();
        inventory.upsert(row("010010-99999", 2010, 31));
        inventory.upsert(row("010010-99999", 2010, 12));

        assert_eq!(inventory.len(), 1);
        let key = StationYearKey::new("010010-99999".parse().unwrap(), 2010);
        assert_eq!(inventory.get(&key).unwrap().monthly_counts[0], 12);
    }

    #[test]
    fn test_rows_for_year() {
        let inventory: Inventory = vec![
            row("010010-99999", 2009, 1),
            row("010010-99999", 2010, 2),
            row("010020-99999", 2010, 3),
            row("010010-99999", 2011, 4),
        ]
        .into_iter()
        .collect();

        let counts: Vec<u32> = inventory
            .rows_for_year(2010)
            .map(|r| r.monthly_counts[0])
            .collect();
        assert_eq!(counts, vec![2, 3]);
        assert_eq!(inventory.station_ids().len(), 2);
        assert_eq!(inventory.years().len(), 3);
    }

    #[test]
    fn test_key_display() {
        let key = StationYearKey::new("010010-99999".parse().unwrap(), 2010);
        assert_eq!(key.to_string(), "010010-99999-2010");
    }
}
