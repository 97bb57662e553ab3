use crate::error::{Result, SyncError};
use crate::models::{DailyObservation, Inventory, InventoryRow, StationId, StationYearKey};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// Build the inventory row for one transformed station-year.
///
/// Each month counts the non-null primary measurements of that month's
/// observations; days outside `year` are not counted.
pub fn summarize(
    station: &StationId,
    year: i32,
    observations: &[DailyObservation],
    last_updated: DateTime<Utc>,
) -> InventoryRow {
    let mut monthly_counts = [0u32; 12];
    for obs in observations.iter().filter(|o| o.year() == year) {
        monthly_counts[obs.month() as usize - 1] += obs.primary_observation_count();
    }

    InventoryRow {
        station: station.clone(),
        year,
        last_updated,
        monthly_counts,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaSummary {
    pub upserted: usize,
    pub removed: usize,
}

/// Pending inventory changes for one year, owned by a single writer.
///
/// Every key is touched at most once: a second upsert of a key, or an upsert
/// and a removal of the same key, is a `ReconciliationConflict`.
#[derive(Debug, Clone, Default)]
pub struct InventoryDelta {
    upserts: BTreeMap<StationYearKey, InventoryRow>,
    removals: BTreeSet<StationYearKey>,
}

impl InventoryDelta {
    pub fn new() -> Self {
        Self::default()
    }

    fn conflict(key: &StationYearKey) -> SyncError {
        SyncError::ReconciliationConflict {
            station: key.station.to_string(),
            year: key.year,
        }
    }

    pub fn upsert(&mut self, row: InventoryRow) -> Result<()> {
        let key = row.key();
        if self.upserts.contains_key(&key) || self.removals.contains(&key) {
            return Err(Self::conflict(&key));
        }
        self.upserts.insert(key, row);
        Ok(())
    }

    pub fn remove(&mut self, key: StationYearKey) -> Result<()> {
        if self.upserts.contains_key(&key) {
            return Err(Self::conflict(&key));
        }
        self.removals.insert(key);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.removals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.upserts.len() + self.removals.len()
    }

    /// Merge into the inventory: upserts replace, removals delete outright.
    pub fn apply(self, inventory: &mut Inventory) -> DeltaSummary {
        let mut summary = DeltaSummary::default();

        for key in &self.removals {
            if inventory.remove(key).is_some() {
                summary.removed += 1;
            }
        }
        for row in self.upserts.into_values() {
            inventory.upsert(row);
            summary.upserted += 1;
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeatherEvents;
    use crate::utils::time::epoch;
    use chrono::NaiveDate;

    fn station() -> StationId {
        StationId::new("010010", "99999")
    }

    fn observation(month: u32, day: u32, temp: Option<f64>, prcp: Option<f64>) -> DailyObservation {
        DailyObservation {
            station: station(),
            date: NaiveDate::from_ymd_opt(2010, month, day).unwrap(),
            elevation: None,
            station_name: None,
            country: None,
            latitude: None,
            longitude: None,
            mean_temp: temp,
            mean_temp_count: 24,
            mean_dewpoint: None,
            mean_dewpoint_count: 0,
            mean_sea_level_pressure: None,
            mean_sea_level_pressure_count: 0,
            mean_station_pressure: None,
            mean_station_pressure_count: 0,
            mean_visibility: None,
            mean_visibility_count: 0,
            mean_windspeed: None,
            mean_windspeed_count: 0,
            max_windspeed: Some(10.0),
            max_gust: None,
            max_temp: None,
            max_temp_quality_flag: false,
            min_temp: None,
            min_temp_quality_flag: false,
            precipitation: prcp,
            precipitation_flag: None,
            snow_depth: None,
            events: WeatherEvents::default(),
        }
    }

    #[test]
    fn test_summarize_counts_primary_measurements() {
        let observations = vec![
            observation(1, 1, Some(20.0), Some(0.0)),
            observation(1, 2, Some(21.0), None),
            observation(3, 1, None, None),
            observation(12, 31, None, Some(1.2)),
        ];

        let row = summarize(&station(), 2010, &observations, epoch());
        assert_eq!(row.monthly_counts[0], 3);
        assert_eq!(row.monthly_counts[2], 0);
        assert_eq!(row.monthly_counts[11], 1);
        assert_eq!(row.total_count(), 4);
    }

    #[test]
    fn test_reapplying_unchanged_file_is_idempotent() {
        let observations = vec![observation(1, 1, Some(20.0), Some(0.0))];
        let mut inventory = Inventory::new();

        for _ in 0..2 {
            let mut delta = InventoryDelta::new();
            delta
                .upsert(summarize(&station(), 2010, &observations, epoch()))
                .unwrap();
            delta.apply(&mut inventory);
        }

        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.iter().next().unwrap().monthly_counts[0], 2);
    }

    #[test]
    fn test_conflicting_upserts_are_rejected() {
        let row = summarize(&station(), 2010, &[], epoch());
        let mut delta = InventoryDelta::new();
        delta.upsert(row.clone()).unwrap();

        assert!(matches!(
            delta.upsert(row.clone()),
            Err(SyncError::ReconciliationConflict { year: 2010, .. })
        ));
        assert!(delta.remove(row.key()).is_err());

        let mut removal_first = InventoryDelta::new();
        removal_first.remove(row.key()).unwrap();
        assert!(removal_first.upsert(row).is_err());
    }

    #[test]
    fn test_apply_removes_rows() {
        let mut inventory: Inventory =
            vec![summarize(&station(), 2010, &[], epoch())].into_iter().collect();

        let mut delta = InventoryDelta::new();
        delta.remove(StationYearKey::new(station(), 2010)).unwrap();
        delta.remove(StationYearKey::new(station(), 2011)).unwrap();
        assert_eq!(delta.len(), 2);

        let summary = delta.apply(&mut inventory);
        assert_eq!(summary, DeltaSummary { upserted: 0, removed: 1 });
        assert!(inventory.is_empty());
    }
}
