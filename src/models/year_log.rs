use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::models::YearListing;
use crate::utils::time::epoch;

/// Year -> last upstream modification timestamp that was fully mirrored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearLog {
    entries: BTreeMap<i32, DateTime<Utc>>,
}

impl YearLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh log where every upstream year starts at the epoch.
    pub fn seeded(years: &[YearListing]) -> Self {
        Self {
            entries: years.iter().map(|y| (y.year, epoch())).collect(),
        }
    }

    /// Logged timestamp for a year; years never logged count as the epoch.
    pub fn logged(&self, year: i32) -> DateTime<Utc> {
        self.entries.get(&year).copied().unwrap_or_else(epoch)
    }

    pub fn contains(&self, year: i32) -> bool {
        self.entries.contains_key(&year)
    }

    pub fn advance(&mut self, year: i32, modified: DateTime<Utc>) {
        self.entries.insert(year, modified);
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, DateTime<Utc>)> + '_ {
        self.entries.iter().map(|(y, ts)| (*y, *ts))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_seeded_log_starts_at_epoch() {
        let modified = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let log = YearLog::seeded(&[
            YearListing {
                year: 1929,
                modified,
            },
            YearListing {
                year: 1930,
                modified,
            },
        ]);
        assert_eq!(log.len(), 2);
        assert_eq!(log.logged(1929), epoch());
        assert_eq!(log.logged(2001), epoch());
        assert!(!log.contains(2001));
    }

    #[test]
    fn test_advance_updates_entry() {
        let mut log = YearLog::new();
        let ts = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 0).unwrap();
        log.advance(2010, ts);
        assert_eq!(log.logged(2010), ts);
    }
}
