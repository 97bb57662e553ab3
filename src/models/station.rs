use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::error::{Result, SyncError};
use crate::utils::coordinates::{
    clean_elevation, clean_latitude, clean_longitude, clean_station_name,
};

/// Two-part station identity (USAF, WBAN), written as `USAF-WBAN`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StationId {
    pub usaf: String,
    pub wban: String,
}

impl StationId {
    pub fn new(usaf: impl Into<String>, wban: impl Into<String>) -> Self {
        Self {
            usaf: usaf.into(),
            wban: wban.into(),
        }
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.usaf, self.wban)
    }
}

impl FromStr for StationId {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().split_once('-') {
            Some((usaf, wban)) if !usaf.is_empty() && !wban.is_empty() && !wban.contains('-') => {
                Ok(StationId::new(usaf, wban))
            }
            _ => Err(SyncError::InvalidFormat(format!(
                "Invalid station identity: '{}'",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StationMetadata {
    pub id: StationId,

    #[validate(length(min = 1))]
    pub name: Option<String>,

    pub country: Option<String>,
    pub state: Option<String>,
    pub icao: Option<String>,

    #[validate(range(exclusive_min = -90.0, exclusive_max = 90.0))]
    pub latitude: Option<f64>,

    #[validate(range(exclusive_min = -180.0, exclusive_max = 180.0))]
    pub longitude: Option<f64>,

    #[validate(range(min = -418.0))]
    pub elevation: Option<f64>,

    pub begin: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl StationMetadata {
    /// A row carrying only the identity, for stations seen in the archive
    /// but unknown to the upstream registry.
    pub fn minimal(id: StationId) -> Self {
        Self {
            id,
            name: None,
            country: None,
            state: None,
            icao: None,
            latitude: None,
            longitude: None,
            elevation: None,
            begin: None,
            end: None,
        }
    }

    /// Null every attribute that falls outside its physical bounds or is an
    /// upstream placeholder.
    pub fn sanitized(self) -> Self {
        Self {
            name: clean_station_name(self.name),
            country: non_blank(self.country),
            state: non_blank(self.state),
            icao: non_blank(self.icao),
            latitude: clean_latitude(self.latitude),
            longitude: clean_longitude(self.longitude),
            elevation: clean_elevation(self.elevation),
            ..self
        }
    }

    pub fn has_descriptive_attributes(&self) -> bool {
        self.name.is_some()
            || self.country.is_some()
            || self.latitude.is_some()
            || self.longitude.is_some()
            || self.elevation.is_some()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Station metadata keyed by identity; at most one row per station.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationRegistry {
    stations: BTreeMap<StationId, StationMetadata>,
}

impl StationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &StationId) -> Option<&StationMetadata> {
        self.stations.get(id)
    }

    pub fn contains(&self, id: &StationId) -> bool {
        self.stations.contains_key(id)
    }

    /// Insert a row. Upstream occasionally lists one identity twice; the row
    /// whose active range ends latest wins.
    pub fn insert(&mut self, station: StationMetadata) {
        match self.stations.get(&station.id) {
            Some(existing) if existing.end > station.end => {}
            _ => {
                self.stations.insert(station.id.clone(), station);
            }
        }
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&StationId) -> bool,
    {
        self.stations.retain(|id, _| keep(id));
    }

    pub fn ids(&self) -> BTreeSet<StationId> {
        self.stations.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StationMetadata> {
        self.stations.values()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

impl FromIterator<StationMetadata> for StationRegistry {
    fn from_iter<I: IntoIterator<Item = StationMetadata>>(iter: I) -> Self {
        let mut registry = StationRegistry::new();
        for station in iter {
            registry.insert(station);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heathrow() -> StationMetadata {
        StationMetadata {
            id: StationId::new("037720", "99999"),
            name: Some("HEATHROW".to_string()),
            country: Some("UK".to_string()),
            state: None,
            icao: Some("EGLL".to_string()),
            latitude: Some(51.478),
            longitude: Some(-0.461),
            elevation: Some(25.3),
            begin: NaiveDate::from_ymd_opt(1948, 12, 1),
            end: NaiveDate::from_ymd_opt(2016, 5, 1),
        }
    }

    #[test]
    fn test_station_id_round_trip() {
        let id: StationId = "999999-99999".parse().unwrap();
        assert_eq!(id.usaf, "999999");
        assert_eq!(id.wban, "99999");
        assert_eq!(id.to_string(), "999999-99999");
        assert!("010010".parse::<StationId>().is_err());
        assert!("010010-99999-2010".parse::<StationId>().is_err());
    }

    #[test]
    fn test_station_validation() {
        let station = heathrow();
        assert!(station.validate().is_ok());
        assert!(station.has_descriptive_attributes());
    }

    #[test]
    fn test_sanitize_out_of_bounds() {
        let mut station = heathrow();
        station.latitude = Some(91.0);
        station.elevation = Some(-500.0);
        station.name = Some("NAME UNKNOWN".to_string());
        assert!(station.validate().is_err());

        let cleaned = station.sanitized();
        assert_eq!(cleaned.latitude, None);
        assert_eq!(cleaned.elevation, None);
        assert_eq!(cleaned.name, None);
        assert_eq!(cleaned.longitude, Some(-0.461));
        assert!(cleaned.validate().is_ok());
    }

    #[test]
    fn test_sanitize_keeps_boundary_values() {
        let mut station = heathrow();
        station.latitude = Some(-89.9);
        station.elevation = Some(-418.0);
        let cleaned = station.sanitized();
        assert_eq!(cleaned.latitude, Some(-89.9));
        assert_eq!(cleaned.elevation, Some(-418.0));
    }

    #[test]
    fn test_registry_prefers_latest_end_date() {
        let mut older = heathrow();
        older.end = NaiveDate::from_ymd_opt(1990, 1, 1);
        older.name = Some("LONDON/HEATHROW OLD".to_string());

        let registry: StationRegistry = vec![heathrow(), older].into_iter().collect();
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry
                .get(&StationId::new("037720", "99999"))
                .and_then(|s| s.name.clone()),
            Some("HEATHROW".to_string())
        );
    }

    #[test]
    fn test_minimal_row_has_no_attributes() {
        let row = StationMetadata::minimal(StationId::new("A00001", "12345"));
        assert!(!row.has_descriptive_attributes());
        assert!(row.validate().is_ok());
    }
}
