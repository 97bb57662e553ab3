use crate::error::Result;
use crate::models::{Inventory, StationRegistry, YearLog};
use crate::readers::station_reader::REGISTRY_DATE_FORMAT;
use crate::utils::constants::MONTH_NAMES;
use crate::utils::time::format_timestamp;
use serde::Serialize;

#[derive(Serialize)]
struct YearLogRecord {
    #[serde(rename = "Year")]
    year: i32,
    #[serde(rename = "Modified")]
    modified: String,
}

#[derive(Serialize)]
struct HistoryRecord<'a> {
    #[serde(rename = "USAF")]
    usaf: &'a str,
    #[serde(rename = "WBAN")]
    wban: &'a str,
    #[serde(rename = "STATION NAME")]
    name: Option<&'a str>,
    #[serde(rename = "CTRY")]
    country: Option<&'a str>,
    #[serde(rename = "STATE")]
    state: Option<&'a str>,
    #[serde(rename = "ICAO")]
    icao: Option<&'a str>,
    #[serde(rename = "LAT")]
    latitude: Option<f64>,
    #[serde(rename = "LON")]
    longitude: Option<f64>,
    #[serde(rename = "ELEV(M)")]
    elevation: Option<f64>,
    #[serde(rename = "BEGIN")]
    begin: Option<String>,
    #[serde(rename = "END")]
    end: Option<String>,
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer.into_inner().map_err(|e| e.into_error().into())
}

/// `Year,Modified`, ascending by year
pub fn encode_year_log(log: &YearLog) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for (year, modified) in log.iter() {
        writer.serialize(YearLogRecord {
            year,
            modified: format_timestamp(&modified),
        })?;
    }
    // An empty log still gets its header
    if log.is_empty() {
        writer.write_record(["Year", "Modified"])?;
    }
    finish(writer)
}

/// `ID,USAF,WBAN,YEAR,Last_Updated,JAN..DEC`, ordered by year then station
pub fn encode_inventory(inventory: &Inventory) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["ID", "USAF", "WBAN", "YEAR", "Last_Updated"];
    header.extend(MONTH_NAMES);
    writer.write_record(&header)?;

    for row in inventory.iter() {
        let mut record = vec![
            row.station.to_string(),
            row.station.usaf.clone(),
            row.station.wban.clone(),
            row.year.to_string(),
            format_timestamp(&row.last_updated),
        ];
        record.extend(row.monthly_counts.iter().map(|c| c.to_string()));
        writer.write_record(&record)?;
    }

    finish(writer)
}

/// Registry in the upstream `isd-history.csv` column layout
pub fn encode_registry(registry: &StationRegistry) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    if registry.is_empty() {
        writer.write_record([
            "USAF", "WBAN", "STATION NAME", "CTRY", "STATE", "ICAO", "LAT", "LON", "ELEV(M)",
            "BEGIN", "END",
        ])?;
    }

    for station in registry.iter() {
        writer.serialize(HistoryRecord {
            usaf: &station.id.usaf,
            wban: &station.id.wban,
            name: station.name.as_deref(),
            country: station.country.as_deref(),
            state: station.state.as_deref(),
            icao: station.icao.as_deref(),
            latitude: station.latitude,
            longitude: station.longitude,
            elevation: station.elevation,
            begin: station.begin.map(|d| d.format(REGISTRY_DATE_FORMAT).to_string()),
            end: station.end.map(|d| d.format(REGISTRY_DATE_FORMAT).to_string()),
        })?;
    }

    finish(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InventoryRow, StationId, StationMetadata};
    use crate::readers::{parse_year_log, InventoryReader, StationReader};
    use chrono::{NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_year_log_persists_and_reloads() -> Result<()> {
        let mut log = YearLog::new();
        log.advance(1930, Utc.with_ymd_and_hms(2016, 6, 1, 10, 12, 0).unwrap());
        log.advance(1929, crate::utils::time::epoch());

        let bytes = encode_year_log(&log)?;
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("Year,Modified\n1929,1970-01-01T00:00:00Z\n"));
        assert_eq!(parse_year_log(&bytes)?, log);

        let empty = encode_year_log(&YearLog::new())?;
        assert!(parse_year_log(&empty)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_inventory_persists_and_reloads() -> Result<()> {
        let mut monthly_counts = [0; 12];
        monthly_counts[0] = 217;
        monthly_counts[11] = 31;
        let inventory: Inventory = vec![InventoryRow {
            station: StationId::new("010010", "99999"),
            year: 2010,
            last_updated: Utc.with_ymd_and_hms(2016, 6, 1, 10, 12, 0).unwrap(),
            monthly_counts,
        }]
        .into_iter()
        .collect();

        let bytes = encode_inventory(&inventory)?;
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("ID,USAF,WBAN,YEAR,Last_Updated,JAN,FEB"));
        assert!(text.contains("010010-99999,010010,99999,2010,2016-06-01T10:12:00Z,217,"));
        assert_eq!(InventoryReader::new().parse_bytes(&bytes)?, inventory);
        Ok(())
    }

    #[test]
    fn test_registry_persists_and_reloads() -> Result<()> {
        let registry: StationRegistry = vec![
            StationMetadata {
                name: Some("JAN MAYEN".to_string()),
                country: Some("NO".to_string()),
                latitude: Some(70.933),
                longitude: Some(-8.667),
                elevation: Some(9.0),
                begin: NaiveDate::from_ymd_opt(1931, 1, 1),
                end: NaiveDate::from_ymd_opt(2020, 4, 29),
                ..StationMetadata::minimal(StationId::new("010010", "99999"))
            },
            StationMetadata::minimal(StationId::new("A00001", "12345")),
        ]
        .into_iter()
        .collect();

        let bytes = encode_registry(&registry)?;
        assert_eq!(StationReader::new().parse_bytes(&bytes)?, registry);

        let empty = encode_registry(&StationRegistry::new())?;
        assert!(StationReader::new().parse_bytes(&empty)?.is_empty());
        Ok(())
    }
}
