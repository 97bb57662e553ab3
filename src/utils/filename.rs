use chrono::{Datelike, Local};
use std::path::PathBuf;

use crate::models::StationId;
use crate::utils::constants::DATASET_EXTENSION;

/// Parse an upstream station-file name such as `010010-99999-2010.op.gz`
/// into its station identity and year.
pub fn parse_station_file_name(name: &str) -> Option<(StationId, i32)> {
    let stem = name
        .strip_suffix(".op.gz")
        .or_else(|| name.strip_suffix(".op"))?;

    let (identity, year) = stem.rsplit_once('-')?;
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let station = identity.parse::<StationId>().ok()?;
    Some((station, year.parse().ok()?))
}

/// Object store prefix holding every dataset of a year.
pub fn dataset_prefix(year: i32) -> String {
    format!("{}/", year)
}

/// Object store key of a transformed station-year dataset: `<year>/<USAF-WBAN>.parquet`
pub fn dataset_key(year: i32, station: &StationId) -> String {
    format!("{}{}.{}", dataset_prefix(year), station, DATASET_EXTENSION)
}

/// Inverse of [`dataset_key`]
pub fn parse_dataset_key(key: &str) -> Option<(i32, StationId)> {
    let (year, file) = key.split_once('/')?;
    let identity = file.strip_suffix(&format!(".{}", DATASET_EXTENSION))?;
    Some((year.parse().ok()?, identity.parse().ok()?))
}

/// Generate default Parquet filename with format: gsod-transform-{YYMMDD}.parquet
pub fn generate_default_parquet_filename() -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100; // Get last 2 digits of year

    let filename = format!(
        "gsod-transform-{:02}{:02}{:02}.parquet",
        year,
        now.month(),
        now.day()
    );
    PathBuf::from("output").join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_station_file_name() {
        let (station, year) = parse_station_file_name("010010-99999-2010.op.gz").unwrap();
        assert_eq!(station, StationId::new("010010", "99999"));
        assert_eq!(year, 2010);

        let (station, _) = parse_station_file_name("999999-94645-1990.op").unwrap();
        assert_eq!(station.to_string(), "999999-94645");

        assert!(parse_station_file_name("gsod_2010.tar").is_none());
        assert!(parse_station_file_name("010010-99999.op.gz").is_none());
        assert!(parse_station_file_name("readme.txt").is_none());
    }

    #[test]
    fn test_dataset_key_round_trip() {
        let station = StationId::new("010010", "99999");
        let key = dataset_key(2010, &station);
        assert_eq!(key, "2010/010010-99999.parquet");
        assert_eq!(parse_dataset_key(&key), Some((2010, station)));
        assert_eq!(parse_dataset_key("isd-inventory.csv"), None);
    }

    #[test]
    fn test_generate_default_parquet_filename() {
        let filename = generate_default_parquet_filename();
        let filename_str = filename.to_string_lossy();

        assert!(filename_str.starts_with("output/"));
        assert!(filename_str.contains("gsod-transform-"));
        assert!(filename_str.ends_with(".parquet"));
    }
}
