use crate::error::{Result, SyncError};
use crate::models::{StationId, StationMetadata, StationRegistry};
use crate::utils::coordinates::parse_optional_decimal;
use chrono::NaiveDate;
use encoding_rs::WINDOWS_1252;
use serde::Deserialize;
use std::borrow::Cow;
use std::path::Path;

/// Registry dates are written as `YYYYMMDD`
pub const REGISTRY_DATE_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Deserialize)]
struct HistoryRecord {
    #[serde(rename = "USAF")]
    usaf: String,
    #[serde(rename = "WBAN")]
    wban: String,
    #[serde(rename = "STATION NAME", default)]
    name: Option<String>,
    #[serde(rename = "CTRY", default)]
    country: Option<String>,
    #[serde(rename = "STATE", default)]
    state: Option<String>,
    #[serde(rename = "ICAO", default)]
    icao: Option<String>,
    #[serde(rename = "LAT", default)]
    latitude: Option<String>,
    #[serde(rename = "LON", default)]
    longitude: Option<String>,
    #[serde(rename = "ELEV(M)", default)]
    elevation: Option<String>,
    #[serde(rename = "BEGIN", default)]
    begin: Option<String>,
    #[serde(rename = "END", default)]
    end: Option<String>,
}

/// Reads the station registry (`isd-history.csv` layout), both the upstream
/// copy and the one persisted in the store.
pub struct StationReader {
    sanitize: bool,
}

impl StationReader {
    pub fn new() -> Self {
        Self { sanitize: true }
    }

    /// Keep attributes exactly as written, without bounds cleaning
    pub fn raw() -> Self {
        Self { sanitize: false }
    }

    pub fn read_path(&self, path: &Path) -> Result<StationRegistry> {
        let raw = std::fs::read(path)?;
        self.parse_bytes(&raw)
    }

    /// Parse registry CSV bytes. Upstream has shipped the file in both UTF-8
    /// and Windows-1252, so invalid UTF-8 is re-decoded rather than rejected.
    pub fn parse_bytes(&self, raw: &[u8]) -> Result<StationRegistry> {
        let text = decode_text(raw);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut registry = StationRegistry::new();
        for (index, record) in reader.deserialize::<HistoryRecord>().enumerate() {
            let record = record?;
            let station = self.to_metadata(record, index + 2)?;
            registry.insert(station);
        }

        Ok(registry)
    }

    fn to_metadata(&self, record: HistoryRecord, line: usize) -> Result<StationMetadata> {
        if record.usaf.is_empty() || record.wban.is_empty() {
            return Err(SyncError::malformed(line, "station", "missing USAF or WBAN"));
        }

        let station = StationMetadata {
            id: StationId::new(record.usaf, record.wban),
            name: record.name,
            country: record.country,
            state: record.state,
            icao: record.icao,
            latitude: record.latitude.as_deref().and_then(parse_optional_decimal),
            longitude: record.longitude.as_deref().and_then(parse_optional_decimal),
            elevation: record.elevation.as_deref().and_then(parse_optional_decimal),
            begin: parse_registry_date(record.begin.as_deref(), line, "begin")?,
            end: parse_registry_date(record.end.as_deref(), line, "end")?,
        };

        Ok(if self.sanitize {
            station.sanitized()
        } else {
            station
        })
    }
}

impl Default for StationReader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_registry_date(
    value: Option<&str>,
    line: usize,
    field: &'static str,
) -> Result<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, REGISTRY_DATE_FORMAT)
            .map(Some)
            .map_err(|e| SyncError::malformed(line, field, format!("'{}': {}", v, e))),
    }
}

/// UTF-8 when valid, Windows-1252 otherwise
pub fn decode_text(raw: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(raw) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            let (decoded, _, _) = WINDOWS_1252.decode(raw);
            decoded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str =
        "\"USAF\",\"WBAN\",\"STATION NAME\",\"CTRY\",\"STATE\",\"ICAO\",\"LAT\",\"LON\",\"ELEV(M)\",\"BEGIN\",\"END\"";

    #[test]
    fn test_parse_registry() -> Result<()> {
        let csv = format!(
            "{}\n{}\n{}\n",
            HEADER,
            "\"010010\",\"99999\",\"JAN MAYEN(NOR-NAVY)\",\"NO\",\"\",\"ENJA\",\"+70.933\",\"-008.667\",\"+0009.0\",\"19310101\",\"20200429\"",
            "\"010014\",\"99999\",\"SORSTOKKEN\",\"NO\",\"\",\"ENSO\",\"+59.783\",\"+005.350\",\"+0048.8\",\"19861120\",\"20200428\""
        );

        let registry = StationReader::new().parse_bytes(csv.as_bytes())?;
        assert_eq!(registry.len(), 2);

        let jan_mayen = registry.get(&StationId::new("010010", "99999")).unwrap();
        assert_eq!(jan_mayen.name.as_deref(), Some("JAN MAYEN(NOR-NAVY)"));
        assert_eq!(jan_mayen.icao.as_deref(), Some("ENJA"));
        assert_eq!(jan_mayen.state, None);
        assert_eq!(jan_mayen.latitude, Some(70.933));
        assert_eq!(jan_mayen.longitude, Some(-8.667));
        assert_eq!(jan_mayen.elevation, Some(9.0));
        assert_eq!(jan_mayen.begin, NaiveDate::from_ymd_opt(1931, 1, 1));
        assert_eq!(jan_mayen.end, NaiveDate::from_ymd_opt(2020, 4, 29));
        Ok(())
    }

    #[test]
    fn test_placeholders_are_sanitized() -> Result<()> {
        let csv = format!(
            "{}\n{}\n",
            HEADER,
            "\"999999\",\"00100\",\"BOGUS CHINESE\",\"\",\"\",\"\",\"+90.000\",\"+000.000\",\"-0999.0\",\"\",\"\""
        );

        let registry = StationReader::new().parse_bytes(csv.as_bytes())?;
        let station = registry.get(&StationId::new("999999", "00100")).unwrap();
        assert_eq!(station.name, None);
        assert_eq!(station.latitude, None);
        assert_eq!(station.longitude, Some(0.0));
        assert_eq!(station.elevation, None);
        assert_eq!(station.begin, None);

        let raw = StationReader::raw().parse_bytes(csv.as_bytes())?;
        let station = raw.get(&StationId::new("999999", "00100")).unwrap();
        assert_eq!(station.latitude, Some(90.0));
        Ok(())
    }

    #[test]
    fn test_bad_registry_date_is_malformed() {
        let csv = format!(
            "{}\n{}\n",
            HEADER,
            "\"010010\",\"99999\",\"JAN MAYEN\",\"NO\",\"\",\"\",\"\",\"\",\"\",\"1931-01-01\",\"\""
        );

        match StationReader::new().parse_bytes(csv.as_bytes()) {
            Err(SyncError::MalformedRecord { line, field, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(field, "begin");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_windows_1252_fallback() -> Result<()> {
        let mut bytes = format!("{}\n", HEADER).into_bytes();
        bytes.extend_from_slice(b"\"723150\",\"03812\",\"ASHEVILLE \xC9\",\"US\",\"NC\",\"KAVL\",\"+35.432\",\"-082.538\",\"+0645.0\",\"19730101\",\"20200429\"\n");

        let mut temp_file = NamedTempFile::new()?;
        temp_file.write_all(&bytes)?;

        let registry = StationReader::new().read_path(temp_file.path())?;
        let station = registry.get(&StationId::new("723150", "03812")).unwrap();
        assert_eq!(station.name.as_deref(), Some("ASHEVILLE É"));
        Ok(())
    }
}
