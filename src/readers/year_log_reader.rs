use crate::error::{Result, SyncError};
use crate::models::YearLog;
use crate::utils::time::parse_timestamp;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct YearLogRecord {
    #[serde(rename = "Year")]
    year: i32,
    #[serde(rename = "Modified")]
    modified: String,
}

/// Parse the persisted per-year log (`Year,Modified`)
pub fn parse_year_log(raw: &[u8]) -> Result<YearLog> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(raw);

    let mut log = YearLog::new();
    for (index, record) in reader.deserialize::<YearLogRecord>().enumerate() {
        let record = record?;
        let modified = parse_timestamp(&record.modified).map_err(|_| {
            SyncError::malformed(index + 2, "modified", format!("'{}'", record.modified))
        })?;
        log.advance(record.year, modified);
    }

    Ok(log)
}
