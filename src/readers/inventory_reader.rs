use crate::error::{Result, SyncError};
use crate::models::{Inventory, InventoryRow, StationId};
use crate::utils::time::{epoch, parse_timestamp};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct InventoryRecord {
    #[serde(rename = "USAF")]
    usaf: String,
    #[serde(rename = "WBAN")]
    wban: String,
    #[serde(rename = "YEAR")]
    year: i32,
    #[serde(rename = "Last_Updated", default)]
    last_updated: Option<String>,
    #[serde(rename = "JAN")]
    jan: u32,
    #[serde(rename = "FEB")]
    feb: u32,
    #[serde(rename = "MAR")]
    mar: u32,
    #[serde(rename = "APR")]
    apr: u32,
    #[serde(rename = "MAY")]
    may: u32,
    #[serde(rename = "JUN")]
    jun: u32,
    #[serde(rename = "JUL")]
    jul: u32,
    #[serde(rename = "AUG")]
    aug: u32,
    #[serde(rename = "SEP")]
    sep: u32,
    #[serde(rename = "OCT")]
    oct: u32,
    #[serde(rename = "NOV")]
    nov: u32,
    #[serde(rename = "DEC")]
    dec: u32,
}

/// Reads inventory CSV.
///
/// The persisted inventory carries an `ID` and `Last_Updated` column; the
/// upstream `isd-inventory.csv` used to bootstrap a fresh store has neither,
/// and its rows are stamped with the epoch so every station-year counts as
/// stale on the first run.
pub struct InventoryReader;

impl InventoryReader {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_bytes(&self, raw: &[u8]) -> Result<Inventory> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(raw);

        let mut inventory = Inventory::new();
        for (index, record) in reader.deserialize::<InventoryRecord>().enumerate() {
            let row = to_row(record?, index + 2)?;
            inventory.upsert(row);
        }

        Ok(inventory)
    }
}

impl Default for InventoryReader {
    fn default() -> Self {
        Self::new()
    }
}

fn to_row(record: InventoryRecord, line: usize) -> Result<InventoryRow> {
    if record.usaf.is_empty() || record.wban.is_empty() {
        return Err(SyncError::malformed(line, "station", "missing USAF or WBAN"));
    }

    let last_updated = match record.last_updated.as_deref().map(str::trim) {
        None | Some("") => epoch(),
        Some(value) => parse_timestamp(value)
            .map_err(|_| SyncError::malformed(line, "last_updated", format!("'{}'", value)))?,
    };

    Ok(InventoryRow {
        station: StationId::new(record.usaf, record.wban),
        year: record.year,
        last_updated,
        monthly_counts: [
            record.jan, record.feb, record.mar, record.apr, record.may, record.jun,
            record.jul, record.aug, record.sep, record.oct, record.nov, record.dec,
        ],
    })
}
