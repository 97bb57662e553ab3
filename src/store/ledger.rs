use crate::error::Result;
use crate::models::{Inventory, StationId, StationRegistry, YearLog};
use crate::readers::{parse_year_log, InventoryReader, StationReader};
use crate::store::ObjectStore;
use crate::sync::SyncReport;
use crate::utils::constants::{INVENTORY_KEY, METADATA_KEY, SYNC_REPORT_KEY, YEAR_LOG_KEY};
use crate::utils::filename::{dataset_key, dataset_prefix, parse_dataset_key};
use crate::writers::{encode_inventory, encode_registry, encode_year_log};
use std::sync::Arc;
use tracing::debug;

/// Typed access to the mirror's persisted artifacts at their well-known keys.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn ObjectStore>,
}

impl Ledger {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub async fn load_year_log(&self) -> Result<Option<YearLog>> {
        match self.store.get(YEAR_LOG_KEY).await? {
            Some(bytes) => Ok(Some(parse_year_log(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn save_year_log(&self, log: &YearLog) -> Result<()> {
        debug!(key = YEAR_LOG_KEY, years = log.len(), "Persisting year log");
        self.store.put(YEAR_LOG_KEY, encode_year_log(log)?).await
    }

    pub async fn load_inventory(&self) -> Result<Option<Inventory>> {
        match self.store.get(INVENTORY_KEY).await? {
            Some(bytes) => Ok(Some(InventoryReader::new().parse_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn save_inventory(&self, inventory: &Inventory) -> Result<()> {
        debug!(key = INVENTORY_KEY, rows = inventory.len(), "Persisting inventory");
        self.store.put(INVENTORY_KEY, encode_inventory(inventory)?).await
    }

    pub async fn load_registry(&self) -> Result<Option<StationRegistry>> {
        match self.store.get(METADATA_KEY).await? {
            Some(bytes) => Ok(Some(StationReader::new().parse_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn save_registry(&self, registry: &StationRegistry) -> Result<()> {
        debug!(key = METADATA_KEY, stations = registry.len(), "Persisting station registry");
        self.store.put(METADATA_KEY, encode_registry(registry)?).await
    }

    pub async fn load_report(&self) -> Result<Option<SyncReport>> {
        match self.store.get(SYNC_REPORT_KEY).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn save_report(&self, report: &SyncReport) -> Result<()> {
        self.store
            .put(SYNC_REPORT_KEY, serde_json::to_vec_pretty(report)?)
            .await
    }

    pub async fn put_dataset(&self, year: i32, station: &StationId, bytes: Vec<u8>) -> Result<()> {
        self.store.put(&dataset_key(year, station), bytes).await
    }

    pub async fn get_dataset(&self, year: i32, station: &StationId) -> Result<Option<Vec<u8>>> {
        self.store.get(&dataset_key(year, station)).await
    }

    pub async fn delete_dataset(&self, year: i32, station: &StationId) -> Result<()> {
        self.store.delete(&dataset_key(year, station)).await
    }

    /// Stations with a persisted dataset for `year`
    pub async fn list_datasets(&self, year: i32) -> Result<Vec<StationId>> {
        let keys = self.store.list(&dataset_prefix(year)).await?;
        Ok(keys
            .iter()
            .filter_map(|key| parse_dataset_key(key))
            .filter(|(y, _)| *y == year)
            .map(|(_, station)| station)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InventoryRow, StationMetadata};
    use crate::store::MemoryObjectStore;
    use crate::utils::time::epoch;

    fn ledger() -> Ledger {
        Ledger::new(Arc::new(MemoryObjectStore::new()))
    }

    #[tokio::test]
    async fn test_missing_artifacts_load_as_none() -> Result<()> {
        let ledger = ledger();
        assert!(ledger.load_year_log().await?.is_none());
        assert!(ledger.load_inventory().await?.is_none());
        assert!(ledger.load_registry().await?.is_none());
        assert!(ledger.load_report().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_artifacts_persist() -> Result<()> {
        let ledger = ledger();

        let mut log = YearLog::new();
        log.advance(2010, epoch());
        ledger.save_year_log(&log).await?;
        assert_eq!(ledger.load_year_log().await?, Some(log));

        let inventory: Inventory = vec![InventoryRow {
            station: StationId::new("010010", "99999"),
            year: 2010,
            last_updated: epoch(),
            monthly_counts: [3; 12],
        }]
        .into_iter()
        .collect();
        ledger.save_inventory(&inventory).await?;
        assert_eq!(ledger.load_inventory().await?, Some(inventory));

        let registry: StationRegistry =
            vec![StationMetadata::minimal(StationId::new("010010", "99999"))]
                .into_iter()
                .collect();
        ledger.save_registry(&registry).await?;
        assert_eq!(ledger.load_registry().await?, Some(registry));

        let report = SyncReport::new(epoch());
        ledger.save_report(&report).await?;
        assert_eq!(ledger.load_report().await?, Some(report));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_datasets() -> Result<()> {
        let ledger = ledger();
        let a = StationId::new("010010", "99999");
        let b = StationId::new("010020", "99999");

        ledger.put_dataset(2010, &a, vec![1]).await?;
        ledger.put_dataset(2010, &b, vec![2]).await?;
        ledger.put_dataset(2011, &a, vec![3]).await?;
        ledger.store().put("2010/readme.txt", vec![]).await?;

        assert_eq!(ledger.list_datasets(2010).await?, vec![a.clone(), b]);
        ledger.delete_dataset(2010, &a).await?;
        assert_eq!(ledger.list_datasets(2010).await?.len(), 1);
        assert_eq!(ledger.get_dataset(2011, &a).await?, Some(vec![3]));
        Ok(())
    }
}
