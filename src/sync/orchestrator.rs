use crate::error::{Result, SyncError};
use crate::models::{Inventory, InventoryRow, StationFile, StationRegistry, YearListing, YearLog};
use crate::processors::{reconcile, summarize, InventoryDelta, StalenessDetector};
use crate::readers::{InventoryReader, OpReader, StationReader};
use crate::remote::{RemoteArchive, RemotePath};
use crate::store::{Ledger, ObjectStore};
use crate::sync::report::{RegistrySummary, SyncReport, SyncState};
use crate::sync::retry::RetryPolicy;
use crate::utils::constants::COMPRESSION_SNAPPY;
use crate::utils::progress::ProgressReporter;
use crate::writers::ParquetWriter;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Knobs for one synchronization run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub max_workers: usize,
    pub retry: RetryPolicy,
    pub compression: String,
    pub bootstrap_inventory: bool,
    pub from_year: Option<i32>,
    pub to_year: Option<i32>,
    pub show_progress: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get(),
            retry: RetryPolicy::default(),
            compression: COMPRESSION_SNAPPY.to_string(),
            bootstrap_inventory: true,
            from_year: None,
            to_year: None,
            show_progress: false,
        }
    }
}

/// Drives one incremental sync: years, then station files, then metadata.
///
/// The year log entry of a year is only advanced after that year's datasets
/// and inventory have been persisted and no file of it failed, so an
/// interrupted run is picked up again by the next one.
pub struct SyncOrchestrator {
    remote: Arc<dyn RemoteArchive>,
    ledger: Ledger,
    writer: Arc<ParquetWriter>,
    detector: StalenessDetector,
    options: SyncOptions,
    state: SyncState,
}

impl SyncOrchestrator {
    pub fn new(
        remote: Arc<dyn RemoteArchive>,
        store: Arc<dyn ObjectStore>,
        options: SyncOptions,
    ) -> Result<Self> {
        let writer = ParquetWriter::new().with_compression(&options.compression)?;
        let detector = StalenessDetector::new().with_year_range(options.from_year, options.to_year);

        Ok(Self {
            remote,
            ledger: Ledger::new(store),
            writer: Arc::new(writer),
            detector,
            options,
            state: SyncState::Idle,
        })
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    fn transition(&mut self, report: &mut SyncReport, next: SyncState) {
        info!(from = %self.state, to = %next, "Sync state transition");
        self.state = next;
        report.state = next;
    }

    /// Run one synchronization. Errors that are not confined to a single
    /// file, including a failed write of the report itself, end the run in
    /// `Failed` and are returned.
    pub async fn run(&mut self) -> Result<SyncReport> {
        let mut report = SyncReport::new(Utc::now());

        let outcome = match self.execute(&mut report).await {
            Ok(()) => self.finish(&mut report).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(()) => {
                self.transition(&mut report, SyncState::Done);
                info!(
                    completed = report.years_completed.len(),
                    stale = report.years_stale.len(),
                    failures = report.failures.len(),
                    "Sync finished"
                );
                Ok(report)
            }
            Err(err) => {
                error!(error = %err, state = %self.state, "Sync failed");
                self.transition(&mut report, SyncState::Failed);
                Err(err)
            }
        }
    }

    /// Persist the report as it will read once the run is done
    async fn finish(&self, report: &mut SyncReport) -> Result<()> {
        report.state = SyncState::Done;
        report.finished_at = Some(Utc::now());
        self.ledger.save_report(report).await
    }

    async fn execute(&mut self, report: &mut SyncReport) -> Result<()> {
        self.transition(report, SyncState::EnumeratingYears);

        let remote = self.remote.clone();
        let years = self
            .options
            .retry
            .run("year index", || remote.list_years())
            .await?;
        report.years_checked = years.len();
        info!(years = years.len(), "Listed upstream years");

        let mut log = match self.ledger.load_year_log().await? {
            Some(log) => log,
            None => {
                info!("No year log found, seeding every upstream year at the epoch");
                let log = YearLog::seeded(&years);
                self.ledger.save_year_log(&log).await?;
                log
            }
        };

        let fresh_registry = match self.fetch_registry().await {
            Ok(registry) => Some(registry),
            Err(err) => {
                warn!(error = %err, "Station registry unavailable, metadata reconciliation will be skipped");
                None
            }
        };
        let join_registry = match &fresh_registry {
            Some(registry) => registry.clone(),
            None => self.ledger.load_registry().await?.unwrap_or_default(),
        };
        let join_registry = Arc::new(join_registry);

        let mut inventory = self.load_or_bootstrap_inventory().await?;

        let stale = self.detector.stale_years(&log, &years);
        info!(stale = stale.len(), "Detected stale years");

        let progress = ProgressReporter::new(stale.len() as u64, "Syncing years", !self.options.show_progress);
        for year in stale {
            self.transition(report, SyncState::ProcessingYear(year.year));
            progress.set_message(&format!("Syncing {}", year.year));
            self.process_year(year, &mut inventory, &join_registry, &mut log, report)
                .await?;
            progress.increment(1);
        }
        progress.finish_with_message("Years synced");

        self.transition(report, SyncState::ReconcilingMetadata);
        match fresh_registry {
            Some(registry) => {
                let result = reconcile(&inventory, registry);
                self.ledger.save_registry(&result.registry).await?;
                report.registry = Some(RegistrySummary {
                    stations: result.registry.len(),
                    dropped: result.dropped,
                    appended: result.appended,
                });
            }
            None => warn!("Skipping metadata reconciliation"),
        }

        Ok(())
    }

    async fn fetch_registry(&self) -> Result<StationRegistry> {
        let remote = self.remote.clone();
        let path = RemotePath::StationHistory;
        let bytes = self
            .options
            .retry
            .run(&path.to_string(), || remote.fetch(&path))
            .await?;

        let registry = tokio::task::spawn_blocking(move || StationReader::new().parse_bytes(&bytes)).await??;
        info!(stations = registry.len(), "Downloaded station registry");
        Ok(registry)
    }

    async fn load_or_bootstrap_inventory(&self) -> Result<Inventory> {
        if let Some(inventory) = self.ledger.load_inventory().await? {
            debug!(rows = inventory.len(), "Loaded inventory");
            return Ok(inventory);
        }

        if !self.options.bootstrap_inventory {
            info!("No inventory found, starting empty");
            return Ok(Inventory::new());
        }

        let remote = self.remote.clone();
        let path = RemotePath::StationInventory;
        let fetched = self
            .options
            .retry
            .run(&path.to_string(), || remote.fetch(&path))
            .await
            .and_then(|bytes| InventoryReader::new().parse_bytes(&bytes));

        match fetched {
            Ok(inventory) => {
                info!(rows = inventory.len(), "Bootstrapped inventory from upstream");
                self.ledger.save_inventory(&inventory).await?;
                Ok(inventory)
            }
            Err(err) => {
                warn!(error = %err, "Inventory bootstrap failed, starting empty");
                Ok(Inventory::new())
            }
        }
    }

    async fn process_year(
        &self,
        listing: YearListing,
        inventory: &mut Inventory,
        registry: &Arc<StationRegistry>,
        log: &mut YearLog,
        report: &mut SyncReport,
    ) -> Result<()> {
        let year = listing.year;
        let remote = self.remote.clone();

        let entries = match self
            .options
            .retry
            .run(&format!("{}/", year), || remote.list_year_files(year))
            .await
        {
            Ok(entries) => entries,
            Err(err) if err.is_file_level() => {
                warn!(year, error = %err, "Year listing failed, leaving year stale");
                report.record_failure(year, None, &err);
                report.years_stale.push(year);
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let work = self.detector.stale_files(year, &entries, inventory);
        info!(
            year,
            fetch = work.to_fetch.len(),
            remove = work.to_remove.len(),
            up_to_date = work.up_to_date,
            "Processing year"
        );
        report.files_up_to_date += work.up_to_date;

        for station in self.ledger.list_datasets(year).await? {
            if !work.listed.contains(&station) {
                debug!(year, station = %station, "Deleting dataset of delisted station");
                self.ledger.delete_dataset(year, &station).await?;
                report.datasets_removed += 1;
            }
        }

        let mut delta = InventoryDelta::new();
        for key in work.to_remove {
            delta.remove(key)?;
        }

        let semaphore = Arc::new(Semaphore::new(self.options.max_workers.max(1)));
        let progress = ProgressReporter::new(
            work.to_fetch.len() as u64,
            &format!("Fetching {}", year),
            !self.options.show_progress,
        );
        let mut join_set = JoinSet::new();

        for file in work.to_fetch {
            let permit = semaphore.clone().acquire_owned();
            let remote = self.remote.clone();
            let ledger = self.ledger.clone();
            let writer = self.writer.clone();
            let registry = registry.clone();
            let retry = self.options.retry;

            join_set.spawn(async move {
                let _permit = match permit.await {
                    Ok(permit) => permit,
                    Err(e) => {
                        let err = SyncError::Config(format!("Worker pool closed: {}", e));
                        return (file, Err(err));
                    }
                };
                let result = sync_file(&file, remote, ledger, writer, registry, retry).await;
                (file, result)
            });
        }

        let mut failed = 0usize;
        while let Some(joined) = join_set.join_next().await {
            let (file, result) = joined?;
            progress.increment(1);

            match result {
                Ok(row) => {
                    delta.upsert(row)?;
                    report.files_fetched += 1;
                }
                Err(err) if err.is_file_level() => {
                    warn!(year, station = %file.station, error = %err, "Station file failed");
                    report.record_failure(year, Some(file.station.to_string()), &err);
                    failed += 1;
                }
                Err(err) => {
                    join_set.abort_all();
                    return Err(err);
                }
            }
        }
        progress.finish_with_message(&format!("{} synced", year));

        if !delta.is_empty() {
            let summary = delta.apply(inventory);
            report.rows_removed += summary.removed;
            self.ledger.save_inventory(inventory).await?;
            debug!(year, upserted = summary.upserted, removed = summary.removed, "Applied inventory delta");
        }

        if failed == 0 {
            log.advance(year, listing.modified);
            self.ledger.save_year_log(log).await?;
            report.years_completed.push(year);
            info!(year, "Year up to date");
        } else {
            warn!(year, failed, "Year left stale");
            report.years_stale.push(year);
        }

        Ok(())
    }
}

/// Fetch, transform and persist one station-year file
async fn sync_file(
    file: &StationFile,
    remote: Arc<dyn RemoteArchive>,
    ledger: Ledger,
    writer: Arc<ParquetWriter>,
    registry: Arc<StationRegistry>,
    retry: RetryPolicy,
) -> Result<InventoryRow> {
    let path = RemotePath::year_file(file.year, &file.file_name);
    let raw = retry
        .run(&path.to_string(), || remote.fetch(&path))
        .await?;

    let station = file.station.clone();
    let year = file.year;
    let modified = file.modified;

    let (row, dataset) = tokio::task::spawn_blocking(move || {
        let observations = OpReader::new().parse_station_year(&raw, &registry, &station, year)?;
        let row = summarize(&station, year, &observations, modified);
        let dataset = writer.encode_observations(&observations)?;
        Ok::<_, SyncError>((row, dataset))
    })
    .await??;

    ledger.put_dataset(year, &file.station, dataset).await?;
    debug!(year, station = %file.station, days = row.total_count(), "Persisted dataset");
    Ok(row)
}
