use crate::cli::args::{Cli, Commands, SyncOverrides};
use crate::config::SyncConfig;
use crate::models::{DailyObservation, StationRegistry};
use crate::readers::{OpReader, StationReader};
use crate::remote::{HttpArchive, RemoteArchive};
use crate::store::{Ledger, LocalObjectStore, MemoryObjectStore, ObjectStore};
use crate::sync::SyncOrchestrator;
use crate::utils::filename::generate_default_parquet_filename;
use crate::utils::progress::ProgressReporter;
use crate::utils::time::{epoch, format_timestamp};
use crate::writers::ParquetWriter;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub async fn run(cli: Cli) -> Result<()> {
    let show_progress = !cli.quiet;
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Sync { overrides, dry_run } => {
            sync(config_path, overrides, dry_run, show_progress).await
        }
        Commands::Transform {
            inputs,
            history,
            output_file,
            compression,
            mmap,
        } => transform(&inputs, history.as_deref(), output_file, &compression, mmap, show_progress),
        Commands::Status { store_dir } => status(config_path, store_dir).await,
        Commands::Info { file, sample } => info(&file, sample),
    }
}

fn apply_overrides(mut config: SyncConfig, overrides: SyncOverrides) -> Result<SyncConfig> {
    if let Some(store_dir) = overrides.store_dir {
        config.store_dir = store_dir;
    }
    if let Some(url) = overrides.gsod_url {
        config.gsod_url = url;
    }
    if let Some(url) = overrides.noaa_url {
        config.noaa_url = url;
    }
    if let Some(workers) = overrides.max_workers {
        config.max_workers = workers;
    }
    if let Some(attempts) = overrides.fetch_attempts {
        config.fetch_attempts = attempts;
    }
    if let Some(delay) = overrides.retry_delay_secs {
        config.retry_delay_secs = delay;
    }
    if let Some(compression) = overrides.compression {
        config.compression = compression;
    }
    if overrides.from_year.is_some() {
        config.from_year = overrides.from_year;
    }
    if overrides.to_year.is_some() {
        config.to_year = overrides.to_year;
    }
    if overrides.no_bootstrap {
        config.bootstrap_inventory = false;
    }

    Ok(config.validated()?)
}

async fn sync(
    config_path: Option<&Path>,
    overrides: SyncOverrides,
    dry_run: bool,
    show_progress: bool,
) -> Result<()> {
    let config = SyncConfig::load(config_path).context("Failed to load configuration")?;
    let config = apply_overrides(config, overrides).context("Invalid configuration")?;

    info!(
        store = %config.store_dir.display(),
        workers = config.max_workers,
        attempts = config.fetch_attempts,
        dry_run,
        "Starting sync"
    );

    let remote: Arc<dyn RemoteArchive> = Arc::new(HttpArchive::new(
        &config.gsod_url,
        &config.noaa_url,
        config.request_timeout(),
    )?);
    let store: Arc<dyn ObjectStore> = if dry_run {
        Arc::new(MemoryObjectStore::new())
    } else {
        Arc::new(LocalObjectStore::new(&config.store_dir))
    };

    let mut orchestrator = SyncOrchestrator::new(remote, store, config.sync_options(show_progress))?;
    let report = orchestrator.run().await.context("Sync failed")?;

    println!("\n{}", report.summary());
    for failure in &report.failures {
        println!(
            "  {} {}: {}",
            failure.year,
            failure.station.as_deref().unwrap_or("(year listing)"),
            failure.error
        );
    }

    Ok(())
}

fn transform(
    inputs: &[PathBuf],
    history: Option<&Path>,
    output_file: Option<PathBuf>,
    compression: &str,
    mmap: bool,
    show_progress: bool,
) -> Result<()> {
    let output_file = output_file.unwrap_or_else(generate_default_parquet_filename);
    let writer = ParquetWriter::new().with_compression(compression)?;

    let registry = match history {
        Some(path) => {
            let spinner = ProgressReporter::new_spinner("Loading station history...", !show_progress);
            let registry = StationReader::new()
                .read_path(path)
                .with_context(|| format!("Failed to read station history {}", path.display()))?;
            spinner.finish_with_message(&format!("Loaded {} stations", registry.len()));
            registry
        }
        None => StationRegistry::new(),
    };
    info!(stations = registry.len(), files = inputs.len(), "Transforming station files");

    let reader = OpReader::with_mmap(mmap);
    let progress = ProgressReporter::new(inputs.len() as u64, "Transforming files...", !show_progress);

    let per_file = inputs
        .par_iter()
        .map(|path| {
            let records = reader
                .read_path(path, &registry)
                .with_context(|| format!("Failed to transform {}", path.display()));
            progress.increment(1);
            records
        })
        .collect::<Result<Vec<_>>>()?;

    let mut records: Vec<DailyObservation> = per_file.into_iter().flatten().collect();
    records.sort_by(|a, b| (&a.station, a.date).cmp(&(&b.station, b.date)));
    progress.finish_with_message(&format!("Transformed {} records", records.len()));

    if records.is_empty() {
        println!("No records to write");
        return Ok(());
    }

    println!("Writing {} records to {}", records.len(), output_file.display());
    writer.write_observations(&records, &output_file)?;

    let file_info = writer.get_file_info(&output_file)?;
    println!("\n{}", file_info.summary());
    Ok(())
}

async fn status(config_path: Option<&Path>, store_dir: Option<PathBuf>) -> Result<()> {
    let mut config = SyncConfig::load(config_path).context("Failed to load configuration")?;
    if let Some(store_dir) = store_dir {
        config.store_dir = store_dir;
    }

    println!("Store: {}", config.store_dir.display());
    let ledger = Ledger::new(Arc::new(LocalObjectStore::new(&config.store_dir)));

    match ledger.load_year_log().await? {
        Some(log) => {
            let mirrored = log.iter().filter(|(_, modified)| *modified > epoch()).count();
            println!("\nYear log: {} years, {} mirrored at least once", log.len(), mirrored);
            if let Some((year, modified)) = log.iter().max_by_key(|(_, modified)| *modified) {
                println!("  Most recent upstream change: {} ({})", year, format_timestamp(&modified));
            }
        }
        None => println!("\nYear log: not created yet"),
    }

    match ledger.load_inventory().await? {
        Some(inventory) => {
            let observations: u64 = inventory.iter().map(|row| row.total_count()).sum();
            println!(
                "\nInventory: {} station-years, {} stations, {} years, {} observations",
                inventory.len(),
                inventory.station_ids().len(),
                inventory.years().len(),
                observations
            );
        }
        None => println!("\nInventory: not created yet"),
    }

    match ledger.load_registry().await? {
        Some(registry) => {
            let described = registry.iter().filter(|s| s.has_descriptive_attributes()).count();
            println!(
                "\nStation registry: {} stations ({} with metadata)",
                registry.len(),
                described
            );
        }
        None => println!("\nStation registry: not created yet"),
    }

    match ledger.load_report().await? {
        Some(report) => {
            println!("\nLast sync started {}", format_timestamp(&report.started_at));
            println!("{}", report.summary());
        }
        None => println!("\nNo sync has completed yet"),
    }

    Ok(())
}

fn info(file: &Path, sample: usize) -> Result<()> {
    println!("Analyzing Parquet file: {}", file.display());

    let writer = ParquetWriter::new();
    let file_info = writer
        .get_file_info(file)
        .with_context(|| format!("Failed to open {}", file.display()))?;
    println!("\n{}", file_info.summary());

    if sample > 0 {
        println!("\nSample Records (showing up to {} records):", sample);
        let records = writer.read_observations(file, Some(sample))?;
        for (i, record) in records.iter().enumerate() {
            println!(
                "{}. {} ({}) on {}: mean={}, max={}{}, min={}{}, prcp={}{}",
                i + 1,
                record.station,
                record.station_name.as_deref().unwrap_or("unknown"),
                record.iso_date(),
                fmt_value(record.mean_temp),
                fmt_value(record.max_temp),
                if record.max_temp_quality_flag { "*" } else { "" },
                fmt_value(record.min_temp),
                if record.min_temp_quality_flag { "*" } else { "" },
                fmt_value(record.precipitation),
                record.precipitation_flag.map(String::from).unwrap_or_default(),
            );
        }
    }

    Ok(())
}

fn fmt_value(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.1}", v))
}
