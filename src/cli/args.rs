use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gsod-mirror")]
#[command(about = "Incremental NOAA GSOD mirror with Parquet output")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Hide progress bars")]
    pub quiet: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true, help = "TOML configuration file")]
    pub config: Option<PathBuf>,
}

/// Command-line overrides of configuration settings
#[derive(Args, Debug, Default)]
pub struct SyncOverrides {
    #[arg(short, long, help = "Object store directory")]
    pub store_dir: Option<PathBuf>,

    #[arg(long, help = "Upstream GSOD base URL")]
    pub gsod_url: Option<String>,

    #[arg(long, help = "Upstream station registry base URL")]
    pub noaa_url: Option<String>,

    #[arg(long)]
    pub max_workers: Option<usize>,

    #[arg(long, help = "Attempts per remote fetch")]
    pub fetch_attempts: Option<u32>,

    #[arg(long)]
    pub retry_delay_secs: Option<u64>,

    #[arg(short = 'z', long)]
    pub compression: Option<String>,

    #[arg(long, help = "First year to sync (inclusive)")]
    pub from_year: Option<i32>,

    #[arg(long, help = "Last year to sync (inclusive)")]
    pub to_year: Option<i32>,

    #[arg(long, help = "Start from an empty inventory instead of the upstream one")]
    pub no_bootstrap: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one incremental synchronization against the upstream archive
    Sync {
        #[command(flatten)]
        overrides: SyncOverrides,

        #[arg(long, help = "Use an in-memory store and discard the results")]
        dry_run: bool,
    },

    /// Transform local .op/.op.gz files into a single Parquet file
    Transform {
        #[arg(required = true, help = "Station-year files to transform")]
        inputs: Vec<PathBuf>,

        #[arg(long, help = "Local isd-history.csv for the metadata join")]
        history: Option<PathBuf>,

        #[arg(
            short,
            long,
            help = "Output Parquet file path [default: output/gsod-transform-{YYMMDD}.parquet]"
        )]
        output_file: Option<PathBuf>,

        #[arg(short = 'z', long, default_value = "snappy")]
        compression: String,

        #[arg(long, help = "Memory-map input files")]
        mmap: bool,
    },

    /// Show the year log, inventory totals and last sync report of a store
    Status {
        #[arg(short, long, help = "Object store directory")]
        store_dir: Option<PathBuf>,
    },

    /// Display information about a Parquet file
    Info {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "10")]
        sample: usize,
    },
}
