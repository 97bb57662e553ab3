/// Upstream locations
pub const DEFAULT_GSOD_URL: &str = "https://www.ncei.noaa.gov/pub/data/gsod/";
pub const DEFAULT_NOAA_URL: &str = "https://www.ncei.noaa.gov/pub/data/noaa/";
pub const STATION_HISTORY_FILE: &str = "isd-history.csv";
pub const STATION_INVENTORY_FILE: &str = "isd-inventory.csv";

/// Well-known object store keys
pub const YEAR_LOG_KEY: &str = "annual_update_log.csv";
pub const INVENTORY_KEY: &str = "isd-inventory.csv";
pub const METADATA_KEY: &str = "isd-history.csv";
pub const SYNC_REPORT_KEY: &str = "sync-report.json";
pub const DATASET_EXTENSION: &str = "parquet";

/// Raw record layout
pub const OP_TOKEN_COUNT: usize = 22;
pub const USAF_WIDTH: usize = 6;
pub const WBAN_WIDTH: usize = 5;
pub const DATE_CODE_WIDTH: usize = 8;
pub const WEATHER_CODE_WIDTH: usize = 6;
pub const QUALITY_MARKER: char = '*';

/// Missing-value pattern: a 9, three or four of 9 / '.', then a 9
pub const SENTINEL_PATTERN: &str = r"^9[.9]{3,4}9$";

/// Physical bounds for station metadata
pub const LOWEST_DRY_LAND_ELEVATION_M: f64 = -418.0;
pub const MAX_LATITUDE: f64 = 90.0;
pub const MAX_LONGITUDE: f64 = 180.0;

/// Station names upstream uses when the real name is not known
pub const UNKNOWN_STATION_NAMES: [&str; 9] = [
    "NAME/LOCATION UNKN",
    "NAME UNKNOWN (ONC)",
    "APPROXIMATE LOCATIO",
    "APPROXIMATE LOCALE",
    "APPROXIMATE LOCATION",
    "NAME AND LOC UNKN",
    "NAME UNKNOWN",
    "NAME0LOCATION UNKN",
    "NAME\\LOCATION UNKN",
];
pub const BOGUS_NAME_MARKERS: [&str; 2] = ["BOGUS", "UNKNOWN"];

/// Sync defaults
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_STORE_DIR: &str = "gsod-mirror";

/// Processing defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
pub const SUPPORTED_COMPRESSIONS: [&str; 5] = [
    COMPRESSION_SNAPPY,
    COMPRESSION_GZIP,
    COMPRESSION_LZ4,
    COMPRESSION_ZSTD,
    COMPRESSION_NONE,
];

pub const MONTH_NAMES: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];
