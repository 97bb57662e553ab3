use crate::error::{Result, SyncError};
use crate::sync::{RetryPolicy, SyncOptions};
use crate::utils::constants::{
    COMPRESSION_SNAPPY, DEFAULT_FETCH_ATTEMPTS, DEFAULT_GSOD_URL, DEFAULT_NOAA_URL,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRY_DELAY_SECS, DEFAULT_STORE_DIR,
    SUPPORTED_COMPRESSIONS,
};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

/// Environment variables overriding file settings, e.g. `GSOD_MAX_WORKERS`
pub const ENV_PREFIX: &str = "GSOD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SyncConfig {
    #[validate(url)]
    pub gsod_url: String,

    #[validate(url)]
    pub noaa_url: String,

    pub store_dir: PathBuf,

    #[validate(range(min = 1))]
    pub max_workers: usize,

    #[validate(range(min = 1, max = 20))]
    pub fetch_attempts: u32,

    pub retry_delay_secs: u64,

    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,

    pub compression: String,

    pub bootstrap_inventory: bool,

    pub from_year: Option<i32>,
    pub to_year: Option<i32>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            gsod_url: DEFAULT_GSOD_URL.to_string(),
            noaa_url: DEFAULT_NOAA_URL.to_string(),
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            max_workers: num_cpus::get(),
            fetch_attempts: DEFAULT_FETCH_ATTEMPTS,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            compression: COMPRESSION_SNAPPY.to_string(),
            bootstrap_inventory: true,
            from_year: None,
            to_year: None,
        }
    }
}

impl SyncConfig {
    /// Layer defaults, an optional TOML file, then `GSOD_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = SyncConfig::default();

        let mut builder = Config::builder()
            .set_default("gsod_url", defaults.gsod_url.as_str())?
            .set_default("noaa_url", defaults.noaa_url.as_str())?
            .set_default("store_dir", defaults.store_dir.to_string_lossy().as_ref())?
            .set_default("max_workers", defaults.max_workers as u64)?
            .set_default("fetch_attempts", defaults.fetch_attempts as u64)?
            .set_default("retry_delay_secs", defaults.retry_delay_secs)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs)?
            .set_default("compression", defaults.compression.as_str())?
            .set_default("bootstrap_inventory", defaults.bootstrap_inventory)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: SyncConfig = settings.try_deserialize()?;
        config.validated()
    }

    /// Field validation plus the checks that span fields
    pub fn validated(self) -> Result<Self> {
        self.validate()?;

        let compression = self.compression.to_lowercase();
        if !SUPPORTED_COMPRESSIONS.contains(&compression.as_str()) {
            return Err(SyncError::Config(format!(
                "Unsupported compression: {} (expected one of {})",
                self.compression,
                SUPPORTED_COMPRESSIONS.join(", ")
            )));
        }

        if let (Some(from), Some(to)) = (self.from_year, self.to_year) {
            if from > to {
                return Err(SyncError::Config(format!(
                    "Year range is empty: {} > {}",
                    from, to
                )));
            }
        }

        Ok(self)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.fetch_attempts, Duration::from_secs(self.retry_delay_secs))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn sync_options(&self, show_progress: bool) -> SyncOptions {
        SyncOptions {
            max_workers: self.max_workers,
            retry: self.retry_policy(),
            compression: self.compression.clone(),
            bootstrap_inventory: self.bootstrap_inventory,
            from_year: self.from_year,
            to_year: self.to_year,
            show_progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_defaults_are_valid() {
        let config = SyncConfig::default().validated().unwrap();
        assert_eq!(config.fetch_attempts, 5);
        assert_eq!(config.compression, "snappy");
        assert_eq!(config.retry_policy().delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "store_dir = \"/tmp/gsod\"")?;
        writeln!(file, "max_workers = 3")?;
        writeln!(file, "fetch_attempts = 2")?;
        writeln!(file, "compression = \"zstd\"")?;
        writeln!(file, "from_year = 2010")?;

        let config = SyncConfig::load(Some(file.path()))?;
        assert_eq!(config.store_dir, PathBuf::from("/tmp/gsod"));
        assert_eq!(config.max_workers, 3);
        assert_eq!(config.fetch_attempts, 2);
        assert_eq!(config.compression, "zstd");
        assert_eq!(config.from_year, Some(2010));
        assert_eq!(config.to_year, None);
        assert_eq!(config.gsod_url, DEFAULT_GSOD_URL);
        Ok(())
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let config = SyncConfig {
            fetch_attempts: 0,
            ..SyncConfig::default()
        };
        assert!(matches!(config.validated(), Err(SyncError::Validation(_))));

        let config = SyncConfig {
            gsod_url: "not a url".to_string(),
            ..SyncConfig::default()
        };
        assert!(config.validated().is_err());

        let config = SyncConfig {
            compression: "brotli".to_string(),
            ..SyncConfig::default()
        };
        assert!(matches!(config.validated(), Err(SyncError::Config(_))));

        let config = SyncConfig {
            from_year: Some(2020),
            to_year: Some(2010),
            ..SyncConfig::default()
        };
        assert!(config.validated().is_err());
    }
}
