use crate::error::{Result, SyncError};
use crate::models::{ListingEntry, YearListing};
use crate::remote::listing::parse_index_page;
use crate::remote::{RemoteArchive, RemotePath};
use crate::utils::constants::{STATION_HISTORY_FILE, STATION_INVENTORY_FILE};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// The NOAA archive over HTTPS.
pub struct HttpArchive {
    client: Client,
    gsod_url: String,
    noaa_url: String,
}

impl HttpArchive {
    pub fn new(gsod_url: &str, noaa_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            gsod_url: gsod_url.trim_end_matches('/').to_string(),
            noaa_url: noaa_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, path: &RemotePath) -> String {
        match path {
            RemotePath::YearFile { year, file_name } => {
                format!("{}/{}/{}", self.gsod_url, year, file_name)
            }
            RemotePath::StationHistory => format!("{}/{}", self.noaa_url, STATION_HISTORY_FILE),
            RemotePath::StationInventory => {
                format!("{}/{}", self.noaa_url, STATION_INVENTORY_FILE)
            }
        }
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let transient = |message: String| SyncError::TransientFetch {
            path: url.to_string(),
            message,
        };

        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(url, status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transient(e.to_string()))?;
        Ok(body.to_vec())
    }

    async fn get_index(&self, url: &str) -> Result<Vec<ListingEntry>> {
        let body = self.get_bytes(url).await?;
        Ok(parse_index_page(&String::from_utf8_lossy(&body)))
    }
}

/// Server errors, timeouts and throttling are worth retrying; any other
/// status (404, 403, ...) will not change on the next attempt.
fn status_error(url: &str, status: StatusCode) -> SyncError {
    let message = format!("HTTP {}", status);
    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        SyncError::TransientFetch {
            path: url.to_string(),
            message,
        }
    } else {
        SyncError::FetchFailed {
            path: url.to_string(),
            attempts: 1,
            message,
        }
    }
}

#[async_trait]
impl RemoteArchive for HttpArchive {
    async fn list_years(&self) -> Result<Vec<YearListing>> {
        let entries = self.get_index(&format!("{}/", self.gsod_url)).await?;
        Ok(entries.iter().filter_map(YearListing::from_entry).collect())
    }

    async fn list_year_files(&self, year: i32) -> Result<Vec<ListingEntry>> {
        self.get_index(&format!("{}/{}/", self.gsod_url, year)).await
    }

    async fn fetch(&self, path: &RemotePath) -> Result<Vec<u8>> {
        self.get_bytes(&self.url_for(path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let archive = HttpArchive::new(
            "https://example.org/pub/data/gsod/",
            "https://example.org/pub/data/noaa",
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(
            archive.url_for(&RemotePath::year_file(2010, "010010-99999-2010.op.gz")),
            "https://example.org/pub/data/gsod/2010/010010-99999-2010.op.gz"
        );
        assert_eq!(
            archive.url_for(&RemotePath::StationHistory),
            "https://example.org/pub/data/noaa/isd-history.csv"
        );
        assert_eq!(
            archive.url_for(&RemotePath::StationInventory),
            "https://example.org/pub/data/noaa/isd-inventory.csv"
        );
    }

    #[test]
    fn test_status_classification() {
        let url = "https://example.org/pub/data/gsod/2010/";
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::REQUEST_TIMEOUT,
            StatusCode::TOO_MANY_REQUESTS,
        ] {
            assert!(status_error(url, status).is_transient(), "{} should be retried", status);
        }

        for status in [StatusCode::NOT_FOUND, StatusCode::FORBIDDEN, StatusCode::GONE] {
            match status_error(url, status) {
                SyncError::FetchFailed { attempts, path, .. } => {
                    assert_eq!(attempts, 1);
                    assert_eq!(path, url);
                }
                other => panic!("{} should fail at once, got {}", status, other),
            }
        }
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transient() {
        let archive = HttpArchive::new(
            "http://127.0.0.1:9/gsod",
            "http://127.0.0.1:9/noaa",
            Duration::from_secs(2),
        )
        .unwrap();

        match archive.fetch(&RemotePath::StationHistory).await {
            Err(err) => assert!(err.is_transient(), "unexpected error: {}", err),
            Ok(_) => panic!("port 9 should refuse connections"),
        }
    }
}
