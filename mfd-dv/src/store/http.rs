//! Hosted bucket accessed over HTTP
//!
//! Objects are addressed as `{base_url}/{path}` with each path segment
//! percent-encoded.

use std::time::Duration;

use async_trait::async_trait;
use mfd_common::{Error, Result};
use tracing::debug;

use super::ObjectStore;

const USER_AGENT: &str = concat!("mfd-dv/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 60;

pub struct HttpObjectStore {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpObjectStore {
    pub fn new(base_url: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn object_url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.base_url, encoded.join("/"))
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.object_url(path);
        debug!(url = %url, "Downloading object");

        let download_error = |reason: String| Error::Download {
            path: path.to_string(),
            reason,
        };

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(download_error(format!("HTTP {}", status.as_u16())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_error(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        let url = self.object_url(path);
        let response = self
            .http_client
            .put(&url)
            .body(bytes)
            .send()
            .await
            .map_err(|e| Error::Internal(format!("Upload to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::Internal(format!(
                "Upload to {} failed: HTTP {}",
                url,
                response.status().as_u16()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_url_encodes_segments() {
        let store = HttpObjectStore::new("https://storage.example.org/bucket/").unwrap();
        assert_eq!(
            store.object_url("/p1/North Bay_std.csv"),
            "https://storage.example.org/bucket/p1/North%20Bay_std.csv"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_download_error() {
        let store = HttpObjectStore::new("http://127.0.0.1:9").unwrap();
        let err = store.get("p1/a.csv").await.unwrap_err();
        assert!(matches!(err, Error::Download { .. }));
    }
}
