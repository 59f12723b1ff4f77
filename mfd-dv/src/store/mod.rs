//! Storage boundary
//!
//! Uploaded files live in an object store (a local directory or the hosted
//! bucket); their metadata lives in the SQLite file catalog.

pub mod catalog;
pub mod http;
pub mod local;

pub use catalog::FileCatalog;
pub use http::HttpObjectStore;
pub use local::LocalObjectStore;

use async_trait::async_trait;
use futures::future::join_all;
use mfd_common::Result;
use tracing::warn;

/// Blob storage keyed by relative path
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short label for logs
    fn name(&self) -> &'static str;

    async fn get(&self, path: &str) -> Result<Vec<u8>>;

    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<()>;
}

/// Download every path concurrently
///
/// All downloads run to completion; if any failed the first error is
/// returned and the successful payloads are discarded.
pub async fn fetch_all(store: &dyn ObjectStore, paths: &[String]) -> Result<Vec<Vec<u8>>> {
    let results = join_all(paths.iter().map(|p| store.get(p))).await;

    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        warn!(
            store = store.name(),
            requested = paths.len(),
            failed,
            "Batch download failed"
        );
    }
    results.into_iter().collect()
}

/// Download both halves of an FPOD pair
pub async fn fetch_pair(
    store: &dyn ObjectStore,
    std_path: &str,
    hr24_path: &str,
) -> Result<(Vec<u8>, Vec<u8>)> {
    let (std_bytes, hr24_bytes) = futures::join!(store.get(std_path), store.get(hr24_path));
    match (std_bytes, hr24_bytes) {
        (Ok(s), Ok(h)) => Ok((s, h)),
        (Err(e), _) | (_, Err(e)) => {
            warn!(store = store.name(), std_path, hr24_path, error = %e, "Paired download failed");
            Err(e)
        }
    }
}
