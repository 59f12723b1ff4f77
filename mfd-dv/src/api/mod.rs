//! HTTP API handlers for mfd-dv

pub mod files;
pub mod health;
pub mod heatmap;
pub mod sync;
pub mod taxonomy;

pub use files::{classify_files, file_date_range, fpod_pairs, open_fpod_pair};
pub use health::health_routes;
pub use heatmap::heatmap;
pub use sync::{show_in_tree, taxon_actions};
pub use taxonomy::taxonomy_tree;

use mfd_common::OccurrenceRecord;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::files::Table;
use crate::store::fetch_all;
use crate::AppState;

/// Occurrence data given inline, by stored file, or both
#[derive(Debug, Default, Deserialize)]
pub struct RecordSource {
    #[serde(default)]
    pub records: Vec<OccurrenceRecord>,
    #[serde(default)]
    pub file_ids: Vec<Uuid>,
}

impl RecordSource {
    /// Inline records followed by the records of the merged stored files
    pub async fn load(&self, state: &AppState) -> ApiResult<Vec<OccurrenceRecord>> {
        let mut records = self.records.clone();
        if let Some(table) = load_merged_table(state, &self.file_ids).await? {
            records.extend(table.to_occurrence_records()?);
        }
        Ok(records)
    }
}

/// Download and merge stored files; any failed download fails the call
pub(crate) async fn load_merged_table(state: &AppState, ids: &[Uuid]) -> ApiResult<Option<Table>> {
    if ids.is_empty() {
        return Ok(None);
    }

    let mut paths = Vec::with_capacity(ids.len());
    for id in ids {
        paths.push(state.catalog.get(*id).await?.storage_path);
    }

    let payloads = fetch_all(state.store.as_ref(), &paths).await?;
    let tables = payloads
        .iter()
        .map(|bytes| Table::from_bytes(bytes))
        .collect::<mfd_common::Result<Vec<_>>>()?;

    debug!(files = tables.len(), "Merged stored tables");
    Ok(Some(Table::merge(&tables)))
}
