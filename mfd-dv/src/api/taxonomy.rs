//! Taxonomic tree endpoint

use axum::{extract::State, Json};
use mfd_common::OccurrenceRecord;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::RecordSource;
use crate::error::ApiResult;
use crate::taxonomy::{
    build_tree, connectors, flatten, reorganize, series_order, FlattenedTaxon, RankTable,
    TaxonFilter, TaxonTree,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TreeRequest {
    #[serde(flatten)]
    pub source: RecordSource,
    #[serde(default)]
    pub filter: TaxonFilter,
    /// Heatmap series to order alongside the tree
    #[serde(default)]
    pub series: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TreeResponse {
    pub tree: TaxonTree,
    /// Display rows after filtering
    pub rows: Vec<FlattenedTaxon>,
    /// `connectors[i]`: row `i` is the direct child of row `i - 1`
    pub connectors: Vec<bool>,
    pub species_count: usize,
    pub series_order: Vec<String>,
}

/// Tree and filtered display rows for one record set
pub(crate) struct TreeView {
    pub tree: TaxonTree,
    pub rows: Vec<FlattenedTaxon>,
}

impl TreeView {
    /// build → flatten → filter, each stage finishing before the next
    pub fn build(records: &[OccurrenceRecord], filter: &TaxonFilter, table: &RankTable) -> Self {
        let tree = build_tree(records, table);
        let all_rows = flatten(&tree);
        let visible = filter.visible_taxa(&tree);
        let rows = reorganize(&tree, &all_rows, &visible);
        Self { tree, rows }
    }
}

/// POST /api/taxonomy/tree
pub async fn taxonomy_tree(
    State(state): State<AppState>,
    Json(req): Json<TreeRequest>,
) -> ApiResult<Json<TreeResponse>> {
    let records = req.source.load(&state).await?;
    let view = TreeView::build(&records, &req.filter, &state.rank_table);

    info!(
        records = records.len(),
        nodes = view.tree.len(),
        rows = view.rows.len(),
        "Built taxonomic tree"
    );

    Ok(Json(TreeResponse {
        connectors: connectors(&view.rows),
        species_count: view.tree.root().species_count,
        series_order: series_order(&view.rows, &req.series),
        rows: view.rows,
        tree: view.tree,
    }))
}
