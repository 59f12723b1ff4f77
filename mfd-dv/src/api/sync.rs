//! Tree/heatmap synchronisation endpoints
//!
//! The tree is rebuilt from the same inputs the view used; identical inputs
//! give identical node ids and row order.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::taxonomy::TreeView;
use super::RecordSource;
use crate::error::{ApiError, ApiResult};
use crate::sync::{self, ActionMenu, ScrollTarget};
use crate::taxonomy::{NodeId, TaxonFilter};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ShowInTreeRequest {
    #[serde(flatten)]
    pub source: RecordSource,
    #[serde(default)]
    pub filter: TaxonFilter,
    /// Heatmap series label
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ShowInTreeResponse {
    /// `None` when no row carries the name
    pub target: Option<ScrollTarget>,
}

/// POST /api/sync/show-in-tree
pub async fn show_in_tree(
    State(state): State<AppState>,
    Json(req): Json<ShowInTreeRequest>,
) -> ApiResult<Json<ShowInTreeResponse>> {
    let records = req.source.load(&state).await?;
    let view = TreeView::build(&records, &req.filter, &state.rank_table);
    Ok(Json(ShowInTreeResponse {
        target: sync::show_in_tree(&view.rows, &req.name),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ActionsRequest {
    #[serde(flatten)]
    pub source: RecordSource,
    pub node: NodeId,
}

/// POST /api/sync/actions
pub async fn taxon_actions(
    State(state): State<AppState>,
    Json(req): Json<ActionsRequest>,
) -> ApiResult<Json<ActionMenu>> {
    let records = req.source.load(&state).await?;
    let view = TreeView::build(&records, &TaxonFilter::default(), &state.rank_table);
    sync::tree_click(&view.tree, req.node)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Tree node {}", req.node)))
}
