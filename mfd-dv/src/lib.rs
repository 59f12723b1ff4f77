//! mfd-dv library - Data Visualization module
//!
//! Reduces uploaded survey files to the taxonomic tree and time-series
//! heatmap models, and classifies/pairs the uploads feeding them.

use std::sync::Arc;

use axum::Router;
use mfd_common::config::HeatmapConfig;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod files;
pub mod heatmap;
pub mod store;
pub mod sync;
pub mod taxonomy;

use files::DateRangeAnalyzer;
use heatmap::HeatmapAggregator;
use store::{FileCatalog, ObjectStore};
use taxonomy::RankTable;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Upload metadata
    pub catalog: FileCatalog,
    /// Upload contents
    pub store: Arc<dyn ObjectStore>,
    /// Rank styling injected into every tree build
    pub rank_table: Arc<RankTable>,
    pub heatmap: HeatmapConfig,
}

impl AppState {
    /// Create new application state
    pub fn new(catalog: FileCatalog, store: Arc<dyn ObjectStore>, heatmap: HeatmapConfig) -> Self {
        Self {
            catalog,
            store,
            rank_table: Arc::new(RankTable::default()),
            heatmap,
        }
    }

    pub fn analyzer(&self) -> DateRangeAnalyzer {
        DateRangeAnalyzer::new(Arc::clone(&self.store))
    }

    pub fn aggregator(&self) -> HeatmapAggregator {
        HeatmapAggregator::new(self.heatmap)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let api = Router::new()
        .route("/api/files/classify", post(api::classify_files))
        .route("/api/files/fpod-pairs", post(api::fpod_pairs))
        .route("/api/files/fpod-pairs/open", post(api::open_fpod_pair))
        .route("/api/files/:id/date-range", get(api::file_date_range))
        .route("/api/taxonomy/tree", post(api::taxonomy_tree))
        .route("/api/heatmap", post(api::heatmap))
        .route("/api/sync/show-in-tree", post(api::show_in_tree))
        .route("/api/sync/actions", post(api::taxon_actions));

    Router::new()
        .merge(api)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
