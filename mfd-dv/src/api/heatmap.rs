//! Heatmap endpoint

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use mfd_common::DataPoint;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::load_merged_table;
use crate::error::ApiResult;
use crate::heatmap::{HeatmapModel, ScaleKind, NO_DATA_FILL};
use crate::sync::BrushWindow;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct HeatmapRequest {
    #[serde(default)]
    pub points: Vec<DataPoint>,
    /// Stored files merged and appended after `points`
    #[serde(default)]
    pub file_ids: Vec<Uuid>,
    /// Series in display order; every series present when omitted
    #[serde(default)]
    pub series: Option<Vec<String>>,
    /// Point-index brush; takes precedence over `time_range`
    #[serde(default)]
    pub brush: Option<BrushWindow>,
    #[serde(default)]
    pub time_range: Option<TimeRange>,
    #[serde(default)]
    pub custom_max: Option<f64>,
    #[serde(default)]
    pub scale: ScaleKind,
}

/// Brush given as wall-clock bounds, inclusive
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct HeatmapResponse {
    #[serde(flatten)]
    pub model: HeatmapModel,
    /// Display colour per cell key
    pub colors: BTreeMap<String, String>,
    pub no_data_fill: &'static str,
}

/// Series names in first-seen order
fn all_series(points: &[DataPoint]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for point in points {
        for name in point.values.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    names
}

/// Index window the aggregator slices on
///
/// A time range no point falls into selects nothing.
fn resolve_brush(
    brush: Option<BrushWindow>,
    time_range: Option<TimeRange>,
    points: &[DataPoint],
) -> BrushWindow {
    match (brush, time_range) {
        (Some(brush), _) => brush,
        (None, Some(range)) => BrushWindow::from_time_range(points, range.from, range.to)
            .unwrap_or_else(BrushWindow::empty),
        (None, None) => BrushWindow::full(points.len()),
    }
}

/// POST /api/heatmap
pub async fn heatmap(
    State(state): State<AppState>,
    Json(req): Json<HeatmapRequest>,
) -> ApiResult<Json<HeatmapResponse>> {
    let mut points = req.points;
    if let Some(table) = load_merged_table(&state, &req.file_ids).await? {
        points.extend(table.to_data_points()?);
    }

    let series = req.series.unwrap_or_else(|| all_series(&points));
    let brush = resolve_brush(req.brush, req.time_range, &points);

    let model = state.aggregator().with_scale_kind(req.scale).aggregate(
        &points,
        &series,
        brush.start,
        brush.end,
        req.custom_max,
    );

    let colors = model
        .cells
        .iter()
        .map(|(key, cell)| (key.clone(), model.scale.color(cell.value)))
        .collect();

    Ok(Json(HeatmapResponse {
        model,
        colors,
        no_data_fill: NO_DATA_FILL,
    }))
}
