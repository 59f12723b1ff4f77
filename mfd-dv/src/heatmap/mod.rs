//! Time-series heatmap: aggregation and colour mapping

pub mod aggregate;
pub mod color;

pub use aggregate::{cell_key, HeatmapAggregator, HeatmapCell, HeatmapModel};
pub use color::{ColorScale, ScaleKind, NO_DATA_FILL};
