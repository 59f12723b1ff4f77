//! Day × series aggregation for the time-series heatmap
//!
//! **Algorithm:**
//! 1. Slice the points to the inclusive brush range
//!    `[max(0, start), min(len - 1, end)]`
//! 2. Parse each point's timestamp; invalid timestamps are skipped
//! 3. Bucket by UTC calendar day × series, accumulating sum and count and
//!    skipping null, non-numeric and NaN values
//! 4. Build the full day interval between the first and last contributing
//!    day; empty days still get a column
//! 5. Keep only the first `max_days` days of that interval; later days are
//!    dropped, not resampled
//! 6. Cell value = sum / count
//! 7. Colour domain = `[max(floor, min cell value), custom max or default]`
//!
//! The result is recomputed in full from its inputs; nothing is patched
//! incrementally, so identical inputs always give an identical model.

use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate};
use mfd_common::config::HeatmapConfig;
use mfd_common::time::{day_key, parse_timestamp};
use mfd_common::DataPoint;
use serde::Serialize;
use tracing::debug;

use super::color::{ColorScale, ScaleKind};

/// Key of a cell in [`HeatmapModel::cells`]
pub fn cell_key(day: &str, series: &str) -> String {
    format!("{}__{}", day, series)
}

/// One aggregated (day, series) cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapCell {
    pub day: String,
    pub series: String,
    /// Mean of the contributing samples
    pub value: f64,
    /// Number of contributing samples
    pub count: usize,
}

/// Aggregated numeric model handed to the heatmap renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapModel {
    /// Cells keyed by `"{day}__{series}"`; absent key means no data
    pub cells: BTreeMap<String, HeatmapCell>,
    /// Rendered day axis (`YYYY-MM-DD`), contiguous
    pub unique_days: Vec<String>,
    /// Rendered series axis
    pub series: Vec<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub scale: ColorScale,
    /// Days cut from the end of the interval by the day cap
    pub truncated_days: usize,
}

impl HeatmapModel {
    pub fn cell(&self, day: &str, series: &str) -> Option<&HeatmapCell> {
        self.cells.get(&cell_key(day, series))
    }

    /// Display colour of a cell, the no-data fill when it has no samples
    pub fn color(&self, day: &str, series: &str) -> String {
        self.scale.color_for(self.cell(day, series).map(|c| c.value))
    }
}

/// Pure heatmap aggregation over already-resident samples
#[derive(Debug, Clone, Copy)]
pub struct HeatmapAggregator {
    config: HeatmapConfig,
    kind: ScaleKind,
}

impl Default for HeatmapAggregator {
    fn default() -> Self {
        Self::new(HeatmapConfig::default())
    }
}

impl HeatmapAggregator {
    pub fn new(config: HeatmapConfig) -> Self {
        Self {
            config,
            kind: ScaleKind::default(),
        }
    }

    pub fn with_scale_kind(mut self, kind: ScaleKind) -> Self {
        self.kind = kind;
        self
    }

    /// Aggregate the brushed window of `points` for the given series
    ///
    /// `brush_start`/`brush_end` are inclusive point indices owned by the
    /// caller; out-of-range values are clamped.
    pub fn aggregate(
        &self,
        points: &[DataPoint],
        series: &[String],
        brush_start: i64,
        brush_end: i64,
        custom_max: Option<f64>,
    ) -> HeatmapModel {
        let ceiling = custom_max
            .filter(|m| m.is_finite() && *m > 0.0)
            .unwrap_or(self.config.default_max_value);
        let empty = |truncated_days| HeatmapModel {
            cells: BTreeMap::new(),
            unique_days: Vec::new(),
            series: series.to_vec(),
            min_value: None,
            max_value: None,
            scale: ColorScale::new(None, ceiling, self.config.min_floor, self.kind),
            truncated_days,
        };

        let Some(window) = brush_window(points.len(), brush_start, brush_end) else {
            return empty(0);
        };

        let mut buckets: HashMap<(NaiveDate, &str), (f64, usize)> = HashMap::new();
        let mut first_day: Option<NaiveDate> = None;
        let mut last_day: Option<NaiveDate> = None;
        let mut skipped_times = 0usize;
        let mut skipped_values = 0usize;

        for point in &points[window.0..=window.1] {
            let Some(ts) = parse_timestamp(&point.time) else {
                skipped_times += 1;
                continue;
            };
            let day = ts.date_naive();

            for name in series {
                let Some(value) = point.values.get(name).and_then(|v| v.as_number()) else {
                    if point.values.contains_key(name) {
                        skipped_values += 1;
                    }
                    continue;
                };
                let bucket = buckets.entry((day, name.as_str())).or_insert((0.0, 0));
                bucket.0 += value;
                bucket.1 += 1;
                first_day = Some(first_day.map_or(day, |d| d.min(day)));
                last_day = Some(last_day.map_or(day, |d| d.max(day)));
            }
        }

        if skipped_times > 0 || skipped_values > 0 {
            debug!(
                skipped_times,
                skipped_values, "Heatmap aggregation skipped unusable samples"
            );
        }

        let (Some(first), Some(last)) = (first_day, last_day) else {
            return empty(0);
        };

        let span = (last - first).num_days() as usize + 1;
        let kept = span.min(self.config.max_days.max(1));
        let last_kept = first + Duration::days(kept as i64 - 1);
        let unique_days: Vec<String> = (0..kept)
            .map(|offset| day_key(first + Duration::days(offset as i64)))
            .collect();

        let mut cells = BTreeMap::new();
        let mut min_value: Option<f64> = None;
        let mut max_value: Option<f64> = None;
        for ((day, name), (sum, count)) in buckets {
            if day > last_kept {
                continue;
            }
            let value = sum / count as f64;
            min_value = Some(min_value.map_or(value, |m| m.min(value)));
            max_value = Some(max_value.map_or(value, |m| m.max(value)));
            let day = day_key(day);
            cells.insert(
                cell_key(&day, name),
                HeatmapCell {
                    day,
                    series: name.to_string(),
                    value,
                    count,
                },
            );
        }

        if span > kept {
            debug!(
                span,
                kept, "Heatmap day interval truncated to the configured maximum"
            );
        }

        HeatmapModel {
            cells,
            unique_days,
            series: series.to_vec(),
            min_value,
            max_value,
            scale: ColorScale::new(min_value, ceiling, self.config.min_floor, self.kind),
            truncated_days: span - kept,
        }
    }
}

/// Inclusive index window after clamping, `None` when empty
fn brush_window(len: usize, start: i64, end: i64) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let lo = start.max(0) as usize;
    let hi = end.min(len as i64 - 1);
    if hi < 0 || lo > hi as usize {
        return None;
    }
    Some((lo, hi as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mfd_common::SampleValue;

    fn series(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn point(time: &str, values: &[(&str, SampleValue)]) -> DataPoint {
        values
            .iter()
            .fold(DataPoint::new(time), |p, (k, v)| p.with(k, v.clone()))
    }

    fn num(v: f64) -> SampleValue {
        SampleValue::Number(v)
    }

    #[test]
    fn test_same_day_samples_are_averaged() {
        let points = vec![
            point("2024-05-01T08:00:00Z", &[("Cod", num(4.0))]),
            point("2024-05-01T20:00:00Z", &[("Cod", num(6.0))]),
        ];
        let model = HeatmapAggregator::default().aggregate(&points, &series(&["Cod"]), 0, 1, None);

        let cell = model.cell("2024-05-01", "Cod").unwrap();
        assert_eq!(cell.value, 5.0);
        assert_eq!(cell.count, 2);
        assert_eq!(model.unique_days, vec!["2024-05-01"]);
    }

    #[test]
    fn test_empty_day_renders_as_no_data() {
        let points = vec![
            point("2024-05-01T08:00:00Z", &[("Cod", num(1.0))]),
            point("2024-05-03T08:00:00Z", &[("Cod", num(0.0))]),
        ];
        let model = HeatmapAggregator::default().aggregate(&points, &series(&["Cod"]), 0, 1, None);

        assert_eq!(model.unique_days, vec!["2024-05-01", "2024-05-02", "2024-05-03"]);
        assert!(model.cell("2024-05-02", "Cod").is_none());
        assert!(!model.cells.contains_key(&cell_key("2024-05-02", "Cod")));
        assert_eq!(model.color("2024-05-02", "Cod"), super::super::color::NO_DATA_FILL);
        // A measured zero is a real cell
        assert_eq!(model.cell("2024-05-03", "Cod").unwrap().value, 0.0);
        assert_ne!(model.color("2024-05-03", "Cod"), super::super::color::NO_DATA_FILL);
    }

    #[test]
    fn test_brush_window_limits_points() {
        let points = vec![
            point("2024-05-01", &[("Cod", num(100.0))]),
            point("2024-05-02", &[("Cod", num(2.0))]),
            point("2024-05-03", &[("Cod", num(3.0))]),
            point("2024-05-04", &[("Cod", num(100.0))]),
        ];
        let model = HeatmapAggregator::default().aggregate(&points, &series(&["Cod"]), 1, 2, None);
        assert_eq!(model.unique_days, vec!["2024-05-02", "2024-05-03"]);
        assert_eq!(model.max_value, Some(3.0));
    }

    #[test]
    fn test_brush_bounds_are_clamped() {
        let points = vec![
            point("2024-05-01", &[("Cod", num(1.0))]),
            point("2024-05-02", &[("Cod", num(2.0))]),
        ];
        let model = HeatmapAggregator::default().aggregate(&points, &series(&["Cod"]), -10, 99, None);
        assert_eq!(model.cells.len(), 2);

        let model = HeatmapAggregator::default().aggregate(&points, &series(&["Cod"]), 5, 9, None);
        assert!(model.cells.is_empty());
        assert!(model.unique_days.is_empty());
    }

    #[test]
    fn test_invalid_samples_are_skipped() {
        let points = vec![
            point("not a time", &[("Cod", num(50.0))]),
            point("2024-05-01", &[("Cod", SampleValue::Null)]),
            point("2024-05-01", &[("Cod", SampleValue::Text("n/a".to_string()))]),
            point("2024-05-01", &[("Cod", num(f64::NAN))]),
            point("2024-05-01", &[("Cod", num(7.0))]),
        ];
        let model = HeatmapAggregator::default().aggregate(&points, &series(&["Cod"]), 0, 4, None);
        let cell = model.cell("2024-05-01", "Cod").unwrap();
        assert_eq!(cell.value, 7.0);
        assert_eq!(cell.count, 1);
    }

    #[test]
    fn test_day_interval_is_capped() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let points: Vec<DataPoint> = (0..200)
            .map(|i| {
                let day = day_key(start + Duration::days(i));
                point(&day, &[("Cod", num(1.0))])
            })
            .collect();
        let model = HeatmapAggregator::default().aggregate(&points, &series(&["Cod"]), 0, 199, None);

        assert_eq!(model.unique_days.len(), 150);
        assert_eq!(model.unique_days[0], "2024-01-01");
        assert_eq!(model.unique_days[149], day_key(start + Duration::days(149)));
        assert_eq!(model.cells.len(), 150);
        assert_eq!(model.truncated_days, 50);
    }

    #[test]
    fn test_series_outside_request_are_ignored() {
        let points = vec![point("2024-05-01", &[("Cod", num(1.0)), ("Temp", num(12.0))])];
        let model = HeatmapAggregator::default().aggregate(&points, &series(&["Cod"]), 0, 0, None);
        assert_eq!(model.cells.len(), 1);
        assert_eq!(model.series, vec!["Cod"]);
    }

    #[test]
    fn test_scale_domain() {
        let points = vec![
            point("2024-05-01", &[("Cod", num(0.0))]),
            point("2024-05-02", &[("Cod", num(40.0))]),
        ];
        let model = HeatmapAggregator::default().aggregate(&points, &series(&["Cod"]), 0, 1, None);
        assert_eq!(model.scale.min, 0.001);
        assert_eq!(model.scale.max, 10.0);

        let model =
            HeatmapAggregator::default().aggregate(&points, &series(&["Cod"]), 0, 1, Some(50.0));
        assert_eq!(model.scale.max, 50.0);
    }

    #[test]
    fn test_utc_day_boundary() {
        let points = vec![
            point("2024-05-01T23:30:00-02:00", &[("Cod", num(1.0))]),
            point("2024-05-01T23:30:00Z", &[("Cod", num(3.0))]),
        ];
        let model = HeatmapAggregator::default().aggregate(&points, &series(&["Cod"]), 0, 1, None);
        assert_eq!(model.cell("2024-05-02", "Cod").unwrap().value, 1.0);
        assert_eq!(model.cell("2024-05-01", "Cod").unwrap().value, 3.0);
    }

    #[test]
    fn test_identical_inputs_identical_model() {
        let points = vec![
            point("2024-05-01", &[("Cod", num(1.0)), ("Hake", num(2.0))]),
            point("2024-05-02", &[("Cod", num(3.0))]),
        ];
        let names = series(&["Cod", "Hake"]);
        let agg = HeatmapAggregator::default();
        assert_eq!(agg.aggregate(&points, &names, 0, 1, None), agg.aggregate(&points, &names, 0, 1, None));
    }
}
