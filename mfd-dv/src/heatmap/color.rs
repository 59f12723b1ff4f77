//! Heatmap colour scale
//!
//! Sequential palette over a clamped domain. Values below the floor render
//! at the first stop and values above the ceiling at the last stop; the
//! scale never extrapolates. Cells without samples use a separate fill so
//! "no data" is distinguishable from a measured zero.

use serde::{Deserialize, Serialize};

/// Fill for a (day, series) cell with no contributing samples
pub const NO_DATA_FILL: &str = "#f3f4f6";

/// Palette stops, lowest value first
const PALETTE: [(u8, u8, u8); 5] = [
    (0xff, 0xff, 0xcc),
    (0xa1, 0xda, 0xb4),
    (0x41, 0xb6, 0xc4),
    (0x2c, 0x7f, 0xb8),
    (0x25, 0x34, 0x94),
];

/// Interpolation used between the domain bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScaleKind {
    Linear,
    /// log10 interpolation; counts span orders of magnitude
    #[default]
    Log,
}

/// Value → colour mapping shared by every heatmap cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
    pub kind: ScaleKind,
}

impl ColorScale {
    /// Domain `[max(floor, observed_min), ceiling]`
    pub fn new(observed_min: Option<f64>, ceiling: f64, floor: f64, kind: ScaleKind) -> Self {
        let min = observed_min.unwrap_or(floor).max(floor);
        Self {
            min,
            max: ceiling,
            kind,
        }
    }

    /// Position of `value` inside the domain, clamped to [0, 1]
    pub fn normalize(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return 0.0;
        }
        if self.max <= self.min {
            return if value >= self.max { 1.0 } else { 0.0 };
        }
        let v = value.clamp(self.min, self.max);
        let t = match self.kind {
            ScaleKind::Linear => (v - self.min) / (self.max - self.min),
            ScaleKind::Log if self.min > 0.0 => {
                (v.log10() - self.min.log10()) / (self.max.log10() - self.min.log10())
            }
            // A non-positive floor cannot be log-scaled
            ScaleKind::Log => (v - self.min) / (self.max - self.min),
        };
        t.clamp(0.0, 1.0)
    }

    /// Colour for a value
    pub fn color(&self, value: f64) -> String {
        interpolate(self.normalize(value))
    }

    /// Colour for a possibly empty cell
    pub fn color_for(&self, value: Option<f64>) -> String {
        match value {
            Some(v) => self.color(v),
            None => NO_DATA_FILL.to_string(),
        }
    }
}

fn interpolate(t: f64) -> String {
    let segments = (PALETTE.len() - 1) as f64;
    let scaled = t.clamp(0.0, 1.0) * segments;
    let index = (scaled.floor() as usize).min(PALETTE.len() - 2);
    let local = scaled - index as f64;

    let (r0, g0, b0) = PALETTE[index];
    let (r1, g1, b1) = PALETTE[index + 1];
    let mix = |a: u8, b: u8| -> u8 { (a as f64 + (b as f64 - a as f64) * local).round() as u8 };

    format!("#{:02x}{:02x}{:02x}", mix(r0, r1), mix(g0, g1), mix(b0, b1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_floor() {
        let scale = ColorScale::new(Some(0.0), 10.0, 0.001, ScaleKind::Log);
        assert_eq!(scale.min, 0.001);
        let scale = ColorScale::new(Some(2.5), 10.0, 0.001, ScaleKind::Log);
        assert_eq!(scale.min, 2.5);
        let scale = ColorScale::new(None, 10.0, 0.001, ScaleKind::Log);
        assert_eq!(scale.min, 0.001);
    }

    #[test]
    fn test_clamps_to_extreme_colors() {
        let scale = ColorScale::new(Some(1.0), 10.0, 0.001, ScaleKind::Linear);
        assert_eq!(scale.color(-5.0), "#ffffcc");
        assert_eq!(scale.color(1.0), "#ffffcc");
        assert_eq!(scale.color(10.0), "#253494");
        assert_eq!(scale.color(500.0), "#253494");
    }

    #[test]
    fn test_log_midpoint() {
        let scale = ColorScale::new(Some(1.0), 100.0, 0.001, ScaleKind::Log);
        assert!((scale.normalize(10.0) - 0.5).abs() < 1e-9);
        assert_eq!(scale.color(10.0), "#41b6c4");
    }

    #[test]
    fn test_zero_is_not_no_data() {
        let scale = ColorScale::new(Some(0.0), 10.0, 0.001, ScaleKind::Log);
        assert_eq!(scale.color_for(Some(0.0)), "#ffffcc");
        assert_eq!(scale.color_for(None), NO_DATA_FILL);
    }

    #[test]
    fn test_degenerate_domain() {
        let scale = ColorScale::new(Some(20.0), 10.0, 0.001, ScaleKind::Log);
        assert_eq!(scale.normalize(25.0), 1.0);
        assert_eq!(scale.normalize(5.0), 0.0);
    }
}
