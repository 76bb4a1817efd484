//! Numeric search dimensions.

use serde::{Deserialize, Serialize};

/// The numeric domain one knob is searched over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Dimension {
    /// Closed interval `[low, high]`; `integer` restricts it to whole numbers.
    Interval { low: f64, high: f64, integer: bool },
    /// Finite candidate set. String knobs use option indices.
    Candidates(Vec<f64>),
}

impl Dimension {
    pub fn interval(low: f64, high: f64) -> Self {
        Self::Interval {
            low,
            high,
            integer: false,
        }
    }

    pub fn integer_interval(low: i64, high: i64) -> Self {
        Self::Interval {
            low: low as f64,
            high: high as f64,
            integer: true,
        }
    }

    pub fn contains(&self, x: f64) -> bool {
        match self {
            Self::Interval { low, high, integer } => {
                x >= *low && x <= *high && (!integer || x.fract() == 0.0)
            }
            Self::Candidates(values) => values.contains(&x),
        }
    }

    /// Smallest and largest reachable value.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            Self::Interval { low, high, .. } => (*low, *high),
            Self::Candidates(values) => values.iter().fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), v| (lo.min(*v), hi.max(*v)),
            ),
        }
    }

    /// Map `u ∈ [0, 1]` onto the dimension (uniform in `u` gives uniform
    /// samples of the domain).
    pub fn from_unit(&self, u: f64) -> f64 {
        let u = u.clamp(0.0, 1.0);
        match self {
            Self::Interval {
                low,
                high,
                integer: false,
            } => low + u * (high - low),
            Self::Interval {
                low,
                high,
                integer: true,
            } => {
                let span = high - low + 1.0;
                (low + (u * span).floor()).min(*high)
            }
            Self::Candidates(values) => {
                let idx = ((u * values.len() as f64).floor() as usize).min(values.len().saturating_sub(1));
                values.get(idx).copied().unwrap_or(f64::NAN)
            }
        }
    }

    /// Position of `x` inside the dimension's bounds, scaled to `[0, 1]`.
    pub fn to_unit(&self, x: f64) -> f64 {
        let (lo, hi) = self.bounds();
        if hi > lo {
            ((x - lo) / (hi - lo)).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Snap an arbitrary value onto the dimension.
    pub fn snap(&self, x: f64) -> f64 {
        match self {
            Self::Interval { low, high, integer } => {
                let v = x.clamp(*low, *high);
                if *integer {
                    v.round().clamp(*low, *high)
                } else {
                    v
                }
            }
            Self::Candidates(values) => values
                .iter()
                .copied()
                .min_by(|a, b| (a - x).abs().total_cmp(&(b - x).abs()))
                .unwrap_or(f64::NAN),
        }
    }
}
