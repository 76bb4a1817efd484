//! Regression-based knob importance.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use kt_engines::{Lasso, StandardScaler};
use kt_types::TuneResult;

/// A knob and its share of the total absolute regression weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFeature {
    pub name: String,
    pub percent: f64,
}

/// Knobs ordered from most to least influential.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRanking {
    pub features: Vec<RankedFeature>,
}

impl FeatureRanking {
    fn zeroed(names: &[String]) -> Self {
        Self {
            features: names
                .iter()
                .map(|name| RankedFeature {
                    name: name.clone(),
                    percent: 0.0,
                })
                .collect(),
        }
    }

    pub fn total_percent(&self) -> f64 {
        self.features.iter().map(|f| f.percent).sum()
    }
}

impl fmt::Display for FeatureRanking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, feature) in self.features.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}%", feature.name, feature.percent)?;
        }
        Ok(())
    }
}

/// Ranks knobs by the magnitude of standardized Lasso coefficients.
#[derive(Debug, Clone)]
pub struct FeatureImportanceRanker {
    alpha: f64,
}

impl Default for FeatureImportanceRanker {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

impl FeatureImportanceRanker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn rank(
        &self,
        points: &[Vec<f64>],
        costs: &[f64],
        names: &[String],
    ) -> TuneResult<FeatureRanking> {
        if points.len() < 2 {
            return Ok(FeatureRanking::zeroed(names));
        }

        let scaled = StandardScaler::fit_transform(points)?;
        let mut lasso = Lasso::new(self.alpha);
        lasso.fit(&scaled, costs)?;
        let coef = lasso.coef();
        let total: f64 = coef.iter().map(|c| c.abs()).sum();
        debug!(?coef, total, "importance regression fitted");
        if total == 0.0 {
            return Ok(FeatureRanking::zeroed(names));
        }

        let mut features: Vec<RankedFeature> = names
            .iter()
            .zip(coef)
            .map(|(name, c)| RankedFeature {
                name: name.clone(),
                percent: round2(c.abs() * 100.0 / total),
            })
            .collect();
        // Stable sort keeps knob order among equal weights.
        features.sort_by(|a, b| b.percent.total_cmp(&a.percent));
        Ok(FeatureRanking { features })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
