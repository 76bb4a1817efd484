//! Warm-start transfer: prior `name=value` trials → positional vectors.

use serde_json::Value;
use tracing::info;

use kt_types::{coerce_float, warm_start_error, KnobSpec, TuneResult};

use crate::space::KnobSpace;

/// Prior trials aligned with the knob order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferredTrials {
    pub vectors: Vec<Vec<f64>>,
    pub scores: Vec<f64>,
}

impl TransferredTrials {
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Resolves prior trials against the knobs and the space built from them.
/// Every transferred coordinate lies inside its knob's dimension.
pub struct WarmStartTransfer<'a> {
    knobs: &'a [KnobSpec],
    space: &'a KnobSpace,
}

impl<'a> WarmStartTransfer<'a> {
    pub fn new(knobs: &'a [KnobSpec], space: &'a KnobSpace) -> Self {
        Self { knobs, space }
    }

    /// Resolve `x0`/`y0`. Either side missing means no warm start.
    pub fn transfer(
        &self,
        x0: Option<&[Vec<String>]>,
        y0: Option<&[Value]>,
    ) -> TuneResult<TransferredTrials> {
        let (Some(x0), Some(y0)) = (x0, y0) else {
            return Ok(TransferredTrials::default());
        };
        if x0.len() != y0.len() {
            return Err(warm_start_error!(
                "x0 has {} trials but y0 has {} scores",
                x0.len(),
                y0.len()
            ));
        }

        let vectors = x0
            .iter()
            .map(|tokens| self.vector(tokens))
            .collect::<TuneResult<Vec<_>>>()?;
        let scores = y0
            .iter()
            .map(|score| {
                coerce_float(score)
                    .ok_or_else(|| warm_start_error!("the score {score} in y0 is not a number"))
            })
            .collect::<TuneResult<Vec<_>>>()?;

        info!(trials = vectors.len(), "warm start transferred");
        Ok(TransferredTrials { vectors, scores })
    }

    fn vector(&self, tokens: &[String]) -> TuneResult<Vec<f64>> {
        if tokens.len() != self.knobs.len() {
            return Err(warm_start_error!(
                "x0 is not the same length with knobs: {} tokens for {} knobs",
                tokens.len(),
                self.knobs.len()
            ));
        }

        let mut values: Vec<Option<&str>> = vec![None; self.knobs.len()];
        for token in tokens {
            let mut parts = token.split('=');
            let (Some(name), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err(warm_start_error!("the param format of {token} is not correct"));
            };
            let name = name.trim();
            let idx = self
                .knobs
                .iter()
                .position(|knob| knob.name == name)
                .ok_or_else(|| warm_start_error!("the param {name} is not a declared knob"))?;
            if values[idx].replace(value).is_some() {
                return Err(warm_start_error!("the param {name} appears more than once in x0"));
            }
        }

        self.knobs
            .iter()
            .zip(&self.space.dimensions)
            .zip(values)
            .map(|((knob, dimension), value)| {
                let value = value
                    .ok_or_else(|| warm_start_error!("the param {} is not in the x0 ref", knob.name))?;
                let encoded = knob.encode_text(value)?;
                if !dimension.contains(encoded) {
                    return Err(warm_start_error!(
                        "the param {}={value} is outside its search space",
                        knob.name
                    ));
                }
                Ok(encoded)
            })
            .collect()
    }
}

/// Random evaluations still needed once `seeds` points are known, given a
/// configured count of `configured`.
pub fn adjusted_random_starts(seeds: usize, configured: usize) -> usize {
    if seeds >= configured {
        0
    } else {
        (configured - seeds + 1).min(configured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::build_space;
    use kt_types::{Dtype, ErrorClass, TuneError};
    use serde_json::json;

    fn knobs() -> Vec<KnobSpec> {
        vec![
            KnobSpec::continuous("x", Dtype::Int, 0, 10, 5),
            KnobSpec::choice("mode", &["a", "b", "c"], "a"),
            KnobSpec::continuous("ratio", Dtype::Float, 0.0, 1.0, 0.5),
        ]
    }

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn single_knob_transfer() {
        let knobs = vec![KnobSpec::continuous("x", Dtype::Int, 0, 10, 0)];
        let space = build_space(&knobs).unwrap();
        let x0 = vec![tokens(&["x=5"])];
        let y0 = vec![json!(1.23)];
        let trials = WarmStartTransfer::new(&knobs, &space)
            .transfer(Some(x0.as_slice()), Some(y0.as_slice()))
            .unwrap();
        assert_eq!(trials.vectors, vec![vec![5.0]]);
        assert_eq!(trials.scores, vec![1.23]);
    }

    #[test]
    fn tokens_are_reordered_to_knob_order() {
        let knobs = knobs();
        let x0 = vec![
            tokens(&["ratio=0.25", "x=3", "mode=c"]),
            tokens(&["mode=a", "ratio=1", "x=10"]),
        ];
        let y0 = vec![json!("2.5"), json!(-1)];
        let space = build_space(&knobs).unwrap();
        let trials = WarmStartTransfer::new(&knobs, &space)
            .transfer(Some(x0.as_slice()), Some(y0.as_slice()))
            .unwrap();
        assert_eq!(trials.vectors, vec![vec![3.0, 2.0, 0.25], vec![10.0, 0.0, 1.0]]);
        assert_eq!(trials.scores, vec![2.5, -1.0]);
    }

    #[test]
    fn missing_side_means_no_warm_start() {
        let knobs = knobs();
        let space = build_space(&knobs).unwrap();
        let x0 = vec![tokens(&["x=3", "mode=c", "ratio=0.1"])];
        let transfer = WarmStartTransfer::new(&knobs, &space);
        assert!(transfer.transfer(Some(x0.as_slice()), None).unwrap().is_empty());
        assert!(transfer.transfer(None, Some(&[json!(1)][..])).unwrap().is_empty());
    }

    #[test]
    fn malformed_trials_are_rejected() {
        let knobs = knobs();
        let space = build_space(&knobs).unwrap();
        let transfer = WarmStartTransfer::new(&knobs, &space);
        let y0 = vec![json!(1.0)];
        let cases = [
            tokens(&["x=3", "mode=c"]),
            tokens(&["x=3", "mode=c", "ratio"]),
            tokens(&["x=3", "mode=c", "ratio=0.1=2"]),
            tokens(&["x=3", "mode=c", "x=4"]),
            tokens(&["x=3", "mode=c", "speed=4"]),
            tokens(&["x=3", "mode=z", "ratio=0.1"]),
            tokens(&["x=three", "mode=c", "ratio=0.1"]),
        ];
        for case in cases {
            let err = transfer.transfer(Some(&[case.clone()][..]), Some(y0.as_slice())).unwrap_err();
            assert_eq!(err.class(), ErrorClass::Config, "{case:?}: {err}");
        }
    }

    #[test]
    fn values_outside_the_space_are_rejected() {
        let knobs = knobs();
        let space = build_space(&knobs).unwrap();
        let transfer = WarmStartTransfer::new(&knobs, &space);
        let y0 = vec![json!(-100)];
        for case in [
            tokens(&["x=50", "mode=a", "ratio=0.5"]),
            tokens(&["x=-1", "mode=a", "ratio=0.5"]),
            tokens(&["x=3", "mode=a", "ratio=1.5"]),
        ] {
            let err = transfer.transfer(Some(&[case.clone()][..]), Some(y0.as_slice())).unwrap_err();
            assert!(matches!(err, TuneError::WarmStart(ref msg) if msg.contains("outside")), "{case:?}: {err}");
        }

        let edges = vec![tokens(&["x=10", "mode=c", "ratio=0"])];
        let trials = transfer.transfer(Some(edges.as_slice()), Some(y0.as_slice())).unwrap();
        assert_eq!(trials.vectors, vec![vec![10.0, 2.0, 0.0]]);
    }

    #[test]
    fn discrete_values_must_be_candidates() {
        let knobs: Vec<KnobSpec> = serde_json::from_value(json!([
            {"name": "n", "type": "discrete", "dtype": "int", "range": [0, 8], "step": 4, "ref": 0}
        ]))
        .unwrap();
        let space = build_space(&knobs).unwrap();
        let transfer = WarmStartTransfer::new(&knobs, &space);
        let y0 = vec![json!(1)];
        assert!(transfer
            .transfer(Some(&[tokens(&["n=4"])][..]), Some(y0.as_slice()))
            .is_ok());
        let err = transfer
            .transfer(Some(&[tokens(&["n=5"])][..]), Some(y0.as_slice()))
            .unwrap_err();
        assert!(matches!(err, TuneError::WarmStart(_)));
    }

    #[test]
    fn scores_must_match_trials() {
        let knobs = knobs();
        let space = build_space(&knobs).unwrap();
        let transfer = WarmStartTransfer::new(&knobs, &space);
        let x0 = vec![tokens(&["x=3", "mode=c", "ratio=0.1"])];
        let err = transfer
            .transfer(Some(x0.as_slice()), Some(&[json!(1), json!(2)][..]))
            .unwrap_err();
        assert!(matches!(err, TuneError::WarmStart(_)));
        let err = transfer.transfer(Some(x0.as_slice()), Some(&[json!("fast")][..])).unwrap_err();
        assert!(matches!(err, TuneError::WarmStart(_)));
    }

    #[test]
    fn random_starts_shrink_with_seeds() {
        assert_eq!(adjusted_random_starts(1, 20), 20);
        assert_eq!(adjusted_random_starts(5, 20), 16);
        assert_eq!(adjusted_random_starts(20, 20), 0);
        assert_eq!(adjusted_random_starts(35, 20), 0);
        assert_eq!(adjusted_random_starts(0, 20), 20);
        for seeds in 0..30 {
            assert!(adjusted_random_starts(seeds, 10) <= 10);
        }
    }
}
