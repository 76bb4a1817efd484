//! Knob declarations → numeric search space.

use serde_json::Value;
use tracing::debug;

use kt_types::{
    coerce_float, coerce_int, config_error, value_text, Dimension, Dtype, KnobKind, KnobSpec,
    TuneResult,
};

const DEFAULT_INT_STEP: i64 = 1;
const DEFAULT_FLOAT_STEP: f64 = 0.1;
/// Upper bound on the values one discrete knob may expand to.
const MAX_DISCRETE_CANDIDATES: usize = 100_000;

/// The search space derived from a knob list: one dimension and one reference
/// coordinate per knob, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct KnobSpace {
    pub dimensions: Vec<Dimension>,
    pub reference: Vec<f64>,
}

impl KnobSpace {
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }
}

/// Builds a [`KnobSpace`], failing on the first invalid knob.
pub struct KnobSpaceBuilder<'a> {
    knobs: &'a [KnobSpec],
}

impl<'a> KnobSpaceBuilder<'a> {
    pub fn new(knobs: &'a [KnobSpec]) -> Self {
        Self { knobs }
    }

    pub fn build(&self) -> TuneResult<KnobSpace> {
        if self.knobs.is_empty() {
            return Err(config_error!("no knobs were declared"));
        }
        for (idx, knob) in self.knobs.iter().enumerate() {
            if self.knobs[..idx].iter().any(|other| other.name == knob.name) {
                return Err(config_error!("the knob {} is declared more than once", knob.name));
            }
        }

        let mut dimensions = Vec::with_capacity(self.knobs.len());
        let mut reference = Vec::with_capacity(self.knobs.len());
        for knob in self.knobs {
            let (dimension, reference_value) = match knob.kind {
                KnobKind::Continuous => continuous(knob)?,
                KnobKind::Discrete => discrete(knob)?,
                KnobKind::Unsupported => {
                    return Err(config_error!("the type of {} is not supported", knob.name))
                }
            };
            debug!(knob = %knob.name, ?dimension, reference = reference_value, "knob dimension built");
            dimensions.push(dimension);
            reference.push(reference_value);
        }
        Ok(KnobSpace {
            dimensions,
            reference,
        })
    }
}

/// Shorthand for `KnobSpaceBuilder::new(knobs).build()`.
pub fn build_space(knobs: &[KnobSpec]) -> TuneResult<KnobSpace> {
    KnobSpaceBuilder::new(knobs).build()
}

fn continuous(knob: &KnobSpec) -> TuneResult<(Dimension, f64)> {
    let range = match knob.range.as_deref() {
        Some(range) if range.len() == 2 => range,
        _ => {
            return Err(config_error!(
                "the item of the scope value of {} must be 2",
                knob.name
            ))
        }
    };
    let (dimension, low, high, reference) = match knob.dtype {
        Dtype::Int => {
            let low = int_value(knob, &range[0], "range")?;
            let high = int_value(knob, &range[1], "range")?;
            let reference = int_value(knob, &knob.reference, "ref")?;
            (
                Dimension::integer_interval(low, high),
                low as f64,
                high as f64,
                reference as f64,
            )
        }
        Dtype::Float => {
            let low = float_value(knob, &range[0], "range")?;
            let high = float_value(knob, &range[1], "range")?;
            let reference = float_value(knob, &knob.reference, "ref")?;
            (Dimension::interval(low, high), low, high, reference)
        }
        Dtype::String | Dtype::Unsupported => {
            return Err(config_error!(
                "the dtype of {} is not supported for continuous knobs",
                knob.name
            ))
        }
    };
    if low > high {
        return Err(config_error!(
            "the range of {} has its lower bound above its upper bound",
            knob.name
        ));
    }
    if reference < low || reference > high {
        return Err(config_error!("the ref value of {} is out of range", knob.name));
    }
    Ok((dimension, reference))
}

fn discrete(knob: &KnobSpec) -> TuneResult<(Dimension, f64)> {
    match knob.dtype {
        Dtype::Int => discrete_int(knob),
        Dtype::Float => discrete_float(knob),
        Dtype::String => discrete_string(knob),
        Dtype::Unsupported => Err(config_error!("the dtype of {} is not supported", knob.name)),
    }
}

fn discrete_int(knob: &KnobSpec) -> TuneResult<(Dimension, f64)> {
    let step = match knob.step {
        Some(step) if step >= 1.0 => step.trunc() as i64,
        _ => DEFAULT_INT_STEP,
    };
    let mut candidates = Vec::new();
    for item in knob.items.as_deref().unwrap_or_default() {
        candidates.push(int_value(knob, item, "items")? as f64);
    }
    for pair in knob.range.as_deref().unwrap_or_default().chunks_exact(2) {
        let low = int_value(knob, &pair[0], "range")?;
        let high = int_value(knob, &pair[1], "range")?;
        let mut value = low;
        while value <= high {
            push_candidate(knob, &mut candidates, value as f64)?;
            match value.checked_add(step) {
                Some(next) => value = next,
                None => break,
            }
        }
    }
    let reference = int_value(knob, &knob.reference, "ref")? as f64;
    Ok((candidate_dimension(candidates, reference), reference))
}

fn discrete_float(knob: &KnobSpec) -> TuneResult<(Dimension, f64)> {
    let step = match knob.step {
        Some(step) if step > 0.0 && step.is_finite() => step,
        _ => DEFAULT_FLOAT_STEP,
    };
    let mut candidates = Vec::new();
    for item in knob.items.as_deref().unwrap_or_default() {
        candidates.push(float_value(knob, item, "items")?);
    }
    for pair in knob.range.as_deref().unwrap_or_default().chunks_exact(2) {
        let low = float_value(knob, &pair[0], "range")?;
        let high = float_value(knob, &pair[1], "range")?;
        // The upper bound is exclusive for float stepping.
        let mut i = 0u64;
        loop {
            let value = low + i as f64 * step;
            if value >= high {
                break;
            }
            push_candidate(knob, &mut candidates, value)?;
            i += 1;
        }
    }
    let reference = float_value(knob, &knob.reference, "ref")?;
    Ok((candidate_dimension(candidates, reference), reference))
}

fn discrete_string(knob: &KnobSpec) -> TuneResult<(Dimension, f64)> {
    let options = knob.options.as_deref().unwrap_or_default();
    if options.is_empty() {
        return Err(config_error!("the options of {} must not be empty", knob.name));
    }
    let reference = knob
        .option_index(&value_text(&knob.reference))
        .ok_or_else(|| config_error!("the ref value of {} is out of range", knob.name))?;
    let candidates = (0..options.len()).map(|idx| idx as f64).collect();
    Ok((Dimension::Candidates(candidates), reference as f64))
}

fn push_candidate(knob: &KnobSpec, candidates: &mut Vec<f64>, value: f64) -> TuneResult<()> {
    if candidates.len() >= MAX_DISCRETE_CANDIDATES {
        return Err(config_error!(
            "the range of {} expands to more than {MAX_DISCRETE_CANDIDATES} values",
            knob.name
        ));
    }
    candidates.push(value);
    Ok(())
}

/// Sorted, de-duplicated candidate set that always contains the reference.
fn candidate_dimension(mut candidates: Vec<f64>, reference: f64) -> Dimension {
    candidates.push(reference);
    candidates.sort_by(f64::total_cmp);
    candidates.dedup();
    Dimension::Candidates(candidates)
}

fn int_value(knob: &KnobSpec, value: &Value, field: &str) -> TuneResult<i64> {
    coerce_int(value).ok_or_else(|| {
        config_error!(
            "the {field} value {value} of {} is not an integer value",
            knob.name
        )
    })
}

fn float_value(knob: &KnobSpec, value: &Value, field: &str) -> TuneResult<f64> {
    coerce_float(value).ok_or_else(|| {
        config_error!(
            "the {field} value {value} of {} is not a float value",
            knob.name
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kt_types::TuneError;
    use serde_json::json;

    fn knobs(value: Value) -> Vec<KnobSpec> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn dimensions_follow_knob_order() {
        let knobs = knobs(json!([
            {"name": "x", "type": "continuous", "dtype": "int", "range": [0, 10], "ref": 5},
            {"name": "mode", "type": "discrete", "dtype": "string", "options": ["a", "b", "c"], "ref": "b"},
            {"name": "ratio", "type": "continuous", "dtype": "float", "range": ["0.5", 1.5], "ref": "1"},
        ]));
        let space = build_space(&knobs).unwrap();
        assert_eq!(space.len(), 3);
        assert_eq!(space.reference, vec![5.0, 1.0, 1.0]);
        assert_eq!(space.dimensions[0], Dimension::integer_interval(0, 10));
        assert_eq!(space.dimensions[1], Dimension::Candidates(vec![0.0, 1.0, 2.0]));
        assert_eq!(space.dimensions[2], Dimension::interval(0.5, 1.5));
    }

    #[test]
    fn discrete_int_steps_include_upper_bound() {
        let knobs = knobs(json!([
            {"name": "n", "type": "discrete", "dtype": "int", "range": [0, 6, 20, 21, 99], "items": [3, "40"], "step": 2, "ref": 7}
        ]));
        let space = build_space(&knobs).unwrap();
        assert_eq!(
            space.dimensions[0],
            Dimension::Candidates(vec![0.0, 2.0, 3.0, 4.0, 6.0, 7.0, 20.0, 40.0])
        );
        assert_eq!(space.reference, vec![7.0]);
    }

    #[test]
    fn discrete_float_steps_exclude_upper_bound() {
        let knobs = knobs(json!([
            {"name": "f", "type": "discrete", "dtype": "float", "range": [0.0, 1.0], "step": 0.25, "ref": 0.5}
        ]));
        let space = build_space(&knobs).unwrap();
        assert_eq!(
            space.dimensions[0],
            Dimension::Candidates(vec![0.0, 0.25, 0.5, 0.75])
        );
    }

    #[test]
    fn invalid_steps_fall_back_to_defaults() {
        let knobs = knobs(json!([
            {"name": "n", "type": "discrete", "dtype": "int", "range": [1, 3], "step": 0.5, "ref": 1},
            {"name": "f", "type": "discrete", "dtype": "float", "range": [0, 0.3], "step": -1, "ref": 0}
        ]));
        let space = build_space(&knobs).unwrap();
        assert_eq!(space.dimensions[0], Dimension::Candidates(vec![1.0, 2.0, 3.0]));
        let Dimension::Candidates(values) = &space.dimensions[1] else {
            panic!("float knob must be discrete");
        };
        assert_eq!(values.len(), 3);
        assert!((values[2] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn int_stepping_stops_at_the_integer_limit() {
        let knobs = knobs(json!([
            {"name": "n", "type": "discrete", "dtype": "int", "range": [i64::MAX - 1, i64::MAX], "ref": i64::MAX},
            {"name": "m", "type": "discrete", "dtype": "int", "range": [0, 10], "step": 1e30, "ref": 0}
        ]));
        let space = build_space(&knobs).unwrap();
        let Dimension::Candidates(values) = &space.dimensions[0] else {
            panic!("int knob must be discrete");
        };
        assert!(!values.is_empty());
        assert!(values.iter().all(|v| *v >= (i64::MAX - 1) as f64));
        assert_eq!(space.dimensions[1], Dimension::Candidates(vec![0.0]));
    }

    #[test]
    fn oversized_discrete_ranges_are_rejected() {
        let cases = [
            json!({"name": "n", "type": "discrete", "dtype": "int", "range": [0, i64::MAX], "ref": 0}),
            json!({"name": "f", "type": "discrete", "dtype": "float", "range": [0, 1], "step": 1e-300, "ref": 0}),
            json!({"name": "f", "type": "discrete", "dtype": "float", "range": [1e300, 2e300], "step": 0.1, "ref": 1e300}),
        ];
        for case in cases {
            let knobs = knobs(json!([case]));
            let err = build_space(&knobs).unwrap_err();
            assert!(
                matches!(err, TuneError::Config(ref msg) if msg.contains("expands to more than")),
                "{case}: {err}"
            );
        }
    }

    #[test]
    fn discrete_reference_is_always_a_candidate() {
        for reference in [-4, 0, 5, 11, 250] {
            let knobs = knobs(json!([
                {"name": "n", "type": "discrete", "dtype": "int", "range": [0, 10], "step": 5, "ref": reference}
            ]));
            let space = build_space(&knobs).unwrap();
            assert!(space.dimensions[0].contains(space.reference[0]));
        }
    }

    #[test]
    fn continuous_reference_must_lie_in_range() {
        let inside = knobs(json!([
            {"name": "x", "type": "continuous", "dtype": "float", "range": [0, 1], "ref": 1}
        ]));
        assert!(build_space(&inside).is_ok());

        let outside = knobs(json!([
            {"name": "x", "type": "continuous", "dtype": "float", "range": [0, 1], "ref": 1.01}
        ]));
        let err = build_space(&outside).unwrap_err();
        assert!(matches!(err, TuneError::Config(ref msg) if msg.contains("out of range")));
    }

    #[test]
    fn continuous_range_needs_two_bounds() {
        let knobs = knobs(json!([
            {"name": "x", "type": "continuous", "dtype": "int", "range": [0], "ref": 0}
        ]));
        let err = build_space(&knobs).unwrap_err();
        assert!(err.to_string().contains("must be 2"));
    }

    #[test]
    fn malformed_declarations_are_rejected() {
        let cases = [
            json!({"name": "x", "type": "continuous", "dtype": "int", "range": [5, 1], "ref": 3}),
            json!({"name": "x", "type": "continuous", "dtype": "int", "range": [0, 9], "ref": "high"}),
            json!({"name": "x", "type": "continuous", "dtype": "string", "range": [0, 9], "ref": 1}),
            json!({"name": "x", "type": "ordinal", "dtype": "int", "range": [0, 9], "ref": 1}),
            json!({"name": "x", "type": "discrete", "dtype": "bool", "ref": true}),
            json!({"name": "x", "type": "discrete", "dtype": "string", "options": [], "ref": "a"}),
            json!({"name": "x", "type": "discrete", "dtype": "string", "options": ["a"], "ref": "z"}),
        ];
        for case in cases {
            let knobs = knobs(json!([case]));
            let err = build_space(&knobs).unwrap_err();
            assert!(matches!(err, TuneError::Config(_)), "{case}: {err}");
        }
    }

    #[test]
    fn empty_and_duplicate_knob_lists_are_rejected() {
        assert!(build_space(&[]).is_err());
        let knobs = knobs(json!([
            {"name": "x", "type": "continuous", "dtype": "int", "range": [0, 9], "ref": 1},
            {"name": "x", "type": "continuous", "dtype": "int", "range": [0, 9], "ref": 1}
        ]));
        assert!(build_space(&knobs).unwrap_err().to_string().contains("more than once"));
    }

    #[test]
    fn numeric_string_options_match_by_text() {
        let knobs = knobs(json!([
            {"name": "hugepages", "type": "discrete", "dtype": "string", "options": ["always", 2, "never"], "ref": "2"}
        ]));
        let space = build_space(&knobs).unwrap();
        assert_eq!(space.reference, vec![1.0]);
    }
}
