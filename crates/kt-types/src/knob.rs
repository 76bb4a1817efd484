//! Knob declarations and the dtype codec shared by every component that moves
//! between numeric search points and named configurations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config_error;
use crate::errors::TuneResult;
use crate::message::Configuration;

/// How a knob's domain is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnobKind {
    /// Finite candidate set (explicit items, stepped ranges or string options).
    Discrete,
    /// Closed interval `[low, high]`.
    Continuous,
    /// Anything else; rejected when the space is built.
    #[serde(other)]
    Unsupported,
}

/// Value type of a knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    Int,
    Float,
    String,
    #[serde(other)]
    Unsupported,
}

/// A concrete knob value, as sent to the benchmarking harness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

/// One declared tunable parameter.
///
/// Numeric fields are kept as raw JSON so that malformed declarations surface
/// as configuration errors while the space is built rather than as opaque
/// deserialization failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnobSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: KnobKind,
    pub dtype: Dtype,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(rename = "ref")]
    pub reference: Value,
}

impl KnobSpec {
    pub fn new(
        name: impl Into<String>,
        kind: KnobKind,
        dtype: Dtype,
        reference: impl Into<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            dtype,
            range: None,
            items: None,
            options: None,
            step: None,
            reference: reference.into(),
        }
    }

    /// Continuous knob over `[low, high]`.
    pub fn continuous(
        name: impl Into<String>,
        dtype: Dtype,
        low: impl Into<Value>,
        high: impl Into<Value>,
        reference: impl Into<Value>,
    ) -> Self {
        Self::new(name, KnobKind::Continuous, dtype, reference)
            .with_range(vec![low.into(), high.into()])
    }

    /// Discrete string knob choosing among `options`.
    pub fn choice(name: impl Into<String>, options: &[&str], reference: &str) -> Self {
        Self::new(name, KnobKind::Discrete, Dtype::String, reference).with_options(
            options.iter().map(|o| Value::from(*o)).collect(),
        )
    }

    pub fn with_range(mut self, range: Vec<Value>) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_items(mut self, items: Vec<Value>) -> Self {
        self.items = Some(items);
        self
    }

    pub fn with_options(mut self, options: Vec<Value>) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    /// Declared options rendered as text, for string knobs.
    pub fn option_labels(&self) -> Vec<String> {
        self.options
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(value_text)
            .collect()
    }

    /// Index of the option whose text equals `label`.
    pub fn option_index(&self, label: &str) -> Option<usize> {
        self.options
            .as_deref()
            .unwrap_or_default()
            .iter()
            .position(|option| value_text(option) == label)
    }

    /// Numeric coordinate of a named value.
    pub fn encode(&self, value: &ParamValue) -> TuneResult<f64> {
        match (self.dtype, value) {
            (Dtype::Int, ParamValue::Int(v)) => Ok(*v as f64),
            (Dtype::Int, ParamValue::Float(v)) if v.fract() == 0.0 => Ok(*v),
            (Dtype::Float, ParamValue::Int(v)) => Ok(*v as f64),
            (Dtype::Float, ParamValue::Float(v)) => Ok(*v),
            (_, ParamValue::Text(raw)) => self.encode_text(raw),
            (Dtype::String, other) => self.encode_text(&other.to_string()),
            _ => Err(config_error!(
                "the value {} of {} is not a valid {:?} value",
                value,
                self.name,
                self.dtype
            )),
        }
    }

    /// Numeric coordinate of a textual value (as found in `name=value` tokens).
    pub fn encode_text(&self, raw: &str) -> TuneResult<f64> {
        let raw = raw.trim();
        match self.dtype {
            Dtype::Int => raw
                .parse::<i64>()
                .map(|v| v as f64)
                .map_err(|_| config_error!("the value {raw} of {} is not an integer value", self.name)),
            Dtype::Float => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| config_error!("the value {raw} of {} is not a float value", self.name)),
            Dtype::String => self
                .option_index(raw)
                .map(|idx| idx as f64)
                .ok_or_else(|| config_error!("the value {raw} of {} is not one of its options", self.name)),
            Dtype::Unsupported => Err(config_error!("the dtype of {} is not supported", self.name)),
        }
    }

    /// Named value of a numeric coordinate.
    pub fn decode(&self, coordinate: f64) -> TuneResult<ParamValue> {
        if !coordinate.is_finite() {
            return Err(config_error!(
                "the coordinate {coordinate} of {} is not finite",
                self.name
            ));
        }
        match self.dtype {
            Dtype::Int => Ok(ParamValue::Int(coordinate.round() as i64)),
            Dtype::Float => Ok(ParamValue::Float(coordinate)),
            Dtype::String => {
                let options = self.options.as_deref().unwrap_or_default();
                let idx = coordinate.round();
                if idx < 0.0 || idx as usize >= options.len() {
                    return Err(config_error!(
                        "the option index {idx} of {} is out of range",
                        self.name
                    ));
                }
                Ok(ParamValue::Text(value_text(&options[idx as usize])))
            }
            Dtype::Unsupported => Err(config_error!("the dtype of {} is not supported", self.name)),
        }
    }
}

/// Turn a search point into a named configuration, in knob order.
pub fn decode_point(knobs: &[KnobSpec], point: &[f64]) -> TuneResult<Configuration> {
    if point.len() != knobs.len() {
        return Err(config_error!(
            "point has {} coordinates but {} knobs are declared",
            point.len(),
            knobs.len()
        ));
    }
    let mut configuration = Configuration::new();
    for (knob, coordinate) in knobs.iter().zip(point) {
        configuration.insert(knob.name.clone(), knob.decode(*coordinate)?);
    }
    Ok(configuration)
}

/// Turn a named configuration back into a search point, in knob order.
pub fn encode_configuration(knobs: &[KnobSpec], configuration: &Configuration) -> TuneResult<Vec<f64>> {
    knobs
        .iter()
        .map(|knob| {
            let value = configuration
                .get(&knob.name)
                .ok_or_else(|| config_error!("the param {} is missing", knob.name))?;
            knob.encode(value)
        })
        .collect()
}

/// Coerce a JSON value to an integer. Floats truncate toward zero.
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Coerce a JSON value to a finite float.
pub fn coerce_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

/// Textual form used when comparing options: strings as-is, anything else
/// through its JSON rendering.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
