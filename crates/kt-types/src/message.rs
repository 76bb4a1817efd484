//! Named configurations and the messages exchanged between the worker, the
//! benchmarking harness and the controller.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{ErrorClass, TuneError};
use crate::knob::ParamValue;

/// Knob name → value, kept in knob declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Configuration {
    entries: Vec<(String, ParamValue)>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name`, replacing an existing value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.iter().map(|(n, v)| format!("{n}={v}")).collect();
        write!(f, "{}", rendered.join(", "))
    }
}

impl Serialize for Configuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Configuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ConfigurationVisitor;

        impl<'de> Visitor<'de> for ConfigurationVisitor {
            type Value = Configuration;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of knob names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut configuration = Configuration::new();
                while let Some((name, value)) = access.next_entry::<String, ParamValue>()? {
                    configuration.insert(name, value);
                }
                Ok(configuration)
            }
        }

        deserializer.deserialize_map(ConfigurationVisitor)
    }
}

/// Worker → harness: one candidate to benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedConfig {
    pub param: Configuration,
}

/// Worker → controller: the run completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    pub param: Configuration,
    /// Feature-importance summary; absent for engines that skip ranking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
    pub finished: bool,
}

/// Worker → controller: the run failed. Carries no `finished` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    pub error: String,
    pub kind: ErrorClass,
}

/// Everything the worker sends over its channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkerMessage {
    // Order matters for untagged decoding: a final result is also a valid
    // suggestion shape once `finished` is ignored.
    Final(FinalResult),
    Suggested(SuggestedConfig),
    Failed(FailureReport),
}

impl WorkerMessage {
    pub fn suggested(param: Configuration) -> Self {
        Self::Suggested(SuggestedConfig { param })
    }

    pub fn finished(param: Configuration, rank: Option<String>) -> Self {
        Self::Final(FinalResult {
            param,
            rank,
            finished: true,
        })
    }

    pub fn failure(error: &TuneError) -> Self {
        Self::Failed(FailureReport {
            error: error.report(),
            kind: error.class(),
        })
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Final(FinalResult { finished: true, .. }))
    }

    /// Whether the run ends with this message.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Suggested(_))
    }

    pub fn param(&self) -> Option<&Configuration> {
        match self {
            Self::Final(result) => Some(&result.param),
            Self::Suggested(suggestion) => Some(&suggestion.param),
            Self::Failed(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_error;
    use serde_json::json;

    fn sample() -> Configuration {
        let mut config = Configuration::new();
        config.insert("zeta", ParamValue::Int(3));
        config.insert("alpha", ParamValue::Text("fast".into()));
        config
    }

    #[test]
    fn configuration_keeps_insertion_order_on_the_wire() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(json, r#"{"zeta":3,"alpha":"fast"}"#);

        let back: Configuration = serde_json::from_str(r#"{"b":1.5,"a":2}"#).unwrap();
        let names: Vec<&str> = back.names().collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(back.get("a"), Some(&ParamValue::Int(2)));
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut config = sample();
        config.insert("zeta", ParamValue::Int(4));
        assert_eq!(config.len(), 2);
        assert_eq!(config.names().next(), Some("zeta"));
        assert_eq!(config.get("zeta"), Some(&ParamValue::Int(4)));
    }

    #[test]
    fn message_shapes_match_protocol() {
        let suggested = serde_json::to_value(WorkerMessage::suggested(sample())).unwrap();
        assert_eq!(suggested, json!({"param": {"zeta": 3, "alpha": "fast"}}));

        let done = serde_json::to_value(WorkerMessage::finished(sample(), None)).unwrap();
        assert_eq!(done, json!({"param": {"zeta": 3, "alpha": "fast"}, "finished": true}));

        let ranked =
            serde_json::to_value(WorkerMessage::finished(sample(), Some("zeta: 100%".into())))
                .unwrap();
        assert_eq!(ranked["rank"], json!("zeta: 100%"));

        let failed = serde_json::to_value(WorkerMessage::failure(&config_error!("bad range")))
            .unwrap();
        assert!(failed.get("finished").is_none());
        assert_eq!(failed["kind"], json!("config"));
    }

    #[test]
    fn untagged_decoding_picks_the_right_variant() {
        let msg: WorkerMessage =
            serde_json::from_value(json!({"param": {"x": 1}, "finished": true})).unwrap();
        assert!(msg.is_finished());

        let msg: WorkerMessage = serde_json::from_value(json!({"param": {"x": 1}})).unwrap();
        assert!(matches!(msg, WorkerMessage::Suggested(_)));
        assert!(!msg.is_terminal());

        let msg: WorkerMessage =
            serde_json::from_value(json!({"error": "boom", "kind": "unexpected"})).unwrap();
        assert!(msg.is_terminal());
        assert!(msg.param().is_none());
    }
}
