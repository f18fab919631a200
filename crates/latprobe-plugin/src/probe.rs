use anyhow::Result;
use latprobe_model::MeasurementEnvelope;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// A measurement that can be run once per scheduled cycle.
pub trait Probe: Send {
    /// Instance name; becomes the envelope `source`.
    fn name(&self) -> &str;

    /// Probe type identifier; becomes the envelope `type`.
    fn kind(&self) -> &str;

    fn interval(&self) -> Duration;

    /// Runs one cycle. Per-target failures belong in the envelope; an `Err`
    /// means no envelope could be produced at all.
    fn probe(&self) -> Result<MeasurementEnvelope>;
}

/// One entry of the `probes` list: name, factory key and whatever options
/// that probe type understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl ProbeSpec {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            options: Map::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    pub fn options_value(&self) -> Value {
        Value::Object(self.options.clone())
    }
}
