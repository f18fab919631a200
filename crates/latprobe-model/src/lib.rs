//! Shared data structures for latprobe.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Round-trip summary for one host over one probe cycle.
///
/// `min`, `max` and `avg` are only present when at least one reply came back;
/// their absence on the wire means the host did not answer this cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostStat {
    pub host: String,
    pub cnt: u32,
    pub loss: f64,
    pub data: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg: Option<f64>,
}

impl HostStat {
    /// Builds the summary from the number of probes sent and the latencies
    /// (ms) of the probes that were answered.
    pub fn new(host: impl Into<String>, cnt: u32, data: Vec<f64>) -> Self {
        let received = data.len() as u32;
        let lost = cnt.saturating_sub(received);
        let loss = if cnt > 0 {
            lost as f64 / cnt as f64
        } else {
            0.0
        };

        let (min, max, avg) = if data.is_empty() {
            (None, None, None)
        } else {
            let min = data.iter().copied().fold(f64::INFINITY, f64::min);
            let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let avg = data.iter().sum::<f64>() / data.len() as f64;
            (Some(min), Some(max), Some(avg))
        };

        Self {
            host: host.into(),
            cnt,
            loss,
            data,
            min,
            max,
            avg,
        }
    }

    pub fn lost(&self) -> u32 {
        self.cnt.saturating_sub(self.data.len() as u32)
    }

    pub fn is_unreachable(&self) -> bool {
        self.cnt > 0 && self.data.is_empty()
    }
}

/// One probe cycle, ready to be handed to an emitter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeasurementEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    /// Unix epoch seconds (UTC) captured when the cycle started.
    pub ts: f64,
    pub data: Vec<HostStat>,
}

impl MeasurementEnvelope {
    pub fn new(kind: impl Into<String>, source: impl Into<String>, ts: f64) -> Self {
        Self {
            kind: kind.into(),
            source: source.into(),
            ts,
            data: Vec::new(),
        }
    }

    pub fn host(&self, host: &str) -> Option<&HostStat> {
        self.data.iter().find(|stat| stat.host == host)
    }
}

/// A configured probe target: either a bare address or a mapping with a
/// `host` key plus display metadata that the probe itself never reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Value", into = "Value")]
pub enum HostEntry {
    Plain(String),
    Annotated {
        host: String,
        extras: Map<String, Value>,
    },
}

impl HostEntry {
    pub fn host(&self) -> &str {
        match self {
            HostEntry::Plain(host) => host,
            HostEntry::Annotated { host, .. } => host,
        }
    }

    pub fn extras(&self) -> Option<&Map<String, Value>> {
        match self {
            HostEntry::Plain(_) => None,
            HostEntry::Annotated { extras, .. } => Some(extras),
        }
    }

    /// Same entry in annotated form; plain entries gain an empty metadata map.
    pub fn annotated(&self) -> HostEntry {
        match self {
            HostEntry::Plain(host) => HostEntry::Annotated {
                host: host.clone(),
                extras: Map::new(),
            },
            annotated => annotated.clone(),
        }
    }
}

impl From<&str> for HostEntry {
    fn from(host: &str) -> Self {
        HostEntry::Plain(host.to_string())
    }
}

impl TryFrom<Value> for HostEntry {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(host) => {
                let host = host.trim();
                if host.is_empty() {
                    return Err("host entry is an empty string".to_string());
                }
                Ok(HostEntry::Plain(host.to_string()))
            }
            Value::Object(mut extras) => match extras.remove("host") {
                Some(Value::String(host)) if !host.trim().is_empty() => Ok(HostEntry::Annotated {
                    host: host.trim().to_string(),
                    extras,
                }),
                Some(other) => Err(format!("`host` must be a non-empty string, got {other}")),
                None => Err("host entry mapping is missing the `host` key".to_string()),
            },
            other => Err(format!(
                "host entry must be an address string or a mapping with a `host` key, got {other}"
            )),
        }
    }
}

impl From<HostEntry> for Value {
    fn from(entry: HostEntry) -> Self {
        match entry {
            HostEntry::Plain(host) => Value::String(host),
            HostEntry::Annotated { host, extras } => {
                let mut map = Map::with_capacity(extras.len() + 1);
                map.insert("host".to_string(), Value::String(host));
                map.extend(extras);
                Value::Object(map)
            }
        }
    }
}

/// A named group of hosts. Anything besides `hosts` is display metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostGroup {
    pub hosts: Vec<HostEntry>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stat_without_replies_omits_summary_fields() {
        let stat = HostStat::new("10.0.0.9", 3, Vec::new());
        assert_eq!(stat.loss, 1.0);
        assert!(stat.is_unreachable());

        let value = serde_json::to_value(&stat).unwrap();
        assert_eq!(value, json!({"host": "10.0.0.9", "cnt": 3, "loss": 1.0, "data": []}));
    }

    #[test]
    fn stat_summary_from_latencies() {
        let stat = HostStat::new("10.0.0.1", 4, vec![2.0, 1.0, 3.0]);
        assert_eq!(stat.lost(), 1);
        assert_eq!(stat.loss, 0.25);
        assert_eq!(stat.min, Some(1.0));
        assert_eq!(stat.max, Some(3.0));
        assert_eq!(stat.avg, Some(2.0));
    }

    #[test]
    fn zero_count_has_no_loss() {
        let stat = HostStat::new("a", 0, Vec::new());
        assert_eq!(stat.loss, 0.0);
        assert!(!stat.is_unreachable());
    }

    #[test]
    fn envelope_uses_type_key() {
        let mut envelope = MeasurementEnvelope::new("fping", "latency", 1.5);
        envelope.data.push(HostStat::new("a", 1, vec![0.5]));

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["type"], "fping");
        assert_eq!(value["source"], "latency");
        assert_eq!(value["ts"], 1.5);
        assert_eq!(value["data"][0]["avg"], 0.5);
        assert!(envelope.host("a").is_some());
    }

    #[test]
    fn host_entry_accepts_both_shapes() {
        let entries: Vec<HostEntry> =
            serde_json::from_value(json!(["a.com", {"host": "b.com", "color": "red"}])).unwrap();

        assert_eq!(entries[0], HostEntry::Plain("a.com".to_string()));
        assert_eq!(entries[1].host(), "b.com");
        assert_eq!(entries[1].extras().unwrap()["color"], "red");

        let back = serde_json::to_value(&entries).unwrap();
        assert_eq!(back[1], json!({"host": "b.com", "color": "red"}));
    }

    #[test]
    fn host_entry_without_host_key_is_rejected() {
        let err = serde_json::from_value::<HostEntry>(json!({"color": "red"})).unwrap_err();
        assert!(err.to_string().contains("missing the `host` key"));

        assert!(serde_json::from_value::<HostEntry>(json!(42)).is_err());
        assert!(serde_json::from_value::<HostEntry>(json!("  ")).is_err());
    }

    #[test]
    fn group_keeps_metadata() {
        let group: HostGroup =
            serde_json::from_value(json!({"hosts": ["a.com"], "color": "blue"})).unwrap();
        assert_eq!(group.hosts.len(), 1);
        assert_eq!(group.extras["color"], "blue");
    }
}
