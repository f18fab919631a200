use crate::error::ProbeError;
use latprobe_model::{HostEntry, HostGroup};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Identifier written to the `type` field of every envelope.
pub const PROBE_KIND: &str = "fping";

pub const DEFAULT_COMMAND: &str = "fping";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_COUNT: u32 = 5;

/// Spacing between probes to the same host, in ms (`-p`).
pub const PROBE_PERIOD_MS: u32 = 20;

fn default_command() -> String {
    DEFAULT_COMMAND.to_string()
}

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

fn default_count() -> u32 {
    DEFAULT_COUNT
}

/// Settings of one fping probe instance. Immutable once the probe is built.
#[derive(Debug, Clone, PartialEq)]
pub struct FpingConfig {
    /// Instance name, reported as the envelope `source`.
    pub name: String,
    pub command: String,
    pub interval: Duration,
    /// Probes sent to each host per cycle.
    pub count: u32,
    pub hosts: Vec<HostEntry>,
    pub groups: BTreeMap<String, HostGroup>,
}

#[derive(Debug, Deserialize)]
struct RawFpingConfig {
    #[serde(default = "default_command")]
    command: String,
    #[serde(default = "default_interval", with = "humantime_serde")]
    interval: Duration,
    #[serde(default = "default_count")]
    count: u32,
    #[serde(default)]
    hosts: Vec<HostEntry>,
    #[serde(flatten)]
    rest: BTreeMap<String, Value>,
}

impl FpingConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: default_command(),
            interval: DEFAULT_INTERVAL,
            count: DEFAULT_COUNT,
            hosts: Vec::new(),
            groups: BTreeMap::new(),
        }
    }

    /// Builds the config from the options of a probe entry. Every mapping
    /// option holding a `hosts` list is a host group.
    pub fn from_options(name: impl Into<String>, options: Value) -> Result<Self, ProbeError> {
        let raw: RawFpingConfig = serde_json::from_value(options)
            .map_err(|err| ProbeError::Config(err.to_string()))?;

        let mut groups = BTreeMap::new();
        for (key, value) in raw.rest {
            let is_group = matches!(&value, Value::Object(map) if map.contains_key("hosts"));
            if is_group {
                let group: HostGroup = serde_json::from_value(value)
                    .map_err(|err| ProbeError::Config(format!("group `{key}`: {err}")))?;
                groups.insert(key, group);
            } else if value.is_object() {
                return Err(ProbeError::Config(format!(
                    "option `{key}` is a mapping without a `hosts` list"
                )));
            } else {
                tracing::warn!(option = %key, "ignoring unknown fping option");
            }
        }

        let config = Self {
            name: name.into(),
            command: raw.command,
            interval: raw.interval,
            count: raw.count,
            hosts: raw.hosts,
            groups,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.name.trim().is_empty() {
            return Err(ProbeError::Config("probe name is empty".to_string()));
        }
        if self.command.trim().is_empty() {
            return Err(ProbeError::Config("`command` is empty".to_string()));
        }
        if self.count == 0 {
            return Err(ProbeError::Config("`count` must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn with_host(mut self, host: impl Into<HostEntry>) -> Self {
        self.hosts.push(host.into());
        self
    }

    pub fn with_group(mut self, name: impl Into<String>, group: HostGroup) -> Self {
        self.groups.insert(name.into(), group);
        self
    }
}
