use anyhow::Result;
use latprobe_model::MeasurementEnvelope;
use latprobe_plugin::{Probe, ProbeRegistry, ProbeSpec};
use serde_json::json;
use std::time::Duration;

struct Echo {
    name: String,
}

impl Probe for Echo {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        "echo"
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(5)
    }

    fn probe(&self) -> Result<MeasurementEnvelope> {
        Ok(MeasurementEnvelope::new("echo", self.name.clone(), 0.0))
    }
}

fn echo_factory(spec: &ProbeSpec) -> Result<Box<dyn Probe>> {
    if spec.options.contains_key("broken") {
        anyhow::bail!("broken option set");
    }
    Ok(Box::new(Echo {
        name: spec.name.clone(),
    }))
}

#[test]
fn builds_registered_kind() {
    let mut registry = ProbeRegistry::new();
    registry.register("echo", echo_factory);

    let probe = registry.build(&ProbeSpec::new("lan", "echo")).unwrap();
    assert_eq!(probe.name(), "lan");
    assert_eq!(probe.probe().unwrap().source, "lan");
    assert_eq!(registry.kinds().collect::<Vec<_>>(), vec!["echo"]);
}

#[test]
fn unknown_kind_names_the_known_ones() {
    let mut registry = ProbeRegistry::new();
    registry.register("echo", echo_factory);

    let err = registry
        .build(&ProbeSpec::new("lan", "icmp"))
        .err()
        .unwrap();
    let message = err.to_string();
    assert!(message.contains("unknown probe type `icmp`"));
    assert!(message.contains("echo"));
}

#[test]
fn factory_errors_carry_probe_name() {
    let mut registry = ProbeRegistry::new();
    registry.register("echo", echo_factory);

    let spec = ProbeSpec::new("wan", "echo").with_option("broken", json!(true));
    let err = registry.build(&spec).err().unwrap();
    assert!(format!("{err:#}").contains("failed to build probe `wan`: broken option set"));
}

#[test]
fn spec_keeps_probe_options_flat() {
    let spec: ProbeSpec = serde_json::from_value(json!({
        "name": "latency",
        "type": "fping",
        "count": 3,
        "lan": {"hosts": ["10.0.0.1"]},
    }))
    .unwrap();

    assert_eq!(spec.kind, "fping");
    assert_eq!(spec.options["count"], 3);
    assert!(spec.options.contains_key("lan"));
    assert!(!spec.options.contains_key("name"));
}
