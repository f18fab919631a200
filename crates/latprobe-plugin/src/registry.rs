use crate::probe::{Probe, ProbeSpec};
use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;

/// Builds a probe instance from its config entry.
pub type ProbeFactory = fn(&ProbeSpec) -> Result<Box<dyn Probe>>;

/// Factory table keyed by probe type, assembled explicitly at startup.
#[derive(Default)]
pub struct ProbeRegistry {
    factories: BTreeMap<String, ProbeFactory>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: impl Into<String>, factory: ProbeFactory) -> &mut Self {
        let kind = kind.into();
        if self.factories.insert(kind.clone(), factory).is_some() {
            tracing::warn!(kind = %kind, "probe factory replaced");
        }
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn build(&self, spec: &ProbeSpec) -> Result<Box<dyn Probe>> {
        let factory = self.factories.get(&spec.kind).ok_or_else(|| {
            let known: Vec<&str> = self.kinds().collect();
            anyhow!(
                "unknown probe type `{}` for probe `{}` (known: {})",
                spec.kind,
                spec.name,
                known.join(", ")
            )
        })?;
        factory(spec).with_context(|| format!("failed to build probe `{}`", spec.name))
    }
}

impl std::fmt::Debug for ProbeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeRegistry")
            .field("kinds", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
