use latprobe_plugin::{Emitter, JsonLinesEmitter, NullEmitter, ProbeRegistry, ProbeSpec};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

fn default_emit() -> Vec<EmitSpec> {
    vec![EmitSpec::Stdout]
}

/// Where envelopes go once a cycle finishes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EmitSpec {
    Stdout,
    File { path: PathBuf },
    Discard,
}

impl EmitSpec {
    pub fn build(&self) -> anyhow::Result<Box<dyn Emitter>> {
        let emitter: Box<dyn Emitter> = match self {
            EmitSpec::Stdout => Box::new(JsonLinesEmitter::stdout()),
            EmitSpec::File { path } => Box::new(JsonLinesEmitter::file(path)?),
            EmitSpec::Discard => Box::new(NullEmitter),
        };
        Ok(emitter)
    }

    /// Checks that the emitter could be built, without creating anything.
    pub fn check(&self) -> Result<(), ConfigError> {
        let EmitSpec::File { path } = self else {
            return Ok(());
        };
        if path.is_dir() {
            return Err(ConfigError::Validation(format!(
                "emit path {:?} is a directory",
                path
            )));
        }
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let metadata = fs::metadata(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
        if !metadata.is_dir() || metadata.permissions().readonly() {
            return Err(ConfigError::Validation(format!(
                "emit directory {:?} is not writable",
                parent
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub probes: Vec<ProbeSpec>,
    #[serde(default = "default_emit")]
    pub emit: Vec<EmitSpec>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Checks what can be checked without building probes.
    pub fn validate(&self, registry: &ProbeRegistry) -> Result<(), ConfigError> {
        let mut names = BTreeSet::new();
        for spec in &self.probes {
            if spec.name.trim().is_empty() {
                return Err(ConfigError::Validation("probe name is empty".to_string()));
            }
            if !names.insert(spec.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate probe name `{}`",
                    spec.name
                )));
            }
            if !registry.contains(&spec.kind) {
                return Err(ConfigError::Validation(format!(
                    "probe `{}` has unknown type `{}`",
                    spec.name, spec.kind
                )));
            }
        }
        Ok(())
    }

    pub fn check_emitters(&self) -> Result<(), ConfigError> {
        self.emit.iter().try_for_each(EmitSpec::check)
    }

    /// Emitters in config order; the no-op emitter when none are listed.
    pub fn emitters(&self) -> anyhow::Result<Vec<Box<dyn Emitter>>> {
        if self.emit.is_empty() {
            tracing::info!("no emitters configured, measurements will be discarded");
            let emitters: Vec<Box<dyn Emitter>> = vec![Box::new(NullEmitter)];
            return Ok(emitters);
        }
        self.emit.iter().map(EmitSpec::build).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latprobe_fping::{FpingProbe, PROBE_KIND};

    fn registry() -> ProbeRegistry {
        let mut registry = ProbeRegistry::new();
        registry.register(PROBE_KIND, FpingProbe::factory);
        registry
    }

    #[test]
    fn example_config_parses() {
        let config = AppConfig::from_yaml(include_str!("../latprobe.example.yaml")).unwrap();
        config.validate(&registry()).unwrap();

        assert_eq!(config.probes.len(), 1);
        let probe = &config.probes[0];
        assert_eq!(probe.name, "latency");
        assert_eq!(probe.kind, "fping");
        assert_eq!(probe.options["count"], 5);
        assert_eq!(probe.options["lan"]["hosts"][1]["name"], "nas");
        assert_eq!(config.emit, vec![EmitSpec::Stdout]);
    }

    #[test]
    fn emit_defaults_to_stdout() {
        let config = AppConfig::from_yaml("probes: []").unwrap();
        assert_eq!(config.emit, vec![EmitSpec::Stdout]);
    }

    #[test]
    fn emit_variants_parse() {
        let config = AppConfig::from_yaml(
            "emit:\n  - type: file\n    path: /tmp/out.jsonl\n  - type: discard\n",
        )
        .unwrap();
        assert_eq!(
            config.emit,
            vec![
                EmitSpec::File {
                    path: PathBuf::from("/tmp/out.jsonl")
                },
                EmitSpec::Discard
            ]
        );
    }

    #[test]
    fn empty_emit_list_uses_null_emitter() {
        let config = AppConfig::from_yaml("emit: []").unwrap();
        let emitters = config.emitters().unwrap();
        assert_eq!(emitters.len(), 1);
        assert_eq!(emitters[0].name(), "null");
    }

    #[test]
    fn checking_file_emitter_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let config = AppConfig {
            probes: Vec::new(),
            emit: vec![EmitSpec::File { path: path.clone() }, EmitSpec::Stdout],
        };

        config.check_emitters().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn checking_file_emitter_rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = EmitSpec::File {
            path: dir.path().join("nope").join("out.jsonl"),
        };
        assert!(matches!(missing.check(), Err(ConfigError::Io { .. })));

        let directory = EmitSpec::File {
            path: dir.path().to_path_buf(),
        };
        assert!(matches!(directory.check(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let config = AppConfig::from_yaml(
            "probes:\n  - {name: a, type: fping}\n  - {name: a, type: fping}\n",
        )
        .unwrap();
        let err = config.validate(&registry()).unwrap_err();
        assert!(err.to_string().contains("duplicate probe name `a`"));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let config = AppConfig::from_yaml("probes:\n  - {name: a, type: icmp}\n").unwrap();
        assert!(matches!(
            config.validate(&registry()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
