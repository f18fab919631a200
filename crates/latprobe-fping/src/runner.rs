use crate::config::{FpingConfig, PROBE_KIND, PROBE_PERIOD_MS};
use crate::error::ProbeError;
use crate::hosts::resolve_hosts;
use crate::parser::parse_verbose;
use crate::stream::spawn_lines;
use chrono::{DateTime, Utc};
use latprobe_model::MeasurementEnvelope;
use latprobe_plugin::{Probe, ProbeSpec};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runs fping against the configured hosts, one envelope per cycle.
#[derive(Debug, Clone)]
pub struct FpingProbe {
    config: FpingConfig,
    program: PathBuf,
}

/// Arguments after the program name: unreachable reporting, per-host count,
/// fixed probe spacing, elapsed-time reporting, then the targets.
pub fn build_args(count: u32, targets: &[String]) -> Vec<String> {
    let mut args = vec![
        "-u".to_string(),
        format!("-C{count}"),
        format!("-p{PROBE_PERIOD_MS}"),
        "-e".to_string(),
    ];
    args.extend(targets.iter().cloned());
    args
}

pub fn epoch_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_micros() as f64 / 1_000_000.0
}

impl FpingProbe {
    /// Fails when `command` does not resolve to an executable.
    pub fn new(config: FpingConfig) -> Result<Self, ProbeError> {
        config.validate()?;
        let program = which::which(&config.command).map_err(|source| {
            tracing::error!(
                probe = %config.name,
                command = %config.command,
                "missing fping, install it or set `command` in the probe config"
            );
            ProbeError::CommandNotFound {
                command: config.command.clone(),
                source,
            }
        })?;
        tracing::debug!(probe = %config.name, program = %program.display(), "fping probe ready");
        Ok(Self { config, program })
    }

    /// Registry entry for the `fping` probe type.
    pub fn factory(spec: &ProbeSpec) -> anyhow::Result<Box<dyn Probe>> {
        let config = FpingConfig::from_options(spec.name.clone(), spec.options_value())?;
        Ok(Box::new(FpingProbe::new(config)?))
    }

    pub fn config(&self) -> &FpingConfig {
        &self.config
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn targets(&self) -> Vec<String> {
        resolve_hosts(&self.config)
    }

    /// One probe cycle. Lines that do not parse are logged and skipped, and
    /// a non-zero fping exit status only gets logged.
    pub fn run(&self) -> Result<MeasurementEnvelope, ProbeError> {
        let mut envelope =
            MeasurementEnvelope::new(PROBE_KIND, self.config.name.clone(), epoch_seconds(Utc::now()));

        let targets = self.targets();
        if targets.is_empty() {
            tracing::warn!(probe = %self.config.name, "no hosts configured, skipping fping");
            return Ok(envelope);
        }

        let args = build_args(self.config.count, &targets);
        tracing::debug!(probe = %self.config.name, program = %self.program.display(), ?args, "spawning fping");

        let mut lines = spawn_lines(&self.program, &args)?;
        for line in lines.by_ref() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_verbose(&line) {
                Ok(stat) => {
                    tracing::debug!(host = %stat.host, cnt = stat.cnt, loss = stat.loss, "parsed fping line");
                    envelope.data.push(stat);
                }
                Err(err) => {
                    tracing::warn!(probe = %self.config.name, error = %err, "skipping fping output line");
                }
            }
        }

        if let Some(status) = lines.status().filter(|status| !status.success()) {
            tracing::debug!(probe = %self.config.name, %status, "fping exited unsuccessfully");
        }

        Ok(envelope)
    }
}

impl Probe for FpingProbe {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> &str {
        PROBE_KIND
    }

    fn interval(&self) -> Duration {
        self.config.interval
    }

    fn probe(&self) -> anyhow::Result<MeasurementEnvelope> {
        Ok(self.run()?)
    }
}
