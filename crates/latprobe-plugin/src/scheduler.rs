use crate::emit::Emitter;
use crate::probe::Probe;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Shortest interval a probe may run at.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Longest uninterrupted sleep, so a stop request is noticed promptly.
const STOP_POLL: Duration = Duration::from_millis(100);

struct Scheduled {
    probe: Box<dyn Probe>,
    interval: Duration,
    next_due: Instant,
}

/// Runs each probe at its own interval on the calling thread and hands every
/// envelope to all emitters. Cycles never overlap.
pub struct Scheduler {
    probes: Vec<Scheduled>,
    emitters: Vec<Box<dyn Emitter>>,
    started: bool,
}

impl Scheduler {
    pub fn new(emitters: Vec<Box<dyn Emitter>>) -> Self {
        Self {
            probes: Vec::new(),
            emitters,
            started: false,
        }
    }

    /// Adds a probe; its first cycle is due immediately.
    pub fn add(&mut self, probe: Box<dyn Probe>) {
        let mut interval = probe.interval();
        if interval < MIN_INTERVAL {
            tracing::warn!(
                probe = probe.name(),
                ?interval,
                min_interval = ?MIN_INTERVAL,
                "interval below minimum, using minimum"
            );
            interval = MIN_INTERVAL;
        }
        self.probes.push(Scheduled {
            probe,
            interval,
            next_due: Instant::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Runs every probe exactly once. Returns the number of envelopes emitted.
    pub fn run_once(&mut self) -> Result<usize> {
        self.start()?;
        let mut emitted = 0;
        for scheduled in &mut self.probes {
            if run_cycle(scheduled.probe.as_ref(), &mut self.emitters) {
                emitted += 1;
            }
        }
        Ok(emitted)
    }

    /// Runs due probes until `stop` is set.
    pub fn run_until(&mut self, stop: &AtomicBool) -> Result<()> {
        self.start()?;
        if self.probes.is_empty() {
            tracing::warn!("no probes configured, nothing to schedule");
            return Ok(());
        }

        while !stop.load(Ordering::SeqCst) {
            let now = Instant::now();
            for scheduled in &mut self.probes {
                if scheduled.next_due > now {
                    continue;
                }
                let started = Instant::now();
                run_cycle(scheduled.probe.as_ref(), &mut self.emitters);
                scheduled.next_due = started + scheduled.interval;
                if stop.load(Ordering::SeqCst) {
                    return Ok(());
                }
            }

            let next_due = self
                .probes
                .iter()
                .map(|scheduled| scheduled.next_due)
                .min()
                .unwrap_or(now);
            let wait = next_due.saturating_duration_since(Instant::now());
            if !wait.is_zero() {
                thread::sleep(wait.min(STOP_POLL));
            }
        }
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        for emitter in &mut self.emitters {
            let name = emitter.name().to_string();
            emitter
                .start()
                .with_context(|| format!("failed to start emitter {name}"))?;
        }
        self.started = true;
        Ok(())
    }
}

fn run_cycle(probe: &dyn Probe, emitters: &mut [Box<dyn Emitter>]) -> bool {
    let envelope = match probe.probe() {
        Ok(envelope) => envelope,
        Err(err) => {
            let error = format!("{err:#}");
            tracing::error!(probe = probe.name(), error = %error, "probe cycle failed");
            return false;
        }
    };

    tracing::info!(
        probe = probe.name(),
        kind = probe.kind(),
        hosts = envelope.data.len(),
        "probe cycle complete"
    );

    for emitter in emitters.iter_mut() {
        if let Err(err) = emitter.emit(&envelope) {
            let error = format!("{err:#}");
            tracing::error!(emitter = emitter.name(), error = %error, "emit failed");
        }
    }
    true
}
