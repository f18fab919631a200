//! Seams between probes, emitters and the schedule that drives them.

pub mod emit;
pub mod probe;
pub mod registry;
pub mod scheduler;

pub use emit::{Emitter, JsonLinesEmitter, MemoryEmitter, NullEmitter};
pub use probe::{Probe, ProbeSpec};
pub use registry::{ProbeFactory, ProbeRegistry};
pub use scheduler::{Scheduler, MIN_INTERVAL};
