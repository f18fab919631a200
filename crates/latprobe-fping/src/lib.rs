//! fping probe: resolves hosts, runs fping and parses its per-host output.

pub mod config;
pub mod error;
pub mod hosts;
pub mod parser;
pub mod runner;
pub mod stream;

pub use config::{FpingConfig, PROBE_KIND};
pub use error::{ParseError, ProbeError};
pub use hosts::{group_targets, host_entries, resolve_hosts};
pub use parser::{parse_verbose, MISSING_REPLY};
pub use runner::{build_args, epoch_seconds, FpingProbe};
pub use stream::{spawn_lines, OutputLines};
