use thiserror::Error;

/// Why a line of fping output could not be turned into a `HostStat`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("no host separator in line {line:?}")]
    MissingSeparator { line: String },

    #[error("empty host name in line {line:?}")]
    EmptyHost { line: String },

    #[error("invalid latency token {token:?} for host {host}")]
    InvalidLatency { host: String, token: String },
}

#[derive(Debug, Error)]
pub enum ProbeError {
    /// The configured executable is not on this system. Fatal at startup.
    #[error("{command} command not found, install it or set `command` in the probe config")]
    CommandNotFound {
        command: String,
        #[source]
        source: which::Error,
    },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid probe config: {0}")]
    Config(String),
}
