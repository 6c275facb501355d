//! Error type for the probe's fallible edges
//!
//! Telemetry queries themselves never fail; a missing metric degrades to a
//! neutral default. This covers only configuration I/O and the CLI
//! boundary.

use std::fmt;

#[derive(Debug, Clone)]
pub enum ProbeError {
    /// Reading or writing a config file failed
    Io(String),
    /// A config file did not parse
    Parse(String),
    /// No usable location for the config file
    NoConfigDir,
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Io(msg) => write!(f, "I/O error: {}", msg),
            ProbeError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ProbeError::NoConfigDir => write!(f, "No config directory available"),
        }
    }
}

impl std::error::Error for ProbeError {}

pub type ProbeResult<T> = Result<T, ProbeError>;
