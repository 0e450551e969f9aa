// src/error.rs
//! Error types for probes, sinks and configuration loading.

use thiserror::Error;

/// Reasons a single probe can fail. Every variant is downgraded to a default
/// metric value by the assembler; none of them abort a pass.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The tool could not be started at all (missing binary, permissions).
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran but exited with a non-zero status.
    #[error("{program} exited with status {code:?}: {stderr}")]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The tool did not finish within the configured timeout.
    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },

    /// A header or data line identified by a marker was not present.
    #[error("marker {0:?} not found in output")]
    MarkerNotFound(String),

    /// The header row was found but lacks the requested column.
    #[error("column {0:?} not present in header")]
    ColumnMissing(String),

    /// No data row starts with the requested device/interface key.
    #[error("no row for key {0:?}")]
    KeyNotFound(String),

    /// The row was found but ends before the requested column.
    #[error("row {key:?} has no value for column {column:?}")]
    ShortRow { key: String, column: String },

    /// A token could not be interpreted as the expected type.
    #[error("invalid token {token:?} for {field}")]
    BadToken { field: String, token: String },

    /// Output that should have been JSON was not.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProbeError {
    /// Log category used to group failures: external tool, output structure,
    /// or JSON decoding.
    pub fn category(&self) -> &'static str {
        match self {
            ProbeError::Spawn { .. } | ProbeError::NonZeroExit { .. } | ProbeError::Timeout { .. } => {
                "tool"
            }
            ProbeError::Json(_) => "json",
            _ => "parse",
        }
    }
}

/// Result type returned by every probe.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Failures of the local store or the remote submission endpoint.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("local store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("request to metrics API failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("metrics API answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures while loading the optional configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid SMART attribute id {0:?}")]
    BadAttributeId(String),
}
