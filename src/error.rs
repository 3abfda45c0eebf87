//! Error types for the gateway and traffic sources.
//!
//! Two families of errors exist and they are deliberately kept apart:
//!
//! - [`GatewayError`] covers everything that can end a run: bad manifests,
//!   sockets that cannot be bound, receive failures and output that cannot be
//!   persisted.
//! - [`ParseError`] describes why a single datagram was rejected. It never
//!   ends a run; the ingestion loop counts it and moves on.
//!
//! ## Recovery guidance
//!
//! ```rust
//! use sybilwatch::GatewayError;
//!
//! let error = GatewayError::config("duration_s must be a positive integer");
//! assert!(error.is_fatal());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for gateway operations.
pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

/// Main error type for gateway and sender operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GatewayError {
    #[error("Invalid run configuration: {reason}")]
    Config { reason: String },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to bind UDP socket on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Socket receive failed")]
    Receive {
        #[source]
        source: std::io::Error,
    },

    #[error("Socket send failed to {target}")]
    Send {
        target: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to persist output: {context}")]
    Output {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Output directory already exists: {path}")]
    OutputExists { path: PathBuf },
}

impl GatewayError {
    /// Returns whether this error must end the current run.
    ///
    /// Every variant is currently fatal; the method exists so callers do not
    /// need to match on the enum when deciding whether to keep going.
    pub fn is_fatal(&self) -> bool {
        match self {
            GatewayError::Config { .. } => true,
            GatewayError::File { .. } => true,
            GatewayError::Bind { .. } => true,
            GatewayError::Receive { .. } => true,
            GatewayError::Send { .. } => true,
            GatewayError::Output { .. } => true,
            GatewayError::OutputExists { .. } => true,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            GatewayError::Config { .. } => vec![
                "Check the manifest for missing required fields",
                "Ensure duration_s is a positive integer",
                "Validate the manifest is well-formed YAML or JSON",
            ],
            GatewayError::File { .. } => vec![
                "Check the file exists and is readable",
                "Check file permissions",
            ],
            GatewayError::Bind { .. } => vec![
                "Check no other collector is listening on the same port",
                "Verify the listen address belongs to this host",
            ],
            GatewayError::Receive { .. } => vec![
                "Check the network interface is still up",
                "Restart the run with a fresh output directory",
            ],
            GatewayError::Send { .. } => vec![
                "Verify the gateway address is reachable",
                "Check local firewall rules for outbound UDP",
            ],
            GatewayError::Output { .. } => vec![
                "Ensure sufficient disk space",
                "Check write permissions on the output root",
                "Discard the incomplete run and repeat it",
            ],
            GatewayError::OutputExists { .. } => vec![
                "Pass --force to overwrite the previous run",
                "Use a different run_id in the manifest",
            ],
        }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        GatewayError::Config { reason: reason.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GatewayError::File { path: path.into(), source }
    }

    /// Helper constructor for output errors.
    pub fn output(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        GatewayError::Output { context: context.into(), source: Some(source.into()) }
    }
}

impl From<csv::Error> for GatewayError {
    fn from(err: csv::Error) -> Self {
        GatewayError::output("CSV record write", err)
    }
}

/// Reason a datagram was rejected by the packet parser.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    #[error("payload is not valid UTF-8")]
    Encoding,

    #[error("expected 4 comma-separated fields, found {found}")]
    FieldCount { found: usize },

    #[error("field '{field}' is empty")]
    EmptyField { field: &'static str },

    #[error("field '{field}' is not an integer: {value:?}")]
    NotAnInteger { field: &'static str, value: String },

    #[error("field '{field}' out of range: {value}")]
    OutOfRange { field: &'static str, value: String },
}

impl ParseError {
    /// Short stable label, used in run logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::Encoding => "encoding",
            ParseError::FieldCount { .. } => "field_count",
            ParseError::EmptyField { .. } => "empty_field",
            ParseError::NotAnInteger { .. } => "not_an_integer",
            ParseError::OutOfRange { .. } => "out_of_range",
        }
    }
}
