//! Listener error types with process exit code mapping.
//!
//! [`ListenerError`] is the central error type. Every variant renders as a
//! single human-readable line (the exact text printed to standard output
//! before the process terminates) and maps to a process exit code.

use std::fmt;

/// Config file flavour, used to label parser errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// Sectioned `key = value` text (`.ini`, `.conf`).
    Ini,
    /// YAML mapping (`.yaml`).
    Yaml,
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ini => f.write_str("Config"),
            Self::Yaml => f.write_str("Yaml"),
        }
    }
}

/// Fatal errors raised while starting up or running the listener.
///
/// | Stage      | Variants                                                   |
/// |------------|------------------------------------------------------------|
/// | CLI        | `MissingConfigArg`                                         |
/// | Config     | `MissingExtension`, `UnsupportedFormat`, `ConfigParse`     |
/// | Connect    | `MissingDsn`, `Connection`                                 |
/// | Drain loop | `ConnectionLost`, `Runtime`, `Output`                      |
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// `--config` was not given.
    #[error("ERROR: Missing config file")]
    MissingConfigArg,

    /// The config path has no file-name suffix.
    #[error("ERROR: Missing config file extension")]
    MissingExtension,

    /// The config path suffix is neither `.ini`, `.conf` nor `.yaml`.
    #[error("ERROR: Wrong config file format. YAML and INI is supported")]
    UnsupportedFormat(String),

    /// The config file could not be read or parsed.
    #[error("ERROR: {format} parser error: {message}")]
    ConfigParse {
        /// Which parser failed.
        format: ConfigFormat,
        /// Message reported by the underlying parser.
        message: String,
    },

    /// No `database.dsn` value was configured.
    #[error("ERROR: Missing database/dsn")]
    MissingDsn,

    /// The database session could not be established.
    #[error("Error: {0}")]
    Connection(String),

    /// The server closed the session while waiting for notifications.
    #[error("Error: connection to server was lost")]
    ConnectionLost,

    /// Database failure after the session was established.
    #[error("Error: {0}")]
    Runtime(#[from] sqlx::Error),

    /// Writing to standard output failed.
    #[error("Error: {0}")]
    Output(#[from] std::io::Error),
}

impl ListenerError {
    /// Builds a [`ListenerError::ConfigParse`] from any displayable error.
    pub fn config_parse(format: ConfigFormat, err: impl fmt::Display) -> Self {
        Self::ConfigParse {
            format,
            message: err.to_string(),
        }
    }

    /// Returns the process exit code for this error.
    ///
    /// Every fatal error exits with `1`; the interrupt path (exit `0`) is not
    /// an error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::MissingConfigArg
            | Self::MissingExtension
            | Self::UnsupportedFormat(_)
            | Self::ConfigParse { .. }
            | Self::MissingDsn
            | Self::Connection(_)
            | Self::ConnectionLost
            | Self::Runtime(_)
            | Self::Output(_) => 1,
        }
    }
}
