//! Listener configuration loaded from an INI or YAML file.
//!
//! The file format is chosen strictly by the file-name suffix:
//!
//! | Suffix           | Parser         | Channel enabled when          |
//! |------------------|----------------|-------------------------------|
//! | `.ini`, `.conf`  | [`ini`]        | value is the literal `true`   |
//! | `.yaml`          | [`yaml`]       | value is truthy               |
//!
//! The two enablement rules intentionally differ; see `DESIGN.md`.

pub mod ini;
pub mod yaml;

use std::path::Path;

use crate::error::{ConfigFormat, ListenerError};

/// Resolved listener configuration.
///
/// Created once at startup via [`ListenerConfig::resolve`] and immutable
/// thereafter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerConfig {
    /// Connection string, `None` when the file does not provide one.
    pub dsn: Option<String>,

    /// Channels to `LISTEN` on, in file order.
    pub channels: Vec<String>,
}

impl ListenerConfig {
    /// Reads and parses the config file at `path`.
    ///
    /// # Errors
    ///
    /// - [`ListenerError::MissingExtension`] if `path` has no suffix.
    /// - [`ListenerError::UnsupportedFormat`] for any suffix other than
    ///   `.ini`, `.conf` or `.yaml`.
    /// - [`ListenerError::ConfigParse`] if the file is unreadable or malformed.
    pub fn resolve(path: &Path) -> Result<Self, ListenerError> {
        let format = detect_format(path)?;
        tracing::debug!(path = %path.display(), ?format, "loading config");

        match format {
            ConfigFormat::Ini => ini::load(path),
            ConfigFormat::Yaml => yaml::load(path),
        }
    }

    /// Returns the configured DSN.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::MissingDsn`] if no DSN was configured or it
    /// is empty.
    pub fn dsn(&self) -> Result<&str, ListenerError> {
        match self.dsn.as_deref() {
            Some(dsn) if !dsn.is_empty() => Ok(dsn),
            _ => Err(ListenerError::MissingDsn),
        }
    }
}

/// Picks the parser from the file-name suffix (case-sensitive).
///
/// # Errors
///
/// Returns [`ListenerError::MissingExtension`] or
/// [`ListenerError::UnsupportedFormat`].
pub fn detect_format(path: &Path) -> Result<ConfigFormat, ListenerError> {
    let Some(extension) = path.extension() else {
        return Err(ListenerError::MissingExtension);
    };

    match extension.to_str() {
        Some("ini" | "conf") => Ok(ConfigFormat::Ini),
        Some("yaml") => Ok(ConfigFormat::Yaml),
        _ => Err(ListenerError::UnsupportedFormat(
            extension.to_string_lossy().into_owned(),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let Ok(mut file) = tempfile::Builder::new().suffix(suffix).tempfile() else {
            panic!("failed to create temp file");
        };
        let Ok(()) = file.write_all(contents.as_bytes()) else {
            panic!("failed to write temp file");
        };
        file
    }

    #[test]
    fn detects_format_by_suffix() {
        assert!(matches!(
            detect_format(Path::new("listen.ini")),
            Ok(ConfigFormat::Ini)
        ));
        assert!(matches!(
            detect_format(Path::new("/etc/pg/listen.conf")),
            Ok(ConfigFormat::Ini)
        ));
        assert!(matches!(
            detect_format(Path::new("listen.yaml")),
            Ok(ConfigFormat::Yaml)
        ));
    }

    #[test]
    fn missing_extension_is_rejected() {
        for path in ["listen", "/etc/pg/listen", ".hidden"] {
            let err = detect_format(Path::new(path));
            assert!(
                matches!(err, Err(ListenerError::MissingExtension)),
                "{path}: {err:?}"
            );
        }
    }

    #[test]
    fn unknown_extension_is_rejected() {
        for path in ["listen.yml", "listen.toml", "listen.INI", "listen."] {
            let err = detect_format(Path::new(path));
            assert!(
                matches!(err, Err(ListenerError::UnsupportedFormat(_))),
                "{path}: {err:?}"
            );
        }
    }

    #[test]
    fn resolve_dispatches_to_ini() {
        let file = write_config(
            ".conf",
            "[database]\ndsn = postgres://localhost/app\n\n[listen]\norders = true\n",
        );
        let Ok(config) = ListenerConfig::resolve(file.path()) else {
            panic!("expected config to load");
        };
        assert_eq!(config.dsn.as_deref(), Some("postgres://localhost/app"));
        assert_eq!(config.channels, vec!["orders".to_string()]);
    }

    #[test]
    fn resolve_dispatches_to_yaml() {
        let file = write_config(
            ".yaml",
            "database:\n  dsn: postgres://localhost/app\nlisten:\n  orders: true\n",
        );
        let Ok(config) = ListenerConfig::resolve(file.path()) else {
            panic!("expected config to load");
        };
        assert_eq!(config.dsn.as_deref(), Some("postgres://localhost/app"));
        assert_eq!(config.channels, vec!["orders".to_string()]);
    }

    #[test]
    fn unset_or_empty_dsn_is_missing() {
        let unset = ListenerConfig::default();
        assert!(matches!(unset.dsn(), Err(ListenerError::MissingDsn)));

        let empty = ListenerConfig {
            dsn: Some(String::new()),
            channels: vec!["orders".to_string()],
        };
        assert!(matches!(empty.dsn(), Err(ListenerError::MissingDsn)));
    }

    #[test]
    fn yaml_without_dsn_fails_only_when_dsn_is_requested() {
        let file = write_config(".yaml", "listen:\n  orders: true\n");
        let Ok(config) = ListenerConfig::resolve(file.path()) else {
            panic!("yaml without dsn should still parse");
        };
        assert!(matches!(config.dsn(), Err(ListenerError::MissingDsn)));
    }
}
