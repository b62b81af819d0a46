//! Command-line arguments.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;
use clap::error::{ContextKind, ContextValue, ErrorKind};

use crate::error::ListenerError;
use crate::output::OutputMode;

/// Stream PostgreSQL `NOTIFY` events to standard output.
#[derive(Debug, Default, Parser)]
#[command(name = "pg-listen", version, about)]
pub struct Args {
    /// Config file (.ini, .conf or .yaml)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Pretty-print JSON payloads
    #[arg(short, long)]
    pub json: bool,

    /// Print the raw payload only
    #[arg(short, long)]
    pub raw: bool,
}

impl Args {
    /// Parses `argv`, skipping arguments the tool does not know.
    ///
    /// Each unknown argument is removed and parsing starts over, so flags
    /// after it still count. Any other usage error (such as `-c` without a
    /// value) yields the defaults, which later fail with
    /// [`ListenerError::MissingConfigArg`].
    ///
    /// # Errors
    ///
    /// Returns the clap error for `--help` and `--version`, for the caller to
    /// print and exit with.
    pub fn parse_lenient<I, T>(argv: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
        loop {
            let err = match Self::try_parse_from(argv.clone()) {
                Ok(args) => return Ok(args),
                Err(err) => err,
            };
            match err.kind() {
                ErrorKind::DisplayHelp
                | ErrorKind::DisplayVersion
                | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => return Err(err),
                ErrorKind::UnknownArgument => {
                    if let Some(index) = unknown_token(&err, &argv) {
                        tracing::debug!(argument = ?argv.get(index), "ignoring unknown argument");
                        argv.remove(index);
                        continue;
                    }
                }
                _ => {}
            }
            tracing::debug!(kind = ?err.kind(), "unusable arguments, using defaults");
            return Ok(Self::default());
        }
    }

    /// Returns the `--config` path.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::MissingConfigArg`] when it was not given.
    pub fn config_path(&self) -> Result<&PathBuf, ListenerError> {
        self.config.as_ref().ok_or(ListenerError::MissingConfigArg)
    }

    /// Output mode selected by `--json` / `--raw`.
    #[must_use]
    pub const fn output_mode(&self) -> OutputMode {
        OutputMode::from_flags(self.json, self.raw)
    }
}

/// Position of the token clap rejected. The program name is never a
/// candidate.
fn unknown_token(err: &clap::Error, argv: &[OsString]) -> Option<usize> {
    let Some(ContextValue::String(invalid)) = err.get(ContextKind::InvalidArg) else {
        return None;
    };
    let with_value = format!("{invalid}=");
    argv.iter()
        .enumerate()
        .skip(1)
        .find(|(_, token)| {
            token
                .to_str()
                .is_some_and(|token| token == invalid || token.starts_with(&with_value))
        })
        .map(|(index, _)| index)
}
