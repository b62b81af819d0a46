//! Output formatting for subscriptions and notifications.
//!
//! Standard output is the tool's only channel. Each notification becomes one
//! line, or one prefix line followed by a pretty-printed JSON block:
//!
//! ```text
//! 2024-05-01 12:00:00 [4242] orders: {"id":1}          plain
//! {"id":1}                                             raw
//! 2024-05-01 12:00:00 [4242] orders:                   json-pretty
//! {
//!     "id": 1
//! }
//! ```

use std::io::{self, Write};

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use serde_json::ser::{Formatter, PrettyFormatter};

use crate::notification::Notification;

/// `strftime` pattern for the notification prefix (local time).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const JSON_INDENT: &[u8] = b"    ";

/// How notifications are rendered. Chosen once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Timestamp, sender PID, channel and raw payload on one line.
    #[default]
    Plain,
    /// Payload only.
    Raw,
    /// Like [`OutputMode::Plain`], but JSON payloads are pretty-printed.
    JsonPretty,
}

impl OutputMode {
    /// Combines the `--json` and `--raw` flags. Raw wins over JSON.
    #[must_use]
    pub const fn from_flags(json: bool, raw: bool) -> Self {
        match (json, raw) {
            (_, true) => Self::Raw,
            (true, false) => Self::JsonPretty,
            (false, false) => Self::Plain,
        }
    }
}

/// Writes listener output to `W` (standard output in production).
#[derive(Debug)]
pub struct NotificationPrinter<W> {
    out: W,
    mode: OutputMode,
}

impl<W: Write> NotificationPrinter<W> {
    /// Creates a printer for the given mode.
    #[must_use]
    pub const fn new(out: W, mode: OutputMode) -> Self {
        Self { out, mode }
    }

    /// Confirms a `LISTEN` subscription. Silent in raw mode.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn listening(&mut self, channel: &str) -> io::Result<()> {
        if self.mode == OutputMode::Raw {
            return Ok(());
        }
        writeln!(self.out, "LISTEN: {channel}")?;
        self.out.flush()
    }

    /// Prints one notification according to the output mode.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn print(&mut self, notification: &Notification) -> io::Result<()> {
        if self.mode == OutputMode::Raw {
            writeln!(self.out, "{}", notification.payload)?;
            return self.out.flush();
        }

        let timestamp = notification.received_at.format(TIMESTAMP_FORMAT);
        let prefix = format!(
            "{timestamp} [{}] {}:",
            notification.sender_pid, notification.channel
        );

        let pretty = match self.mode {
            OutputMode::JsonPretty => pretty_json(&notification.payload),
            OutputMode::Plain | OutputMode::Raw => None,
        };

        match pretty {
            Some(block) => writeln!(self.out, "{prefix} \n{block}")?,
            None => writeln!(self.out, "{prefix} {}", notification.payload)?,
        }
        self.out.flush()
    }

    /// Prints the shutdown banner.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn exit_banner(&mut self) -> io::Result<()> {
        writeln!(self.out, "\nExit")?;
        self.out.flush()
    }

    /// Consumes the printer and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Re-serializes a JSON payload with sorted keys and 4-space indentation.
///
/// Numbers are re-emitted exactly as written and non-ASCII characters are
/// escaped as `\uXXXX`, so the output is plain ASCII.
///
/// Returns `None` when `payload` is not valid JSON; callers print the raw
/// payload instead.
#[must_use]
pub fn pretty_json(payload: &str) -> Option<String> {
    let value: Value = serde_json::from_str(payload).ok()?;

    let mut buf = Vec::new();
    let formatter = AsciiFormatter(PrettyFormatter::with_indent(JSON_INDENT));
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    SortedKeys(&value).serialize(&mut serializer).ok()?;

    String::from_utf8(buf).ok()
}

/// [`PrettyFormatter`] that writes non-ASCII characters as UTF-16 `\uXXXX`
/// escapes (surrogate pairs above the BMP).
struct AsciiFormatter<'a>(PrettyFormatter<'a>);

impl Formatter for AsciiFormatter<'_> {
    fn write_string_fragment<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut units = [0_u16; 2];
        for c in fragment.chars() {
            if c.is_ascii() {
                let mut byte = [0_u8; 1];
                writer.write_all(c.encode_utf8(&mut byte).as_bytes())?;
            } else {
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }

    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_array(writer)
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.0.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object(writer)
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.0.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object_value(writer)
    }
}

/// Serializes a [`Value`] with object keys in lexicographic order,
/// regardless of how `serde_json` stores maps.
struct SortedKeys<'a>(&'a Value);

impl Serialize for SortedKeys<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(object) => {
                let mut entries: Vec<_> = object.iter().collect();
                entries.sort_by(|(a, _), (b, _)| a.cmp(b));

                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, &SortedKeys(value))?;
                }
                map.end()
            }
            Value::Array(items) => serializer.collect_seq(items.iter().map(SortedKeys)),
            scalar => scalar.serialize(serializer),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{Local, TimeZone};

    use super::*;

    fn notification(payload: &str) -> Notification {
        let Some(received_at) = Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).single() else {
            panic!("unambiguous local time expected");
        };
        Notification {
            received_at,
            channel: "orders".to_string(),
            sender_pid: 4242,
            payload: payload.to_string(),
        }
    }

    fn render(mode: OutputMode, payload: &str) -> String {
        let mut printer = NotificationPrinter::new(Vec::new(), mode);
        let Ok(()) = printer.print(&notification(payload)) else {
            panic!("write to Vec failed");
        };
        let Ok(text) = String::from_utf8(printer.into_inner()) else {
            panic!("output is not utf-8");
        };
        text
    }

    #[test]
    fn raw_flag_beats_json_flag() {
        assert_eq!(OutputMode::from_flags(false, false), OutputMode::Plain);
        assert_eq!(OutputMode::from_flags(true, false), OutputMode::JsonPretty);
        assert_eq!(OutputMode::from_flags(false, true), OutputMode::Raw);
        assert_eq!(OutputMode::from_flags(true, true), OutputMode::Raw);
    }

    #[test]
    fn raw_mode_prints_payload_only() {
        assert_eq!(render(OutputMode::Raw, r#"{"a":1}"#), "{\"a\":1}\n");
        assert_eq!(render(OutputMode::Raw, ""), "\n");
    }

    #[test]
    fn plain_mode_prints_prefix_and_payload_inline() {
        assert_eq!(
            render(OutputMode::Plain, r#"{"b":2,"a":1}"#),
            "2024-05-01 12:30:05 [4242] orders: {\"b\":2,\"a\":1}\n"
        );
    }

    #[test]
    fn json_mode_pretty_prints_with_sorted_keys() {
        assert_eq!(
            render(OutputMode::JsonPretty, r#"{"b":2,"a":1}"#),
            "2024-05-01 12:30:05 [4242] orders: \n{\n    \"a\": 1,\n    \"b\": 2\n}\n"
        );
    }

    #[test]
    fn json_mode_sorts_nested_objects() {
        let Some(pretty) = pretty_json(r#"{"z":[{"y":1,"x":2}],"m":{"k":null,"c":true}}"#) else {
            panic!("valid json expected");
        };
        assert_eq!(
            pretty,
            "{\n    \"m\": {\n        \"c\": true,\n        \"k\": null\n    },\n    \
             \"z\": [\n        {\n            \"x\": 2,\n            \"y\": 1\n        }\n    ]\n}"
        );
    }

    #[test]
    fn json_mode_falls_back_to_raw_payload() {
        assert_eq!(
            render(OutputMode::JsonPretty, "not-json"),
            "2024-05-01 12:30:05 [4242] orders: not-json\n"
        );
    }

    #[test]
    fn json_mode_keeps_big_numbers_exact() {
        assert_eq!(
            pretty_json(r#"{"id": 123456789012345678901234567890, "ratio": 0.1}"#).as_deref(),
            Some("{\n    \"id\": 123456789012345678901234567890,\n    \"ratio\": 0.1\n}")
        );
    }

    #[test]
    fn json_mode_escapes_non_ascii() {
        assert_eq!(
            pretty_json(r#"{"név": "ő😀", "plain": "a\"b"}"#).as_deref(),
            Some(
                "{\n    \"n\\u00e9v\": \"\\u0151\\ud83d\\ude00\",\n    \"plain\": \"a\\\"b\"\n}"
            )
        );
    }

    #[test]
    fn json_scalars_are_pretty_printed_too() {
        assert_eq!(pretty_json("42").as_deref(), Some("42"));
        assert_eq!(pretty_json("{}").as_deref(), Some("{}"));
        assert_eq!(pretty_json(""), None);
    }

    #[test]
    fn listen_confirmation_is_suppressed_in_raw_mode() {
        let mut plain = NotificationPrinter::new(Vec::new(), OutputMode::Plain);
        let mut raw = NotificationPrinter::new(Vec::new(), OutputMode::Raw);
        let (Ok(()), Ok(())) = (plain.listening("orders"), raw.listening("orders")) else {
            panic!("write to Vec failed");
        };
        assert_eq!(plain.into_inner(), b"LISTEN: orders\n");
        assert!(raw.into_inner().is_empty());
    }

    #[test]
    fn exit_banner_starts_on_a_fresh_line() {
        let mut printer = NotificationPrinter::new(Vec::new(), OutputMode::Raw);
        let Ok(()) = printer.exit_banner() else {
            panic!("write to Vec failed");
        };
        assert_eq!(printer.into_inner(), b"\nExit\n");
    }
}
