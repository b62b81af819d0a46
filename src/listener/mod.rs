//! The notify drain loop.
//!
//! One session, one `LISTEN` per configured channel, then forever:
//!
//! 1. suspend until the server delivers a notification (no timeout),
//! 2. drain every notification already buffered on the connection,
//! 3. print each one in arrival order.
//!
//! The loop only ends through the shutdown future (interrupt) or a fatal
//! error; there is no retry and no reconnection.

pub mod postgres;

use std::convert::Infallible;
use std::future::Future;
use std::io::Write;
use std::time::Duration;

use crate::config::ListenerConfig;
use crate::dsn;
use crate::error::ListenerError;
use crate::notification::Notification;
use crate::output::NotificationPrinter;

pub use postgres::PgNotificationSource;

/// Upper bound on the best-effort connection close at shutdown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// A connection that delivers `NOTIFY` events.
pub trait NotificationSource {
    /// Subscribes to `channel` (already in server identifier form).
    fn listen(&mut self, channel: &str) -> impl Future<Output = Result<(), ListenerError>>;

    /// Waits until at least one notification is available.
    ///
    /// Resolves to `Ok(None)` if the connection was closed.
    fn recv(&mut self) -> impl Future<Output = Result<Option<Notification>, ListenerError>>;

    /// Pops a notification that has already arrived, without waiting.
    fn next_buffered(&mut self) -> Option<Notification>;
}

/// Connects, subscribes and drains until `shutdown` resolves.
///
/// On shutdown the connection is closed best-effort and the `Exit` banner is
/// printed; this is the only `Ok` return.
///
/// # Errors
///
/// - [`ListenerError::MissingDsn`] before any connection attempt.
/// - [`ListenerError::Connection`] if the DSN is invalid or the server is
///   unreachable.
/// - [`ListenerError::ConnectionLost`], [`ListenerError::Runtime`] or
///   [`ListenerError::Output`] from the drain loop.
pub async fn run<W, F>(
    config: &ListenerConfig,
    printer: &mut NotificationPrinter<W>,
    shutdown: F,
) -> Result<(), ListenerError>
where
    W: Write,
    F: Future<Output = ()>,
{
    let options = dsn::parse(config.dsn()?)?;
    let pool = postgres::lazy_pool(options.clone());

    let session = async {
        let mut source = PgNotificationSource::connect(&options, &pool).await?;
        listen_and_drain(&mut source, &config.channels, printer).await
    };
    let outcome = until_shutdown(session, shutdown).await;

    // The session future (and its listener) is gone by now, so the
    // connection is back in the pool or being released.
    if tokio::time::timeout(CLOSE_TIMEOUT, pool.close()).await.is_err() {
        tracing::warn!("timed out closing database connection");
    }

    outcome?;
    printer.exit_banner()?;
    Ok(())
}

/// Races `work` against `shutdown`.
///
/// Returns `Ok(())` when `shutdown` wins; `work` is dropped mid-flight, so any
/// notifications it had not printed yet are discarded.
///
/// # Errors
///
/// Returns the error `work` failed with.
pub async fn until_shutdown<Fut, F>(work: Fut, shutdown: F) -> Result<(), ListenerError>
where
    Fut: Future<Output = Result<Infallible, ListenerError>>,
    F: Future<Output = ()>,
{
    tokio::select! {
        biased;
        () = shutdown => {
            tracing::debug!("shutdown requested");
            Ok(())
        }
        result = work => match result {
            Ok(never) => match never {},
            Err(err) => Err(err),
        },
    }
}

/// Issues one `LISTEN` per channel, in order, then runs the drain loop.
///
/// # Errors
///
/// See [`drain`]; `LISTEN` failures surface as [`ListenerError::Runtime`].
pub async fn listen_and_drain<S, W>(
    source: &mut S,
    channels: &[String],
    printer: &mut NotificationPrinter<W>,
) -> Result<Infallible, ListenerError>
where
    S: NotificationSource,
    W: Write,
{
    for channel in channels {
        printer.listening(channel)?;
        source.listen(&listen_identifier(channel)).await?;
    }
    tracing::debug!(channels = channels.len(), "waiting for notifications");

    drain(source, printer).await
}

/// Waits for notifications and prints them until something fails.
///
/// # Errors
///
/// - [`ListenerError::ConnectionLost`] if the connection closes.
/// - [`ListenerError::Runtime`] on a protocol or server error.
/// - [`ListenerError::Output`] if standard output cannot be written.
pub async fn drain<S, W>(
    source: &mut S,
    printer: &mut NotificationPrinter<W>,
) -> Result<Infallible, ListenerError>
where
    S: NotificationSource,
    W: Write,
{
    loop {
        let Some(first) = source.recv().await? else {
            return Err(ListenerError::ConnectionLost);
        };
        printer.print(&first)?;

        let mut drained = 1_usize;
        while let Some(notification) = source.next_buffered() {
            printer.print(&notification)?;
            drained += 1;
        }
        tracing::trace!(drained, "buffer drained");
    }
}

/// Maps a configured channel name to the identifier the server uses.
///
/// `NOTIFY orders` and `NOTIFY Orders` both publish to `orders`, because
/// unquoted identifiers have their ASCII letters folded to lower case; other
/// letters are left alone. Names written in double quotes keep their case,
/// with `""` standing for a literal quote.
#[must_use]
pub fn listen_identifier(channel: &str) -> String {
    match channel
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(quoted) if !quoted.is_empty() => quoted.replace("\"\"", "\""),
        _ => channel.to_ascii_lowercase(),
    }
}
