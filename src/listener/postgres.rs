//! PostgreSQL-backed notification source using `sqlx::postgres::PgListener`.

use std::fmt;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgConnection, PgListener, PgPoolOptions};
use sqlx::{Connection, PgPool};

use super::NotificationSource;
use crate::error::ListenerError;
use crate::notification::Notification;

/// Bound on the pool's own connect attempt, made right after the initial
/// connection succeeded.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens the single-connection pool the listener draws its session from.
///
/// No I/O happens here; the connection is established by
/// [`PgNotificationSource::connect`].
#[must_use]
pub fn lazy_pool(options: PgConnectOptions) -> PgPool {
    PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_lazy_with(options)
}

/// A live `LISTEN` session.
///
/// sqlx connections run in autocommit mode: `LISTEN` is executed outside any
/// transaction and takes effect immediately.
pub struct PgNotificationSource {
    listener: PgListener,
}

impl PgNotificationSource {
    /// Establishes the session.
    ///
    /// A direct connection is tried first so that a refused or rejected
    /// connection fails at once with the driver's message; the pool would
    /// otherwise retry until its acquire timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::Connection`] if the server is unreachable or
    /// rejects the credentials.
    pub async fn connect(
        options: &PgConnectOptions,
        pool: &PgPool,
    ) -> Result<Self, ListenerError> {
        let direct = PgConnection::connect_with(options)
            .await
            .map_err(|e| ListenerError::Connection(e.to_string()))?;
        if let Err(err) = direct.close().await {
            tracing::debug!(error = %err, "closing initial connection failed");
        }

        let listener = PgListener::connect_with(pool)
            .await
            .map_err(|e| ListenerError::Connection(e.to_string()))?;
        tracing::debug!("connected");
        Ok(Self { listener })
    }
}

impl fmt::Debug for PgNotificationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgNotificationSource").finish_non_exhaustive()
    }
}

impl NotificationSource for PgNotificationSource {
    async fn listen(&mut self, channel: &str) -> Result<(), ListenerError> {
        self.listener.listen(channel).await?;
        tracing::debug!(%channel, "LISTEN issued");
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<Notification>, ListenerError> {
        // `None` means the connection dropped; sqlx would only reconnect on
        // the next call, which the drain loop never makes.
        Ok(self.listener.try_recv().await?.map(Notification::from))
    }

    fn next_buffered(&mut self) -> Option<Notification> {
        self.listener.next_buffered().map(Notification::from)
    }
}
