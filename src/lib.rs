//! # pg-listen
//!
//! Subscribes to PostgreSQL notification channels and streams every
//! `NOTIFY` event to standard output.
//!
//! ## Architecture
//!
//! ```text
//! CLI (cli)
//!     │
//!     ├── ListenerConfig (config/)   .ini / .conf / .yaml
//!     ├── DSN parsing (dsn)
//!     │
//!     ├── drain loop (listener/)     LISTEN, wait, drain
//!     │       └── PgListener (sqlx)
//!     │
//!     └── NotificationPrinter (output)   plain / raw / json-pretty
//! ```
//!
//! Everything runs on a single thread. The only suspension point is the
//! wait for the next notification, raced against the interrupt signal.

pub mod cli;
pub mod config;
pub mod dsn;
pub mod error;
pub mod listener;
pub mod notification;
pub mod output;
pub mod shutdown;
