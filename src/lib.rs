//! Async session layer over callback-style native database clients.
//!
//! A [`Connection`] walks `Unconnected -> Connected -> Disconnected`, executes SQL,
//! prepares [`Statement`]s and controls the transaction. Every operation goes through
//! [`adapt`], which turns the native client's error-first callback into a single
//! settlement. [`callback`] offers the same core with completion callbacks instead of
//! futures.
//!
//! The native client sits behind [`native::NativeSession`]. With the default `sqlite`
//! feature, [`native::sqlite::SqliteSession`] provides one backed by `rusqlite`.

pub mod adapt;
pub mod callback;
pub mod config;
pub mod connection;
pub mod error;
pub mod native;
pub mod prelude;
pub mod results;
pub mod statement;
pub mod types;

pub use callback::{CallbackConnection, CallbackStatement};
pub use config::{ConnectionParams, ConnectionParamsBuilder};
pub use connection::{Connection, ConnectionState};
pub use error::{NativeError, SessionError};
pub use results::{QueryOutcome, ResultSet, Row};
pub use statement::{CursorPosition, Statement};
pub use types::{QueryValue, RowValues};

#[cfg(all(doctest, feature = "sqlite"))]
#[doc = include_str!("../README.md")]
pub struct ReadmeDoctests;

#[cfg(feature = "sqlite")]
pub use native::sqlite::SqliteSession;
