//! Convenient imports for common functionality.
//!
//! ```rust
//! use sql_session::prelude::*;
//! ```

pub use crate::adapt::BoxFuture;
pub use crate::callback::{CallbackConnection, CallbackStatement};
pub use crate::config::{ConnectionParams, ConnectionParamsBuilder};
pub use crate::connection::{Connection, ConnectionState};
pub use crate::error::{NativeError, SessionError};
pub use crate::native::{Callback, NativeSession, NativeStatement};
pub use crate::params;
pub use crate::results::{QueryOutcome, ResultSet, Row};
pub use crate::statement::{CursorPosition, Statement};
pub use crate::types::{QueryValue, RowValues};

#[cfg(feature = "sqlite")]
pub use crate::native::sqlite::SqliteSession;
