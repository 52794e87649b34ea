use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Native code the client reports once a procedure has no result sets left.
pub const PROCEDURE_COMPLETE_CODE: i32 = 105;

/// Message text accompanying [`PROCEDURE_COMPLETE_CODE`].
pub const PROCEDURE_COMPLETE_MESSAGE: &str = "Procedure has completed";

static NOT_FOUND: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\bnot found\b|\bno such\b").ok());

/// Failure reported by the native client, carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    /// Native error code, when the client reported one
    pub code: Option<i32>,
    /// Native message text
    pub message: String,
}

impl NativeError {
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    /// An error with message text only (driver-level failures carry no code).
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// The terminal signal for result-set advancement.
    #[must_use]
    pub fn procedure_completed() -> Self {
        Self::new(PROCEDURE_COMPLETE_CODE, PROCEDURE_COMPLETE_MESSAGE)
    }

    /// Whether this error is the result-set exhaustion signal.
    ///
    /// Matches on the code and on the message wording, since older clients only
    /// communicate the condition through text.
    #[must_use]
    pub fn is_procedure_completed(&self) -> bool {
        self.code == Some(PROCEDURE_COMPLETE_CODE)
            || self.message.contains(PROCEDURE_COMPLETE_MESSAGE)
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "Code: {code} Msg: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for NativeError {}

#[derive(Debug, Error)]
pub enum SessionError {
    /// Operation attempted in a connection state that does not allow it
    #[error("Connection error: {0}")]
    ConnectionState(String),

    /// Operation on a dropped statement or one whose connection is gone
    #[error("Statement is not valid: {0}")]
    StatementInvalid(String),

    #[error(transparent)]
    Native(NativeError),

    /// No further result sets remain; iteration finished
    #[error("{0}")]
    Exhausted(NativeError),

    /// The native layer broke its completion contract
    #[error("Native callback contract violation: {0}")]
    Contract(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<NativeError> for SessionError {
    fn from(err: NativeError) -> Self {
        if err.is_procedure_completed() {
            SessionError::Exhausted(err)
        } else {
            SessionError::Native(err)
        }
    }
}

impl SessionError {
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, SessionError::Exhausted(_))
    }

    #[must_use]
    pub fn is_connection_state(&self) -> bool {
        matches!(self, SessionError::ConnectionState(_))
    }

    #[must_use]
    pub fn is_statement_invalid(&self) -> bool {
        matches!(self, SessionError::StatementInvalid(_))
    }

    /// Whether the native layer reported a missing table, procedure or other object.
    #[must_use]
    pub fn is_object_not_found(&self) -> bool {
        match (self, NOT_FOUND.as_ref()) {
            (SessionError::Native(err), Some(pattern)) => pattern.is_match(&err.message),
            _ => false,
        }
    }

    /// The native error code, if the failure came from the native layer.
    #[must_use]
    pub fn native_code(&self) -> Option<i32> {
        match self {
            SessionError::Native(err) | SessionError::Exhausted(err) => err.code,
            _ => None,
        }
    }
}
