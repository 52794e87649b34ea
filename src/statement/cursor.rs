use crate::error::SessionError;
use crate::results::QueryOutcome;

/// Where a prepared statement stands in the result iteration protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorPosition {
    /// No execution has completed yet.
    #[default]
    Unexecuted,
    /// The last execution returned an affected-row count.
    RowCount,
    /// Positioned on the result set with this zero-based index.
    At(usize),
    /// Advancement reported that no further result sets remain.
    Exhausted,
}

impl CursorPosition {
    pub(crate) fn after_exec(outcome: &Result<QueryOutcome, SessionError>) -> Self {
        match outcome {
            Ok(QueryOutcome::Rows(_)) => CursorPosition::At(0),
            Ok(QueryOutcome::Affected(_)) => CursorPosition::RowCount,
            Err(_) => CursorPosition::Exhausted,
        }
    }

    /// Position after a `get_more_results` call settles with `advanced`.
    ///
    /// A failure other than exhaustion leaves the cursor where it was.
    pub(crate) fn after_advance<T>(self, advanced: &Result<T, SessionError>) -> Self {
        match advanced {
            Ok(_) => match self {
                CursorPosition::At(index) => CursorPosition::At(index + 1),
                CursorPosition::RowCount => CursorPosition::At(1),
                CursorPosition::Unexecuted | CursorPosition::Exhausted => CursorPosition::At(0),
            },
            Err(err) if err.is_exhausted() => CursorPosition::Exhausted,
            Err(_) => self,
        }
    }

    #[must_use]
    pub fn is_exhausted(self) -> bool {
        self == CursorPosition::Exhausted
    }

    /// Index of the current result set, if positioned on one.
    #[must_use]
    pub fn index(self) -> Option<usize> {
        match self {
            CursorPosition::At(index) => Some(index),
            _ => None,
        }
    }
}
