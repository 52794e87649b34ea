use super::ResultSet;

/// What one execution produced.
///
/// The statement kind decides the variant: row-producing statements yield
/// [`QueryOutcome::Rows`] (possibly empty), everything else yields the affected-row count.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Rows(ResultSet),
    Affected(usize),
}

impl QueryOutcome {
    #[must_use]
    pub fn is_rows(&self) -> bool {
        matches!(self, QueryOutcome::Rows(_))
    }

    #[must_use]
    pub fn rows(&self) -> Option<&ResultSet> {
        match self {
            QueryOutcome::Rows(rs) => Some(rs),
            QueryOutcome::Affected(_) => None,
        }
    }

    #[must_use]
    pub fn into_rows(self) -> Option<ResultSet> {
        match self {
            QueryOutcome::Rows(rs) => Some(rs),
            QueryOutcome::Affected(_) => None,
        }
    }

    #[must_use]
    pub fn affected(&self) -> Option<usize> {
        match self {
            QueryOutcome::Affected(count) => Some(*count),
            QueryOutcome::Rows(_) => None,
        }
    }
}

impl From<ResultSet> for QueryOutcome {
    fn from(rs: ResultSet) -> Self {
        QueryOutcome::Rows(rs)
    }
}
