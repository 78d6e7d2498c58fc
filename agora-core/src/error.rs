use crate::TxState;
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a persistence operation.
///
/// Every variant is scoped to the operation (or transaction) that produced it,
/// none of them is fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The record could not be turned into columns, or a row could not be turned into the record.
    #[error("Mapping error: {0}")]
    Mapping(String),
    /// The backing store rejected the statement or could not be reached.
    #[error("Query error: {0:#}")]
    Query(anyhow::Error),
    /// A single row read matched nothing.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The store refused the commit, the outcome of the transaction is unknown.
    #[error("Commit error: {0}")]
    Commit(#[source] Box<Error>),
    /// The transaction was already terminated.
    #[error("Invalid state: the transaction is {0} and cannot be used anymore")]
    InvalidState(TxState),
    /// The request deadline expired before the operation completed.
    #[error("Deadline exceeded: the operation was abandoned")]
    DeadlineExceeded,
    /// A write of a batch failed, `index` is the position of the failing record.
    #[error("Batch write failed at record {index}: {source}")]
    Batch {
        index: usize,
        #[source]
        source: Box<Error>,
    },
    /// An operation failed and the rollback that followed failed as well.
    #[error("{cause} (the rollback failed too: {rollback})")]
    RollbackFailed {
        #[source]
        cause: Box<Error>,
        rollback: Box<Error>,
    },
}

impl Error {
    pub fn mapping(message: impl fmt::Display) -> Self {
        Error::Mapping(message.to_string())
    }

    pub fn query(message: impl fmt::Display) -> Self {
        Error::Query(anyhow::Error::msg(message.to_string()))
    }

    pub fn not_found(message: impl fmt::Display) -> Self {
        Error::NotFound(message.to_string())
    }

    /// The error that originated the failure, looking through batch and rollback wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Batch { source, .. } => source.root_cause(),
            Error::RollbackFailed { cause, .. } => cause.root_cause(),
            Error::Commit(source) => source.root_cause(),
            _ => self,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root_cause(), Error::NotFound(..))
    }
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::Query(value)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Error::Query(anyhow::Error::new(value).context("The blocking task did not complete"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_cause_looks_through_wrappers() {
        let error = Error::RollbackFailed {
            cause: Box::new(Error::Batch {
                index: 1,
                source: Box::new(Error::not_found("likes")),
            }),
            rollback: Box::new(Error::query("disk I/O error")),
        };
        assert!(error.is_not_found());
        let message = error.to_string();
        assert!(message.contains("record 1"), "{message}");
        assert!(message.contains("disk I/O error"), "{message}");
    }

    #[test]
    fn query_error_keeps_the_context_chain() {
        let error: Error = anyhow::Error::msg("UNIQUE constraint failed: users.username")
            .context("While executing INSERT")
            .into();
        let message = error.to_string();
        assert!(message.contains("While executing INSERT"));
        assert!(message.contains("UNIQUE constraint failed"));
    }
}
