use thiserror::Error;
use unit_of_work::Retryable;

/// Failures of the message store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The referenced row does not exist.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// Another connection committed while this transaction was running.
    #[error("Write conflict: the data changed during the transaction")]
    Conflict,

    /// The actor may not perform the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The request violates a constraint of the data model.
    #[error("Invalid request: {0}")]
    Invalid(String),

    /// The database no longer accepts connections.
    #[error("Database is closed")]
    Closed,
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether another attempt may succeed. Only write conflicts go away on their own.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Conflict)
    }
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}
