use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Unknown property '{0}' on record '{1}'")]
    UnknownProperty(String, String),

    #[error("Cannot cast property '{property}' to {target}: {reason}")]
    CastFailure {
        property: String,
        target: String,
        reason: String,
    },

    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("Malformed UUID: {0}")]
    MalformedUuid(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Table '{0}' already exists")]
    TableExists(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

impl DbError {
    /// True for failures raised by the database abstraction rather than by
    /// the record/table layer itself.
    pub fn is_store_failure(&self) -> bool {
        !matches!(
            self,
            Self::UnknownProperty(..)
                | Self::CastFailure { .. }
                | Self::PreconditionViolation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}
