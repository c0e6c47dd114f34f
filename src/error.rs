//! Error types. Most of the crate propagates `anyhow` errors with context;
//! the persistence boundary additionally classifies failures into
//! [`StoreError`] kinds so callers can react to them.

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds at the persistence boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The row targeted by an update or delete does not exist.
    #[error("no purchase found with id {0}")]
    NotFound(i64),

    /// A database constraint (unique, foreign key, check) rejected the write.
    #[error("constraint violation: {0}")]
    ConstraintViolation(#[source] sqlx::Error),

    /// The database could not be reached or the connection was lost.
    #[error("database connection failure: {0}")]
    ConnectionFailure(#[source] sqlx::Error),

    /// Any other database failure.
    #[error("database error: {0}")]
    Other(#[source] sqlx::Error),
}

impl StoreError {
    /// Classifies an `sqlx` error into a [`StoreError`] kind.
    pub(crate) fn classify(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db)
                if db.is_unique_violation()
                    || db.is_foreign_key_violation()
                    || db.is_check_violation() =>
            {
                StoreError::ConstraintViolation(e)
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => StoreError::ConnectionFailure(e),
            _ => StoreError::Other(e),
        }
    }
}
