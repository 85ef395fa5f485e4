/// Failure of a persistent-store operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness or referential constraint rejected the write.
    #[error("{0}")]
    Conflict(String),
    #[error("stored record is malformed: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() || db.is_foreign_key_violation() {
                return StoreError::Conflict(db.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
