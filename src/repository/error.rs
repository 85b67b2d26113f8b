#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DatabaseError {
    #[error("Internal database error: {0}")]
    BackendError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Internal database error: {message}")]
    InternalError { message: String },
}

impl From<crate::entity::DeadlineQueryBuilderError> for DatabaseError {
    fn from(value: crate::entity::DeadlineQueryBuilderError) -> Self {
        DatabaseError::InternalError {
            message: value.to_string(),
        }
    }
}
