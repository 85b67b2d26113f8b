use crate::repository::error::DatabaseError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AlertError {
    #[error("User {username} not found")]
    SubscriberNotFound { username: String },

    #[error("DatabaseError: {0}")]
    DatabaseError(#[from] DatabaseError),
}
