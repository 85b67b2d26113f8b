#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("Invalid address `{address}`: {message}")]
    InvalidAddress { address: String, message: String },

    #[error("Failed to build message: {0}")]
    BuildFailed(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Message rejected: {message}")]
    Rejected { message: String },
}
