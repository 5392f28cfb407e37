#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Unknown connection: {0}")]
    UnknownConnection(String),

    #[error("Entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("Shutting down: {0}")]
    ShuttingDown(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}
