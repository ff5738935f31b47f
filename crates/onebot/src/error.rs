/// Crate-wide result type for OneBot model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or decoding OneBot payloads.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required field is missing or malformed.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// JSON (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }
}
