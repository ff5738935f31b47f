/// Crate-wide result type for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the VoceChat side of the bridge.
///
/// Every variant is terminal for the call that produced it; nothing here is
/// retried.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required field is missing or malformed. Raised before any I/O.
    #[error("{message}")]
    Validation { message: String },

    /// The VoceChat server answered with a non-success status.
    #[error("HTTP {status}, {body}")]
    UpstreamHttp { status: u16, body: String },

    /// Transport-level failure talking to a remote endpoint.
    #[error("network error during {context}: {source}")]
    Network {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    /// A response or payload could not be decoded.
    #[error("{message}")]
    Decode { message: String },

    /// The operation is deliberately not implemented.
    #[error("{operation} is not supported")]
    Unsupported { operation: String },

    /// Local file access failed.
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{message}")]
    Internal { message: String },
}

impl Error {
    #[must_use]
    pub fn validation(message: impl std::fmt::Display) -> Self {
        Self::Validation {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn decode(message: impl std::fmt::Display) -> Self {
        Self::Decode {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unsupported(operation: impl std::fmt::Display) -> Self {
        Self::Unsupported {
            operation: operation.to_string(),
        }
    }

    #[must_use]
    pub fn internal(message: impl std::fmt::Display) -> Self {
        Self::Internal {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn network(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            context: context.into(),
            source,
        }
    }

    #[must_use]
    pub fn io(path: impl std::fmt::Display, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

impl From<vocebot_onebot::Error> for Error {
    fn from(err: vocebot_onebot::Error) -> Self {
        match err {
            vocebot_onebot::Error::InvalidInput { message } => Self::Validation { message },
            vocebot_onebot::Error::SerdeJson(e) => Self::decode(e),
            other => Self::internal(other),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err)
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Self::decode(format!("invalid base64 data: {err}"))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn onebot_invalid_input_becomes_validation() {
        let err: Error = vocebot_onebot::Error::invalid_input("missing 'user_id'").into();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "missing 'user_id'");
    }

    #[test]
    fn upstream_message_carries_status_and_body() {
        let err = Error::UpstreamHttp {
            status: 403,
            body: "forbidden".into(),
        };
        assert_eq!(err.to_string(), "HTTP 403, forbidden");
    }
}
