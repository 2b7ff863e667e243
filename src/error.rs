use std::fmt;

pub const SERVER_ERROR_MESSAGE: &str = "Server error occurred";
pub const NETWORK_ERROR_MESSAGE: &str = "Network error - please check your connection";
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Every failure the library hands back to a caller. None of them are fatal;
/// the message is meant to be shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Rejected locally before any request was sent.
    Validation(String),
    /// The request never produced a response.
    Network(String),
    /// The slot or appointment was already claimed.
    Conflict(String),
    NotFound(String),
    Backend { status: u16, message: String },
    Unexpected(String),
}

impl ApiError {
    pub fn validation<S: ToString>(message: S) -> Self {
        ApiError::Validation(message.to_string())
    }

    pub fn conflict<S: ToString>(message: S) -> Self {
        ApiError::Conflict(message.to_string())
    }

    /// Maps a non-2xx status and the message extracted from its body.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            _ => ApiError::Backend { status, message },
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation(message)
            | ApiError::Network(message)
            | ApiError::Conflict(message)
            | ApiError::NotFound(message)
            | ApiError::Unexpected(message) => message,
            ApiError::Backend { message, .. } => message,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Backend { status, .. } => Some(*status),
            ApiError::Conflict(_) => Some(409),
            ApiError::NotFound(_) => Some(404),
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation(message) => write!(f, "validation error: {}", message),
            ApiError::Network(message) => write!(f, "network error: {}", message),
            ApiError::Conflict(message) => write!(f, "conflict: {}", message),
            ApiError::NotFound(message) => write!(f, "not found: {}", message),
            ApiError::Backend { status, message } => {
                write!(f, "backend error {}: {}", status, message)
            }
            ApiError::Unexpected(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_status_picks_kind() {
        assert_eq!(
            ApiError::from_status(409, "taken".to_string()),
            ApiError::Conflict("taken".to_string())
        );
        assert_eq!(
            ApiError::from_status(404, "gone".to_string()),
            ApiError::NotFound("gone".to_string())
        );
        let err = ApiError::from_status(500, SERVER_ERROR_MESSAGE.to_string());
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.message(), SERVER_ERROR_MESSAGE);
    }

    #[test]
    fn display_keeps_backend_message() {
        let err = ApiError::Backend {
            status: 400,
            message: "slot closed".to_string(),
        };
        assert_eq!(err.to_string(), "backend error 400: slot closed");
    }
}
