//! Error types for the TaskVault client.

/// Error types for session and dashboard operations.
///
/// Every auth or table call the backend answered with a failure surfaces as
/// [`Error::BackendRequestFailed`] carrying the backend-supplied message.
/// A call that never got an answer is [`Error::BackendUnreachable`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    BackendRequestFailed(String),

    #[error("Backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Session store error: {0}")]
    SessionStore(String),

    #[error("Terminal error: {0}")]
    Terminal(String),
}

impl Error {
    pub fn backend(message: impl Into<String>) -> Self {
        Error::BackendRequestFailed(message.into())
    }

    /// Whether the backend answered and turned the request down, as opposed
    /// to not being reached at all.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::BackendRequestFailed(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::BackendRequestFailed(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::BackendRequestFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
