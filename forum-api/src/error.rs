use crate::CommentId;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Session expired, please log in again")]
    SessionExpired,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Malformed comment tree: {0}")]
    MalformedTree(String),

    #[error("Unknown comment {0:?}")]
    UnknownComment(CommentId),

    #[error("A like is already being toggled on comment {0:?}")]
    LikePending(CommentId),
}

impl Error {
    pub fn data_unavailable(msg: impl Into<String>) -> Error {
        Error::DataUnavailable(msg.into())
    }

    /// The operation may succeed if the user tries again later
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::DataUnavailable(_) | Error::LikePending(_))
    }

    /// The user should be sent through the login flow again
    pub fn needs_reauth(&self) -> bool {
        matches!(self, Error::SessionExpired)
    }
}
