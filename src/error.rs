use thiserror::Error;

/// Failure taxonomy for the relay and the conversation lifecycle.
/// Validation errors are raised before any network call; everything
/// else maps a failed upstream or store call.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("symptoms description must not be empty")]
    EmptySymptoms,

    #[error("message content must not be empty")]
    EmptyMessage,

    #[error("no active conversation to continue")]
    NoConversation,

    #[error("upstream returned an empty response")]
    UpstreamEmpty,

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("conversation store request failed: {0}")]
    Store(String),

    #[error("user '{0}' not found")]
    UserNotFound(String),
}

impl ChatError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ChatError::EmptySymptoms | ChatError::EmptyMessage | ChatError::NoConversation
        )
    }
}
