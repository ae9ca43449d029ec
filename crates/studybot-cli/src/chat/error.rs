use thiserror::Error;

/// Ways a chat submission can end without an assistant reply
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Cannot connect to AI server. The host is offline.")]
    EngineOffline,

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Queue timeout: the server has been busy for too long. Please try again later.")]
    QueueTimeout,

    #[error("Stream interrupted: {0}")]
    Stream(String),

    #[error("A reply is still being generated, wait for it to finish")]
    InputLocked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_user_facing() {
        assert_eq!(
            ChatError::EngineOffline.to_string(),
            "Cannot connect to AI server. The host is offline."
        );
        assert!(ChatError::QueueTimeout.to_string().starts_with("Queue timeout"));

        let err = ChatError::Server {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "Server error 502: bad gateway");
    }
}
