use thiserror::Error;

/// Reasons an inbound delivery is acknowledged without processing. These are
/// expected outcomes, not failures: no reply is sent and no memory is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    MissingMessage,
    MissingConversationId,
    BlockedSender,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingMessage => "missing_message",
            Self::MissingConversationId => "missing_conversation_id",
            Self::BlockedSender => "blocked_sender",
        }
    }
}

/// Failures a webhook turn can surface to the acknowledgment layer.
///
/// The inbound transport must always see HTTP success, so these are caught at
/// the webhook boundary, logged, and reported only in the `{ "error": ... }`
/// ack body. Downstream knowledge-base failures never appear here: the
/// answerer absorbs them into a canned reply by contract.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("token issuance failed: {0}")]
    Auth(String),
    #[error("memory store failure: {0}")]
    Persistence(String),
    #[error("reply delivery failed: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::{ProcessError, SkipReason};

    #[test]
    fn skip_reasons_render_stable_labels() {
        assert_eq!(SkipReason::MissingMessage.as_str(), "missing_message");
        assert_eq!(SkipReason::MissingConversationId.as_str(), "missing_conversation_id");
        assert_eq!(SkipReason::BlockedSender.as_str(), "blocked_sender");
    }

    #[test]
    fn process_errors_carry_their_class_in_the_message() {
        let auth = ProcessError::Auth("signature rejected".to_string());
        let persistence = ProcessError::Persistence("disk full".to_string());
        let transport = ProcessError::Transport("connection reset".to_string());

        assert!(auth.to_string().contains("token issuance"));
        assert!(persistence.to_string().contains("memory store"));
        assert!(transport.to_string().contains("reply delivery"));
    }
}
