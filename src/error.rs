use crate::types::quote::Venue;

/// Failure talking to one of the external services.
///
/// The `Display` output is the human-readable message stored in component
/// state, so variants carry strings rather than source errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("{context}: {status}")]
    Status { context: &'static str, status: u16 },
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("{0}")]
    Rejected(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SwapError {
    #[error("no prepared message for {0} route")]
    NotPrepared(Venue),
    #[error("{0} routes require a message signer")]
    SignerUnavailable(Venue),
    #[error("execution returned no message id")]
    MissingMessageId,
    #[error(transparent)]
    Client(#[from] ClientError),
}
