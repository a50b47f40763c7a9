use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("signaling connect failed: {0}")]
    Connect(String),

    #[error("negotiation failed: {0}")]
    Negotiation(#[from] webrtc::Error),

    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
}
