use crate::RequestId;
use reqwest::StatusCode;

/// Errors returned by the relay client.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("relay request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("relay responded to {url} with {status}: {body}")]
    Status { url: String, status: StatusCode, body: String },
    #[error("unexpected relay response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },
    #[error("relay API key is not a valid header value")]
    InvalidApiKey,
    #[error("relay accepted the mint request but returned no request id")]
    MintRejected,
    #[error("mint request {request_id} failed: {reason}")]
    MintFailed { request_id: RequestId, reason: String },
    #[error("mint request {request_id} was not terminal after {attempts} status checks")]
    MintTimeout { request_id: RequestId, attempts: u32 },
}

impl RelayError {
    /// Returns `true` if the relay could not be reached or did not answer sensibly.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Status { .. } | Self::MalformedResponse { .. })
    }
}
