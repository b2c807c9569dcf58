use thiserror::Error;

/// Errors returned by PayPerAgent operations.
#[derive(Debug, Error)]
pub enum PayPerAgentError {
    #[error(
        "payment required: {} {} for {}; configure a signer to enable automatic payments",
        .amount.as_deref().unwrap_or("unknown amount"),
        crate::PAYMENT_CURRENCY,
        .description.as_deref().unwrap_or("this resource")
    )]
    PaymentRequired {
        amount: Option<String>,
        description: Option<String>,
    },

    #[error("rate limit exceeded: {0}; please try again later")]
    RateLimited(String),

    #[error("invalid request: {0}; check your parameters")]
    BadRequest(String),

    #[error("gateway returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("max retries ({0}) exceeded")]
    MaxRetriesExceeded(u32),

    #[error("signature error: {0}")]
    SignatureError(String),

    #[error("invalid payment proof: {0}")]
    InvalidProof(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl PayPerAgentError {
    /// HTTP status the gateway answered with, when the error came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            PayPerAgentError::PaymentRequired { .. } => Some(402),
            PayPerAgentError::RateLimited(_) => Some(429),
            PayPerAgentError::BadRequest(_) => Some(400),
            PayPerAgentError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
