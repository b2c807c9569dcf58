//! Payment proof tokens sent in the `X-PAYMENT` header.
//!
//! A proof is `signature:timestamp_ms:amount`, where `signature` is an
//! EIP-191 signature over `timestamp_ms:amount:description`. The description
//! is not part of the token; the gateway knows which resource was requested.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::Address;

use crate::signer::{recover_message_signer, MessageSigner};
use crate::PayPerAgentError;

/// A signed payment commitment for one retried request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentProof {
    pub signature: String,
    pub timestamp_ms: u64,
    pub amount: String,
}

impl PaymentProof {
    /// The message that gets signed.
    pub fn signing_message(timestamp_ms: u64, amount: &str, description: &str) -> String {
        format!("{timestamp_ms}:{amount}:{description}")
    }

    /// Sign a proof for `amount`/`description` stamped with the current time.
    pub async fn sign<S: MessageSigner>(
        signer: &S,
        amount: &str,
        description: &str,
    ) -> Result<Self, PayPerAgentError> {
        Self::sign_at(signer, now_millis()?, amount, description).await
    }

    /// Sign a proof with an explicit timestamp.
    pub async fn sign_at<S: MessageSigner>(
        signer: &S,
        timestamp_ms: u64,
        amount: &str,
        description: &str,
    ) -> Result<Self, PayPerAgentError> {
        check_field("amount", amount)?;

        let message = Self::signing_message(timestamp_ms, amount, description);
        let signature = signer.sign_message(&message).await?;
        check_field("signature", &signature)?;

        tracing::debug!(
            signer = %signer.address(),
            timestamp_ms,
            amount,
            "payment proof signed"
        );

        Ok(Self {
            signature,
            timestamp_ms,
            amount: amount.to_string(),
        })
    }

    /// Value for the `X-PAYMENT` header.
    pub fn header_value(&self) -> String {
        self.to_string()
    }

    /// Recover the address that signed this proof for `description`.
    pub fn recover_signer(&self, description: &str) -> Result<Address, PayPerAgentError> {
        let message = Self::signing_message(self.timestamp_ms, &self.amount, description);
        recover_message_signer(&message, &self.signature)
    }
}

impl fmt::Display for PaymentProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.signature, self.timestamp_ms, self.amount)
    }
}

impl FromStr for PaymentProof {
    type Err = PayPerAgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [signature, timestamp, amount] = parts.as_slice() else {
            return Err(PayPerAgentError::InvalidProof(format!(
                "expected signature:timestamp:amount, got {} part(s)",
                parts.len()
            )));
        };
        if signature.is_empty() || amount.is_empty() {
            return Err(PayPerAgentError::InvalidProof(
                "signature and amount must be non-empty".to_string(),
            ));
        }
        let timestamp_ms = timestamp
            .parse::<u64>()
            .map_err(|e| PayPerAgentError::InvalidProof(format!("invalid timestamp: {e}")))?;

        Ok(Self {
            signature: signature.to_string(),
            timestamp_ms,
            amount: amount.to_string(),
        })
    }
}

fn check_field(name: &str, value: &str) -> Result<(), PayPerAgentError> {
    if value.is_empty() {
        return Err(PayPerAgentError::InvalidProof(format!("{name} is empty")));
    }
    if value.contains(':') {
        return Err(PayPerAgentError::InvalidProof(format!(
            "{name} must not contain ':'"
        )));
    }
    Ok(())
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> Result<u64, PayPerAgentError> {
    let elapsed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| PayPerAgentError::ConfigError(format!("system time error: {e}")))?;
    Ok(elapsed.as_millis() as u64)
}
