//! Message signing for payment proofs.
//!
//! The gateway verifies proofs with EIP-191 personal-message recovery, so any
//! [`MessageSigner`] must produce a 65-byte secp256k1 signature over the
//! message with the `"\x19Ethereum Signed Message:\n"` prefix applied.

use alloy::primitives::{Address, Signature};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use crate::PayPerAgentError;

/// Environment variable holding the hex private key used for payments.
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

/// Client-side signing capability used to produce payment proofs.
pub trait MessageSigner: Send + Sync {
    /// Address that will be recovered from signatures made by this signer.
    fn address(&self) -> Address;

    /// Sign `message` and return the `0x`-prefixed hex signature.
    fn sign_message(
        &self,
        message: &str,
    ) -> impl std::future::Future<Output = Result<String, PayPerAgentError>> + Send;
}

/// [`MessageSigner`] backed by a local secp256k1 key.
#[derive(Clone)]
pub struct LocalMessageSigner {
    signer: PrivateKeySigner,
}

impl LocalMessageSigner {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    /// Parse a hex private key (with or without `0x`).
    pub fn from_private_key(key: &str) -> Result<Self, PayPerAgentError> {
        let signer: PrivateKeySigner = key
            .trim()
            .parse()
            .map_err(|e| PayPerAgentError::ConfigError(format!("invalid private key: {e}")))?;
        Ok(Self { signer })
    }

    /// Load the key from `PRIVATE_KEY`. Returns `Ok(None)` when it is unset or empty.
    pub fn from_env() -> Result<Option<Self>, PayPerAgentError> {
        match std::env::var(PRIVATE_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Self::from_private_key(&key).map(Some),
            _ => Ok(None),
        }
    }

    /// Generate a throwaway key.
    pub fn random() -> Self {
        Self {
            signer: PrivateKeySigner::random(),
        }
    }

    pub fn inner(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl std::fmt::Debug for LocalMessageSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalMessageSigner")
            .field("address", &self.signer.address())
            .finish()
    }
}

impl MessageSigner for LocalMessageSigner {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn sign_message(&self, message: &str) -> Result<String, PayPerAgentError> {
        let sig = self
            .signer
            .sign_message_sync(message.as_bytes())
            .map_err(|e| PayPerAgentError::SignatureError(format!("signing failed: {e}")))?;
        Ok(encode_signature_hex(&sig))
    }
}

/// Encode a signature as `0x` + 130 hex chars (r || s || v, v = 27/28).
pub fn encode_signature_hex(sig: &Signature) -> String {
    format!("0x{}", alloy::primitives::hex::encode(sig.as_bytes()))
}

/// Recover the address that signed `message` (EIP-191) from a hex signature.
pub fn recover_message_signer(message: &str, signature: &str) -> Result<Address, PayPerAgentError> {
    let hex = signature.strip_prefix("0x").unwrap_or(signature);
    let bytes = alloy::primitives::hex::decode(hex)
        .map_err(|e| PayPerAgentError::SignatureError(format!("invalid signature hex: {e}")))?;
    if bytes.len() != 65 {
        return Err(PayPerAgentError::SignatureError(format!(
            "signature must be 65 bytes, got {}",
            bytes.len()
        )));
    }
    let sig = Signature::from_raw(&bytes)
        .map_err(|e| PayPerAgentError::SignatureError(format!("invalid signature: {e}")))?;
    sig.recover_address_from_msg(message.as_bytes())
        .map_err(|e| PayPerAgentError::SignatureError(format!("recovery failed: {e}")))
}
