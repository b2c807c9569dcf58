//! Core types for the PayPerAgent pay-per-request gateway.
//!
//! The gateway answers `402 Payment Required` for paid endpoints. A client
//! retries with an `X-PAYMENT: signature:timestamp_ms:amount` header, where
//! the signature is an EIP-191 personal-message signature over
//! `timestamp_ms:amount:description`.
//!
//! This crate holds the pieces that do not need a network stack:
//!
//! - [`PaymentProof`]: builds, renders and parses proof tokens
//! - [`MessageSigner`] / [`LocalMessageSigner`]: the signing seam
//! - [`payment`]: 402 and success envelopes
//! - [`types`]: weather, crypto and news payloads and their queries
//! - [`format`]: display helpers
//!
//! The HTTP client lives in `payperagent-client`.
//!
//! # Quick example
//!
//! ```no_run
//! use payperagent::{LocalMessageSigner, PaymentProof};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let signer = LocalMessageSigner::random();
//! let proof = PaymentProof::sign(&signer, "0.001", "Weather data access")
//!     .await
//!     .unwrap();
//! println!("X-PAYMENT: {proof}");
//! # }
//! ```

pub mod constants;
pub mod error;
pub mod format;
pub mod payment;
pub mod proof;
pub mod signer;
pub mod types;

pub use alloy::primitives::Address;
pub use constants::*;
pub use error::PayPerAgentError;
pub use payment::{DataEnvelope, ErrorBody, PaymentRequirement};
pub use proof::{now_millis, PaymentProof};
pub use signer::{encode_signature_hex, recover_message_signer, LocalMessageSigner, MessageSigner};
pub use types::*;
