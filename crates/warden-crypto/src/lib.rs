//! Warden Crypto - signing primitives for registry credentials.
//!
//! This crate provides:
//! - Ed25519 signing keys loaded from hex seeds or key files
//! - A trusted-key ring for verifying credentials across key rotation
//! - BLAKE3 fingerprints for referring to tokens in logs without exposing them
//!
//! # Example
//!
//! ```
//! use warden_crypto::{KeyPair, SignatureVerifier};
//!
//! let keypair = KeyPair::generate();
//! let signature = keypair.sign(b"payload");
//!
//! let verifier = SignatureVerifier::with_keys([keypair.export_public_key()]);
//! assert_eq!(verifier.verify_any(b"payload", &signature).unwrap(), keypair.key_id());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod hash;
mod keypair;
mod signature;
mod verifier;

pub use error::{CryptoError, CryptoResult};
pub use hash::ContentHash;
pub use keypair::{KeyPair, PublicKey};
pub use signature::Signature;
pub use verifier::{KeyId, SignatureVerifier};
