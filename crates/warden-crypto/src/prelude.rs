//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_crypto::prelude::*;` to import all essential types.

// Errors
pub use crate::{CryptoError, CryptoResult};

// Keys and signatures
pub use crate::{KeyId, KeyPair, PublicKey, Signature};

// Verification
pub use crate::SignatureVerifier;

// Fingerprints
pub use crate::ContentHash;
