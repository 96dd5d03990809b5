//! # dcc-crypto — Hybrid Envelope for Remote Signing
//!
//! When the unsigned structure itself, rather than its digest, must leave
//! the process, it travels in an [`EncryptionEnvelope`]:
//!
//! - AES-256-CBC with PKCS#7 padding over the structure bytes, under a
//!   fresh random data key and a fresh random IV prepended to the
//!   ciphertext.
//! - RSA with PKCS#1 v1.5 padding over the data key, to the recipient's
//!   public key. This is the only asymmetric padding used in the workspace.
//!
//! The recipient side ([`EncryptionEnvelope::open`]) reverses both layers
//! and checks the recovered bytes against the carried digest.
//!
//! Data keys live in [`zeroize::Zeroizing`] buffers and are wiped on drop.

pub mod envelope;
pub mod keys;

pub use envelope::{EncryptionEnvelope, DATA_KEY_LEN, IV_LEN};
pub use keys::{RecipientKey, RecipientSecretKey, MIN_RSA_BITS};
