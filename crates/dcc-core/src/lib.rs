//! # dcc-core — Foundational Types for the DCC Codec
//!
//! Leaf crate of the workspace. Everything here is a pure transformation
//! over its inputs; nothing performs I/O or holds shared mutable state.
//!
//! - **Base45** alphabet codec for the QR text layer.
//! - **CborValue**, a closed model of the restricted CBOR/COSE profile.
//! - **DGCI** identifier generation with a Luhn mod N check character.
//! - **CertificateInitData** and **IssuanceConfig** for issuance metadata.
//! - **ContentDigest**, the SHA-256 value handed to the remote signer.
//! - The **error taxonomy** shared by every crate.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `dcc-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod base45;
pub mod cbor;
pub mod config;
pub mod dgci;
pub mod digest;
pub mod error;
pub mod init_data;

pub use cbor::CborValue;
pub use config::IssuanceConfig;
pub use dgci::{check_character, verify_check_character, DgciGenerator};
pub use digest::ContentDigest;
pub use error::{ConfigError, CryptoError, DccError, EncodingError, MalformedError};
pub use init_data::CertificateInitData;
