//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error types used throughout the DCC codec. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Every failure is reported synchronously to the caller. Nothing is
//!   logged and swallowed.
//! - Structural errors name the offending location (map key, array index,
//!   expected type) so a rejected certificate can be diagnosed from the
//!   message alone.
//! - Cryptographic failures collapse into a single category. Callers cannot
//!   act differently on a padding error versus a key error.

use thiserror::Error;

/// Top-level error type for the DCC codec.
#[derive(Error, Debug)]
pub enum DccError {
    /// The input does not have the expected structural shape.
    #[error("malformed input: {0}")]
    Malformed(#[from] MalformedError),

    /// Base45 text could not be decoded.
    #[error("invalid encoding: {0}")]
    Encoding(#[from] EncodingError),

    /// Configured values are unusable.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The cipher layer rejected an operation.
    #[error("cryptographic failure: {0}")]
    Crypto(#[from] CryptoError),
}

/// Structural shape violations in QR text, COSE structures, or claim maps.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedError {
    /// QR text does not start with the `HC1:` marker.
    #[error("missing \"HC1:\" prefix")]
    MissingPrefix,

    /// A value that must be a CBOR array is something else.
    #[error("{0} is not an array")]
    NotAnArray(&'static str),

    /// The top-level structure does not carry the COSE_Sign1 tag.
    #[error("expected CBOR tag {expected}, found {}", found.map_or_else(|| "no tag".to_string(), |t| t.to_string()))]
    WrongTag {
        /// The tag required at this position.
        expected: u64,
        /// The tag actually present, if any.
        found: Option<u64>,
    },

    /// An array has fewer elements than the structure requires.
    #[error("{what} has {actual} elements, expected at least {expected}")]
    TooFewElements {
        /// Which structure was short.
        what: &'static str,
        /// Minimum element count.
        expected: usize,
        /// Element count found.
        actual: usize,
    },

    /// Element 2 of the COSE structure is not a byte string.
    #[error("payload is not a byte string")]
    PayloadNotBytes,

    /// A value that must be a CBOR map is something else.
    #[error("{0} is not a map")]
    NotAMap(&'static str),

    /// A required map key is absent.
    #[error("missing required key {0}")]
    MissingKey(String),

    /// A map key is present but its value has the wrong CBOR type.
    #[error("key {key} has wrong type, expected {expected}")]
    WrongType {
        /// The offending key.
        key: String,
        /// The CBOR type required for this key.
        expected: &'static str,
    },

    /// A bytes argument is not a COSE_Sign1 envelope.
    #[error("not a valid envelope: {0}")]
    NotAnEnvelope(String),

    /// A signature merge would leave the signature element empty.
    #[error("signature is empty")]
    EmptySignature,

    /// The restricted CBOR codec rejected the bytes.
    #[error("CBOR error: {0}")]
    Cbor(String),

    /// A claims tree could not be bridged to or from JSON.
    #[error("JSON error: {0}")]
    Json(String),

    /// The zlib stream could not be inflated or deflated.
    #[error("compression error: {0}")]
    Compression(String),
}

/// Base45 decoding failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// A character outside the 45-symbol alphabet.
    #[error("invalid character {ch:?} at position {position}")]
    InvalidCharacter {
        /// The rejected character.
        ch: char,
        /// Character offset in the input.
        position: usize,
    },

    /// A chunk decodes to a value that does not fit its byte width.
    #[error("chunk at position {position} decodes to {value}, which overflows its byte width")]
    Overflow {
        /// The decoded chunk value.
        value: u32,
        /// Character offset of the chunk in the input.
        position: usize,
    },

    /// The input length leaves a single dangling character.
    #[error("invalid length {0}: a single trailing character cannot encode a byte")]
    InvalidLength(usize),
}

/// Unusable configuration values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A DGCI prefix contains a character outside the checksum table.
    #[error("identifier prefix contains unsupported character {0:?}")]
    InvalidPrefixCharacter(char),

    /// The issuer country code is empty.
    #[error("issuer code must not be empty")]
    EmptyIssuer,

    /// Expiration does not come strictly after issuance.
    #[error("expiration {expiration} must be after issued-at {issued_at}")]
    InvalidValidity {
        /// Issued-at, seconds since epoch.
        issued_at: i64,
        /// Expiration, seconds since epoch.
        expiration: i64,
    },

    /// An environment variable holds a value that cannot be parsed.
    #[error("invalid value for {var}: {reason}")]
    InvalidValue {
        /// Variable name.
        var: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Failure in the cipher layer, wrapped as a single category.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Symmetric or asymmetric cipher operation failed.
    #[error("cipher error: {0}")]
    Cipher(String),

    /// Key material could not be loaded or has the wrong size.
    #[error("key error: {0}")]
    Key(String),

    /// The random source failed to produce bytes.
    #[error("random source error: {0}")]
    Rng(String),
}

impl From<rand_core::Error> for CryptoError {
    fn from(err: rand_core::Error) -> Self {
        CryptoError::Rng(err.to_string())
    }
}
