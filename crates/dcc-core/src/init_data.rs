//! # Certificate Issuance Metadata
//!
//! [`CertificateInitData`] carries everything the structure builder needs
//! besides the claims themselves: issuer, validity window, and the header
//! parameters of the eventual signature.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Immutable metadata for one issuance request.
///
/// # Invariants
///
/// - `issuer` is non-empty.
/// - `expiration > issued_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateInitData {
    issuer: String,
    issued_at: i64,
    expiration: i64,
    key_id: Option<Vec<u8>>,
    algorithm_id: i64,
}

impl CertificateInitData {
    /// Validate and build issuance metadata.
    ///
    /// `algorithm_id == 0` means the algorithm header is omitted.
    pub fn new(
        issuer: impl Into<String>,
        issued_at: i64,
        expiration: i64,
        key_id: Option<Vec<u8>>,
        algorithm_id: i64,
    ) -> Result<Self, ConfigError> {
        let issuer = issuer.into();
        if issuer.is_empty() {
            return Err(ConfigError::EmptyIssuer);
        }
        if expiration <= issued_at {
            return Err(ConfigError::InvalidValidity {
                issued_at,
                expiration,
            });
        }
        Ok(Self {
            issuer,
            issued_at,
            expiration,
            key_id,
            algorithm_id,
        })
    }

    /// Build metadata for a certificate valid from `issued_at` for `validity`.
    pub fn starting_at(
        issuer: impl Into<String>,
        issued_at: DateTime<Utc>,
        validity: Duration,
        key_id: Option<Vec<u8>>,
        algorithm_id: i64,
    ) -> Result<Self, ConfigError> {
        let start = issued_at.timestamp();
        let end = start.saturating_add(validity.num_seconds());
        Self::new(issuer, start, end, key_id, algorithm_id)
    }

    /// Issuer country code.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Issued-at, seconds since epoch.
    pub fn issued_at(&self) -> i64 {
        self.issued_at
    }

    /// Expiration, seconds since epoch.
    pub fn expiration(&self) -> i64 {
        self.expiration
    }

    /// Key identifier for the protected header, if any.
    pub fn key_id(&self) -> Option<&[u8]> {
        self.key_id.as_deref()
    }

    /// COSE algorithm identifier; `0` omits the header entry.
    pub fn algorithm_id(&self) -> i64 {
        self.algorithm_id
    }
}
