//! Issuance configuration.
//!
//! Holds the deployment-level settings of a certificate issuer: identifier
//! prefix, issuer country, validity window and signature header parameters.
//! Defaults describe a German test-certificate issuer. Override via
//! environment variables or explicit construction.

use chrono::{DateTime, Duration, Utc};

use crate::dgci::DgciGenerator;
use crate::error::ConfigError;
use crate::init_data::CertificateInitData;

/// Default DGCI prefix.
pub const DEFAULT_DGCI_PREFIX: &str = "URN:UVCI:V1:DE";
/// Default issuer country.
pub const DEFAULT_ISSUER_COUNTRY: &str = "DE";
/// Default validity window in hours.
pub const DEFAULT_VALIDITY_HOURS: i64 = 48;
/// Default COSE algorithm: ES256.
pub const DEFAULT_ALGORITHM_ID: i64 = -7;

/// Configuration for a certificate issuer.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuanceConfig {
    /// Prefix for generated certificate identifiers.
    pub dgci_prefix: String,
    /// Issuer country code written to claim key 1.
    pub issuer_country: String,
    /// Hours between issued-at and expiration.
    pub validity_hours: i64,
    /// Key identifier for the protected header.
    pub key_id: Option<Vec<u8>>,
    /// COSE algorithm identifier; `0` omits it.
    pub algorithm_id: i64,
}

impl std::fmt::Debug for IssuanceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuanceConfig")
            .field("dgci_prefix", &self.dgci_prefix)
            .field("issuer_country", &self.issuer_country)
            .field("validity_hours", &self.validity_hours)
            .field("key_id", &self.key_id.as_ref().map(hex::encode))
            .field("algorithm_id", &self.algorithm_id)
            .finish()
    }
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            dgci_prefix: DEFAULT_DGCI_PREFIX.to_string(),
            issuer_country: DEFAULT_ISSUER_COUNTRY.to_string(),
            validity_hours: DEFAULT_VALIDITY_HOURS,
            key_id: None,
            algorithm_id: DEFAULT_ALGORITHM_ID,
        }
    }
}

impl IssuanceConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `DCC_DGCI_PREFIX` (default: `URN:UVCI:V1:DE`)
    /// - `DCC_ISSUER_COUNTRY` (default: `DE`)
    /// - `DCC_VALIDITY_HOURS` (default: 48)
    /// - `DCC_KEY_ID`, hex (default: absent)
    /// - `DCC_ALGORITHM_ID` (default: -7)
    ///
    /// The loaded values are validated before returning.
    pub fn from_env() -> Result<Self, ConfigError> {
        let key_id = match std::env::var("DCC_KEY_ID") {
            Ok(raw) if !raw.trim().is_empty() => {
                Some(hex::decode(raw.trim()).map_err(|e| ConfigError::InvalidValue {
                    var: "DCC_KEY_ID".to_string(),
                    reason: e.to_string(),
                })?)
            }
            _ => None,
        };

        let config = Self {
            dgci_prefix: env_or("DCC_DGCI_PREFIX", DEFAULT_DGCI_PREFIX),
            issuer_country: env_or("DCC_ISSUER_COUNTRY", DEFAULT_ISSUER_COUNTRY),
            validity_hours: env_parse("DCC_VALIDITY_HOURS", DEFAULT_VALIDITY_HOURS)?,
            key_id,
            algorithm_id: env_parse("DCC_ALGORITHM_ID", DEFAULT_ALGORITHM_ID)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every field without building anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        DgciGenerator::new(self.dgci_prefix.as_str())?;
        if self.issuer_country.is_empty() {
            return Err(ConfigError::EmptyIssuer);
        }
        if self.validity_hours <= 0 {
            return Err(ConfigError::InvalidValue {
                var: "DCC_VALIDITY_HOURS".to_string(),
                reason: format!("must be positive, got {}", self.validity_hours),
            });
        }
        Ok(())
    }

    /// Identifier generator for the configured prefix.
    pub fn dgci_generator(&self) -> Result<DgciGenerator, ConfigError> {
        DgciGenerator::new(self.dgci_prefix.as_str())
    }

    /// Issuance metadata for a certificate issued at `now`.
    pub fn init_data(&self, now: DateTime<Utc>) -> Result<CertificateInitData, ConfigError> {
        let validity =
            Duration::try_hours(self.validity_hours).ok_or_else(|| ConfigError::InvalidValue {
                var: "DCC_VALIDITY_HOURS".to_string(),
                reason: format!("{} hours is out of range", self.validity_hours),
            })?;
        CertificateInitData::starting_at(
            self.issuer_country.as_str(),
            now,
            validity,
            self.key_id.clone(),
            self.algorithm_id,
        )
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

fn env_parse(var: &str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|e: std::num::ParseIntError| {
            ConfigError::InvalidValue {
                var: var.to_string(),
                reason: e.to_string(),
            }
        }),
        Err(_) => Ok(default),
    }
}
