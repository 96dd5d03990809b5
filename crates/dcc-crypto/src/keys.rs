//! # RSA Key Handles
//!
//! Thin wrappers over OpenSSL RSA keys. The public half wraps data keys on
//! the issuer side; the private half belongs to the key-management service
//! that opens envelopes.
//!
//! Public keys load from PEM or DER in either SubjectPublicKeyInfo or
//! PKCS#1 form. Private keys load from PEM or DER in either PKCS#8 or
//! PKCS#1 form.

use dcc_core::CryptoError;
use openssl::pkey::{PKey, Private, Public};
use openssl::rsa::Rsa;

/// Smallest modulus accepted for a recipient key.
pub const MIN_RSA_BITS: u32 = 2048;

/// Public key of an envelope recipient.
#[derive(Clone)]
pub struct RecipientKey(Rsa<Public>);

impl RecipientKey {
    /// Load from PEM (`PUBLIC KEY` or `RSA PUBLIC KEY`).
    pub fn from_pem(pem: &[u8]) -> Result<Self, CryptoError> {
        Rsa::public_key_from_pem(pem)
            .or_else(|_| Rsa::public_key_from_pem_pkcs1(pem))
            .map_err(key_error)
            .and_then(Self::from_rsa)
    }

    /// Load from DER (SubjectPublicKeyInfo or PKCS#1).
    pub fn from_der(der: &[u8]) -> Result<Self, CryptoError> {
        Rsa::public_key_from_der(der)
            .or_else(|_| Rsa::public_key_from_der_pkcs1(der))
            .map_err(key_error)
            .and_then(Self::from_rsa)
    }

    /// Wrap an already loaded key.
    pub fn from_rsa(rsa: Rsa<Public>) -> Result<Self, CryptoError> {
        check_size(rsa.size())?;
        Ok(Self(rsa))
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> u32 {
        self.0.size() * 8
    }

    /// SubjectPublicKeyInfo PEM.
    pub fn to_pem(&self) -> Result<Vec<u8>, CryptoError> {
        self.0.public_key_to_pem().map_err(key_error)
    }

    pub(crate) fn rsa(&self) -> &Rsa<Public> {
        &self.0
    }
}

impl std::fmt::Debug for RecipientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipientKey")
            .field("bits", &self.bits())
            .finish()
    }
}

/// Private key of an envelope recipient. Never printed.
pub struct RecipientSecretKey(Rsa<Private>);

impl RecipientSecretKey {
    /// Load from PEM (`PRIVATE KEY` or `RSA PRIVATE KEY`).
    pub fn from_pem(pem: &[u8]) -> Result<Self, CryptoError> {
        PKey::private_key_from_pem(pem)
            .and_then(|pkey| pkey.rsa())
            .map_err(key_error)
            .and_then(Self::from_rsa)
    }

    /// Load from DER (PKCS#8 or PKCS#1).
    pub fn from_der(der: &[u8]) -> Result<Self, CryptoError> {
        PKey::private_key_from_der(der)
            .and_then(|pkey| pkey.rsa())
            .or_else(|_| Rsa::private_key_from_der(der))
            .map_err(key_error)
            .and_then(Self::from_rsa)
    }

    /// Wrap an already loaded key.
    pub fn from_rsa(rsa: Rsa<Private>) -> Result<Self, CryptoError> {
        check_size(rsa.size())?;
        Ok(Self(rsa))
    }

    /// The matching public key.
    pub fn public_key(&self) -> Result<RecipientKey, CryptoError> {
        let n = self.0.n().to_owned().map_err(key_error)?;
        let e = self.0.e().to_owned().map_err(key_error)?;
        let public = Rsa::from_public_components(n, e).map_err(key_error)?;
        RecipientKey::from_rsa(public)
    }

    pub(crate) fn rsa(&self) -> &Rsa<Private> {
        &self.0
    }
}

impl std::fmt::Debug for RecipientSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RecipientSecretKey(<redacted>)")
    }
}

fn check_size(bytes: u32) -> Result<(), CryptoError> {
    let bits = bytes * 8;
    if bits < MIN_RSA_BITS {
        return Err(CryptoError::Key(format!(
            "RSA modulus of {bits} bits is below the {MIN_RSA_BITS}-bit minimum"
        )));
    }
    Ok(())
}

pub(crate) fn key_error(err: openssl::error::ErrorStack) -> CryptoError {
    CryptoError::Key(err.to_string())
}
