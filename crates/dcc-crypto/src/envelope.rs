//! # Hybrid Encryption Envelope
//!
//! Ships an unsigned COSE_Sign1 structure to a remote signing service.
//! The structure is encrypted with a fresh AES-256-CBC data key (PKCS#7
//! padding); the data key is encrypted to the recipient's RSA key with
//! PKCS#1 v1.5 padding.
//!
//! ## Wire Layout
//!
//! - `hash`: SHA-256 of the structure's `Sig_structure`.
//! - `dccData`: the unsigned structure in clear.
//! - `dataEncrypted`: `IV (16 bytes) ‖ ciphertext`. A fresh random IV is
//!   generated per envelope; the recipient reads it back from the front.
//! - `dek`: the RSA-encrypted 32-byte data key.
//!
//! All four are base64 strings in JSON.

use base64::engine::{general_purpose::STANDARD as BASE64, Engine};
use dcc_core::{CertificateInitData, ContentDigest, CryptoError, DccError};
use dcc_cose::{build_certificate, compute_signature_digest};
use openssl::rsa::Padding;
use openssl::symm::{self, Cipher};
use rand_core::{CryptoRng, OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::keys::{RecipientKey, RecipientSecretKey};

/// AES-256 key length in bytes.
pub const DATA_KEY_LEN: usize = 32;
/// AES block and IV length in bytes.
pub const IV_LEN: usize = 16;

/// An unsigned certificate structure encrypted for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionEnvelope {
    hash: ContentDigest,
    #[serde(rename = "dccData", with = "base64_bytes")]
    dcc_data: Vec<u8>,
    #[serde(rename = "dataEncrypted", with = "base64_bytes")]
    data_encrypted: Vec<u8>,
    #[serde(with = "base64_bytes")]
    dek: Vec<u8>,
}

impl EncryptionEnvelope {
    /// Build a certificate and encrypt it to `recipient` using the OS
    /// random source.
    pub fn wrap(
        init: &CertificateInitData,
        payload_json: &str,
        recipient: &RecipientKey,
    ) -> Result<Self, DccError> {
        Self::wrap_with(init, payload_json, recipient, &mut OsRng)
    }

    /// Build a certificate and encrypt it to `recipient`, drawing the data
    /// key and IV from `rng`.
    pub fn wrap_with<R: RngCore + CryptoRng>(
        init: &CertificateInitData,
        payload_json: &str,
        recipient: &RecipientKey,
        rng: &mut R,
    ) -> Result<Self, DccError> {
        let unsigned = build_certificate(init, payload_json)?;
        let hash = unsigned.signature_digest()?;

        let mut data_key = Zeroizing::new([0u8; DATA_KEY_LEN]);
        rng.try_fill_bytes(&mut data_key[..])
            .map_err(CryptoError::from)?;
        let mut iv = [0u8; IV_LEN];
        rng.try_fill_bytes(&mut iv).map_err(CryptoError::from)?;

        let ciphertext = symm::encrypt(
            Cipher::aes_256_cbc(),
            &data_key[..],
            Some(&iv),
            unsigned.as_bytes(),
        )
        .map_err(cipher_error)?;
        let mut data_encrypted = Vec::with_capacity(IV_LEN + ciphertext.len());
        data_encrypted.extend_from_slice(&iv);
        data_encrypted.extend_from_slice(&ciphertext);

        let rsa = recipient.rsa();
        let mut dek = vec![0u8; rsa.size() as usize];
        let written = rsa
            .public_encrypt(&data_key[..], &mut dek, Padding::PKCS1)
            .map_err(cipher_error)?;
        dek.truncate(written);

        tracing::debug!(
            recipient_bits = recipient.bits(),
            plaintext_len = unsigned.as_bytes().len(),
            ciphertext_len = data_encrypted.len(),
            "wrapped certificate in hybrid envelope"
        );

        Ok(Self {
            hash,
            dcc_data: unsigned.into_bytes(),
            data_encrypted,
            dek,
        })
    }

    /// Decrypt the envelope with the recipient's private key.
    ///
    /// Returns the recovered structure bytes after checking that their
    /// signature digest equals `hash`.
    ///
    /// # Errors
    ///
    /// [`CryptoError::Cipher`] if the data key cannot be unwrapped, the
    /// ciphertext is truncated or its padding is wrong, or the recovered
    /// bytes do not match `hash`.
    pub fn open(&self, key: &RecipientSecretKey) -> Result<Vec<u8>, DccError> {
        let rsa = key.rsa();
        let mut unwrapped = Zeroizing::new(vec![0u8; rsa.size() as usize]);
        let written = rsa
            .private_decrypt(&self.dek, &mut unwrapped, Padding::PKCS1)
            .map_err(cipher_error)?;
        if written != DATA_KEY_LEN {
            return Err(CryptoError::Cipher(format!(
                "data key is {written} bytes, expected {DATA_KEY_LEN}"
            ))
            .into());
        }

        if self.data_encrypted.len() < IV_LEN {
            return Err(CryptoError::Cipher(format!(
                "encrypted data is {} bytes, shorter than the {IV_LEN}-byte IV",
                self.data_encrypted.len()
            ))
            .into());
        }
        let (iv, ciphertext) = self.data_encrypted.split_at(IV_LEN);
        let plaintext = symm::decrypt(
            Cipher::aes_256_cbc(),
            &unwrapped[..DATA_KEY_LEN],
            Some(iv),
            ciphertext,
        )
        .map_err(cipher_error)?;

        let recovered = compute_signature_digest(&plaintext)
            .map_err(|e| CryptoError::Cipher(format!("recovered data is not a structure: {e}")))?;
        if recovered != self.hash {
            return Err(CryptoError::Cipher(format!(
                "recovered data digest {recovered} does not match envelope hash {}",
                self.hash
            ))
            .into());
        }
        Ok(plaintext)
    }

    /// Signature digest of the carried structure.
    pub fn hash(&self) -> &ContentDigest {
        &self.hash
    }

    /// The unsigned structure in clear.
    pub fn dcc_data(&self) -> &[u8] {
        &self.dcc_data
    }

    /// IV followed by the AES-256-CBC ciphertext.
    pub fn data_encrypted(&self) -> &[u8] {
        &self.data_encrypted
    }

    /// The RSA-encrypted data key.
    pub fn dek(&self) -> &[u8] {
        &self.dek
    }
}

fn cipher_error(err: openssl::error::ErrorStack) -> CryptoError {
    CryptoError::Cipher(err.to_string())
}

mod base64_bytes {
    use super::{Engine, BASE64};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64.decode(encoded).map_err(serde::de::Error::custom)
    }
}
