//! # COSE_Sign1 Structure
//!
//! Typed view over the four-element COSE_Sign1 array
//! `[protected-header-bytes, unprotected-header-map, payload-bytes, signature]`
//! and the two byte-level newtypes that move through the issuance flow:
//!
//! - [`UnsignedCose`]: produced by the builder, signature element empty.
//! - [`SignedCose`]: produced by a signature merge, signature non-empty.
//!
//! Both newtypes validate their shape on construction, so every consumer of
//! an `UnsignedCose` or `SignedCose` can rely on it parsing as a tagged
//! COSE_Sign1 array.
//!
//! ## Signature Input
//!
//! The remote signer signs the SHA-256 of the canonical `Sig_structure`
//! `["Signature1", protected, external_aad, payload]` with an empty external
//! AAD. [`ToBeSigned`] can only be built from a parsed structure, so the
//! digest is always computed over that exact layout.

use dcc_core::{CborValue, ContentDigest, MalformedError};

/// CBOR tag for COSE_Sign1.
pub const COSE_SIGN1_TAG: u64 = 18;

/// Protected header label: algorithm.
pub const HEADER_ALG: i64 = 1;
/// Protected header label: key identifier.
pub const HEADER_KID: i64 = 4;

const SIG_STRUCTURE_CONTEXT: &str = "Signature1";

/// Parsed COSE_Sign1 array.
#[derive(Debug, Clone, PartialEq)]
pub struct CoseSign1 {
    /// Serialized protected header map.
    pub protected: Vec<u8>,
    /// Unprotected header entries, in encounter order.
    pub unprotected: Vec<(CborValue, CborValue)>,
    /// Serialized payload.
    pub payload: Vec<u8>,
    /// Signature bytes; empty before signing.
    pub signature: Vec<u8>,
}

/// Whether the outer COSE_Sign1 tag must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagPolicy {
    /// Tag 18 is mandatory.
    Required,
    /// Tag 18 may be present or absent; any other tag is rejected.
    Optional,
}

impl CoseSign1 {
    /// Parse CBOR bytes into a COSE_Sign1 view.
    pub fn from_slice(bytes: &[u8], policy: TagPolicy) -> Result<Self, MalformedError> {
        Self::from_value(CborValue::from_slice(bytes)?, policy)
    }

    /// Interpret a decoded CBOR value as a COSE_Sign1 array.
    pub fn from_value(value: CborValue, policy: TagPolicy) -> Result<Self, MalformedError> {
        let inner = match value {
            CborValue::Tag(COSE_SIGN1_TAG, inner) => *inner,
            CborValue::Tag(other, _) => {
                return Err(MalformedError::WrongTag {
                    expected: COSE_SIGN1_TAG,
                    found: Some(other),
                })
            }
            untagged if policy == TagPolicy::Required => {
                return Err(match untagged {
                    CborValue::Array(_) => MalformedError::WrongTag {
                        expected: COSE_SIGN1_TAG,
                        found: None,
                    },
                    _ => MalformedError::NotAnArray("COSE structure"),
                })
            }
            untagged => untagged,
        };

        let items = match inner {
            CborValue::Array(items) => items,
            _ => return Err(MalformedError::NotAnArray("COSE structure")),
        };
        if items.len() < 4 {
            return Err(MalformedError::TooFewElements {
                what: "COSE structure",
                expected: 4,
                actual: items.len(),
            });
        }

        let mut items = items.into_iter();
        let (Some(protected), Some(unprotected), Some(payload), Some(signature)) =
            (items.next(), items.next(), items.next(), items.next())
        else {
            return Err(MalformedError::NotAnArray("COSE structure"));
        };

        let protected = match protected {
            CborValue::Bytes(b) => b,
            _ => return Err(wrong_element(0, "byte string")),
        };
        let unprotected = match unprotected {
            CborValue::Map(entries) => entries,
            _ => return Err(MalformedError::NotAMap("unprotected header")),
        };
        let payload = match payload {
            CborValue::Bytes(b) => b,
            _ => return Err(MalformedError::PayloadNotBytes),
        };
        let signature = match signature {
            CborValue::Bytes(b) => b,
            _ => return Err(wrong_element(3, "byte string")),
        };

        Ok(Self {
            protected,
            unprotected,
            payload,
            signature,
        })
    }

    /// The tagged CBOR value for this structure.
    pub fn to_value(&self) -> CborValue {
        CborValue::Tag(
            COSE_SIGN1_TAG,
            Box::new(CborValue::Array(vec![
                CborValue::Bytes(self.protected.clone()),
                CborValue::Map(self.unprotected.clone()),
                CborValue::Bytes(self.payload.clone()),
                CborValue::Bytes(self.signature.clone()),
            ])),
        )
    }

    /// Serialize as a tagged COSE_Sign1 array.
    pub fn to_vec(&self) -> Result<Vec<u8>, MalformedError> {
        self.to_value().to_vec()
    }

    /// Parse the protected header map.
    ///
    /// An empty byte string is read as an empty map.
    pub fn protected_header(&self) -> Result<Vec<(CborValue, CborValue)>, MalformedError> {
        if self.protected.is_empty() {
            return Ok(Vec::new());
        }
        match CborValue::from_slice(&self.protected)? {
            CborValue::Map(entries) => Ok(entries),
            _ => Err(MalformedError::NotAMap("protected header")),
        }
    }

    /// Build the signature input for this structure.
    pub fn to_be_signed(&self) -> Result<ToBeSigned, MalformedError> {
        let sig_structure = CborValue::Array(vec![
            CborValue::Text(SIG_STRUCTURE_CONTEXT.to_string()),
            CborValue::Bytes(self.protected.clone()),
            CborValue::Bytes(Vec::new()),
            CborValue::Bytes(self.payload.clone()),
        ]);
        Ok(ToBeSigned(sig_structure.to_vec()?))
    }

    /// Copy every unprotected header entry of `source` into this structure,
    /// replacing entries with equal keys and keeping the rest.
    pub fn merge_unprotected(&mut self, source: &[(CborValue, CborValue)]) {
        for (key, value) in source {
            match self.unprotected.iter_mut().find(|(k, _)| k == key) {
                Some(entry) => entry.1 = value.clone(),
                None => self.unprotected.push((key.clone(), value.clone())),
            }
        }
    }
}

fn wrong_element(index: usize, expected: &'static str) -> MalformedError {
    MalformedError::WrongType {
        key: format!("element {index}"),
        expected,
    }
}

/// Serialized `Sig_structure`, the exact bytes a COSE_Sign1 signer signs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToBeSigned(Vec<u8>);

impl ToBeSigned {
    /// The serialized `Sig_structure`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// SHA-256 of the `Sig_structure`, as sent to the remote signer.
    pub fn digest(&self) -> ContentDigest {
        ContentDigest::sha256(&self.0)
    }
}

/// Bytes of a tagged COSE_Sign1 structure awaiting its signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedCose(Vec<u8>);

impl UnsignedCose {
    /// Validate externally held bytes as an unsigned structure.
    ///
    /// Accepts tagged or untagged arrays and re-emits them tagged.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MalformedError> {
        let parsed = CoseSign1::from_slice(bytes, TagPolicy::Optional)?;
        Self::from_parts(&parsed)
    }

    pub(crate) fn from_parts(parts: &CoseSign1) -> Result<Self, MalformedError> {
        Ok(Self(parts.to_vec()?))
    }

    /// Parse into the typed view.
    pub fn parts(&self) -> Result<CoseSign1, MalformedError> {
        CoseSign1::from_slice(&self.0, TagPolicy::Required)
    }

    /// The serialized structure.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into the serialized structure.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for UnsignedCose {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Bytes of a tagged COSE_Sign1 structure with a non-empty signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCose(Vec<u8>);

impl SignedCose {
    /// Validate externally held bytes as a signed structure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MalformedError> {
        let parsed = CoseSign1::from_slice(bytes, TagPolicy::Optional)?;
        Self::from_parts(&parsed)
    }

    pub(crate) fn from_parts(parts: &CoseSign1) -> Result<Self, MalformedError> {
        if parts.signature.is_empty() {
            return Err(MalformedError::EmptySignature);
        }
        Ok(Self(parts.to_vec()?))
    }

    /// Parse into the typed view.
    pub fn parts(&self) -> Result<CoseSign1, MalformedError> {
        CoseSign1::from_slice(&self.0, TagPolicy::Required)
    }

    /// The serialized structure.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into the serialized structure.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for SignedCose {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
