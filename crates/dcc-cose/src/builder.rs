//! # Certificate Structure Builder
//!
//! Composes the unsigned COSE_Sign1 structure from a JSON claims document,
//! computes the digest the remote signer signs, and merges the returned
//! signature back.
//!
//! ## Payload Layout
//!
//! ```text
//! {
//!   1: issuer,          // text
//!   6: issued-at,       // seconds since epoch
//!   4: expiration,      // seconds since epoch
//!   -260: { 1: claims } // hcert wrapper around the versioned claims
//! }
//! ```
//!
//! Keys are written in exactly this order.

use dcc_core::{
    CborValue, CertificateInitData, ConfigError, ContentDigest, DccError, MalformedError,
};

use crate::cose::{CoseSign1, SignedCose, TagPolicy, UnsignedCose, HEADER_ALG, HEADER_KID};

/// Payload key: issuer.
pub const CLAIM_ISSUER: i64 = 1;
/// Payload key: expiration.
pub const CLAIM_EXPIRATION: i64 = 4;
/// Payload key: issued-at.
pub const CLAIM_ISSUED_AT: i64 = 6;
/// Payload key: health-certificate wrapper.
pub const CLAIM_HCERT: i64 = -260;
/// Key of the versioned claims inside the hcert wrapper.
pub const HCERT_EU_DCC: i64 = 1;

/// Build the CBOR payload for a certificate.
///
/// # Errors
///
/// - [`ConfigError::EmptyIssuer`] if `issuer` is empty.
/// - [`MalformedError::Json`] if `payload_json` is not valid JSON.
/// - [`MalformedError::NotAMap`] if it is valid JSON but not an object.
pub fn build_payload(
    payload_json: &str,
    issuer: &str,
    issued_at: i64,
    expiration: i64,
) -> Result<Vec<u8>, DccError> {
    if issuer.is_empty() {
        return Err(ConfigError::EmptyIssuer.into());
    }
    let claims: serde_json::Value =
        serde_json::from_str(payload_json).map_err(|e| MalformedError::Json(e.to_string()))?;
    if !claims.is_object() {
        return Err(MalformedError::NotAMap("certificate payload").into());
    }

    let payload = CborValue::Map(vec![
        (int(CLAIM_ISSUER), CborValue::Text(issuer.to_string())),
        (int(CLAIM_ISSUED_AT), int(issued_at)),
        (int(CLAIM_EXPIRATION), int(expiration)),
        (
            int(CLAIM_HCERT),
            CborValue::Map(vec![(int(HCERT_EU_DCC), CborValue::from_json(&claims))]),
        ),
    ]);
    let bytes = payload.to_vec()?;
    tracing::debug!(issuer, payload_len = bytes.len(), "built certificate payload");
    Ok(bytes)
}

/// Wrap payload bytes in an unsigned COSE_Sign1 structure.
///
/// The protected header carries the algorithm (omitted when
/// `algorithm_id == 0`) and the key identifier (omitted when `None`). The
/// unprotected header is empty and the signature is an empty byte string.
pub fn build_unsigned(
    payload: &[u8],
    key_id: Option<&[u8]>,
    algorithm_id: i64,
) -> Result<UnsignedCose, DccError> {
    let mut header = Vec::with_capacity(2);
    if algorithm_id != 0 {
        header.push((int(HEADER_ALG), int(algorithm_id)));
    }
    if let Some(kid) = key_id {
        header.push((int(HEADER_KID), CborValue::Bytes(kid.to_vec())));
    }

    let parts = CoseSign1 {
        protected: CborValue::Map(header).to_vec()?,
        unprotected: Vec::new(),
        payload: payload.to_vec(),
        signature: Vec::new(),
    };
    let unsigned = UnsignedCose::from_parts(&parts)?;
    tracing::debug!(
        envelope_len = unsigned.as_bytes().len(),
        has_kid = key_id.is_some(),
        algorithm_id,
        "built unsigned COSE_Sign1"
    );
    Ok(unsigned)
}

/// Build the unsigned structure for `init` and `payload_json` in one step.
pub fn build_certificate(
    init: &CertificateInitData,
    payload_json: &str,
) -> Result<UnsignedCose, DccError> {
    let payload = build_payload(
        payload_json,
        init.issuer(),
        init.issued_at(),
        init.expiration(),
    )?;
    build_unsigned(&payload, init.key_id(), init.algorithm_id())
}

/// SHA-256 of the `Sig_structure` of an unsigned structure.
///
/// # Errors
///
/// Returns a malformed-input error if `unsigned` is not a COSE_Sign1 array.
pub fn compute_signature_digest(unsigned: &[u8]) -> Result<ContentDigest, DccError> {
    let parts = CoseSign1::from_slice(unsigned, TagPolicy::Optional)?;
    let digest = parts.to_be_signed()?.digest();
    tracing::debug!(digest = %digest, "computed signature digest");
    Ok(digest)
}

impl UnsignedCose {
    /// SHA-256 of this structure's `Sig_structure`.
    pub fn signature_digest(&self) -> Result<ContentDigest, DccError> {
        compute_signature_digest(self.as_bytes())
    }
}

/// Place a raw signature into an unsigned structure.
///
/// # Errors
///
/// Returns [`MalformedError::EmptySignature`] if `signature` is empty.
pub fn merge_signature(unsigned: &UnsignedCose, signature: &[u8]) -> Result<SignedCose, DccError> {
    let mut target = unsigned.parts()?;
    target.signature = signature.to_vec();
    let signed = SignedCose::from_parts(&target)?;
    tracing::debug!(signature_len = signature.len(), "merged raw signature");
    Ok(signed)
}

/// Merge a partial COSE structure returned by the remote signer.
///
/// The signature element of `partial` replaces the target's. Every entry of
/// `partial`'s unprotected header is copied into the target's unprotected
/// header, overriding equal keys and keeping the others.
///
/// # Errors
///
/// - [`MalformedError::NotAnEnvelope`] if either side is not a COSE_Sign1 array
///   of at least four elements.
/// - [`MalformedError::NotAMap`] if `partial`'s unprotected header is not a map.
/// - [`MalformedError::EmptySignature`] if `partial` carries no signature.
pub fn merge_partial_signature(
    unsigned: &UnsignedCose,
    partial: &[u8],
) -> Result<SignedCose, DccError> {
    let mut target = unsigned.parts().map_err(|e| not_an_envelope("unsigned", e))?;
    let source = CoseSign1::from_slice(partial, TagPolicy::Optional).map_err(|e| match e {
        MalformedError::NotAMap(_) => MalformedError::NotAMap("signer unprotected header"),
        other => not_an_envelope("partial", other),
    })?;

    target.signature = source.signature;
    target.merge_unprotected(&source.unprotected);
    let signed = SignedCose::from_parts(&target)?;
    tracing::debug!(
        merged_headers = source.unprotected.len(),
        signature_len = target.signature.len(),
        "merged partial signature"
    );
    Ok(signed)
}

fn not_an_envelope(which: &str, cause: MalformedError) -> MalformedError {
    MalformedError::NotAnEnvelope(format!("{which} structure: {cause}"))
}

fn int(value: i64) -> CborValue {
    CborValue::Integer(i128::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cose::COSE_SIGN1_TAG;

    const CLAIMS: &str = r#"{"ver":"1.3.0","nam":{"fn":"Musterfrau","gn":"Erika"},"dob":"1964-08-12","t":[{"tg":"840539006","ci":"URN:UVCI:V1:DE:ABC"}]}"#;

    fn payload_entries(bytes: &[u8]) -> Vec<(CborValue, CborValue)> {
        match CborValue::from_slice(bytes).unwrap() {
            CborValue::Map(entries) => entries,
            other => panic!("payload is {}", other.type_name()),
        }
    }

    #[test]
    fn payload_has_keys_in_order() {
        let bytes = build_payload(CLAIMS, "DE", 1_622_505_600, 1_622_678_400).unwrap();
        let entries = payload_entries(&bytes);
        let keys: Vec<&CborValue> = entries.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![&int(1), &int(6), &int(4), &int(-260)]);
        assert_eq!(entries[0].1, CborValue::Text("DE".into()));
        assert_eq!(entries[1].1, int(1_622_505_600));
        assert_eq!(entries[2].1, int(1_622_678_400));
    }

    #[test]
    fn payload_wraps_claims_under_hcert() {
        let bytes = build_payload(CLAIMS, "DE", 1, 2).unwrap();
        let entries = payload_entries(&bytes);
        let Some(CborValue::Map(hcert)) = CborValue::lookup(&entries, CLAIM_HCERT) else {
            panic!("hcert wrapper missing");
        };
        let claims = CborValue::lookup(hcert, HCERT_EU_DCC).unwrap();
        let expected: serde_json::Value = serde_json::from_str(CLAIMS).unwrap();
        assert_eq!(claims.to_json().unwrap(), expected);
    }

    #[test]
    fn payload_rejects_empty_issuer() {
        assert!(matches!(
            build_payload(CLAIMS, "", 1, 2),
            Err(DccError::Config(ConfigError::EmptyIssuer))
        ));
    }

    #[test]
    fn payload_rejects_invalid_json() {
        assert!(matches!(
            build_payload("{not json", "DE", 1, 2),
            Err(DccError::Malformed(MalformedError::Json(_)))
        ));
        assert!(matches!(
            build_payload("[1,2]", "DE", 1, 2),
            Err(DccError::Malformed(MalformedError::NotAMap(_)))
        ));
    }

    #[test]
    fn unsigned_structure_shape() {
        let unsigned = build_unsigned(b"payload", Some(b"kid1"), -7).unwrap();
        let value = CborValue::from_slice(unsigned.as_bytes()).unwrap();
        let CborValue::Tag(COSE_SIGN1_TAG, inner) = value else {
            panic!("not tagged 18");
        };
        let CborValue::Array(items) = *inner else {
            panic!("not an array");
        };
        assert_eq!(items.len(), 4);
        assert_eq!(items[1], CborValue::Map(vec![]));
        assert_eq!(items[2], CborValue::Bytes(b"payload".to_vec()));
        assert_eq!(items[3], CborValue::Bytes(vec![]));

        let parts = unsigned.parts().unwrap();
        let header = parts.protected_header().unwrap();
        assert_eq!(
            header,
            vec![
                (int(HEADER_ALG), int(-7)),
                (int(HEADER_KID), CborValue::Bytes(b"kid1".to_vec())),
            ]
        );
    }

    #[test]
    fn unsigned_omits_absent_header_entries() {
        let unsigned = build_unsigned(b"payload", None, 0).unwrap();
        let parts = unsigned.parts().unwrap();
        assert_eq!(parts.protected, vec![0xa0]);
    }

    #[test]
    fn digest_depends_on_payload() {
        let a = build_unsigned(b"a", None, -7).unwrap();
        let b = build_unsigned(b"b", None, -7).unwrap();
        assert_ne!(a.signature_digest().unwrap(), b.signature_digest().unwrap());
        assert_eq!(
            a.signature_digest().unwrap(),
            compute_signature_digest(a.as_bytes()).unwrap()
        );
    }

    #[test]
    fn digest_rejects_non_array() {
        let bytes = CborValue::Text("nope".into()).to_vec().unwrap();
        assert!(matches!(
            compute_signature_digest(&bytes),
            Err(DccError::Malformed(MalformedError::NotAnArray(_)))
        ));
    }

    #[test]
    fn digest_ignores_unprotected_header_and_signature() {
        let unsigned = build_unsigned(b"payload", Some(b"k"), -7).unwrap();
        let signed = merge_signature(&unsigned, &[9; 64]).unwrap();
        assert_eq!(
            compute_signature_digest(signed.as_bytes()).unwrap(),
            unsigned.signature_digest().unwrap()
        );
    }

    #[test]
    fn merge_signature_fills_index_3() {
        let unsigned = build_unsigned(b"payload", None, -7).unwrap();
        let signed = merge_signature(&unsigned, &[7; 64]).unwrap();
        let parts = signed.parts().unwrap();
        assert_eq!(parts.signature, vec![7; 64]);
        assert_eq!(parts.payload, b"payload".to_vec());
    }

    #[test]
    fn merge_signature_rejects_empty() {
        let unsigned = build_unsigned(b"payload", None, -7).unwrap();
        assert!(matches!(
            merge_signature(&unsigned, &[]),
            Err(DccError::Malformed(MalformedError::EmptySignature))
        ));
    }

    #[test]
    fn merge_partial_copies_signature_and_headers() {
        let unsigned = build_unsigned(b"payload", None, -7).unwrap();
        let partial = CoseSign1 {
            protected: vec![0xa0],
            unprotected: vec![(int(HEADER_KID), CborValue::Bytes(b"kid".to_vec()))],
            payload: vec![],
            signature: vec![5; 64],
        }
        .to_vec()
        .unwrap();

        let signed = merge_partial_signature(&unsigned, &partial).unwrap();
        let parts = signed.parts().unwrap();
        assert_eq!(parts.signature, vec![5; 64]);
        assert_eq!(parts.payload, b"payload".to_vec());
        assert_eq!(
            parts.unprotected,
            vec![(int(HEADER_KID), CborValue::Bytes(b"kid".to_vec()))]
        );
    }

    #[test]
    fn merge_partial_rejects_short_source() {
        let unsigned = build_unsigned(b"payload", None, -7).unwrap();
        let short = CborValue::Array(vec![CborValue::Bytes(vec![]), CborValue::Map(vec![])])
            .to_vec()
            .unwrap();
        assert!(matches!(
            merge_partial_signature(&unsigned, &short),
            Err(DccError::Malformed(MalformedError::NotAnEnvelope(_)))
        ));
    }

    #[test]
    fn merge_partial_rejects_non_map_header() {
        let unsigned = build_unsigned(b"payload", None, -7).unwrap();
        let bad = CborValue::Array(vec![
            CborValue::Bytes(vec![]),
            CborValue::Text("header".into()),
            CborValue::Bytes(vec![]),
            CborValue::Bytes(vec![1]),
        ])
        .to_vec()
        .unwrap();
        assert!(matches!(
            merge_partial_signature(&unsigned, &bad),
            Err(DccError::Malformed(MalformedError::NotAMap("signer unprotected header")))
        ));
    }
}
