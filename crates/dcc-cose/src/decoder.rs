//! # Certificate Decoder
//!
//! Inverse of the issuance path: QR text → COSE_Sign1 → payload map →
//! versioned claims as JSON. Every structural expectation is a pattern
//! match; a mismatch names the key or element that failed.

use dcc_core::{CborValue, DccError, MalformedError};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::builder::{CLAIM_EXPIRATION, CLAIM_HCERT, CLAIM_ISSUED_AT, CLAIM_ISSUER, HCERT_EU_DCC};
use crate::cose::{CoseSign1, TagPolicy, HEADER_ALG, HEADER_KID};
use crate::qr::from_qr_text;

/// Certificate groups searched for an identifier, in priority order:
/// test, recovery, vaccination.
const IDENTIFIER_GROUPS: [&str; 3] = ["t", "r", "v"];

/// Field holding the certificate identifier inside a group entry.
const IDENTIFIER_FIELD: &str = "ci";

/// The result of decoding one QR text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedCertificate {
    /// Issuer country code.
    pub issuer: String,
    /// Issued-at, seconds since epoch.
    pub issued_at: i64,
    /// Expiration, seconds since epoch.
    pub expiration: i64,
    /// The certificate identifier (`ci`), if any group carries one.
    pub dgci: Option<String>,
    /// Versioned claims as a JSON tree.
    pub payload: JsonValue,
    /// Versioned claims as a JSON string.
    pub raw_json: String,
    /// Algorithm from the protected header, if present.
    pub algorithm_id: Option<i64>,
    /// Key identifier from the protected header, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<Vec<u8>>,
}

/// Decode QR text into its certificate contents.
///
/// # Errors
///
/// - [`MalformedError::MissingPrefix`] without the `HC1:` marker.
/// - Base45 encoding errors and zlib errors from the text layer.
/// - [`MalformedError::WrongTag`], [`MalformedError::NotAnArray`],
///   [`MalformedError::TooFewElements`] or [`MalformedError::PayloadNotBytes`]
///   if the structure is not a tagged COSE_Sign1 array.
/// - [`MalformedError::NotAMap`], [`MalformedError::MissingKey`] or
///   [`MalformedError::WrongType`] if the payload lacks a required claim.
pub fn decode(qr_text: &str) -> Result<DecodedCertificate, DccError> {
    let cose_bytes = from_qr_text(qr_text)?;
    let cose = CoseSign1::from_slice(&cose_bytes, TagPolicy::Required)?;

    let entries = match CborValue::from_slice(&cose.payload)? {
        CborValue::Map(entries) => entries,
        _ => return Err(MalformedError::NotAMap("payload").into()),
    };

    let issuer = match required(&entries, CLAIM_ISSUER)? {
        CborValue::Text(s) => s.clone(),
        _ => return Err(wrong_type(CLAIM_ISSUER, "text string").into()),
    };
    let issued_at = integer_claim(&entries, CLAIM_ISSUED_AT)?;
    let expiration = integer_claim(&entries, CLAIM_EXPIRATION)?;
    let hcert = match required(&entries, CLAIM_HCERT)? {
        CborValue::Map(hcert) => hcert,
        _ => return Err(wrong_type(CLAIM_HCERT, "map").into()),
    };
    let claims = required(hcert, HCERT_EU_DCC)?;

    let payload = claims.to_json()?;
    let raw_json =
        serde_json::to_string(&payload).map_err(|e| MalformedError::Json(e.to_string()))?;
    let dgci = extract_identifier(&payload);

    // Header introspection is best effort: an unreadable protected header
    // leaves both fields empty.
    let header = cose.protected_header().unwrap_or_default();
    let algorithm_id = match CborValue::lookup(&header, HEADER_ALG) {
        Some(CborValue::Integer(i)) => i64::try_from(*i).ok(),
        _ => None,
    };
    let key_id = match CborValue::lookup(&header, HEADER_KID) {
        Some(CborValue::Bytes(b)) => Some(b.clone()),
        _ => None,
    };

    tracing::debug!(
        issuer = %issuer,
        has_identifier = dgci.is_some(),
        "decoded certificate"
    );

    Ok(DecodedCertificate {
        issuer,
        issued_at,
        expiration,
        dgci,
        payload,
        raw_json,
        algorithm_id,
        key_id,
    })
}

/// Find the certificate identifier in a claims tree.
///
/// Looks for arrays under `"t"`, then `"r"`, then `"v"`, and returns the
/// `"ci"` text of the first entry of the first array present.
pub fn extract_identifier(claims: &JsonValue) -> Option<String> {
    IDENTIFIER_GROUPS
        .iter()
        .filter_map(|group| claims.get(group).and_then(JsonValue::as_array))
        .find_map(|entries| {
            entries
                .first()
                .and_then(|entry| entry.get(IDENTIFIER_FIELD))
                .and_then(JsonValue::as_str)
                .map(str::to_owned)
        })
}

fn required(entries: &[(CborValue, CborValue)], key: i64) -> Result<&CborValue, MalformedError> {
    CborValue::lookup(entries, key).ok_or_else(|| MalformedError::MissingKey(key.to_string()))
}

fn integer_claim(entries: &[(CborValue, CborValue)], key: i64) -> Result<i64, MalformedError> {
    match required(entries, key)? {
        CborValue::Integer(i) => i64::try_from(*i).map_err(|_| wrong_type(key, "64-bit integer")),
        _ => Err(wrong_type(key, "integer")),
    }
}

fn wrong_type(key: i64, expected: &'static str) -> MalformedError {
    MalformedError::WrongType {
        key: key.to_string(),
        expected,
    }
}
