//! # QR Text Layer
//!
//! `"HC1:" + Base45(zlib(COSE_Sign1 bytes))`, with no line breaks and no
//! further framing. Compression uses zlib level 9.

use std::io::{Read, Write};

use dcc_core::{base45, DccError, MalformedError};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::cose::SignedCose;

/// Marker that opens every health-certificate QR text.
pub const QR_PREFIX: &str = "HC1:";

const COMPRESSION_LEVEL: u32 = 9;

/// Largest structure accepted when inflating QR text.
pub const MAX_INFLATED_LEN: u64 = 1024 * 1024;

/// Render a signed structure as QR text.
pub fn to_qr_text(signed: &SignedCose) -> Result<String, DccError> {
    let compressed = deflate(signed.as_bytes())?;
    let text = format!("{QR_PREFIX}{}", base45::encode(&compressed));
    tracing::debug!(
        cose_len = signed.as_bytes().len(),
        compressed_len = compressed.len(),
        qr_len = text.len(),
        "rendered QR text"
    );
    Ok(text)
}

/// Strip the prefix, Base45-decode and inflate QR text back to COSE bytes.
///
/// # Errors
///
/// - [`MalformedError::MissingPrefix`] if `text` does not start with `HC1:`.
/// - An encoding error for invalid Base45.
/// - [`MalformedError::Compression`] if the zlib stream is corrupt.
pub fn from_qr_text(text: &str) -> Result<Vec<u8>, DccError> {
    let body = text
        .strip_prefix(QR_PREFIX)
        .ok_or(MalformedError::MissingPrefix)?;
    let compressed = base45::decode(body)?;
    Ok(inflate(&compressed)?)
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, MalformedError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(COMPRESSION_LEVEL));
    encoder
        .write_all(data)
        .map_err(|e| MalformedError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| MalformedError::Compression(e.to_string()))
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, MalformedError> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .take(MAX_INFLATED_LEN + 1)
        .read_to_end(&mut out)
        .map_err(|e| MalformedError::Compression(e.to_string()))?;
    if out.len() as u64 > MAX_INFLATED_LEN {
        return Err(MalformedError::Compression(format!(
            "inflated data exceeds {MAX_INFLATED_LEN} bytes"
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_unsigned, merge_signature};
    use dcc_core::EncodingError;

    fn signed() -> SignedCose {
        let unsigned = build_unsigned(b"payload", None, -7).unwrap();
        merge_signature(&unsigned, &[1; 64]).unwrap()
    }

    #[test]
    fn qr_text_has_prefix_and_alphabet() {
        let text = to_qr_text(&signed()).unwrap();
        assert!(text.starts_with("HC1:"));
        assert!(text[4..].bytes().all(|b| base45::ALPHABET.contains(&b)));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn from_qr_text_inverts_rendering() {
        let signed = signed();
        let text = to_qr_text(&signed).unwrap();
        assert_eq!(from_qr_text(&text).unwrap(), signed.as_bytes());
    }

    #[test]
    fn deflate_output_is_zlib() {
        let compressed = deflate(b"hello hello hello").unwrap();
        // zlib header: CM=8, level 9 sets FLEVEL=3
        assert_eq!(compressed[0], 0x78);
        assert_eq!(compressed[1], 0xda);
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(matches!(
            from_qr_text("HC2:ABC"),
            Err(DccError::Malformed(MalformedError::MissingPrefix))
        ));
    }

    #[test]
    fn rejects_bad_base45() {
        assert!(matches!(
            from_qr_text("HC1:abc"),
            Err(DccError::Encoding(EncodingError::InvalidCharacter { .. }))
        ));
    }

    #[test]
    fn rejects_oversized_inflation() {
        let bomb = deflate(&vec![0u8; MAX_INFLATED_LEN as usize + 1]).unwrap();
        assert!(bomb.len() < 4096);
        let text = format!("HC1:{}", base45::encode(&bomb));
        match from_qr_text(&text) {
            Err(DccError::Malformed(MalformedError::Compression(msg))) => {
                assert!(msg.contains("exceeds"));
            }
            other => panic!("expected Compression error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_inflation_at_limit() {
        let data = vec![0u8; MAX_INFLATED_LEN as usize];
        let text = format!("HC1:{}", base45::encode(&deflate(&data).unwrap()));
        assert_eq!(from_qr_text(&text).unwrap().len(), data.len());
    }

    #[test]
    fn rejects_corrupt_stream() {
        let text = format!("HC1:{}", base45::encode(b"definitely not zlib"));
        assert!(matches!(
            from_qr_text(&text),
            Err(DccError::Malformed(MalformedError::Compression(_)))
        ));
    }
}
