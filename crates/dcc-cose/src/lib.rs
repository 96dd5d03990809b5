//! # dcc-cose — COSE_Sign1 Issuance and Decoding
//!
//! The issuance flow, end to end:
//!
//! 1. [`build_payload`] maps issuance metadata and the claims JSON onto
//!    the integer-keyed CBOR payload (`1`, `6`, `4`, `-260`).
//! 2. [`build_unsigned`] wraps it in a tagged COSE_Sign1 array with an
//!    empty signature, yielding an [`UnsignedCose`].
//! 3. [`compute_signature_digest`] produces the SHA-256 a remote signer
//!    signs.
//! 4. [`merge_signature`] or [`merge_partial_signature`] inserts the
//!    returned signature, yielding a [`SignedCose`].
//! 5. [`to_qr_text`] renders `HC1:` + Base45(zlib(bytes)).
//!
//! [`decode`] runs the flow backwards for a verifier.
//!
//! No signatures are created or verified here.

pub mod builder;
pub mod cose;
pub mod decoder;
pub mod qr;

pub use builder::{
    build_certificate, build_payload, build_unsigned, compute_signature_digest,
    merge_partial_signature, merge_signature,
};
pub use cose::{CoseSign1, SignedCose, TagPolicy, ToBeSigned, UnsignedCose};
pub use decoder::{decode, extract_identifier, DecodedCertificate};
pub use qr::{from_qr_text, to_qr_text, MAX_INFLATED_LEN, QR_PREFIX};
