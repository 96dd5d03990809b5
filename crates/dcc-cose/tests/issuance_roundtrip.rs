//! # Issuance Round-Trip Tests
//!
//! Drives the full issuer flow (config → payload → unsigned structure →
//! digest → signature merge → QR text) and checks the verifier side
//! recovers every claim.

use chrono::{TimeZone, Utc};
use dcc_core::{DccError, IssuanceConfig, MalformedError};
use dcc_cose::{
    build_certificate, compute_signature_digest, decode, merge_partial_signature,
    merge_signature, to_qr_text, QR_PREFIX,
};
use proptest::prelude::*;

/// A German test certificate as issued in the field.
const DE_TEST_CLAIMS: &str = r#"{"ver":"1.0.0","nam":{"fn":"Mustermann","gn":"Erika","fnt":"MUSTERMANN","gnt":"ERIKA"},"dob":"1964-08-12","t":[{"tg":"840539006","tt":"LP217198-3","ma":"1232","sc":"2021-05-30T10:12:22Z","tr":"260415000","tc":"Testzentrum Koeln Hbf","co":"DE","is":"Robert Koch-Institut","ci":"URN:UVCI:01:OS:B5921A35D6A0D696421B3E2462178297I"}]}"#;

/// An Austrian vaccination certificate produced outside this workspace:
/// CBOR from a separate encoder with claim keys in `4, 6, 1, -260` order,
/// zlib at the default level, and a separate Base45 encoder.
const AT_VACCINATION_QR: &str = concat!(
    "HC1:6BF3W19KP3POJ101 596O4MHR.RF8J$%P7$2+BR2+MTU00KKHWBIMAA IZ7C",
    "KA48V6K085SO5%O60195PF:4U:FX8O$8I Z4S0W+Q4 65G371L70NN8:VMAFVQN%",
    "*AK+BO:F.HK++FVDSVIHMIATDKD8KI:GI9OV/O9 E0IQW K2+CPXS9$0MIADP0.%",
    "SNMN9CQNGQBQPCML9TF:53FCEAQC9+HTN3UU56ISVNAK10L*05Q1QHRU4S7$4IJC",
    "PZ3V1IA.SLDJM7J.OOXZ5QUBROT% LD1AM*G000C6RS57 1OLKPM319124A82Z8X",
    " 6VJO06SF.GE7PF50PEN5PAB129YDV-KXII3FSWQ2S25.32QAF-JTW%0+GIPSOIT",
    "JU6Q$QD7WULQU*9D% NWWS6950J7:Y5LTCDE7K Q.HB Y5Z6HIZK E5LJEAV2+H5",
    "4NDAGHY8A9X7H$5IVPB1SQX9DS8+BFHWRZGF9-NR-L-/TA+JR/R:.NG:VXQG5UOM",
    "TK VSG5ORLLHHJMLF//FEHE97OR7B4 B%3DX74E72/8TL69B22C-613N05WQYQ*B",
    "E",
);

const AT_VACCINATION_CLAIMS: &str = r#"{"v":[{"ci":"URN:UVCI:V1:AT:0E7QGZ6XW2KR3ZRDBNH0V5TL1","co":"AT","dn":2,"dt":"2021-06-01","is":"Ministry of Health, Austria","ma":"ORG-100030215","mp":"EU/1/20/1528","sd":2,"tg":"840539006","vp":"1119349007"}],"dob":"1998-02-26","nam":{"fn":"Musterfrau-Gößinger","gn":"Gabriele","fnt":"MUSTERFRAU<GOESSINGER","gnt":"GABRIELE"},"ver":"1.2.1"}"#;

fn de_config() -> IssuanceConfig {
    IssuanceConfig {
        key_id: Some(vec![0x0f, 0x1e, 0x2d, 0x3c, 0x4b, 0x5a, 0x69, 0x78]),
        ..IssuanceConfig::default()
    }
}

#[test]
fn de_test_certificate_survives_issuance() {
    let now = Utc.with_ymd_and_hms(2021, 5, 30, 10, 12, 22).unwrap();
    let init = de_config().init_data(now).unwrap();

    let unsigned = build_certificate(&init, DE_TEST_CLAIMS).unwrap();
    let digest = compute_signature_digest(unsigned.as_bytes()).unwrap();
    assert_eq!(digest, unsigned.signature_digest().unwrap());

    let signed = merge_signature(&unsigned, &[0x5a; 64]).unwrap();
    let text = to_qr_text(&signed).unwrap();
    assert!(text.starts_with(QR_PREFIX));

    let decoded = decode(&text).unwrap();
    assert_eq!(decoded.issuer, "DE");
    assert_eq!(decoded.issued_at, now.timestamp());
    assert_eq!(decoded.expiration, now.timestamp() + 48 * 3600);
    assert_eq!(
        decoded.dgci.as_deref(),
        Some("URN:UVCI:01:OS:B5921A35D6A0D696421B3E2462178297I")
    );
    assert!(!decoded.raw_json.is_empty());
    assert_eq!(decoded.raw_json, DE_TEST_CLAIMS);
    assert_eq!(decoded.algorithm_id, Some(-7));
    assert_eq!(decoded.key_id, init.key_id().map(<[u8]>::to_vec));
}

#[test]
fn decodes_externally_encoded_certificate() {
    let decoded = decode(AT_VACCINATION_QR).unwrap();
    assert_eq!(decoded.issuer, "AT");
    assert_eq!(decoded.issued_at, 1_624_010_400);
    assert_eq!(decoded.expiration, 1_655_546_400);
    assert_eq!(
        decoded.dgci.as_deref(),
        Some("URN:UVCI:V1:AT:0E7QGZ6XW2KR3ZRDBNH0V5TL1")
    );
    assert_eq!(decoded.raw_json, AT_VACCINATION_CLAIMS);
    assert_eq!(decoded.payload["nam"]["fn"], "Musterfrau-Gößinger");
    assert_eq!(decoded.algorithm_id, Some(-7));
    assert_eq!(
        decoded.key_id,
        Some(vec![0xd9, 0x19, 0x37, 0x5f, 0xc1, 0xe7, 0xb6, 0xb2])
    );

    let cose = dcc_cose::from_qr_text(AT_VACCINATION_QR).unwrap();
    let signed = dcc_cose::SignedCose::from_bytes(&cose).unwrap();
    assert_eq!(signed.parts().unwrap().signature, (0u8..64).collect::<Vec<_>>());
}

#[test]
fn signature_digest_is_stable_across_merges() {
    let now = Utc.with_ymd_and_hms(2021, 5, 30, 0, 0, 0).unwrap();
    let init = de_config().init_data(now).unwrap();
    let unsigned = build_certificate(&init, DE_TEST_CLAIMS).unwrap();
    let before = unsigned.signature_digest().unwrap();

    let signed = merge_signature(&unsigned, &[1; 64]).unwrap();
    let after = compute_signature_digest(signed.as_bytes()).unwrap();
    assert_eq!(before, after);
}

#[test]
fn partial_merge_produces_decodable_certificate() {
    let now = Utc.with_ymd_and_hms(2021, 5, 30, 0, 0, 0).unwrap();
    let init = de_config().init_data(now).unwrap();
    let unsigned = build_certificate(&init, DE_TEST_CLAIMS).unwrap();

    // [h'', {4: h'0102'}, h'', h'AAAA'] as produced by a remote signer.
    let partial = [
        0xd2, 0x84, 0x40, 0xa1, 0x04, 0x42, 0x01, 0x02, 0x40, 0x42, 0xaa, 0xaa,
    ];
    let signed = merge_partial_signature(&unsigned, &partial).unwrap();
    let parts = signed.parts().unwrap();
    assert_eq!(parts.signature, vec![0xaa, 0xaa]);
    assert_eq!(parts.unprotected.len(), 1);

    let decoded = decode(&to_qr_text(&signed).unwrap()).unwrap();
    assert_eq!(decoded.issuer, "DE");
}

#[test]
fn decode_rejects_text_without_prefix() {
    assert!(matches!(
        decode("6BFOXN%TS3DH0YOJ58S S-W5HDC *M0II5XHC9B5G2+$N IOP-IA%NFQGRJPC%OQHIZC4.OI1RM8ZA.A5:S9MKN4NL*MN:X9FE6:CM"),
        Err(DccError::Malformed(MalformedError::MissingPrefix))
    ));
}

#[test]
fn decode_rejects_non_array_structure() {
    // zlib(CBOR text "x") behind a valid prefix.
    use flate2::write::ZlibEncoder;
    use std::io::Write;
    let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::best());
    encoder.write_all(&[0x61, 0x78]).unwrap();
    let text = format!(
        "{QR_PREFIX}{}",
        dcc_core::base45::encode(&encoder.finish().unwrap())
    );
    assert!(matches!(
        decode(&text),
        Err(DccError::Malformed(MalformedError::NotAnArray(_)))
    ));
}

proptest! {
    #[test]
    fn issued_claims_decode_unchanged(
        issuer in "[A-Z]{2}",
        name in "[A-Za-z ]{0,24}",
        ci in "URN:UVCI:V1:[A-Z]{2}:[A-Z0-9]{10}",
        issued_at in 0i64..4_000_000_000,
        signature in proptest::collection::vec(any::<u8>(), 1..=96),
    ) {
        let claims = serde_json::json!({
            "ver": "1.3.0",
            "nam": {"fn": name},
            "v": [{"ci": ci, "dn": 2}],
        })
        .to_string();
        let payload = dcc_cose::build_payload(&claims, &issuer, issued_at, issued_at + 3600).unwrap();
        let unsigned = dcc_cose::build_unsigned(&payload, None, -7).unwrap();
        let signed = merge_signature(&unsigned, &signature).unwrap();
        let text = to_qr_text(&signed).unwrap();

        prop_assert!(text.starts_with(QR_PREFIX));
        let decoded = decode(&text).unwrap();
        prop_assert_eq!(decoded.issuer, issuer);
        prop_assert_eq!(decoded.issued_at, issued_at);
        prop_assert_eq!(decoded.dgci, Some(ci));
        prop_assert_eq!(decoded.raw_json, claims);
        prop_assert_eq!(decoded.key_id, None);
    }
}
