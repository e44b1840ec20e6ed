//! Decoding signatures and timestamps built from raw DER.

mod common;

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::der::{self, CertificateBuilder, SignedDataBuilder, SignerInfoBuilder, TstInfoBuilder};
use symscope::{
    pkcs::{oid, AsnDecode, AsnReader, Certificate, DistinguishedName, SignedData},
    signature::{package_signature, SignatureKind},
    timestamp::{validate_signer_certificate_against_timestamp, Rfc3161TimestampToken},
    utils::digest,
};

const MICROSOFT: [(&str, &str); 5] = [
    (oid::COUNTRY_NAME, "US"),
    (oid::STATE_OR_PROVINCE_NAME, "Washington"),
    (oid::LOCALITY_NAME, "Redmond"),
    (oid::ORGANIZATION_NAME, "Microsoft Corporation"),
    (oid::COMMON_NAME, "Microsoft Corporation"),
];

fn gen_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap()
}

fn token(signature_value: &[u8], accuracy_seconds: u64) -> Vec<u8> {
    let tst_info = TstInfoBuilder::new(gen_time())
        .message_imprint(oid::SHA256, &digest("SHA256", signature_value).unwrap())
        .accuracy(Some(accuracy_seconds), None, None)
        .nonce(&[0x0F, 0xA0])
        .build();

    let authority = CertificateBuilder::new()
        .subject(&[(oid::COMMON_NAME, "Timestamp Authority")])
        .serial(&[0x42])
        .build();

    SignedDataBuilder::new()
        .tst_info(&tst_info)
        .certificate(&authority)
        .signer(&SignerInfoBuilder::new().serial(&[0x42]).build())
        .build_content_info()
}

#[test]
fn distinguished_name_display() {
    let name = DistinguishedName::from_der(&der::name(&[
        (oid::COUNTRY_NAME, "US"),
        (oid::ORGANIZATION_NAME, "Microsoft Corporation"),
        (oid::LOCALITY_NAME, "Redmond"),
    ]))
    .unwrap();

    assert_eq!(name.to_string(), "L=Redmond, O=Microsoft Corporation, C=US");
    assert_eq!(name.get(oid::COUNTRY_NAME), Some("US"));
    assert_eq!(name.common_name(), None);
}

#[test]
fn certificate_with_trailing_data() {
    let good = CertificateBuilder::new().build();
    assert!(Certificate::from_der(&good).is_ok());

    let bad = CertificateBuilder::new().tbs_trailer(&der::null()).build();
    if Certificate::from_der(&bad).is_ok() {
        panic!("This should not work!")
    }
}

#[test]
fn truncated_sequence() {
    #[rustfmt::skip]
    let data = [
        0x30, 0x05,
        0x02, 0x01, 0x01,
    ];

    let mut reader = AsnReader::new(&data);
    assert!(reader.read_sequence().is_err());
}

#[test]
fn timestamp_token() {
    let token = Rfc3161TimestampToken::decode(&token(b"signature", 2)).unwrap();

    let info = token.token_info();
    assert_eq!(info.timestamp(), gen_time());
    assert_eq!(info.accuracy_in_microseconds(), Some(2_000_000));
    assert!(info.is_imprint_of(b"signature"));
    assert!(!info.is_imprint_of(b"other"));
    assert_eq!(info.lower_limit(), gen_time() - Duration::seconds(2));
    assert_eq!(info.upper_limit(), gen_time() + Duration::seconds(2));

    let authority = token.signer_certificate().unwrap();
    assert_eq!(authority.subject().common_name(), Some("Timestamp Authority"));
}

#[test]
fn certificate_validity_against_timestamp() {
    let token = Rfc3161TimestampToken::decode(&token(b"signature", 2)).unwrap();

    let certificate = |margin: i64| {
        Certificate::from_der(
            &CertificateBuilder::new()
                .validity(
                    gen_time() - Duration::seconds(margin),
                    gen_time() + Duration::seconds(margin),
                )
                .build(),
        )
        .unwrap()
    };

    assert!(validate_signer_certificate_against_timestamp(
        &certificate(10),
        token.token_info()
    ));
    assert!(!validate_signer_certificate_against_timestamp(
        &certificate(1),
        token.token_info()
    ));
}

#[test]
fn timestamped_package_signature() {
    let signature_value = b"signature";
    let certificate = CertificateBuilder::new()
        .subject(&MICROSOFT)
        .validity(gen_time() - Duration::days(365), gen_time() + Duration::days(365))
        .build();
    let signer = SignerInfoBuilder::new()
        .signed_attribute(
            oid::COMMITMENT_TYPE_INDICATION,
            &der::sequence(&[der::oid(oid::COMMITMENT_TYPE_AUTHOR)]),
        )
        .unsigned_attribute(oid::TIMESTAMP_TOKEN, &token(signature_value, 1))
        .build();

    let data = SignedDataBuilder::new()
        .content(oid::DATA, b"Version:1")
        .certificate(&certificate)
        .signer(&signer)
        .build_content_info();

    let signature = package_signature(&data).unwrap();
    assert_eq!(signature.kind, SignatureKind::Author);
    assert_eq!(
        signature.signer_subject().as_deref(),
        Some("CN=Microsoft Corporation, O=Microsoft Corporation, L=Redmond, S=Washington, C=US")
    );

    let timestamps = signature.timestamps().unwrap();
    assert_eq!(timestamps.len(), 1);
    assert_eq!(timestamps[0].gen_time, gen_time());
    assert!(timestamps[0].signer_certificate.is_some());
    assert!(signature.is_signer_valid_at_timestamp().unwrap());
}

#[test]
fn not_signed_data() {
    let data = der::sequence(&[
        der::oid(oid::DATA),
        der::explicit(0, &der::octet_string(b"payload")),
    ]);

    if SignedData::from_content_info(&data).is_ok() {
        panic!("This should not work!")
    }
}
