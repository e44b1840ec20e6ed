//! Benchmarks for the decoders on the validation path.
//!
//! - DER: certificates, SignedData and RFC 3161 tokens
//! - Portable PDB: reading the metadata root and decoding documents
//! - Debug data: the full per-binary pipeline of the validator
//! - Source Link: resolving document paths

#[path = "../src/test/der.rs"]
#[allow(dead_code)]
mod der;
#[path = "../src/test/metadata.rs"]
#[allow(dead_code)]
mod metadata;
#[path = "../src/test/pdb.rs"]
#[allow(dead_code)]
mod pdb;
#[path = "../src/test/pe.rs"]
#[allow(dead_code)]
mod pe;

use std::hint::black_box;

use chrono::{TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use der::{CertificateBuilder, SignedDataBuilder, SignerInfoBuilder, TstInfoBuilder};
use pdb::PortablePdbBuilder;
use pe::PeBuilder;
use symscope::{
    assembly::{AssemblyDebugParser, SourceLinkMap},
    metadata::pdb::PortablePdb,
    pkcs::{AsnDecode, Certificate, SignedData},
    timestamp::Rfc3161TimestampToken,
};
use uguid::guid;

fn signed_data() -> Vec<u8> {
    let gen_time = Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap();
    let token = SignedDataBuilder::new()
        .tst_info(&TstInfoBuilder::new(gen_time).accuracy(Some(1), Some(500), None).build())
        .certificate(&CertificateBuilder::new().serial(&[0x42]).build())
        .signer(&SignerInfoBuilder::new().serial(&[0x42]).build())
        .build_content_info();

    SignedDataBuilder::new()
        .certificate(&CertificateBuilder::new().build())
        .signer(
            &SignerInfoBuilder::new()
                .unsigned_attribute("1.2.840.113549.1.9.16.2.14", &token)
                .build(),
        )
        .build_content_info()
}

fn symbols() -> Vec<u8> {
    let mut builder = PortablePdbBuilder::new()
        .with_id(guid!("3e8f07a1-6c2d-4b59-9f14-8d0a7b2e6c31"), 0x6600_0000)
        .with_source_link(r#"{"documents":{"/_/*":"https://example.org/repo/abc/*"}}"#)
        .with_compilation_options(&[("language", "C#"), ("optimization", "release")]);
    for index in 0..64 {
        builder = builder.with_source_document(
            &format!("/_/src/Module{index}.cs"),
            format!("class Module{index} {{}}").as_bytes(),
        );
    }
    builder.build()
}

fn bench_certificate(c: &mut Criterion) {
    let certificate = CertificateBuilder::new()
        .subject_key_identifier(&[0xAB; 20])
        .build();

    c.bench_function("der_certificate", |b| {
        b.iter(|| Certificate::from_der(black_box(&certificate)).unwrap());
    });
}

fn bench_signed_data(c: &mut Criterion) {
    let data = signed_data();

    c.bench_function("der_signed_data", |b| {
        b.iter(|| SignedData::from_content_info(black_box(&data)).unwrap());
    });
}

fn bench_timestamp_token(c: &mut Criterion) {
    let gen_time = Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap();
    let token = SignedDataBuilder::new()
        .tst_info(&TstInfoBuilder::new(gen_time).nonce(&[0x01, 0x02]).build())
        .signer(&SignerInfoBuilder::new().build())
        .build_content_info();

    c.bench_function("rfc3161_token", |b| {
        b.iter(|| Rfc3161TimestampToken::decode(black_box(&token)).unwrap());
    });
}

fn bench_portable_pdb(c: &mut Criterion) {
    let data = symbols();

    c.bench_function("pdb_documents", |b| {
        b.iter(|| {
            let pdb = PortablePdb::read(black_box(&data)).unwrap();
            black_box(pdb.documents().unwrap().len())
        });
    });
}

fn bench_debug_data(c: &mut Criterion) {
    let symbols = symbols();
    let binary = PeBuilder::new().with_embedded_pdb(&symbols).build();

    c.bench_function("debug_data_embedded", |b| {
        b.iter(|| {
            let parser = AssemblyDebugParser::new(black_box(binary.clone()), None).unwrap();
            black_box(parser.get_debug_data().unwrap().sources.len())
        });
    });
}

fn bench_source_link(c: &mut Criterion) {
    let (maps, _) = SourceLinkMap::parse(
        r#"{"documents":{
            "/_/*":"https://example.org/repo/abc/*",
            "/_/external/*":"https://example.org/external/def/*",
            "/_/src/Generated.cs":"https://example.org/generated.cs"
        }}"#,
    )
    .unwrap();

    c.bench_function("source_link_resolve", |b| {
        b.iter(|| SourceLinkMap::resolve(&maps, black_box("/_/external/lib/Parser.cs")));
    });
}

criterion_group!(
    benches,
    bench_certificate,
    bench_signed_data,
    bench_timestamp_token,
    bench_portable_pdb,
    bench_debug_data,
    bench_source_link
);
criterion_main!(benches);
