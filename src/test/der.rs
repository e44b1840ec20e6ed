//! Builders that synthesize DER structures for decoder tests.
//!
//! Only `std` and `chrono` are used here so the integration tests can include this file
//! directly.

use chrono::{DateTime, Datelike, Utc};

const OID_DATA: &str = "1.2.840.113549.1.7.1";
const OID_SIGNED_DATA: &str = "1.2.840.113549.1.7.2";
const OID_SHA256: &str = "2.16.840.1.101.3.4.2.1";
const OID_RSA: &str = "1.2.840.113549.1.1.1";
const OID_SHA256_RSA: &str = "1.2.840.113549.1.1.11";
const OID_COMMON_NAME: &str = "2.5.4.3";
const OID_SUBJECT_KEY_IDENTIFIER: &str = "2.5.29.14";
const OID_TST_INFO: &str = "1.2.840.113549.1.9.16.1.4";

/// Encode a DER length
pub fn length(length: usize) -> Vec<u8> {
    if length < 0x80 {
        return vec![length as u8];
    }

    let bytes: Vec<u8> = length
        .to_be_bytes()
        .into_iter()
        .skip_while(|byte| *byte == 0)
        .collect();

    let mut encoded = vec![0x80 | bytes.len() as u8];
    encoded.extend(bytes);
    encoded
}

/// Tag, length, content
pub fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut encoded = vec![tag];
    encoded.extend(length(content.len()));
    encoded.extend_from_slice(content);
    encoded
}

pub fn sequence(elements: &[Vec<u8>]) -> Vec<u8> {
    tlv(0x30, &elements.concat())
}

pub fn set(elements: &[Vec<u8>]) -> Vec<u8> {
    tlv(0x31, &elements.concat())
}

/// `[number] EXPLICIT` wrapper around an encoded element
pub fn explicit(number: u8, inner: &[u8]) -> Vec<u8> {
    tlv(0xA0 | number, inner)
}

pub fn oid(dotted: &str) -> Vec<u8> {
    let arcs: Vec<u64> = dotted
        .split('.')
        .map(|arc| arc.parse().unwrap_or(0))
        .collect();

    let mut content = Vec::new();
    let first = arcs.first().copied().unwrap_or(0) * 40 + arcs.get(1).copied().unwrap_or(0);
    for arc in std::iter::once(first).chain(arcs.iter().skip(2).copied()) {
        let mut groups = vec![(arc & 0x7F) as u8];
        let mut rest = arc >> 7;
        while rest > 0 {
            groups.push(0x80 | (rest & 0x7F) as u8);
            rest >>= 7;
        }
        content.extend(groups.into_iter().rev());
    }

    tlv(0x06, &content)
}

/// INTEGER from big-endian content octets
pub fn integer(content: &[u8]) -> Vec<u8> {
    tlv(0x02, content)
}

/// INTEGER from a non-negative value, minimally encoded
pub fn small_integer(value: u64) -> Vec<u8> {
    let mut content: Vec<u8> = value
        .to_be_bytes()
        .into_iter()
        .skip_while(|byte| *byte == 0)
        .collect();

    if content.first().map_or(true, |byte| byte & 0x80 != 0) {
        content.insert(0, 0);
    }

    integer(&content)
}

pub fn boolean(value: bool) -> Vec<u8> {
    tlv(0x01, &[if value { 0xFF } else { 0x00 }])
}

pub fn null() -> Vec<u8> {
    vec![0x05, 0x00]
}

pub fn octet_string(content: &[u8]) -> Vec<u8> {
    tlv(0x04, content)
}

pub fn bit_string(content: &[u8]) -> Vec<u8> {
    let mut bits = vec![0x00];
    bits.extend_from_slice(content);
    tlv(0x03, &bits)
}

pub fn utf8_string(value: &str) -> Vec<u8> {
    tlv(0x0C, value.as_bytes())
}

pub fn utc_time(time: DateTime<Utc>) -> Vec<u8> {
    tlv(0x17, time.format("%y%m%d%H%M%SZ").to_string().as_bytes())
}

pub fn generalized_time(time: DateTime<Utc>) -> Vec<u8> {
    tlv(0x18, time.format("%Y%m%d%H%M%SZ").to_string().as_bytes())
}

/// UTCTime before 2050, GeneralizedTime after
pub fn time(time: DateTime<Utc>) -> Vec<u8> {
    if (1950..2050).contains(&time.year()) {
        utc_time(time)
    } else {
        generalized_time(time)
    }
}

/// A `Name` from `(oid, value)` pairs in wire order, one attribute per RDN
pub fn name(attributes: &[(&str, &str)]) -> Vec<u8> {
    let relative_names: Vec<Vec<u8>> = attributes
        .iter()
        .map(|(attribute, value)| set(&[sequence(&[oid(attribute), utf8_string(value)])]))
        .collect();

    sequence(&relative_names)
}

pub fn validity(not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Vec<u8> {
    sequence(&[time(not_before), time(not_after)])
}

/// AlgorithmIdentifier with NULL parameters
pub fn algorithm(algorithm: &str) -> Vec<u8> {
    sequence(&[oid(algorithm), null()])
}

/// Attribute with a single value
pub fn attribute(attribute: &str, value: &[u8]) -> Vec<u8> {
    sequence(&[oid(attribute), set(&[value.to_vec()])])
}

fn date(year: i32) -> DateTime<Utc> {
    DateTime::from_timestamp(0, 0)
        .and_then(|epoch| epoch.with_year(year))
        .unwrap_or_default()
}

/// Builds an X.509 v3 certificate with a dummy key and signature
pub struct CertificateBuilder {
    issuer: Vec<(String, String)>,
    subject: Vec<(String, String)>,
    serial: Vec<u8>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    subject_key_identifier: Option<Vec<u8>>,
    tbs_trailer: Vec<u8>,
}

impl Default for CertificateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CertificateBuilder {
    pub fn new() -> Self {
        CertificateBuilder {
            issuer: vec![(OID_COMMON_NAME.to_string(), "Test Root".to_string())],
            subject: vec![(OID_COMMON_NAME.to_string(), "Test Signer".to_string())],
            serial: vec![0x01],
            not_before: date(2020),
            not_after: date(2040),
            subject_key_identifier: None,
            tbs_trailer: Vec::new(),
        }
    }

    fn owned(attributes: &[(&str, &str)]) -> Vec<(String, String)> {
        attributes
            .iter()
            .map(|(oid, value)| (oid.to_string(), value.to_string()))
            .collect()
    }

    pub fn issuer(mut self, attributes: &[(&str, &str)]) -> Self {
        self.issuer = Self::owned(attributes);
        self
    }

    pub fn subject(mut self, attributes: &[(&str, &str)]) -> Self {
        self.subject = Self::owned(attributes);
        self
    }

    pub fn serial(mut self, serial: &[u8]) -> Self {
        self.serial = serial.to_vec();
        self
    }

    pub fn validity(mut self, not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }

    pub fn subject_key_identifier(mut self, identifier: &[u8]) -> Self {
        self.subject_key_identifier = Some(identifier.to_vec());
        self
    }

    /// Raw bytes appended to the end of the TBSCertificate content
    pub fn tbs_trailer(mut self, trailer: &[u8]) -> Self {
        self.tbs_trailer = trailer.to_vec();
        self
    }

    fn borrowed(attributes: &[(String, String)]) -> Vec<u8> {
        let pairs: Vec<(&str, &str)> = attributes
            .iter()
            .map(|(oid, value)| (oid.as_str(), value.as_str()))
            .collect();
        name(&pairs)
    }

    pub fn build(self) -> Vec<u8> {
        let public_key_info = sequence(&[algorithm(OID_RSA), bit_string(&[0x30, 0x00])]);

        let mut fields = vec![
            explicit(0, &small_integer(2)),
            integer(&self.serial),
            algorithm(OID_SHA256_RSA),
            Self::borrowed(&self.issuer),
            validity(self.not_before, self.not_after),
            Self::borrowed(&self.subject),
            public_key_info,
        ];

        if let Some(identifier) = &self.subject_key_identifier {
            let extension = sequence(&[
                oid(OID_SUBJECT_KEY_IDENTIFIER),
                octet_string(&octet_string(identifier)),
            ]);
            fields.push(explicit(3, &sequence(&[extension])));
        }

        fields.push(self.tbs_trailer);

        sequence(&[
            sequence(&fields),
            algorithm(OID_SHA256_RSA),
            bit_string(&[0x5A; 16]),
        ])
    }
}

/// Builds a SignerInfo with a dummy signature
pub struct SignerInfoBuilder {
    issuer: Vec<u8>,
    serial: Vec<u8>,
    key_identifier: Option<Vec<u8>>,
    signed_attributes: Vec<Vec<u8>>,
    unsigned_attributes: Vec<Vec<u8>>,
}

impl Default for SignerInfoBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SignerInfoBuilder {
    pub fn new() -> Self {
        SignerInfoBuilder {
            issuer: name(&[(OID_COMMON_NAME, "Test Root")]),
            serial: vec![0x01],
            key_identifier: None,
            signed_attributes: Vec::new(),
            unsigned_attributes: Vec::new(),
        }
    }

    pub fn issuer(mut self, attributes: &[(&str, &str)]) -> Self {
        self.issuer = name(attributes);
        self
    }

    pub fn serial(mut self, serial: &[u8]) -> Self {
        self.serial = serial.to_vec();
        self
    }

    pub fn key_identifier(mut self, identifier: &[u8]) -> Self {
        self.key_identifier = Some(identifier.to_vec());
        self
    }

    pub fn signed_attribute(mut self, attribute_oid: &str, value: &[u8]) -> Self {
        self.signed_attributes.push(attribute(attribute_oid, value));
        self
    }

    pub fn unsigned_attribute(mut self, attribute_oid: &str, value: &[u8]) -> Self {
        self.unsigned_attributes.push(attribute(attribute_oid, value));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let (version, sid) = match &self.key_identifier {
            Some(identifier) => (3, tlv(0x80, identifier)),
            None => (
                1,
                sequence(&[self.issuer.clone(), integer(&self.serial)]),
            ),
        };

        let mut fields = vec![small_integer(version), sid, algorithm(OID_SHA256)];
        if !self.signed_attributes.is_empty() {
            fields.push(tlv(0xA0, &self.signed_attributes.concat()));
        }
        fields.push(algorithm(OID_RSA));
        fields.push(octet_string(&[0x5A; 16]));
        if !self.unsigned_attributes.is_empty() {
            fields.push(tlv(0xA1, &self.unsigned_attributes.concat()));
        }

        sequence(&fields)
    }
}

/// Builds a SignedData, optionally wrapped in a ContentInfo
pub struct SignedDataBuilder {
    content_type: String,
    content: Option<Vec<u8>>,
    certificates: Option<Vec<Vec<u8>>>,
    crls: Option<Vec<u8>>,
    signers: Vec<Vec<u8>>,
}

impl Default for SignedDataBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SignedDataBuilder {
    pub fn new() -> Self {
        SignedDataBuilder {
            content_type: OID_DATA.to_string(),
            content: None,
            certificates: None,
            crls: None,
            signers: Vec::new(),
        }
    }

    /// Encapsulated content carried as an OCTET STRING
    pub fn content(mut self, content_type: &str, content: &[u8]) -> Self {
        self.content_type = content_type.to_string();
        self.content = Some(octet_string(content));
        self
    }

    /// Encapsulated content carried as an arbitrary encoded element
    pub fn encoded_content(mut self, content_type: &str, encoded: &[u8]) -> Self {
        self.content_type = content_type.to_string();
        self.content = Some(encoded.to_vec());
        self
    }

    /// A timestamp token: TSTInfo content
    pub fn tst_info(self, tst_info: &[u8]) -> Self {
        self.content(OID_TST_INFO, tst_info)
    }

    pub fn certificate(self, certificate: &[u8]) -> Self {
        self.raw_certificate(certificate)
    }

    /// Any encoded element placed into the certificates set
    pub fn raw_certificate(mut self, element: &[u8]) -> Self {
        self.certificates
            .get_or_insert_with(Vec::new)
            .push(element.to_vec());
        self
    }

    /// Complete encoding of the `[1]` revocation information
    pub fn crls(mut self, encoded: &[u8]) -> Self {
        self.crls = Some(encoded.to_vec());
        self
    }

    pub fn signer(mut self, signer: &[u8]) -> Self {
        self.signers.push(signer.to_vec());
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut encapsulated = vec![oid(&self.content_type)];
        if let Some(content) = &self.content {
            encapsulated.push(explicit(0, content));
        }

        let mut fields = vec![
            small_integer(1),
            set(&[algorithm(OID_SHA256)]),
            sequence(&encapsulated),
        ];
        if let Some(certificates) = &self.certificates {
            fields.push(tlv(0xA0, &certificates.concat()));
        }
        if let Some(crls) = &self.crls {
            fields.push(crls.clone());
        }
        fields.push(set(&self.signers));

        sequence(&fields)
    }

    pub fn build_content_info(self) -> Vec<u8> {
        sequence(&[oid(OID_SIGNED_DATA), explicit(0, &self.build())])
    }
}

/// Builds an RFC 3161 TSTInfo
pub struct TstInfoBuilder {
    version: u64,
    policy: String,
    hash_algorithm: String,
    hashed_message: Vec<u8>,
    gen_time: DateTime<Utc>,
    accuracy: Option<(Option<u64>, Option<u16>, Option<u16>)>,
    ordering: bool,
    nonce: Option<Vec<u8>>,
}

impl TstInfoBuilder {
    pub fn new(gen_time: DateTime<Utc>) -> Self {
        TstInfoBuilder {
            version: 1,
            policy: "1.3.6.1.4.1.601.10.3.1".to_string(),
            hash_algorithm: OID_SHA256.to_string(),
            hashed_message: vec![0x00; 32],
            gen_time,
            accuracy: None,
            ordering: false,
            nonce: None,
        }
    }

    pub fn version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn policy(mut self, policy: &str) -> Self {
        self.policy = policy.to_string();
        self
    }

    pub fn message_imprint(mut self, hash_algorithm: &str, hashed_message: &[u8]) -> Self {
        self.hash_algorithm = hash_algorithm.to_string();
        self.hashed_message = hashed_message.to_vec();
        self
    }

    pub fn accuracy(mut self, seconds: Option<u64>, millis: Option<u16>, micros: Option<u16>) -> Self {
        self.accuracy = Some((seconds, millis, micros));
        self
    }

    pub fn ordering(mut self, ordering: bool) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn nonce(mut self, nonce: &[u8]) -> Self {
        self.nonce = Some(nonce.to_vec());
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut fields = vec![
            small_integer(self.version),
            oid(&self.policy),
            sequence(&[algorithm(&self.hash_algorithm), octet_string(&self.hashed_message)]),
            small_integer(0x1234),
            generalized_time(self.gen_time),
        ];

        if let Some((seconds, millis, micros)) = self.accuracy {
            let mut accuracy = Vec::new();
            if let Some(seconds) = seconds {
                accuracy.push(small_integer(seconds));
            }
            if let Some(millis) = millis {
                accuracy.push(tlv(0x80, &small_integer(u64::from(millis))[2..]));
            }
            if let Some(micros) = micros {
                accuracy.push(tlv(0x81, &small_integer(u64::from(micros))[2..]));
            }
            fields.push(sequence(&accuracy));
        }

        if self.ordering {
            fields.push(boolean(true));
        }

        if let Some(nonce) = &self.nonce {
            fields.push(integer(nonce));
        }

        sequence(&fields)
    }
}
