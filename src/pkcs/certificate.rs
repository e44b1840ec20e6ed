//! X.509 v3 certificates (RFC 5280).
//!
//! [`Certificate`] keeps its complete encoding next to the decoded `TBSCertificate`, so the
//! SHA-1 thumbprint and the raw validity remain available. Public keys and signature values are
//! kept opaque; no signature is verified.
//!
//! # Reference
//! - RFC 5280 4.1 (certificate fields) and 4.2.1.2 (subject key identifier)

use chrono::{DateTime, Utc};
use sha1::{Digest, Sha1};

use crate::{
    pkcs::{
        algorithm::AlgorithmIdentifier,
        asn1::{tag, AsnReader},
        name::DistinguishedName,
        oid, AsnDecode,
    },
    Error, Result,
};

/// Validity period of a certificate.
///
/// ```text
/// Validity ::= SEQUENCE {
///     notBefore  Time,
///     notAfter   Time }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validity {
    /// Complete encoding of the `Validity` SEQUENCE
    pub raw: Vec<u8>,
    /// Start of the validity period
    pub not_before: DateTime<Utc>,
    /// End of the validity period
    pub not_after: DateTime<Utc>,
}

impl Validity {
    /// Returns `true` if `[start, end]` lies strictly inside the validity period
    #[must_use]
    pub fn strictly_contains(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.not_before < start && end < self.not_after
    }
}

impl AsnDecode for Validity {
    fn decode(reader: &mut AsnReader<'_>) -> Result<Self> {
        let raw = reader.read_encoded_value()?;
        let mut sequence = AsnReader::new(raw).read_sequence()?;

        let not_before = sequence.read_time()?;
        let not_after = sequence.read_time()?;

        sequence.ensure_empty()?;

        Ok(Validity {
            raw: raw.to_vec(),
            not_before,
            not_after,
        })
    }
}

/// A certificate extension.
///
/// ```text
/// Extension ::= SEQUENCE {
///     extnID      OBJECT IDENTIFIER,
///     critical    BOOLEAN DEFAULT FALSE,
///     extnValue   OCTET STRING }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TbsCertificateExtension {
    /// Dotted extension OID
    pub oid: String,
    /// Criticality flag
    pub critical: bool,
    /// Content of `extnValue`, itself DER encoded
    pub value: Vec<u8>,
}

impl TbsCertificateExtension {
    /// The key identifier carried by a subject key identifier extension.
    ///
    /// # Errors
    /// Returns [`crate::Error::ContractViolation`] when called on any other extension, and
    /// [`crate::Error::Malformed`] if the value is not an OCTET STRING.
    pub fn subject_key_identifier(&self) -> Result<Vec<u8>> {
        if self.oid != oid::SUBJECT_KEY_IDENTIFIER {
            return Err(Error::ContractViolation(format!(
                "extension {} is not a subject key identifier",
                self.oid
            )));
        }

        let mut reader = AsnReader::new(&self.value);
        let identifier = reader.read_octet_string()?;
        reader.ensure_empty()?;

        Ok(identifier.to_vec())
    }
}

impl AsnDecode for TbsCertificateExtension {
    fn decode(reader: &mut AsnReader<'_>) -> Result<Self> {
        let mut sequence = reader.read_sequence()?;

        let oid = sequence.read_object_identifier()?;
        let critical = sequence
            .read_optional(tag::BOOLEAN, AsnReader::read_boolean)?
            .unwrap_or(false);
        let value = sequence.read_octet_string()?.to_vec();

        sequence.ensure_empty()?;

        Ok(TbsCertificateExtension {
            oid,
            critical,
            value,
        })
    }
}

/// The signed portion of a certificate.
///
/// ```text
/// TBSCertificate ::= SEQUENCE {
///     version          [0] EXPLICIT Version DEFAULT v1,
///     serialNumber         CertificateSerialNumber,
///     signature            AlgorithmIdentifier,
///     issuer               Name,
///     validity             Validity,
///     subject              Name,
///     subjectPublicKeyInfo SubjectPublicKeyInfo,
///     issuerUniqueID   [1] IMPLICIT UniqueIdentifier OPTIONAL,
///     subjectUniqueID  [2] IMPLICIT UniqueIdentifier OPTIONAL,
///     extensions       [3] EXPLICIT Extensions OPTIONAL }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TbsCertificate {
    /// Encoded version: 0 for v1, 2 for v3
    pub version: u8,
    /// Big-endian two's complement serial number
    pub serial_number: Vec<u8>,
    /// Signature algorithm, repeated inside the signed portion
    pub signature_algorithm: AlgorithmIdentifier,
    /// Issuer name
    pub issuer: DistinguishedName,
    /// Validity period
    pub validity: Validity,
    /// Subject name
    pub subject: DistinguishedName,
    /// Complete encoding of the SubjectPublicKeyInfo
    pub subject_public_key_info: Vec<u8>,
    /// Issuer unique identifier bits
    pub issuer_unique_id: Option<Vec<u8>>,
    /// Subject unique identifier bits
    pub subject_unique_id: Option<Vec<u8>>,
    /// Extensions, empty if absent
    pub extensions: Vec<TbsCertificateExtension>,
}

impl AsnDecode for TbsCertificate {
    fn decode(reader: &mut AsnReader<'_>) -> Result<Self> {
        let mut sequence = reader.read_sequence()?;

        let version = sequence
            .read_optional(tag::context_constructed(0), |explicit| {
                let mut version = explicit.read_context_explicit(0)?;
                let value = version.read_small_integer()?;
                version.ensure_empty()?;
                u8::try_from(value)
                    .ok()
                    .filter(|version| *version <= 2)
                    .ok_or_else(|| malformed_error!("Invalid certificate version {}", value))
            })?
            .unwrap_or(0);

        let serial_number = sequence.read_integer()?.to_vec();
        let signature_algorithm = AlgorithmIdentifier::decode(&mut sequence)?;
        let issuer = DistinguishedName::decode(&mut sequence)?;
        let validity = Validity::decode(&mut sequence)?;
        let subject = DistinguishedName::decode(&mut sequence)?;
        let subject_public_key_info = sequence.read_encoded_value()?.to_vec();

        let issuer_unique_id = sequence.read_optional(tag::context_primitive(1), |unique| {
            Ok(unique.read_tagged(tag::context_primitive(1))?.to_vec())
        })?;
        let subject_unique_id = sequence.read_optional(tag::context_primitive(2), |unique| {
            Ok(unique.read_tagged(tag::context_primitive(2))?.to_vec())
        })?;

        let extensions = sequence
            .read_optional(tag::context_constructed(3), |explicit| {
                let mut wrapper = explicit.read_context_explicit(3)?;
                let extensions = wrapper.read_sequence_of(TbsCertificateExtension::decode)?;
                wrapper.ensure_empty()?;
                Ok(extensions)
            })?
            .unwrap_or_default();

        sequence.ensure_empty()?;

        Ok(TbsCertificate {
            version,
            serial_number,
            signature_algorithm,
            issuer,
            validity,
            subject,
            subject_public_key_info,
            issuer_unique_id,
            subject_unique_id,
            extensions,
        })
    }
}

/// An X.509 certificate.
///
/// ```text
/// Certificate ::= SEQUENCE {
///     tbsCertificate       TBSCertificate,
///     signatureAlgorithm   AlgorithmIdentifier,
///     signatureValue       BIT STRING }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The signed portion
    pub tbs_certificate: TbsCertificate,
    /// Algorithm used by the issuer to sign
    pub signature_algorithm: AlgorithmIdentifier,
    /// Signature bits
    pub signature_value: Vec<u8>,
    /// Complete DER encoding of the certificate
    pub encoded: Vec<u8>,
}

impl Certificate {
    /// Subject name
    #[must_use]
    pub fn subject(&self) -> &DistinguishedName {
        &self.tbs_certificate.subject
    }

    /// Issuer name
    #[must_use]
    pub fn issuer(&self) -> &DistinguishedName {
        &self.tbs_certificate.issuer
    }

    /// Serial number bytes
    #[must_use]
    pub fn serial_number(&self) -> &[u8] {
        &self.tbs_certificate.serial_number
    }

    /// Start of the validity period
    #[must_use]
    pub fn not_before(&self) -> DateTime<Utc> {
        self.tbs_certificate.validity.not_before
    }

    /// End of the validity period
    #[must_use]
    pub fn not_after(&self) -> DateTime<Utc> {
        self.tbs_certificate.validity.not_after
    }

    /// First extension with type `oid`
    #[must_use]
    pub fn extension(&self, oid: &str) -> Option<&TbsCertificateExtension> {
        self.tbs_certificate
            .extensions
            .iter()
            .find(|extension| extension.oid == oid)
    }

    /// The subject key identifier, if the certificate carries the extension.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the extension value is damaged.
    pub fn subject_key_identifier(&self) -> Result<Option<Vec<u8>>> {
        self.extension(oid::SUBJECT_KEY_IDENTIFIER)
            .map(TbsCertificateExtension::subject_key_identifier)
            .transpose()
    }

    /// SHA-1 thumbprint of the encoded certificate, as shown by Windows certificate tooling
    #[must_use]
    pub fn thumbprint(&self) -> [u8; 20] {
        Sha1::digest(&self.encoded).into()
    }
}

impl AsnDecode for Certificate {
    fn decode(reader: &mut AsnReader<'_>) -> Result<Self> {
        let encoded = reader.read_encoded_value()?;
        let mut sequence = AsnReader::new(encoded).read_sequence()?;

        let tbs_certificate = TbsCertificate::decode(&mut sequence)?;
        let signature_algorithm = AlgorithmIdentifier::decode(&mut sequence)?;
        let (_, signature_value) = sequence.read_bit_string()?;

        sequence.ensure_empty()?;

        Ok(Certificate {
            tbs_certificate,
            signature_algorithm,
            signature_value: signature_value.to_vec(),
            encoded: encoded.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::test::der::{self, CertificateBuilder};

    #[test]
    fn decode_v3_certificate() {
        let not_before = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let not_after = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        let encoded = CertificateBuilder::new()
            .subject(&[
                (oid::COUNTRY_NAME, "US"),
                (oid::ORGANIZATION_NAME, "Contoso"),
                (oid::COMMON_NAME, "Contoso Code Signing"),
            ])
            .serial(&[0x01, 0x7F])
            .validity(not_before, not_after)
            .subject_key_identifier(&[0xAA; 20])
            .build();

        let certificate = Certificate::from_der(&encoded).unwrap();

        assert_eq!(certificate.tbs_certificate.version, 2);
        assert_eq!(certificate.serial_number(), &[0x01, 0x7F]);
        assert_eq!(
            certificate.subject().to_string(),
            "CN=Contoso Code Signing, O=Contoso, C=US"
        );
        assert_eq!(certificate.not_before(), not_before);
        assert_eq!(certificate.not_after(), not_after);
        assert_eq!(
            certificate.subject_key_identifier().unwrap(),
            Some(vec![0xAA; 20])
        );
        assert_eq!(certificate.encoded, encoded);
        assert_eq!(certificate.thumbprint().len(), 20);
    }

    #[test]
    fn trailing_bytes_inside_tbs() {
        let encoded = CertificateBuilder::new().tbs_trailer(&[0x05, 0x00]).build();
        if Certificate::from_der(&encoded).is_ok() {
            panic!("This should not work!")
        }
    }

    #[test]
    fn trailing_bytes_after_certificate() {
        let mut encoded = CertificateBuilder::new().build();
        encoded.extend_from_slice(&[0x05, 0x00]);

        assert!(Certificate::from_der(&encoded).is_err());

        let mut reader = AsnReader::new(&encoded);
        assert!(Certificate::decode(&mut reader).is_ok());
        reader.read_null().unwrap();
    }

    #[test]
    fn subject_key_identifier_contract() {
        let extension = TbsCertificateExtension {
            oid: "2.5.29.19".to_string(),
            critical: true,
            value: vec![0x30, 0x00],
        };

        assert!(matches!(
            extension.subject_key_identifier(),
            Err(Error::ContractViolation(_))
        ));

        let extension = TbsCertificateExtension {
            oid: oid::SUBJECT_KEY_IDENTIFIER.to_string(),
            critical: false,
            value: der::octet_string(&[0x01, 0x02]),
        };
        assert_eq!(extension.subject_key_identifier().unwrap(), vec![0x01, 0x02]);
    }

    #[test]
    fn extension_critical_flag() {
        let encoded = der::sequence(&[
            der::oid("2.5.29.19"),
            der::boolean(true),
            der::octet_string(&[0x30, 0x00]),
        ]);

        let extension = TbsCertificateExtension::from_der(&encoded).unwrap();
        assert!(extension.critical);
        assert_eq!(extension.value, vec![0x30, 0x00]);
    }

    #[test]
    fn validity_window() {
        let validity = Validity::from_der(&der::validity(
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        ))
        .unwrap();

        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(validity.strictly_contains(start, start));
        assert!(!validity.strictly_contains(validity.not_before, start));
    }
}
