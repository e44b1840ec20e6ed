//! CMS `SignerInfo` (RFC 5652 5.3) and signer identifiers.

use chrono::{DateTime, Utc};

use crate::{
    pkcs::{
        algorithm::AlgorithmIdentifier,
        asn1::{tag, AsnReader},
        attribute::{find_attribute, AttributeValue},
        certificate::Certificate,
        name::DistinguishedName,
        oid, AsnDecode,
    },
    Result,
};

/// `IssuerAndSerialNumber ::= SEQUENCE { issuer Name, serialNumber CertificateSerialNumber }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerAndSerialNumber {
    /// Issuer of the signing certificate
    pub issuer: DistinguishedName,
    /// Serial number of the signing certificate
    pub serial_number: Vec<u8>,
}

impl AsnDecode for IssuerAndSerialNumber {
    fn decode(reader: &mut AsnReader<'_>) -> Result<Self> {
        let mut sequence = reader.read_sequence()?;

        let issuer = DistinguishedName::decode(&mut sequence)?;
        let serial_number = sequence.read_integer()?.to_vec();

        sequence.ensure_empty()?;

        Ok(IssuerAndSerialNumber {
            issuer,
            serial_number,
        })
    }
}

/// Identifies the certificate of a signer.
///
/// ```text
/// SignerIdentifier ::= CHOICE {
///     issuerAndSerialNumber IssuerAndSerialNumber,
///     subjectKeyIdentifier  [0] SubjectKeyIdentifier }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerIdentifier {
    /// Matched by issuer name and serial number
    IssuerAndSerialNumber(IssuerAndSerialNumber),
    /// Matched by the subject key identifier extension
    SubjectKeyIdentifier(Vec<u8>),
}

impl SignerIdentifier {
    /// Returns `true` if `certificate` is the one this identifier points at.
    ///
    /// Certificates without a subject key identifier never match the key identifier form,
    /// and neither do certificates whose extension is damaged.
    #[must_use]
    pub fn matches(&self, certificate: &Certificate) -> bool {
        match self {
            SignerIdentifier::IssuerAndSerialNumber(id) => {
                certificate.issuer() == &id.issuer
                    && certificate.serial_number() == id.serial_number.as_slice()
            }
            SignerIdentifier::SubjectKeyIdentifier(key) => {
                matches!(certificate.subject_key_identifier(), Ok(Some(ref ski)) if ski == key)
            }
        }
    }
}

impl AsnDecode for SignerIdentifier {
    fn decode(reader: &mut AsnReader<'_>) -> Result<Self> {
        match reader.peek_tag()? {
            tag::SEQUENCE => Ok(SignerIdentifier::IssuerAndSerialNumber(
                IssuerAndSerialNumber::decode(reader)?,
            )),
            value if value == tag::context_primitive(0) => Ok(
                SignerIdentifier::SubjectKeyIdentifier(reader.read_tagged(value)?.to_vec()),
            ),
            value => Err(malformed_error!(
                "Unexpected SignerIdentifier tag 0x{:02x}",
                value
            )),
        }
    }
}

/// Per-signer information of a SignedData.
///
/// ```text
/// SignerInfo ::= SEQUENCE {
///     version            CMSVersion,
///     sid                SignerIdentifier,
///     digestAlgorithm    DigestAlgorithmIdentifier,
///     signedAttrs        [0] IMPLICIT SignedAttributes OPTIONAL,
///     signatureAlgorithm SignatureAlgorithmIdentifier,
///     signature          SignatureValue,
///     unsignedAttrs      [1] IMPLICIT UnsignedAttributes OPTIONAL }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerInfo {
    /// Syntax version, 1 for issuer/serial identifiers and 3 for key identifiers
    pub version: i64,
    /// Signing certificate identifier
    pub sid: SignerIdentifier,
    /// Digest algorithm over the content and signed attributes
    pub digest_algorithm: AlgorithmIdentifier,
    /// Signed attributes
    pub signed_attributes: Vec<AttributeValue>,
    /// Signature algorithm
    pub signature_algorithm: AlgorithmIdentifier,
    /// Signature octets
    pub signature: Vec<u8>,
    /// Unsigned attributes
    pub unsigned_attributes: Vec<AttributeValue>,
}

impl SignerInfo {
    /// The signed attribute of type `oid`.
    ///
    /// # Errors
    /// Returns [`crate::Error::DuplicateAttribute`] if the attribute occurs more than once.
    pub fn signed_attribute(&self, oid: &str) -> Result<Option<&AttributeValue>> {
        find_attribute(&self.signed_attributes, oid)
    }

    /// The unsigned attribute of type `oid`.
    ///
    /// # Errors
    /// Returns [`crate::Error::DuplicateAttribute`] if the attribute occurs more than once.
    pub fn unsigned_attribute(&self, oid: &str) -> Result<Option<&AttributeValue>> {
        find_attribute(&self.unsigned_attributes, oid)
    }

    /// The message digest signed attribute.
    ///
    /// # Errors
    /// Returns [`crate::Error::DuplicateAttribute`] or [`crate::Error::Malformed`].
    pub fn message_digest(&self) -> Result<Option<Vec<u8>>> {
        let Some(attribute) = self.signed_attribute(oid::MESSAGE_DIGEST)? else {
            return Ok(None);
        };

        let value = single_value(attribute)?;
        let mut reader = AsnReader::new(value);
        let digest = reader.read_octet_string()?.to_vec();
        reader.ensure_empty()?;

        Ok(Some(digest))
    }

    /// The signing time signed attribute.
    ///
    /// # Errors
    /// Returns [`crate::Error::DuplicateAttribute`] or [`crate::Error::Malformed`].
    pub fn signing_time(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(attribute) = self.signed_attribute(oid::SIGNING_TIME)? else {
            return Ok(None);
        };

        let value = single_value(attribute)?;
        let mut reader = AsnReader::new(value);
        let time = reader.read_time()?;
        reader.ensure_empty()?;

        Ok(Some(time))
    }

    /// Encoded RFC 3161 timestamp tokens attached as unsigned attributes.
    ///
    /// Both the CMS `id-aa-timeStampToken` attribute and the Authenticode countersignature
    /// attribute are searched.
    ///
    /// # Errors
    /// Returns [`crate::Error::DuplicateAttribute`] if either attribute occurs more than once.
    pub fn timestamp_tokens(&self) -> Result<Vec<&[u8]>> {
        let mut tokens = Vec::new();
        for attribute_oid in [oid::TIMESTAMP_TOKEN, oid::MS_RFC3161_COUNTERSIGNATURE] {
            if let Some(attribute) = self.unsigned_attribute(attribute_oid)? {
                tokens.extend(attribute.values.iter().map(Vec::as_slice));
            }
        }

        Ok(tokens)
    }
}

fn single_value(attribute: &AttributeValue) -> Result<&[u8]> {
    match attribute.values.as_slice() {
        [value] => Ok(value),
        values => Err(malformed_error!(
            "Attribute {} has {} values, expected exactly one",
            attribute.oid,
            values.len()
        )),
    }
}

fn read_attributes(reader: &mut AsnReader<'_>, number: u8) -> Result<Vec<AttributeValue>> {
    Ok(reader
        .read_optional(tag::context_constructed(number), |attributes| {
            attributes
                .read_set_of_tagged(tag::context_constructed(number))?
                .read_all(AttributeValue::decode)
        })?
        .unwrap_or_default())
}

impl AsnDecode for SignerInfo {
    fn decode(reader: &mut AsnReader<'_>) -> Result<Self> {
        let mut sequence = reader.read_sequence()?;

        let version = sequence.read_small_integer()?;
        let sid = SignerIdentifier::decode(&mut sequence)?;
        let digest_algorithm = AlgorithmIdentifier::decode(&mut sequence)?;
        let signed_attributes = read_attributes(&mut sequence, 0)?;
        let signature_algorithm = AlgorithmIdentifier::decode(&mut sequence)?;
        let signature = sequence.read_octet_string()?.to_vec();
        let unsigned_attributes = read_attributes(&mut sequence, 1)?;

        sequence.ensure_empty()?;

        Ok(SignerInfo {
            version,
            sid,
            digest_algorithm,
            signed_attributes,
            signature_algorithm,
            signature,
            unsigned_attributes,
        })
    }
}
