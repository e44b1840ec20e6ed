//! CMS `SignedData` (RFC 5652 5.1) and the certificates bundled with it.
//!
//! Only X.509 certificates are decoded; the other `CertificateChoices` are rejected.

use crate::{
    pkcs::{
        algorithm::AlgorithmIdentifier,
        asn1::{tag, AsnReader},
        certificate::Certificate,
        content::{ContentInfo, EncapsulatedContentInfo},
        oid,
        signerinfo::SignerInfo,
        AsnDecode,
    },
    Error, Result,
};

/// One element of the SignedData `certificates` set.
///
/// ```text
/// CertificateChoices ::= CHOICE {
///     certificate          Certificate,
///     extendedCertificate  [0] IMPLICIT ExtendedCertificate,
///     v1AttrCert           [1] IMPLICIT AttributeCertificateV1,
///     v2AttrCert           [2] IMPLICIT AttributeCertificateV2,
///     other                [3] IMPLICIT OtherCertificateFormat }
/// ```
///
/// Only plain X.509 certificates are supported. The other alternatives are rejected with
/// [`crate::Error::UnsupportedCertificateChoice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateChoices {
    /// An X.509 certificate
    Certificate(Certificate),
}

impl CertificateChoices {
    /// The wrapped certificate
    #[must_use]
    pub fn certificate(&self) -> &Certificate {
        match self {
            CertificateChoices::Certificate(certificate) => certificate,
        }
    }
}

impl AsnDecode for CertificateChoices {
    fn decode(reader: &mut AsnReader<'_>) -> Result<Self> {
        match reader.peek_tag()? {
            tag::SEQUENCE => Ok(CertificateChoices::Certificate(Certificate::decode(reader)?)),
            choice @ 0xA0..=0xA3 => Err(Error::UnsupportedCertificateChoice(choice)),
            other => Err(malformed_error!(
                "Unexpected CertificateChoices tag 0x{:02x}",
                other
            )),
        }
    }
}

/// A PKCS#7 / CMS SignedData.
///
/// ```text
/// SignedData ::= SEQUENCE {
///     version           CMSVersion,
///     digestAlgorithms  SET OF DigestAlgorithmIdentifier,
///     encapContentInfo  EncapsulatedContentInfo,
///     certificates      [0] IMPLICIT CertificateSet OPTIONAL,
///     crls              [1] IMPLICIT RevocationInfoChoices OPTIONAL,
///     signerInfos       SET OF SignerInfo }
/// ```
///
/// # Examples
///
/// ```rust,no_run
/// use symscope::pkcs::SignedData;
///
/// let data = std::fs::read(".signature.p7s")?;
/// let signed = SignedData::from_content_info(&data)?;
/// for signer in &signed.signer_infos {
///     if let Some(certificate) = signed.signer_certificate(signer) {
///         println!("{}", certificate.subject());
///     }
/// }
/// # Ok::<(), symscope::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedData {
    /// Syntax version
    pub version: i64,
    /// Digest algorithms used by the signers
    pub digest_algorithms: Vec<AlgorithmIdentifier>,
    /// The signed content
    pub encap_content_info: EncapsulatedContentInfo,
    /// Certificates bundled with the signature, `None` if the field is absent
    pub certificates: Option<Vec<CertificateChoices>>,
    /// Encoded revocation entries (CRLs or other choices), `None` if the field is absent
    pub crls: Option<Vec<Vec<u8>>>,
    /// The signers
    pub signer_infos: Vec<SignerInfo>,
}

impl SignedData {
    /// Decode a `ContentInfo` wrapping a SignedData, as found in `.p7s` files, Authenticode
    /// certificate table entries and RFC 3161 tokens.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the content type is not SignedData, the content
    /// is missing, or any part fails to decode.
    pub fn from_content_info(data: &[u8]) -> Result<Self> {
        let info = ContentInfo::from_der(data)?;
        if info.content_type != oid::SIGNED_DATA {
            return Err(malformed_error!(
                "ContentInfo type {} is not SignedData",
                info.content_type
            ));
        }

        match info.content {
            Some(content) => SignedData::from_der(&content),
            None => Err(malformed_error!("ContentInfo without SignedData content")),
        }
    }

    /// Iterate over the bundled certificates
    pub fn iter_certificates(&self) -> impl Iterator<Item = &Certificate> {
        self.certificates
            .iter()
            .flatten()
            .map(CertificateChoices::certificate)
    }

    /// The bundled certificate that `signer` identifies
    #[must_use]
    pub fn signer_certificate(&self, signer: &SignerInfo) -> Option<&Certificate> {
        self.iter_certificates()
            .find(|certificate| signer.sid.matches(certificate))
    }
}

impl AsnDecode for SignedData {
    fn decode(reader: &mut AsnReader<'_>) -> Result<Self> {
        let mut sequence = reader.read_sequence()?;

        let version = sequence.read_small_integer()?;
        let digest_algorithms = sequence.read_set_of_with(AlgorithmIdentifier::decode)?;
        let encap_content_info = EncapsulatedContentInfo::decode(&mut sequence)?;

        let certificates = sequence.read_optional(tag::context_constructed(0), |set| {
            set.read_set_of_tagged(tag::context_constructed(0))?
                .read_all(CertificateChoices::decode)
        })?;
        let crls = sequence.read_optional(tag::context_constructed(1), |set| {
            set.read_set_of_tagged(tag::context_constructed(1))?
                .read_all(|entry| Ok(entry.read_encoded_value()?.to_vec()))
        })?;

        let signer_infos = sequence.read_set_of_with(SignerInfo::decode)?;

        sequence.ensure_empty()?;

        Ok(SignedData {
            version,
            digest_algorithms,
            encap_content_info,
            certificates,
            crls,
            signer_infos,
        })
    }
}
