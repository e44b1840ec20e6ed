//! Object identifiers used by the PKCS#7, X.509 and RFC 3161 decoders.

/// `id-signedData`, the content type of a PKCS#7 SignedData
pub const SIGNED_DATA: &str = "1.2.840.113549.1.7.2";
/// `id-data`
pub const DATA: &str = "1.2.840.113549.1.7.1";
/// `id-contentType` signed attribute
pub const CONTENT_TYPE: &str = "1.2.840.113549.1.9.3";
/// `id-messageDigest` signed attribute
pub const MESSAGE_DIGEST: &str = "1.2.840.113549.1.9.4";
/// `id-signingTime` signed attribute
pub const SIGNING_TIME: &str = "1.2.840.113549.1.9.5";
/// `id-aa-timeStampToken`, the unsigned attribute carrying an RFC 3161 token
pub const TIMESTAMP_TOKEN: &str = "1.2.840.113549.1.9.16.2.14";
/// `id-ct-TSTInfo`, the encapsulated content type of an RFC 3161 token
pub const TST_INFO: &str = "1.2.840.113549.1.9.16.1.4";
/// `id-aa-signingCertificateV2`
pub const SIGNING_CERTIFICATE_V2: &str = "1.2.840.113549.1.9.16.2.47";
/// Microsoft `SPC_RFC3161_OBJID`, used by Authenticode for RFC 3161 countersignatures
pub const MS_RFC3161_COUNTERSIGNATURE: &str = "1.3.6.1.4.1.311.3.3.1";
/// Microsoft `SPC_INDIRECT_DATA_OBJID`, the content type of Authenticode SignedData
pub const SPC_INDIRECT_DATA: &str = "1.3.6.1.4.1.311.2.1.4";
/// NuGet `commitment-type-indication` signed attribute
pub const COMMITMENT_TYPE_INDICATION: &str = "1.2.840.113549.1.9.16.2.16";
/// Author signature commitment type
pub const COMMITMENT_TYPE_AUTHOR: &str = "1.2.840.113549.1.9.16.6.1";
/// Repository signature commitment type
pub const COMMITMENT_TYPE_REPOSITORY: &str = "1.2.840.113549.1.9.16.6.2";
/// Baseline time-stamp policy of ETSI EN 319 422
pub const BASELINE_TIMESTAMP_POLICY: &str = "0.4.0.2023.1.1";
/// `id-ce-subjectKeyIdentifier`
pub const SUBJECT_KEY_IDENTIFIER: &str = "2.5.29.14";

/// `id-sha1`
pub const SHA1: &str = "1.3.14.3.2.26";
/// `id-sha256`
pub const SHA256: &str = "2.16.840.1.101.3.4.2.1";
/// `id-sha384`
pub const SHA384: &str = "2.16.840.1.101.3.4.2.2";
/// `id-sha512`
pub const SHA512: &str = "2.16.840.1.101.3.4.2.3";

/// `id-at-commonName`
pub const COMMON_NAME: &str = "2.5.4.3";
/// `id-at-surname`
pub const SURNAME: &str = "2.5.4.4";
/// `id-at-serialNumber`
pub const SERIAL_NUMBER: &str = "2.5.4.5";
/// `id-at-countryName`
pub const COUNTRY_NAME: &str = "2.5.4.6";
/// `id-at-localityName`
pub const LOCALITY_NAME: &str = "2.5.4.7";
/// `id-at-stateOrProvinceName`
pub const STATE_OR_PROVINCE_NAME: &str = "2.5.4.8";
/// `id-at-streetAddress`
pub const STREET_ADDRESS: &str = "2.5.4.9";
/// `id-at-organizationName`
pub const ORGANIZATION_NAME: &str = "2.5.4.10";
/// `id-at-organizationalUnitName`
pub const ORGANIZATIONAL_UNIT_NAME: &str = "2.5.4.11";
/// PKCS#9 `emailAddress`
pub const EMAIL_ADDRESS: &str = "1.2.840.113549.1.9.1";
