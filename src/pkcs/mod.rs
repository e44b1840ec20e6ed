//! DER decoders for the signature structures found in symbol packages and signed binaries.
//!
//! The module is layered bottom-up:
//!
//! - [`asn1`] - a forward-only DER reader ([`AsnReader`])
//! - [`AlgorithmIdentifier`], [`AttributeValue`], [`DistinguishedName`] - shared building blocks
//! - [`Certificate`] - X.509 certificates
//! - [`ContentInfo`], [`SignedData`], [`SignerInfo`] - PKCS#7 / CMS containers
//! - [`Rfc3161TstInfo`] - RFC 3161 timestamp token content
//!
//! Every decoded structure implements [`AsnDecode`]. Decoders are strict: each constructed
//! element must be consumed completely, and [`AsnDecode::from_der`] rejects trailing bytes
//! after the top-level element.
//!
//! # Examples
//!
//! ```rust
//! use symscope::pkcs::{AlgorithmIdentifier, AsnDecode};
//!
//! #[rustfmt::skip]
//! let data = [
//!     0x30, 0x0D,
//!         0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01,
//!         0x05, 0x00,
//! ];
//!
//! let algorithm = AlgorithmIdentifier::from_der(&data)?;
//! assert_eq!(algorithm.digest_name(), Some("SHA256"));
//! # Ok::<(), symscope::Error>(())
//! ```

pub mod asn1;
pub mod oid;

mod algorithm;
mod attribute;
mod certificate;
mod content;
mod name;
mod signeddata;
mod signerinfo;
mod tstinfo;

pub use algorithm::AlgorithmIdentifier;
pub use asn1::AsnReader;
pub use attribute::{find_attribute, AttributeValue};
pub use certificate::{Certificate, TbsCertificate, TbsCertificateExtension, Validity};
pub use content::{ContentInfo, EncapsulatedContentInfo};
pub use name::{DistinguishedName, NameAttribute};
pub use signeddata::{CertificateChoices, SignedData};
pub use signerinfo::{IssuerAndSerialNumber, SignerIdentifier, SignerInfo};
pub use tstinfo::{Accuracy, MessageImprint, Rfc3161TstInfo};

use crate::Result;

/// A structure that can be decoded from DER.
pub trait AsnDecode: Sized {
    /// Decode one element from `reader`, leaving it positioned after the element.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for damaged or unexpected input.
    fn decode(reader: &mut AsnReader<'_>) -> Result<Self>;

    /// Decode `data`, which must hold exactly one element.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for damaged input or trailing bytes.
    fn from_der(data: &[u8]) -> Result<Self> {
        let mut reader = AsnReader::new(data);
        let value = Self::decode(&mut reader)?;
        reader.ensure_empty()?;

        Ok(value)
    }
}
