//! `ContentInfo` and `EncapsulatedContentInfo` (RFC 5652 3 and 5.2).

use crate::{
    pkcs::{
        asn1::{tag, AsnReader},
        AsnDecode,
    },
    Result,
};

/// The outermost PKCS#7 wrapper.
///
/// ```text
/// ContentInfo ::= SEQUENCE {
///     contentType  ContentType,
///     content      [0] EXPLICIT ANY DEFINED BY contentType OPTIONAL }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentInfo {
    /// Dotted content type OID
    pub content_type: String,
    /// Complete encoding of the explicitly tagged content, if present
    pub content: Option<Vec<u8>>,
}

impl AsnDecode for ContentInfo {
    fn decode(reader: &mut AsnReader<'_>) -> Result<Self> {
        let mut sequence = reader.read_sequence()?;

        let content_type = sequence.read_object_identifier()?;
        let content = sequence.read_optional(tag::context_constructed(0), |explicit| {
            let mut wrapper = explicit.read_context_explicit(0)?;
            let content = wrapper.read_encoded_value()?.to_vec();
            wrapper.ensure_empty()?;
            Ok(content)
        })?;

        sequence.ensure_empty()?;

        Ok(ContentInfo {
            content_type,
            content,
        })
    }
}

/// The signed content of a SignedData.
///
/// ```text
/// EncapsulatedContentInfo ::= SEQUENCE {
///     eContentType  ContentType,
///     eContent      [0] EXPLICIT OCTET STRING OPTIONAL }
/// ```
///
/// Authenticode places `SpcIndirectDataContent` here as a SEQUENCE rather than an OCTET
/// STRING. In that case `content` holds the complete encoding of the SEQUENCE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncapsulatedContentInfo {
    /// Dotted content type OID
    pub content_type: String,
    /// The content octets, or the encoded value for non OCTET STRING content
    pub content: Option<Vec<u8>>,
}

impl AsnDecode for EncapsulatedContentInfo {
    fn decode(reader: &mut AsnReader<'_>) -> Result<Self> {
        let mut sequence = reader.read_sequence()?;

        let content_type = sequence.read_object_identifier()?;
        let content = sequence.read_optional(tag::context_constructed(0), |explicit| {
            let mut wrapper = explicit.read_context_explicit(0)?;
            let content = if wrapper.peek_tag()? == tag::OCTET_STRING {
                wrapper.read_octet_string()?.to_vec()
            } else {
                wrapper.read_encoded_value()?.to_vec()
            };
            wrapper.ensure_empty()?;
            Ok(content)
        })?;

        sequence.ensure_empty()?;

        Ok(EncapsulatedContentInfo {
            content_type,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pkcs::oid, test::der};

    #[test]
    fn content_info() {
        let inner = der::sequence(&[der::integer(&[0x01])]);
        let data = der::sequence(&[
            der::oid(oid::SIGNED_DATA),
            der::explicit(0, &inner),
        ]);

        let info = ContentInfo::from_der(&data).unwrap();
        assert_eq!(info.content_type, oid::SIGNED_DATA);
        assert_eq!(info.content, Some(inner));
    }

    #[test]
    fn content_info_without_content() {
        let data = der::sequence(&[der::oid(oid::DATA)]);

        let info = ContentInfo::from_der(&data).unwrap();
        assert!(info.content.is_none());
    }

    #[test]
    fn encapsulated_octet_string() {
        let data = der::sequence(&[
            der::oid(oid::TST_INFO),
            der::explicit(0, &der::octet_string(&[0xDE, 0xAD])),
        ]);

        let info = EncapsulatedContentInfo::from_der(&data).unwrap();
        assert_eq!(info.content_type, oid::TST_INFO);
        assert_eq!(info.content, Some(vec![0xDE, 0xAD]));
    }

    #[test]
    fn encapsulated_sequence() {
        let indirect = der::sequence(&[der::null()]);
        let data = der::sequence(&[
            der::oid(oid::SPC_INDIRECT_DATA),
            der::explicit(0, &indirect),
        ]);

        let info = EncapsulatedContentInfo::from_der(&data).unwrap();
        assert_eq!(info.content, Some(indirect));
    }

    #[test]
    fn trailing_inside_explicit() {
        let mut wrapped = der::octet_string(&[0x01]);
        wrapped.extend_from_slice(&der::null());
        let data = der::sequence(&[der::oid(oid::DATA), der::explicit(0, &wrapped)]);

        if EncapsulatedContentInfo::from_der(&data).is_ok() {
            panic!("This should not work!")
        }
    }
}
