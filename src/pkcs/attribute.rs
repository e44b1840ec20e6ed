//! CMS attributes and the lookup of a single attribute by OID.

use crate::{
    pkcs::{asn1::AsnReader, AsnDecode},
    Error, Result,
};

/// A signed or unsigned attribute of a `SignerInfo`.
///
/// ```text
/// Attribute ::= SEQUENCE {
///     attrType    OBJECT IDENTIFIER,
///     attrValues  SET OF AttributeValue }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValue {
    /// Dotted attribute type OID
    pub oid: String,
    /// Complete encoding of every value in the set
    pub values: Vec<Vec<u8>>,
}

impl AsnDecode for AttributeValue {
    fn decode(reader: &mut AsnReader<'_>) -> Result<Self> {
        let mut sequence = reader.read_sequence()?;

        let oid = sequence.read_object_identifier()?;
        let values = sequence.read_set_of_with(|value| Ok(value.read_encoded_value()?.to_vec()))?;

        sequence.ensure_empty()?;

        Ok(AttributeValue { oid, values })
    }
}

/// Find the single attribute with type `oid`.
///
/// # Errors
/// Returns [`crate::Error::DuplicateAttribute`] if more than one attribute has the type.
pub fn find_attribute<'a>(
    attributes: &'a [AttributeValue],
    oid: &str,
) -> Result<Option<&'a AttributeValue>> {
    let mut matches = attributes.iter().filter(|attribute| attribute.oid == oid);

    let first = matches.next();
    if matches.next().is_some() {
        return Err(Error::DuplicateAttribute(oid.to_string()));
    }

    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkcs::oid;

    #[rustfmt::skip]
    const CONTENT_TYPE_ATTRIBUTE: [u8; 24] = [
        0x30, 0x16,
            0x06, 0x09, 0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x09, 0x03,
            0x31, 0x09,
                0x06, 0x07, 0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01,
    ];

    #[test]
    fn decode() {
        let attribute = AttributeValue::from_der(&CONTENT_TYPE_ATTRIBUTE).unwrap();

        assert_eq!(attribute.oid, oid::CONTENT_TYPE);
        assert_eq!(attribute.values.len(), 1);
        assert_eq!(attribute.values[0][0], 0x06);
    }

    #[test]
    fn duplicates() {
        let attribute = AttributeValue::from_der(&CONTENT_TYPE_ATTRIBUTE).unwrap();
        let attributes = vec![attribute.clone()];

        assert!(find_attribute(&attributes, oid::CONTENT_TYPE).unwrap().is_some());
        assert!(find_attribute(&attributes, oid::MESSAGE_DIGEST).unwrap().is_none());

        let attributes = vec![attribute.clone(), attribute];
        assert!(matches!(
            find_attribute(&attributes, oid::CONTENT_TYPE),
            Err(Error::DuplicateAttribute(_))
        ));
    }
}
