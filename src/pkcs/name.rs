//! X.501 names and their LDAP-style display form.

use std::fmt;

use crate::{
    pkcs::{
        asn1::{is_character_string, AsnReader},
        oid, AsnDecode,
    },
    utils::to_hex_upper,
    Result,
};

/// One `AttributeTypeAndValue` of a relative distinguished name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameAttribute {
    /// Dotted attribute type OID
    pub oid: String,
    /// The value. Values that are not character strings are rendered as `#` followed by the
    /// hex encoding of their DER bytes.
    pub value: String,
}

impl NameAttribute {
    /// The short alias of the attribute type, or the dotted OID for unknown types
    #[must_use]
    pub fn key(&self) -> &str {
        match self.oid.as_str() {
            oid::COMMON_NAME => "CN",
            oid::SURNAME => "SN",
            oid::SERIAL_NUMBER => "SERIALNUMBER",
            oid::COUNTRY_NAME => "C",
            oid::LOCALITY_NAME => "L",
            oid::STATE_OR_PROVINCE_NAME => "S",
            oid::STREET_ADDRESS => "STREET",
            oid::ORGANIZATION_NAME => "O",
            oid::ORGANIZATIONAL_UNIT_NAME => "OU",
            oid::EMAIL_ADDRESS => "E",
            other => other,
        }
    }
}

impl fmt::Display for NameAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let needs_quotes = self.value.is_empty()
            || self.value.starts_with(' ')
            || self.value.ends_with(' ')
            || self
                .value
                .chars()
                .any(|c| matches!(c, ',' | '+' | '=' | '"' | '\n' | '<' | '>' | '#' | ';'));

        if needs_quotes {
            write!(f, "{}=\"{}\"", self.key(), self.value.replace('"', "\"\""))
        } else {
            write!(f, "{}={}", self.key(), self.value)
        }
    }
}

/// An X.501 `Name`, kept in display order.
///
/// ```text
/// Name ::= CHOICE { rdnSequence RDNSequence }
/// RDNSequence ::= SEQUENCE OF RelativeDistinguishedName
/// RelativeDistinguishedName ::= SET SIZE (1..MAX) OF AttributeTypeAndValue
/// AttributeTypeAndValue ::= SEQUENCE { type OBJECT IDENTIFIER, value ANY }
/// ```
///
/// The wire order lists the most significant component (usually the country) first. Display
/// order, as used by LDAP and by Windows certificate tooling, is the reverse.
///
/// # Examples
///
/// ```rust
/// use symscope::pkcs::{AsnDecode, DistinguishedName};
///
/// #[rustfmt::skip]
/// let data = [
///     0x30, 0x1C,
///         0x31, 0x0B, 0x30, 0x09, 0x06, 0x03, 0x55, 0x04, 0x06, 0x13, 0x02, b'U', b'S',
///         0x31, 0x0D, 0x30, 0x0B, 0x06, 0x03, 0x55, 0x04, 0x03, 0x13, 0x04, b'T', b'e', b's', b't',
/// ];
///
/// let name = DistinguishedName::from_der(&data)?;
/// assert_eq!(name.to_string(), "CN=Test, C=US");
/// # Ok::<(), symscope::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DistinguishedName {
    /// Attributes in display order
    pub attributes: Vec<NameAttribute>,
}

impl DistinguishedName {
    /// First value of the attribute with type `oid`, in display order
    #[must_use]
    pub fn get(&self, oid: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.oid == oid)
            .map(|attribute| attribute.value.as_str())
    }

    /// The common name, if present
    #[must_use]
    pub fn common_name(&self) -> Option<&str> {
        self.get(oid::COMMON_NAME)
    }
}

impl AsnDecode for DistinguishedName {
    fn decode(reader: &mut AsnReader<'_>) -> Result<Self> {
        let relative_names = reader.read_sequence_of(|rdn| {
            let attributes = rdn.read_set_of_with(|pair| {
                let mut sequence = pair.read_sequence()?;

                let oid = sequence.read_object_identifier()?;
                let value = if is_character_string(sequence.peek_tag()?) {
                    sequence.read_character_string()?
                } else {
                    format!("#{}", to_hex_upper(sequence.read_encoded_value()?))
                };

                sequence.ensure_empty()?;
                Ok(NameAttribute { oid, value })
            })?;

            if attributes.is_empty() {
                return Err(malformed_error!("Empty RelativeDistinguishedName"));
            }

            Ok(attributes)
        })?;

        Ok(DistinguishedName {
            attributes: relative_names.into_iter().rev().flatten().collect(),
        })
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, attribute) in self.attributes.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{attribute}")?;
        }

        Ok(())
    }
}
