//! `AlgorithmIdentifier` (RFC 5280 4.1.1.2).

use crate::{
    pkcs::{asn1::AsnReader, oid, AsnDecode},
    Result,
};

/// An algorithm and its optional parameters.
///
/// ```text
/// AlgorithmIdentifier ::= SEQUENCE {
///     algorithm   OBJECT IDENTIFIER,
///     parameters  ANY DEFINED BY algorithm OPTIONAL }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmIdentifier {
    /// Dotted algorithm OID
    pub algorithm: String,
    /// Complete encoding of the parameters, if present
    pub parameters: Option<Vec<u8>>,
}

impl AlgorithmIdentifier {
    /// Returns `true` if the parameters are absent or an explicit NULL
    #[must_use]
    pub fn has_null_parameters(&self) -> bool {
        matches!(self.parameters.as_deref(), None | Some([0x05, 0x00]))
    }

    /// Short name of a known digest algorithm, e.g. `SHA256`
    #[must_use]
    pub fn digest_name(&self) -> Option<&'static str> {
        match self.algorithm.as_str() {
            oid::SHA1 => Some("SHA1"),
            oid::SHA256 => Some("SHA256"),
            oid::SHA384 => Some("SHA384"),
            oid::SHA512 => Some("SHA512"),
            _ => None,
        }
    }
}

impl AsnDecode for AlgorithmIdentifier {
    fn decode(reader: &mut AsnReader<'_>) -> Result<Self> {
        let mut sequence = reader.read_sequence()?;

        let algorithm = sequence.read_object_identifier()?;
        let parameters = if sequence.has_data() {
            Some(sequence.read_encoded_value()?.to_vec())
        } else {
            None
        };

        sequence.ensure_empty()?;

        Ok(AlgorithmIdentifier {
            algorithm,
            parameters,
        })
    }
}
