//! RFC 3161 `TSTInfo`, the content of a timestamp token.

use chrono::{DateTime, Utc};

use crate::{
    pkcs::{
        algorithm::AlgorithmIdentifier,
        asn1::{tag, AsnReader},
        AsnDecode,
    },
    Result,
};

/// `MessageImprint ::= SEQUENCE { hashAlgorithm AlgorithmIdentifier, hashedMessage OCTET STRING }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageImprint {
    /// Hash algorithm of the imprint
    pub hash_algorithm: AlgorithmIdentifier,
    /// Hash of the timestamped data
    pub hashed_message: Vec<u8>,
}

impl AsnDecode for MessageImprint {
    fn decode(reader: &mut AsnReader<'_>) -> Result<Self> {
        let mut sequence = reader.read_sequence()?;

        let hash_algorithm = AlgorithmIdentifier::decode(&mut sequence)?;
        let hashed_message = sequence.read_octet_string()?.to_vec();

        sequence.ensure_empty()?;

        Ok(MessageImprint {
            hash_algorithm,
            hashed_message,
        })
    }
}

/// Accuracy of a timestamp.
///
/// ```text
/// Accuracy ::= SEQUENCE {
///     seconds  INTEGER           OPTIONAL,
///     millis   [0] INTEGER (1..999) OPTIONAL,
///     micros   [1] INTEGER (1..999) OPTIONAL }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accuracy {
    /// Whole seconds
    pub seconds: Option<u64>,
    /// Milliseconds
    pub millis: Option<u16>,
    /// Microseconds
    pub micros: Option<u16>,
}

impl Accuracy {
    /// The accuracy in microseconds, saturating on overflow
    #[must_use]
    pub fn total_microseconds(&self) -> u64 {
        self.seconds
            .unwrap_or(0)
            .saturating_mul(1_000_000)
            .saturating_add(u64::from(self.millis.unwrap_or(0)) * 1_000)
            .saturating_add(u64::from(self.micros.unwrap_or(0)))
    }
}

fn read_sub_second(reader: &mut AsnReader<'_>, number: u8, unit: &str) -> Result<Option<u16>> {
    reader.read_optional(tag::context_primitive(number), |field| {
        let value = field.read_small_integer_with_tag(tag::context_primitive(number))?;
        match u16::try_from(value) {
            Ok(value) if (1..=999).contains(&value) => Ok(value),
            _ => Err(malformed_error!("Accuracy {} {} out of range", unit, value)),
        }
    })
}

impl AsnDecode for Accuracy {
    fn decode(reader: &mut AsnReader<'_>) -> Result<Self> {
        let mut sequence = reader.read_sequence()?;

        let seconds = sequence.read_optional(tag::INTEGER, |field| {
            let value = field.read_small_integer()?;
            u64::try_from(value)
                .map_err(|_| malformed_error!("Negative accuracy seconds {}", value))
        })?;
        let millis = read_sub_second(&mut sequence, 0, "millis")?;
        let micros = read_sub_second(&mut sequence, 1, "micros")?;

        sequence.ensure_empty()?;

        Ok(Accuracy {
            seconds,
            millis,
            micros,
        })
    }
}

/// The content of an RFC 3161 timestamp token.
///
/// ```text
/// TSTInfo ::= SEQUENCE {
///     version         INTEGER { v1(1) },
///     policy          TSAPolicyId,
///     messageImprint  MessageImprint,
///     serialNumber    INTEGER,
///     genTime         GeneralizedTime,
///     accuracy        Accuracy OPTIONAL,
///     ordering        BOOLEAN DEFAULT FALSE,
///     nonce           INTEGER OPTIONAL,
///     tsa             [0] GeneralName OPTIONAL,
///     extensions      [1] IMPLICIT Extensions OPTIONAL }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rfc3161TstInfo {
    /// Syntax version, always 1
    pub version: i64,
    /// Dotted policy OID under which the token was issued
    pub policy: String,
    /// Hash of the timestamped data
    pub message_imprint: MessageImprint,
    /// Serial number assigned by the authority
    pub serial_number: Vec<u8>,
    /// Time at which the token was created
    pub gen_time: DateTime<Utc>,
    /// Accuracy of `gen_time`
    pub accuracy: Option<Accuracy>,
    /// Ordering flag
    pub ordering: bool,
    /// Nonce echoed from the request
    pub nonce: Option<Vec<u8>>,
    /// Complete encoding of the authority name
    pub tsa: Option<Vec<u8>>,
    /// Complete encoding of the extensions
    pub extensions: Option<Vec<u8>>,
}

impl AsnDecode for Rfc3161TstInfo {
    fn decode(reader: &mut AsnReader<'_>) -> Result<Self> {
        let mut sequence = reader.read_sequence()?;

        let version = sequence.read_small_integer()?;
        if version != 1 {
            return Err(malformed_error!("Unsupported TSTInfo version {}", version));
        }

        let policy = sequence.read_object_identifier()?;
        let message_imprint = MessageImprint::decode(&mut sequence)?;
        let serial_number = sequence.read_integer()?.to_vec();
        let gen_time = sequence.read_generalized_time()?;
        let accuracy = sequence.read_optional(tag::SEQUENCE, Accuracy::decode)?;
        let ordering = sequence
            .read_optional(tag::BOOLEAN, AsnReader::read_boolean)?
            .unwrap_or(false);
        let nonce = sequence.read_optional(tag::INTEGER, |field| {
            Ok(field.read_integer()?.to_vec())
        })?;
        let tsa = sequence.read_optional(tag::context_constructed(0), |field| {
            Ok(field.read_encoded_value()?.to_vec())
        })?;
        let extensions = sequence.read_optional(tag::context_constructed(1), |field| {
            Ok(field.read_encoded_value()?.to_vec())
        })?;

        sequence.ensure_empty()?;

        Ok(Rfc3161TstInfo {
            version,
            policy,
            message_imprint,
            serial_number,
            gen_time,
            accuracy,
            ordering,
            nonce,
            tsa,
            extensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{
        pkcs::oid,
        test::der::{self, TstInfoBuilder},
    };

    #[test]
    fn decode_minimal() {
        let gen_time = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let data = TstInfoBuilder::new(gen_time).build();

        let info = Rfc3161TstInfo::from_der(&data).unwrap();
        assert_eq!(info.version, 1);
        assert_eq!(info.gen_time, gen_time);
        assert_eq!(info.message_imprint.hash_algorithm.algorithm, oid::SHA256);
        assert!(info.accuracy.is_none());
        assert!(!info.ordering);
        assert!(info.nonce.is_none());
    }

    #[test]
    fn decode_full() {
        let gen_time = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let data = TstInfoBuilder::new(gen_time)
            .policy(oid::BASELINE_TIMESTAMP_POLICY)
            .accuracy(Some(2), Some(500), Some(7))
            .ordering(true)
            .nonce(&[0x12, 0x34])
            .build();

        let info = Rfc3161TstInfo::from_der(&data).unwrap();
        assert_eq!(info.policy, oid::BASELINE_TIMESTAMP_POLICY);
        assert!(info.ordering);
        assert_eq!(info.nonce, Some(vec![0x12, 0x34]));

        let accuracy = info.accuracy.unwrap();
        assert_eq!(accuracy.seconds, Some(2));
        assert_eq!(accuracy.millis, Some(500));
        assert_eq!(accuracy.micros, Some(7));
        assert_eq!(accuracy.total_microseconds(), 2_500_007);
    }

    #[test]
    fn millis_out_of_range() {
        let data = der::sequence(&[der::tlv(0x80, &[0x00])]);
        assert!(Accuracy::from_der(&data).is_err());

        let data = der::sequence(&[der::tlv(0x80, &[0x03, 0xE8])]);
        if Accuracy::from_der(&data).is_ok() {
            panic!("This should not work!")
        }
    }

    #[test]
    fn wrong_version() {
        let gen_time = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let data = TstInfoBuilder::new(gen_time).version(2).build();

        assert!(Rfc3161TstInfo::from_der(&data).is_err());
    }
}
