//! Bounded BER/DER tag-length-value reader.
//!
//! [`AsnReader`] walks a buffer of ASN.1 encoded data. Reading a constructed element (SEQUENCE,
//! SET, context tagged wrapper) hands back a new reader bounded to exactly that element's
//! content, while the parent moves past the whole element. Decoders therefore nest the same way
//! the ASN.1 grammar does, and finish each structure with [`AsnReader::ensure_empty`] so that
//! unknown trailing content is rejected instead of being silently ignored.
//!
//! Only definite lengths and single-byte identifier octets are supported. Neither restriction
//! matters for the DER structures of PKCS#7, X.509 and RFC 3161.
//!
//! # Examples
//!
//! ```rust
//! use symscope::pkcs::asn1::AsnReader;
//!
//! // SEQUENCE { OBJECT IDENTIFIER 2.5.4.3, PrintableString "Test" }
//! let data = [
//!     0x30, 0x0B, 0x06, 0x03, 0x55, 0x04, 0x03, 0x13, 0x04, b'T', b'e', b's', b't',
//! ];
//!
//! let mut reader = AsnReader::new(&data);
//! let mut sequence = reader.read_sequence()?;
//! assert_eq!(sequence.read_object_identifier()?, "2.5.4.3");
//! assert_eq!(sequence.read_character_string()?, "Test");
//! sequence.ensure_empty()?;
//! reader.ensure_empty()?;
//! # Ok::<(), symscope::Error>(())
//! ```

use chrono::{DateTime, NaiveDate, Utc};

use crate::Result;

/// Universal and helper tag values
pub mod tag {
    /// BOOLEAN
    pub const BOOLEAN: u8 = 0x01;
    /// INTEGER
    pub const INTEGER: u8 = 0x02;
    /// BIT STRING
    pub const BIT_STRING: u8 = 0x03;
    /// OCTET STRING
    pub const OCTET_STRING: u8 = 0x04;
    /// NULL
    pub const NULL: u8 = 0x05;
    /// OBJECT IDENTIFIER
    pub const OBJECT_IDENTIFIER: u8 = 0x06;
    /// ENUMERATED
    pub const ENUMERATED: u8 = 0x0A;
    /// UTF8String
    pub const UTF8_STRING: u8 = 0x0C;
    /// NumericString
    pub const NUMERIC_STRING: u8 = 0x12;
    /// PrintableString
    pub const PRINTABLE_STRING: u8 = 0x13;
    /// T61String (TeletexString)
    pub const T61_STRING: u8 = 0x14;
    /// IA5String
    pub const IA5_STRING: u8 = 0x16;
    /// UTCTime
    pub const UTC_TIME: u8 = 0x17;
    /// GeneralizedTime
    pub const GENERALIZED_TIME: u8 = 0x18;
    /// VisibleString
    pub const VISIBLE_STRING: u8 = 0x1A;
    /// UniversalString
    pub const UNIVERSAL_STRING: u8 = 0x1C;
    /// BMPString
    pub const BMP_STRING: u8 = 0x1E;
    /// SEQUENCE / SEQUENCE OF
    pub const SEQUENCE: u8 = 0x30;
    /// SET / SET OF
    pub const SET: u8 = 0x31;

    /// Context-specific constructed tag `[n]`, as used for EXPLICIT tagging and for IMPLICIT
    /// tagging of constructed types
    #[must_use]
    pub const fn context_constructed(number: u8) -> u8 {
        0xA0 | (number & 0x1F)
    }

    /// Context-specific primitive tag `[n]`, as used for IMPLICIT tagging of primitive types
    #[must_use]
    pub const fn context_primitive(number: u8) -> u8 {
        0x80 | (number & 0x1F)
    }
}

/// Largest length the reader accepts, in bytes of the length field
const MAX_LENGTH_OCTETS: usize = 4;

/// Cursor over ASN.1 encoded data, bounded to one region.
#[derive(Debug, Clone)]
pub struct AsnReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> AsnReader<'a> {
    /// Create a reader over `data`
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        AsnReader { data, position: 0 }
    }

    /// Returns `true` while unread bytes remain
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Number of unread bytes in the region
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Fail unless the whole region has been consumed.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if unread bytes remain.
    pub fn ensure_empty(&self) -> Result<()> {
        if self.has_data() {
            return Err(malformed_error!(
                "{} unexpected trailing bytes at offset {}",
                self.remaining(),
                self.position
            ));
        }

        Ok(())
    }

    /// The identifier octet of the next element, without consuming it.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] at the end of the region or for a multi-byte tag.
    pub fn peek_tag(&self) -> Result<u8> {
        let Some(&tag) = self.data.get(self.position) else {
            return Err(malformed_error!("Expected a tag at offset {}", self.position));
        };

        if tag & 0x1F == 0x1F {
            return Err(malformed_error!(
                "Multi-byte tag 0x{:02x} is not supported",
                tag
            ));
        }

        Ok(tag)
    }

    /// Read the next element without interpreting it.
    ///
    /// Returns the identifier octet, the content octets and the complete encoding.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a truncated header, an indefinite length, or a
    /// length that runs past the region.
    pub fn read_any(&mut self) -> Result<(u8, &'a [u8], &'a [u8])> {
        let start = self.position;
        let tag = self.peek_tag()?;
        let mut offset = start + 1;

        let Some(&first) = self.data.get(offset) else {
            return Err(malformed_error!("Truncated length at offset {}", offset));
        };
        offset += 1;

        let length = if first & 0x80 == 0 {
            usize::from(first)
        } else {
            let octets = usize::from(first & 0x7F);
            if octets == 0 {
                return Err(malformed_error!(
                    "Indefinite length at offset {} is not supported",
                    start
                ));
            }
            if octets > MAX_LENGTH_OCTETS {
                return Err(malformed_error!(
                    "Length with {} octets at offset {} is too large",
                    octets,
                    start
                ));
            }

            let Some(bytes) = self.data.get(offset..offset + octets) else {
                return Err(malformed_error!("Truncated length at offset {}", offset));
            };
            offset += octets;

            bytes
                .iter()
                .fold(0_usize, |length, byte| (length << 8) | usize::from(*byte))
        };

        let Some(end) = offset.checked_add(length).filter(|end| *end <= self.data.len()) else {
            return Err(malformed_error!(
                "Element at offset {} with length {} exceeds its enclosing region of {} bytes",
                start,
                length,
                self.data.len()
            ));
        };

        self.position = end;
        Ok((tag, &self.data[offset..end], &self.data[start..end]))
    }

    /// Read the content octets of an element that must carry `expected`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] on a tag mismatch or a damaged header. The position
    /// is left unchanged on a mismatch.
    pub fn read_tagged(&mut self, expected: u8) -> Result<&'a [u8]> {
        let tag = self.peek_tag()?;
        if tag != expected {
            return Err(malformed_error!(
                "Expected tag 0x{:02x} at offset {}, found 0x{:02x}",
                expected,
                self.position,
                tag
            ));
        }

        let (_, content, _) = self.read_any()?;
        Ok(content)
    }

    /// Read a SEQUENCE and return a reader bounded to its content.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the next element is not a valid SEQUENCE.
    pub fn read_sequence(&mut self) -> Result<AsnReader<'a>> {
        self.read_set_of_tagged(tag::SEQUENCE)
    }

    /// Read a SET and return a reader bounded to its content.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the next element is not a valid SET.
    pub fn read_set_of(&mut self) -> Result<AsnReader<'a>> {
        self.read_set_of_tagged(tag::SET)
    }

    /// Read a constructed element carrying `expected`, typically an IMPLICIT `[n]` SET OF,
    /// and return a reader bounded to its content.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] on a tag mismatch or a damaged header.
    pub fn read_set_of_tagged(&mut self, expected: u8) -> Result<AsnReader<'a>> {
        self.read_tagged(expected).map(AsnReader::new)
    }

    /// Read an `[n] EXPLICIT` wrapper and return a reader bounded to the wrapped element.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] on a tag mismatch or a damaged header.
    pub fn read_context_explicit(&mut self, number: u8) -> Result<AsnReader<'a>> {
        self.read_set_of_tagged(tag::context_constructed(number))
    }

    /// Decode every element of a SEQUENCE OF with `element`.
    ///
    /// All elements are decoded before returning, and the SEQUENCE must be fully consumed.
    ///
    /// # Errors
    /// Propagates the first element error.
    pub fn read_sequence_of<T, F>(&mut self, element: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut AsnReader<'a>) -> Result<T>,
    {
        self.read_sequence()?.read_all(element)
    }

    /// Decode every element of a SET OF with `element`.
    ///
    /// # Errors
    /// Propagates the first element error.
    pub fn read_set_of_with<T, F>(&mut self, element: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut AsnReader<'a>) -> Result<T>,
    {
        self.read_set_of()?.read_all(element)
    }

    /// Decode elements with `element` until this region is exhausted.
    ///
    /// # Errors
    /// Propagates the first element error, or fails if `element` stops consuming input.
    pub fn read_all<T, F>(&mut self, mut element: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut AsnReader<'a>) -> Result<T>,
    {
        let mut elements = Vec::new();
        while self.has_data() {
            let before = self.position;
            elements.push(element(self)?);
            if self.position == before {
                return Err(malformed_error!(
                    "Element decoder made no progress at offset {}",
                    before
                ));
            }
        }

        Ok(elements)
    }

    /// Decode an optional element, present only when the next tag equals `expected`.
    ///
    /// Returns `Ok(None)` without consuming input when the region is exhausted or the next
    /// tag differs.
    ///
    /// # Errors
    /// Propagates the error of `element` when the tag matches.
    pub fn read_optional<T, F>(&mut self, expected: u8, element: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut AsnReader<'a>) -> Result<T>,
    {
        if !self.has_data() || self.peek_tag()? != expected {
            return Ok(None);
        }

        element(self).map(Some)
    }

    /// The complete encoding (tag, length and content) of the next element.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a damaged header.
    pub fn read_encoded_value(&mut self) -> Result<&'a [u8]> {
        let (_, _, encoded) = self.read_any()?;
        Ok(encoded)
    }

    /// The big-endian two's complement content octets of an INTEGER.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a tag mismatch or an empty INTEGER.
    pub fn read_integer(&mut self) -> Result<&'a [u8]> {
        self.read_integer_with_tag(tag::INTEGER)
    }

    /// INTEGER content octets under a custom (IMPLICIT) tag.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a tag mismatch or an empty INTEGER.
    pub fn read_integer_with_tag(&mut self, expected: u8) -> Result<&'a [u8]> {
        let content = self.read_tagged(expected)?;
        if content.is_empty() {
            return Err(malformed_error!("Empty INTEGER"));
        }

        Ok(content)
    }

    /// An INTEGER that must fit into 64 bits.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a tag mismatch or a value outside `i64`.
    pub fn read_small_integer(&mut self) -> Result<i64> {
        self.read_small_integer_with_tag(tag::INTEGER)
    }

    /// A 64 bit INTEGER under a custom (IMPLICIT) tag.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a tag mismatch or a value outside `i64`.
    pub fn read_small_integer_with_tag(&mut self, expected: u8) -> Result<i64> {
        let content = self.read_integer_with_tag(expected)?;
        if content.len() > 8 {
            return Err(malformed_error!(
                "INTEGER of {} bytes does not fit into 64 bits",
                content.len()
            ));
        }

        let initial: i64 = if content[0] & 0x80 != 0 { -1 } else { 0 };
        Ok(content
            .iter()
            .fold(initial, |value, byte| (value << 8) | i64::from(*byte)))
    }

    /// A BOOLEAN.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a tag mismatch or a content length other than 1.
    pub fn read_boolean(&mut self) -> Result<bool> {
        match self.read_tagged(tag::BOOLEAN)? {
            [value] => Ok(*value != 0),
            content => Err(malformed_error!(
                "BOOLEAN with {} content bytes",
                content.len()
            )),
        }
    }

    /// A NULL.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a tag mismatch or non-empty content.
    pub fn read_null(&mut self) -> Result<()> {
        if !self.read_tagged(tag::NULL)?.is_empty() {
            return Err(malformed_error!("NULL with content"));
        }

        Ok(())
    }

    /// An OBJECT IDENTIFIER in dotted decimal notation.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a tag mismatch or an invalid encoding.
    pub fn read_object_identifier(&mut self) -> Result<String> {
        let content = self.read_tagged(tag::OBJECT_IDENTIFIER)?;
        decode_object_identifier(content)
    }

    /// The content of a primitive OCTET STRING.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a tag mismatch.
    pub fn read_octet_string(&mut self) -> Result<&'a [u8]> {
        self.read_tagged(tag::OCTET_STRING)
    }

    /// A BIT STRING, returned as the number of unused bits in the last byte and the bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a tag mismatch or an invalid unused-bit count.
    pub fn read_bit_string(&mut self) -> Result<(u8, &'a [u8])> {
        let content = self.read_tagged(tag::BIT_STRING)?;
        let Some((&unused, bits)) = content.split_first() else {
            return Err(malformed_error!("BIT STRING without unused-bits octet"));
        };

        if unused > 7 || (bits.is_empty() && unused != 0) {
            return Err(malformed_error!(
                "BIT STRING with invalid unused-bits count {}",
                unused
            ));
        }

        Ok((unused, bits))
    }

    /// A UTCTime, with two-digit years mapped into 1950..=2049.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a tag mismatch or an invalid time.
    pub fn read_utc_time(&mut self) -> Result<DateTime<Utc>> {
        let content = self.read_tagged(tag::UTC_TIME)?;
        parse_utc_time(content)
    }

    /// A GeneralizedTime, with optional fractional seconds.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a tag mismatch or an invalid time.
    pub fn read_generalized_time(&mut self) -> Result<DateTime<Utc>> {
        let content = self.read_tagged(tag::GENERALIZED_TIME)?;
        parse_generalized_time(content)
    }

    /// The X.509 `Time` CHOICE: either UTCTime or GeneralizedTime.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the next element is neither.
    pub fn read_time(&mut self) -> Result<DateTime<Utc>> {
        match self.peek_tag()? {
            tag::UTC_TIME => self.read_utc_time(),
            tag::GENERALIZED_TIME => self.read_generalized_time(),
            other => Err(malformed_error!(
                "Expected UTCTime or GeneralizedTime, found tag 0x{:02x}",
                other
            )),
        }
    }

    /// Any of the character string types used in names and directory strings.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a non-string tag or invalid content.
    pub fn read_character_string(&mut self) -> Result<String> {
        let string_tag = self.peek_tag()?;
        if !is_character_string(string_tag) {
            return Err(malformed_error!(
                "Tag 0x{:02x} is not a character string",
                string_tag
            ));
        }
        let content = self.read_tagged(string_tag)?;

        match string_tag {
            tag::UTF8_STRING => String::from_utf8(content.to_vec())
                .map_err(|error| malformed_error!("Invalid UTF8String - {}", error)),
            tag::PRINTABLE_STRING
            | tag::IA5_STRING
            | tag::NUMERIC_STRING
            | tag::VISIBLE_STRING => {
                if !content.is_ascii() {
                    return Err(malformed_error!("Non-ASCII content in ASCII string type"));
                }
                Ok(content.iter().map(|byte| char::from(*byte)).collect())
            }
            // Teletex is treated as Latin-1, which matches what issuers put into it in practice
            tag::T61_STRING => Ok(content.iter().map(|byte| char::from(*byte)).collect()),
            tag::BMP_STRING => {
                if content.len() % 2 != 0 {
                    return Err(malformed_error!("BMPString with odd length"));
                }
                let units: Vec<u16> = content
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16(&units)
                    .map_err(|error| malformed_error!("Invalid BMPString - {}", error))
            }
            tag::UNIVERSAL_STRING => {
                if content.len() % 4 != 0 {
                    return Err(malformed_error!("UniversalString with invalid length"));
                }
                content
                    .chunks_exact(4)
                    .map(|quad| {
                        char::from_u32(u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]]))
                            .ok_or_else(|| malformed_error!("Invalid UniversalString code point"))
                    })
                    .collect()
            }
            _ => Err(malformed_error!(
                "Tag 0x{:02x} is not a character string",
                string_tag
            )),
        }
    }
}

/// Returns `true` for the tags [`AsnReader::read_character_string`] accepts
#[must_use]
pub fn is_character_string(value: u8) -> bool {
    matches!(
        value,
        tag::UTF8_STRING
            | tag::PRINTABLE_STRING
            | tag::IA5_STRING
            | tag::NUMERIC_STRING
            | tag::VISIBLE_STRING
            | tag::T61_STRING
            | tag::BMP_STRING
            | tag::UNIVERSAL_STRING
    )
}

/// Decode the content octets of an OBJECT IDENTIFIER into dotted notation.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for empty content, non-minimal or truncated arcs, and
/// arcs that overflow 64 bits.
pub fn decode_object_identifier(content: &[u8]) -> Result<String> {
    if content.is_empty() {
        return Err(malformed_error!("Empty OBJECT IDENTIFIER"));
    }

    let mut arcs: Vec<u64> = Vec::new();
    let mut value: u64 = 0;
    let mut in_arc = false;

    for byte in content {
        if !in_arc && *byte == 0x80 {
            return Err(malformed_error!("Non-minimal OBJECT IDENTIFIER arc"));
        }
        if value > (u64::MAX >> 7) {
            return Err(malformed_error!("OBJECT IDENTIFIER arc overflows 64 bits"));
        }

        value = (value << 7) | u64::from(byte & 0x7F);
        in_arc = byte & 0x80 != 0;

        if !in_arc {
            if arcs.is_empty() {
                let first = (value / 40).min(2);
                arcs.push(first);
                arcs.push(value - first * 40);
            } else {
                arcs.push(value);
            }
            value = 0;
        }
    }

    if in_arc {
        return Err(malformed_error!("Truncated OBJECT IDENTIFIER"));
    }

    Ok(arcs
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join("."))
}

fn digits(content: &[u8], range: std::ops::Range<usize>) -> Result<u32> {
    let Some(bytes) = content.get(range) else {
        return Err(malformed_error!("Truncated time value"));
    };

    bytes.iter().try_fold(0_u32, |value, byte| {
        if byte.is_ascii_digit() {
            Ok(value * 10 + u32::from(byte - b'0'))
        } else {
            Err(malformed_error!("Non-digit in time value"))
        }
    })
}

fn build_time(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    nanos: u32,
) -> Result<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_nano_opt(hour, minute, second, nanos))
        .map(|time| time.and_utc())
        .ok_or_else(|| malformed_error!("Time value out of range"))
}

fn parse_utc_time(content: &[u8]) -> Result<DateTime<Utc>> {
    // YYMMDDhhmm[ss]Z
    let (has_seconds, expected_len) = match content.len() {
        13 => (true, 13),
        11 => (false, 11),
        _ => return Err(malformed_error!("Invalid UTCTime length {}", content.len())),
    };
    if content[expected_len - 1] != b'Z' {
        return Err(malformed_error!("UTCTime must be expressed in UTC"));
    }

    let short_year = digits(content, 0..2)?;
    let year = if short_year >= 50 {
        1900 + short_year
    } else {
        2000 + short_year
    };
    let second = if has_seconds { digits(content, 10..12)? } else { 0 };

    build_time(
        i32::try_from(year).map_err(|_| malformed_error!("Invalid UTCTime year"))?,
        digits(content, 2..4)?,
        digits(content, 4..6)?,
        digits(content, 6..8)?,
        digits(content, 8..10)?,
        second,
        0,
    )
}

fn parse_generalized_time(content: &[u8]) -> Result<DateTime<Utc>> {
    // YYYYMMDDhhmmss[.f+]Z
    if content.len() < 15 || content.last() != Some(&b'Z') {
        return Err(malformed_error!("Invalid GeneralizedTime"));
    }

    let nanos = match &content[14..content.len() - 1] {
        [] => 0,
        [b'.' | b',', fraction @ ..] if !fraction.is_empty() && fraction.len() <= 9 => {
            let value = digits(fraction, 0..fraction.len())?;
            let scale = 10_u32.pow(9 - u32::try_from(fraction.len()).unwrap_or(9));
            value * scale
        }
        _ => return Err(malformed_error!("Invalid GeneralizedTime fraction")),
    };

    build_time(
        i32::try_from(digits(content, 0..4)?)
            .map_err(|_| malformed_error!("Invalid GeneralizedTime year"))?,
        digits(content, 4..6)?,
        digits(content, 6..8)?,
        digits(content, 8..10)?,
        digits(content, 10..12)?,
        digits(content, 12..14)?,
        nanos,
    )
}
