//! Stream headers of the metadata root (ECMA-335 II.24.2.2).

use crate::{file::parser::Parser, Result};

/// Stream names that may appear in a metadata root
pub const KNOWN_STREAMS: [&str; 8] = [
    "#~", "#-", "#Strings", "#US", "#Blob", "#GUID", "#Pdb", "#JTD",
];

/// Location and name of one stream, relative to the metadata root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Offset of the stream from the start of the metadata root
    pub offset: u32,
    /// Size of the stream in bytes
    pub size: u32,
    /// Name of the stream, at most 32 characters
    pub name: String,
}

impl StreamHeader {
    /// Read one stream header, leaving `parser` at the next 4-byte aligned header.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated input and
    /// [`crate::Error::Malformed`] for an unknown or unterminated name.
    pub fn read(parser: &mut Parser) -> Result<StreamHeader> {
        let offset = parser.read_le::<u32>()?;
        let size = parser.read_le::<u32>()?;

        let name_start = parser.pos();
        let rest = &parser.data()[name_start..];
        let Some(length) = rest.iter().take(32).position(|byte| *byte == 0) else {
            return Err(malformed_error!("Stream name at {} is not terminated", name_start));
        };

        let name = String::from_utf8_lossy(&rest[..length]).into_owned();
        if !KNOWN_STREAMS.contains(&name.as_str()) {
            return Err(malformed_error!("Invalid stream header name - {}", name));
        }

        parser.advance_by(length + 1)?;
        parser.align(4)?;

        Ok(StreamHeader { offset, size, name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let header_bytes = [
            0x6C, 0x00, 0x00, 0x00,
            0xA4, 0x45, 0x00, 0x00,
            0x23, 0x50, 0x64, 0x62, 0x00, 0x00, 0x00, 0x00,
            0xFF,
        ];

        let mut parser = Parser::new(&header_bytes);
        let parsed_header = StreamHeader::read(&mut parser).unwrap();

        assert_eq!(parsed_header.offset, 0x6C);
        assert_eq!(parsed_header.size, 0x45A4);
        assert_eq!(parsed_header.name, "#Pdb");
        assert_eq!(parser.pos(), 16);
    }

    #[test]
    fn crafted_invalid() {
        #[rustfmt::skip]
        let header_bytes = [
            0x6C, 0x00, 0x00, 0x00,
            0xA4, 0x45, 0x00, 0x00,
            0x24, 0x7E, 0x00, 0x00,
        ];

        if StreamHeader::read(&mut Parser::new(&header_bytes)).is_ok() {
            panic!("This should not be valid!")
        }

        let unterminated = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x23, 0x7E];
        assert!(StreamHeader::read(&mut Parser::new(&unterminated)).is_err());
    }
}
