//! Metadata root header and stream directory (ECMA-335 II.24.2.1).
//!
//! The root is shared by the metadata of an assembly and by portable PDBs; the latter add the
//! `#Pdb` stream and usually omit `#US`.
//!
//! # Example
//!
//! ```rust
//! use symscope::metadata::root::Root;
//! let root = Root::read(&[
//!            0x42, 0x53, 0x4A, 0x42,
//!            0x01, 0x00,
//!            0x01, 0x00,
//!            0x00, 0x00, 0x00, 0x00,
//!            0x08, 0x00, 0x00, 0x00,
//!            b'P', b'D', b'B', b' ', b'v', b'1', 0x00, 0x00,
//!            0x00, 0x00,
//!            0x01, 0x00,
//!            0x28, 0x00, 0x00, 0x00, // StreamHeader
//!            0x04, 0x00, 0x00, 0x00,
//!            0x23, 0x7E, 0x00, 0x00,
//!            0x00, 0x00, 0x00, 0x00,
//!        ])?;
//! assert_eq!(root.version, "PDB v1");
//! assert!(root.stream("#~").is_some());
//! # Ok::<(), symscope::Error>(())
//! ```

use crate::{file::parser::Parser, metadata::streams::StreamHeader, Result};

/// The MAGIC value indicating the CIL header
pub const CIL_HEADER_MAGIC: u32 = 0x424A_5342;

/// Upper bound for the number of streams, one per known stream name
const MAX_STREAMS: u16 = 8;

/// The metadata root with its stream directory
#[derive(Debug, Clone)]
pub struct Root {
    /// `MajorVersion`
    pub major_version: u16,
    /// `MinorVersion`
    pub minor_version: u16,
    /// Version string, without the padding
    pub version: String,
    /// Reserved, always 0
    pub flags: u16,
    /// Streams
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Reads a [`Root`] metadata header from a byte slice.
    ///
    /// Every stream is checked to lie within `data`.
    ///
    /// # Errors
    /// Returns an error if the data is too short, the signature is invalid, or the stream
    /// directory is malformed.
    pub fn read(data: &[u8]) -> Result<Root> {
        let mut parser = Parser::new(data);

        let signature = parser.read_le::<u32>()?;
        if signature != CIL_HEADER_MAGIC {
            return Err(malformed_error!(
                "CIL_HEADER_MAGIC does not match - {}",
                signature
            ));
        }

        let major_version = parser.read_le::<u16>()?;
        let minor_version = parser.read_le::<u16>()?;
        parser.advance_by(4)?;

        let version_length = parser.read_le::<u32>()? as usize;
        if version_length > 255 {
            return Err(malformed_error!(
                "Version string length too large - {}",
                version_length
            ));
        }

        let version_bytes = parser.read_bytes(version_length)?;
        let version_end = version_bytes
            .iter()
            .position(|byte| *byte == 0)
            .unwrap_or(version_bytes.len());
        let version = String::from_utf8_lossy(&version_bytes[..version_end]).into_owned();
        parser.align(4)?;

        let flags = parser.read_le::<u16>()?;
        let stream_count = parser.read_le::<u16>()?;
        if stream_count == 0 || stream_count > MAX_STREAMS {
            return Err(malformed_error!("Invalid stream count - {}", stream_count));
        }

        let mut stream_headers: Vec<StreamHeader> = Vec::with_capacity(stream_count as usize);
        for _ in 0..stream_count {
            let header = StreamHeader::read(&mut parser)?;

            let Some(end) = header.offset.checked_add(header.size) else {
                return Err(malformed_error!(
                    "Stream offset and size cause integer overflow - {} + {}",
                    header.offset,
                    header.size
                ));
            };
            if end as usize > data.len() {
                return Err(out_of_bounds_error!());
            }

            if stream_headers.iter().any(|known| known.name == header.name) {
                return Err(malformed_error!("Duplicate stream - {}", header.name));
            }

            stream_headers.push(header);
        }

        Ok(Root {
            major_version,
            minor_version,
            version,
            flags,
            stream_headers,
        })
    }

    /// The header of the stream called `name`
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.stream_headers.iter().find(|header| header.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    const HEADER: [u8; 56] = [
        0x42, 0x53, 0x4A, 0x42,
        0x01, 0x00,
        0x01, 0x00,
        0x00, 0x00, 0x00, 0x00,
        0x0C, 0x00, 0x00, 0x00,
        b'v', b'4', b'.', b'0', b'.', b'3', b'0', b'3', b'1', b'9', 0x00, 0x00,
        0x00, 0x00,
        0x02, 0x00,

        0x30, 0x00, 0x00, 0x00, // StreamHeader
        0x04, 0x00, 0x00, 0x00,
        0x23, 0x7E, 0x00, 0x00,

        0x30, 0x00, 0x00, 0x00, // StreamHeader
        0x04, 0x00, 0x00, 0x00,
        0x23, 0x50, 0x64, 0x62,
    ];

    #[test]
    fn crafted() {
        // Second name needs its terminator and the streams need room.
        let mut data = HEADER.to_vec();
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

        let parsed_header = Root::read(&data).unwrap();

        assert_eq!(parsed_header.major_version, 1);
        assert_eq!(parsed_header.minor_version, 1);
        assert_eq!(parsed_header.version, "v4.0.30319");
        assert_eq!(parsed_header.flags, 0);
        assert_eq!(parsed_header.stream_headers.len(), 2);
        assert_eq!(parsed_header.stream_headers[0].offset, 0x30);
        assert_eq!(parsed_header.stream_headers[0].size, 0x4);
        assert_eq!(parsed_header.stream_headers[0].name, "#~");
        assert_eq!(parsed_header.stream("#Pdb").unwrap().offset, 0x30);
        assert!(parsed_header.stream("#Strings").is_none());
    }

    #[test]
    fn invalid() {
        let mut data = HEADER.to_vec();
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        data[0] = 0x43;
        if Root::read(&data).is_ok() {
            panic!("This should not work!")
        }

        // Stream reaching past the end
        let mut data = HEADER.to_vec();
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        data[36] = 0x10;
        assert!(Root::read(&data).is_err());

        // Missing streams
        assert!(Root::read(&HEADER[..32]).is_err());
    }
}
