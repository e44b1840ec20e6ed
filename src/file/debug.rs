//! PE debug directory entries.
//!
//! The debug data directory is an array of 28-byte `IMAGE_DEBUG_DIRECTORY` records. Managed
//! compilers emit a handful of well-known entry types, which are the ones modeled here:
//!
//! - CodeView (`RSDS`) - identity of the matching PDB (GUID, age, path)
//! - Reproducible - marks a deterministic build
//! - EmbeddedPortablePdb - a deflated portable PDB stored inside the image
//! - PdbChecksum - hash of the matching PDB with its id zeroed
//!
//! Everything else is preserved as [`DebugType::Unknown`] so the raw payload remains reachable.

use crate::{file::parser::Parser, utils::decompress::inflate, Result};

/// `RSDS` signature of a PDB 7.0 CodeView record
pub const CODEVIEW_SIGNATURE_RSDS: u32 = 0x5344_5352;

/// `MPDB` signature at the start of an embedded portable PDB payload
pub const EMBEDDED_PDB_SIGNATURE: u32 = 0x4244_504D;

/// Minor version stamped by compilers into the CodeView entry of a portable PDB
pub const PORTABLE_CODEVIEW_VERSION: u16 = 0x504D;

/// Size of a single `IMAGE_DEBUG_DIRECTORY` record
pub const DEBUG_DIRECTORY_ENTRY_SIZE: usize = 28;

/// Debug directory entry types (`IMAGE_DEBUG_TYPE_*`) of interest to symbol validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugType {
    /// 2 - CodeView record pointing at a PDB
    CodeView,
    /// 16 - The image was produced by a deterministic build
    Reproducible,
    /// 17 - Compressed portable PDB embedded in the image
    EmbeddedPortablePdb,
    /// 19 - Checksum of the associated PDB
    PdbChecksum,
    /// Any other type, carrying the raw value
    Unknown(u32),
}

impl From<u32> for DebugType {
    fn from(value: u32) -> Self {
        match value {
            2 => DebugType::CodeView,
            16 => DebugType::Reproducible,
            17 => DebugType::EmbeddedPortablePdb,
            19 => DebugType::PdbChecksum,
            other => DebugType::Unknown(other),
        }
    }
}

/// One `IMAGE_DEBUG_DIRECTORY` record together with the bytes it points to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugDirectoryEntry {
    /// Time stamp, for deterministic builds a hash fragment
    pub time_date_stamp: u32,
    /// Major version of the payload format
    pub major_version: u16,
    /// Minor version of the payload format
    pub minor_version: u16,
    /// The entry type
    pub debug_type: DebugType,
    /// RVA of the payload, 0 if not mapped
    pub address_of_raw_data: u32,
    /// File offset of the payload
    pub pointer_to_raw_data: u32,
    /// Raw payload, empty if the entry does not carry data
    pub data: Vec<u8>,
}

impl DebugDirectoryEntry {
    /// Read one entry header from `parser`. The payload is left empty; it is resolved by the
    /// owning [`crate::file::File`] since only the image knows its file layout.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 28 bytes remain.
    pub fn read_header(parser: &mut Parser) -> Result<(DebugDirectoryEntry, u32)> {
        let _characteristics = parser.read_le::<u32>()?;
        let time_date_stamp = parser.read_le::<u32>()?;
        let major_version = parser.read_le::<u16>()?;
        let minor_version = parser.read_le::<u16>()?;
        let debug_type = DebugType::from(parser.read_le::<u32>()?);
        let size_of_data = parser.read_le::<u32>()?;
        let address_of_raw_data = parser.read_le::<u32>()?;
        let pointer_to_raw_data = parser.read_le::<u32>()?;

        Ok((
            DebugDirectoryEntry {
                time_date_stamp,
                major_version,
                minor_version,
                debug_type,
                address_of_raw_data,
                pointer_to_raw_data,
                data: Vec::new(),
            },
            size_of_data,
        ))
    }

    /// Returns `true` for a CodeView entry that refers to a portable PDB
    #[must_use]
    pub fn is_portable_codeview(&self) -> bool {
        self.debug_type == DebugType::CodeView && self.minor_version == PORTABLE_CODEVIEW_VERSION
    }
}

/// Decoded `RSDS` CodeView record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeView {
    /// PDB signature GUID
    pub guid: uguid::Guid,
    /// PDB age. Portable PDBs always use 1.
    pub age: u32,
    /// Path of the PDB as recorded by the linker or compiler
    pub path: String,
    /// `true` if the record refers to a portable PDB
    pub portable: bool,
}

impl CodeView {
    /// Decode the payload of a CodeView entry.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the payload is not an `RSDS` record.
    pub fn parse(entry: &DebugDirectoryEntry) -> Result<CodeView> {
        let mut parser = Parser::new(&entry.data);
        let signature = parser.read_le::<u32>()?;
        if signature != CODEVIEW_SIGNATURE_RSDS {
            return Err(malformed_error!(
                "Unsupported CodeView signature - 0x{:08X}",
                signature
            ));
        }

        let mut guid = [0_u8; 16];
        guid.copy_from_slice(parser.read_bytes(16)?);
        let age = parser.read_le::<u32>()?;
        let path = parser.read_string_utf8()?;

        Ok(CodeView {
            guid: uguid::Guid::from_bytes(guid),
            age,
            path,
            portable: entry.is_portable_codeview(),
        })
    }

    /// File name part of the recorded path, accepting both separator styles
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path
            .rsplit(|c| c == '\\' || c == '/')
            .next()
            .unwrap_or(self.path.as_str())
    }
}

/// Decoded PdbChecksum entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdbChecksum {
    /// Hash algorithm name, e.g. `SHA256`
    pub algorithm: String,
    /// Checksum bytes
    pub checksum: Vec<u8>,
}

impl PdbChecksum {
    /// Decode the payload of a PdbChecksum entry.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an empty algorithm name or checksum.
    pub fn parse(entry: &DebugDirectoryEntry) -> Result<PdbChecksum> {
        let mut parser = Parser::new(&entry.data);
        let algorithm = parser.read_string_utf8()?;
        let checksum = parser.read_remaining().to_vec();

        if algorithm.is_empty() || checksum.is_empty() {
            return Err(malformed_error!("Empty PdbChecksum entry"));
        }

        Ok(PdbChecksum {
            algorithm,
            checksum,
        })
    }
}

/// Decompress the payload of an EmbeddedPortablePdb entry.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for a bad signature, a corrupt deflate stream or a size
/// that does not match the declared one.
pub fn decompress_embedded_pdb(entry: &DebugDirectoryEntry) -> Result<Vec<u8>> {
    let mut parser = Parser::new(&entry.data);
    let signature = parser.read_le::<u32>()?;
    if signature != EMBEDDED_PDB_SIGNATURE {
        return Err(malformed_error!(
            "Invalid embedded PDB signature - 0x{:08X}",
            signature
        ));
    }

    let size = parser.read_le::<u32>()? as usize;
    inflate(parser.read_remaining(), size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(debug_type: DebugType, minor_version: u16, data: Vec<u8>) -> DebugDirectoryEntry {
        DebugDirectoryEntry {
            time_date_stamp: 0,
            major_version: 0x0100,
            minor_version,
            debug_type,
            address_of_raw_data: 0,
            pointer_to_raw_data: 0,
            data,
        }
    }

    #[test]
    fn header() {
        #[rustfmt::skip]
        let data = [
            0x00, 0x00, 0x00, 0x00,
            0x78, 0x56, 0x34, 0x12,
            0x00, 0x01,
            0x4D, 0x50,
            0x02, 0x00, 0x00, 0x00,
            0x20, 0x00, 0x00, 0x00,
            0x00, 0x30, 0x00, 0x00,
            0x00, 0x10, 0x00, 0x00,
        ];

        let mut parser = Parser::new(&data);
        let (entry, size) = DebugDirectoryEntry::read_header(&mut parser).unwrap();

        assert_eq!(size, 0x20);
        assert_eq!(entry.time_date_stamp, 0x1234_5678);
        assert_eq!(entry.debug_type, DebugType::CodeView);
        assert_eq!(entry.address_of_raw_data, 0x3000);
        assert_eq!(entry.pointer_to_raw_data, 0x1000);
        assert!(entry.is_portable_codeview());
        assert!(!parser.has_more_data());
    }

    #[test]
    fn codeview() {
        let mut data = b"RSDS".to_vec();
        data.extend_from_slice(&[0x11; 16]);
        data.extend_from_slice(&1_u32.to_le_bytes());
        data.extend_from_slice(b"C:\\build\\obj\\Release\\Library.pdb\0");

        let codeview = CodeView::parse(&entry(DebugType::CodeView, 0x504D, data)).unwrap();
        assert_eq!(codeview.age, 1);
        assert_eq!(codeview.file_name(), "Library.pdb");
        assert!(codeview.portable);
        assert_eq!(codeview.guid.to_bytes(), [0x11; 16]);

        if CodeView::parse(&entry(DebugType::CodeView, 0, b"NB10abcdefgh".to_vec())).is_ok() {
            panic!("This should not work!")
        }
    }

    #[test]
    fn pdb_checksum() {
        let mut data = b"SHA256\0".to_vec();
        data.extend_from_slice(&[0xAB; 32]);

        let checksum = PdbChecksum::parse(&entry(DebugType::PdbChecksum, 1, data)).unwrap();
        assert_eq!(checksum.algorithm, "SHA256");
        assert_eq!(checksum.checksum, vec![0xAB; 32]);

        assert!(PdbChecksum::parse(&entry(DebugType::PdbChecksum, 1, b"SHA256\0".to_vec())).is_err());
    }

    #[test]
    fn embedded_pdb_bad_signature() {
        let data = b"XPDB\x04\x00\x00\x00".to_vec();
        assert!(decompress_embedded_pdb(&entry(DebugType::EmbeddedPortablePdb, 0x0100, data)).is_err());
    }

    #[test]
    fn debug_type_values() {
        assert_eq!(DebugType::from(17), DebugType::EmbeddedPortablePdb);
        assert_eq!(DebugType::from(19), DebugType::PdbChecksum);
        assert_eq!(DebugType::from(20), DebugType::Unknown(20));
    }
}
