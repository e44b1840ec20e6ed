//! Custom debug information blobs of portable PDBs.
//!
//! Each `CustomDebugInformation` row pairs a kind GUID with a blob. The kinds decoded here are the
//! ones symbol validation relies on:
//!
//! - **Source Link** - a UTF-8 JSON document mapping local paths to URLs, attached to the module
//! - **Embedded source** - the source text of a document, raw or deflate-compressed
//! - **Compilation options** - the compiler flags as NUL-terminated key/value pairs
//! - **Compilation metadata references** - the assemblies the compilation referenced
//!
//! # Reference
//! - Portable PDB v1.0 format specification, "Custom Debug Information"

use uguid::{guid, Guid};

use crate::{file::parser::Parser, utils::decompress::inflate, Result};

/// Source Link JSON
pub const SOURCE_LINK: Guid = guid!("CC110556-A091-4D38-9FEC-25AB9A351A6A");
/// Embedded document source
pub const EMBEDDED_SOURCE: Guid = guid!("0E8A571B-6926-466E-B4AD-8AB04611F5FE");
/// Compiler options
pub const COMPILATION_OPTIONS: Guid = guid!("B5FEEC05-8CD0-4A83-96DA-466284BB4BD8");
/// Metadata references of the compilation
pub const COMPILATION_METADATA_REFERENCES: Guid = guid!("7E4D4708-096E-4C5C-AEDA-CB10BA6A740D");

/// Known custom debug information kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomDebugKind {
    /// [`SOURCE_LINK`]
    SourceLink,
    /// [`EMBEDDED_SOURCE`]
    EmbeddedSource,
    /// [`COMPILATION_OPTIONS`]
    CompilationOptions,
    /// [`COMPILATION_METADATA_REFERENCES`]
    CompilationMetadataReferences,
    /// Any other kind
    Unknown(Guid),
}

impl From<Guid> for CustomDebugKind {
    fn from(guid: Guid) -> Self {
        if guid == SOURCE_LINK {
            CustomDebugKind::SourceLink
        } else if guid == EMBEDDED_SOURCE {
            CustomDebugKind::EmbeddedSource
        } else if guid == COMPILATION_OPTIONS {
            CustomDebugKind::CompilationOptions
        } else if guid == COMPILATION_METADATA_REFERENCES {
            CustomDebugKind::CompilationMetadataReferences
        } else {
            CustomDebugKind::Unknown(guid)
        }
    }
}

/// One entry of the compilation metadata references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataReference {
    /// File name of the referenced assembly
    pub file_name: String,
    /// Extern aliases
    pub aliases: Vec<String>,
    /// `MetadataImageKind` and embed-interop-types flags
    pub flags: u8,
    /// COFF timestamp of the referenced image
    pub time_stamp: u32,
    /// `SizeOfImage` of the referenced image
    pub image_size: u32,
    /// Module version id of the referenced image
    pub mvid: Guid,
}

/// Decode an embedded source blob into the source bytes.
///
/// The blob starts with an `int32` format: 0 for uncompressed content, a positive value for
/// deflate-compressed content of that decompressed size.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for a negative format or corrupt compressed data.
pub fn parse_embedded_source(data: &[u8]) -> Result<Vec<u8>> {
    let mut parser = Parser::new(data);
    let format = parser.read_le::<i32>()?;
    let content = parser.read_remaining();

    match format {
        0 => Ok(content.to_vec()),
        size if size > 0 => inflate(content, size as usize),
        _ => Err(malformed_error!("Invalid embedded source format - {}", format)),
    }
}

/// Decode the compilation options into ordered key/value pairs.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for invalid UTF-8 or a key without a value.
pub fn parse_compilation_options(data: &[u8]) -> Result<Vec<(String, String)>> {
    let mut parser = Parser::new(data);
    let mut options = Vec::new();

    while parser.has_more_data() {
        let key = parser.read_string_utf8()?;
        if !parser.has_more_data() {
            return Err(malformed_error!("Compilation option '{}' without a value", key));
        }
        let value = parser.read_string_utf8()?;
        options.push((key, value));
    }

    Ok(options)
}

/// Decode the compilation metadata references.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] for a truncated entry.
pub fn parse_metadata_references(data: &[u8]) -> Result<Vec<MetadataReference>> {
    let mut parser = Parser::new(data);
    let mut references = Vec::new();

    while parser.has_more_data() {
        let file_name = parser.read_string_utf8()?;
        let aliases = parser.read_string_utf8()?;
        let flags = parser.read_le::<u8>()?;
        let time_stamp = parser.read_le::<u32>()?;
        let image_size = parser.read_le::<u32>()?;

        let mut mvid = [0u8; 16];
        mvid.copy_from_slice(parser.read_bytes(16)?);

        references.push(MetadataReference {
            file_name,
            aliases: aliases
                .split(',')
                .filter(|alias| !alias.is_empty())
                .map(str::to_string)
                .collect(),
            flags,
            time_stamp,
            image_size,
            mvid: Guid::from_bytes(mvid),
        });
    }

    Ok(references)
}
