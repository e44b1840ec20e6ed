//! PE image access and debug-relevant data directories.
//!
//! This module wraps a PE image (a managed assembly, or a native binary shipped in a package)
//! and exposes the pieces symbol validation needs:
//!
//! - the debug directory ([`crate::file::File::debug_directory`]) and the typed views on it:
//!   CodeView records, PDB checksums and the embedded portable PDB
//! - the attribute certificate table carrying the Authenticode signature
//! - the CLR runtime header and the ECMA-335 metadata root it points to
//!
//! Header parsing is delegated to `goblin`; the structures `goblin` does not model are read with
//! [`crate::file::parser::Parser`].
//!
//! # Data Sources
//!
//! The image is held by a [`crate::file::Backend`], either an owned buffer (files extracted from
//! a package, downloaded symbols) or a read-only memory map of a file on disk.
//!
//! # Examples
//!
//! ```rust,no_run
//! use symscope::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("bin/Release/net8.0/Library.dll"))?;
//!
//! if let Some(pdb) = file.embedded_pdb()? {
//!     println!("Embedded portable PDB with {} bytes", pdb.len());
//! }
//!
//! for checksum in file.pdb_checksums()? {
//!     println!("{} checksum over the PDB", checksum.algorithm);
//! }
//! # Ok::<(), symscope::Error>(())
//! ```

pub mod certificate;
pub mod debug;
pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use crate::{
    file::{
        certificate::{parse_certificate_table, WinCertificate},
        debug::{
            decompress_embedded_pdb, CodeView, DebugDirectoryEntry, DebugType, PdbChecksum,
            DEBUG_DIRECTORY_ENTRY_SIZE,
        },
        parser::Parser,
    },
    metadata::cor20header::Cor20Header,
    Error::{Empty, GoblinErr},
    Result,
};
use goblin::pe::{data_directories::DataDirectoryType, PE};
use memory::Memory;
use ouroboros::self_referencing;
use physical::Physical;

/// Backend trait for file data sources.
///
/// Implementations only provide the full byte view; bounded access is derived from it.
pub trait Backend: Send + Sync {
    /// The complete data of this backend
    fn data(&self) -> &[u8];

    /// Length of the data in bytes
    fn len(&self) -> usize {
        self.data().len()
    }

    /// Bounds-checked access to `len` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the data.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(out_of_bounds_error!());
        };

        self.data()
            .get(offset..offset_end)
            .ok_or(out_of_bounds_error!())
    }
}

/// A parsed PE image.
///
/// ```rust,no_run
/// use symscope::File;
///
/// let data = std::fs::read("Library.dll")?;
/// let file = File::from_mem(data)?;
///
/// if let Some(codeview) = file.codeview()? {
///     println!("{} {:?} age {}", codeview.path, codeview.guid, codeview.age);
/// }
/// # Ok::<(), symscope::Error>(())
/// ```
#[self_referencing]
pub struct File {
    /// The underlying data source (memory or file).
    data: Box<dyn Backend>,
    /// The parsed PE structure, referencing the data.
    #[borrows(data)]
    #[not_covariant]
    pe: PE<'this>,
}

impl File {
    /// Map and parse the PE image at `file`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, is empty, or is not a PE image with an
    /// optional header.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Parse a PE image held in memory.
    ///
    /// # Errors
    /// Returns an error if the buffer is empty or is not a PE image with an optional header.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let data = Box::new(data);

        File::try_new(data, |data| match PE::parse(data.data()) {
            Ok(pe) => {
                if pe.header.optional_header.is_none() {
                    Err(malformed_error!("File does not have an OptionalHeader"))
                } else {
                    Ok(pe)
                }
            }
            Err(error) => Err(GoblinErr(error)),
        })
    }

    /// Returns the total size of the loaded image in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns `true` if the image has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw bytes of the image
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.with_data(|data| data.data())
    }

    /// Bounds-checked access to `len` bytes at file offset `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the image.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.with_data(|data| data.data_slice(offset, len))
    }

    /// Returns `true` if the image is a managed assembly
    #[must_use]
    pub fn is_managed(&self) -> bool {
        self.get_data_directory(DataDirectoryType::ClrRuntimeHeader)
            .is_some()
    }

    /// The RVA and size of a data directory, `None` if the directory is absent or empty.
    #[must_use]
    pub fn get_data_directory(&self, dir_type: DataDirectoryType) -> Option<(u32, u32)> {
        self.with_pe(|pe| {
            pe.header.optional_header.as_ref().and_then(|optional_header| {
                optional_header
                    .data_directories
                    .dirs()
                    .find(|(directory_type, directory)| {
                        *directory_type == dir_type
                            && directory.virtual_address != 0
                            && directory.size != 0
                    })
                    .map(|(_, directory)| (directory.virtual_address, directory.size))
            })
        })
    }

    /// Translate a relative virtual address into a file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no section maps the address.
    pub fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        let rva_u32 =
            u32::try_from(rva).map_err(|_| malformed_error!("RVA too large to fit in u32: {}", rva))?;

        self.with_pe(|pe| {
            for section in &pe.sections {
                let size = section.virtual_size.max(section.size_of_raw_data);
                let Some(section_max) = section.virtual_address.checked_add(size) else {
                    return Err(malformed_error!(
                        "Section malformed, causing integer overflow - {} + {}",
                        section.virtual_address,
                        size
                    ));
                };

                if section.virtual_address <= rva_u32 && section_max > rva_u32 {
                    return Ok((rva - section.virtual_address as usize)
                        + section.pointer_to_raw_data as usize);
                }
            }

            Err(malformed_error!(
                "RVA could not be converted to offset - {}",
                rva
            ))
        })
    }

    /// Contents of a data directory, addressed by RVA.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be mapped into the image.
    pub fn data_directory_slice(&self, dir_type: DataDirectoryType) -> Result<Option<&[u8]>> {
        let Some((rva, size)) = self.get_data_directory(dir_type) else {
            return Ok(None);
        };

        let offset = self.rva_to_offset(rva as usize)?;
        self.data_slice(offset, size as usize).map(Some)
    }

    /// Parse all entries of the debug directory, with their payloads.
    ///
    /// An image without a debug directory yields an empty list.
    ///
    /// # Errors
    /// Returns an error if the directory or one of its payloads lies outside the image.
    pub fn debug_directory(&self) -> Result<Vec<DebugDirectoryEntry>> {
        let Some(directory) = self.data_directory_slice(DataDirectoryType::DebugTable)? else {
            return Ok(Vec::new());
        };

        let count = directory.len() / DEBUG_DIRECTORY_ENTRY_SIZE;
        let mut parser = Parser::new(directory);
        let mut entries = Vec::with_capacity(count);

        for _ in 0..count {
            let (mut entry, size) = DebugDirectoryEntry::read_header(&mut parser)?;
            if size > 0 {
                let offset = if entry.pointer_to_raw_data != 0 {
                    entry.pointer_to_raw_data as usize
                } else {
                    self.rva_to_offset(entry.address_of_raw_data as usize)?
                };
                entry.data = self.data_slice(offset, size as usize)?.to_vec();
            }

            entries.push(entry);
        }

        Ok(entries)
    }

    /// Decompressed embedded portable PDB, `None` if the image does not embed one.
    ///
    /// # Errors
    /// Returns an error if the debug directory is damaged or the payload cannot be inflated.
    pub fn embedded_pdb(&self) -> Result<Option<Vec<u8>>> {
        match self
            .debug_directory()?
            .iter()
            .find(|entry| entry.debug_type == DebugType::EmbeddedPortablePdb)
        {
            Some(entry) => decompress_embedded_pdb(entry).map(Some),
            None => Ok(None),
        }
    }

    /// All `RSDS` CodeView records of the image, in directory order.
    ///
    /// # Errors
    /// Returns an error if the debug directory is damaged.
    pub fn codeviews(&self) -> Result<Vec<CodeView>> {
        self.debug_directory()?
            .iter()
            .filter(|entry| entry.debug_type == DebugType::CodeView)
            .map(CodeView::parse)
            .collect()
    }

    /// The first CodeView record, which identifies the primary PDB.
    ///
    /// # Errors
    /// Returns an error if the debug directory is damaged.
    pub fn codeview(&self) -> Result<Option<CodeView>> {
        Ok(self.codeviews()?.into_iter().next())
    }

    /// All PdbChecksum records of the image.
    ///
    /// # Errors
    /// Returns an error if the debug directory is damaged.
    pub fn pdb_checksums(&self) -> Result<Vec<PdbChecksum>> {
        self.debug_directory()?
            .iter()
            .filter(|entry| entry.debug_type == DebugType::PdbChecksum)
            .map(PdbChecksum::parse)
            .collect()
    }

    /// Entries of the attribute certificate table.
    ///
    /// The certificate directory holds a file offset rather than an RVA.
    ///
    /// # Errors
    /// Returns an error if the table lies outside the image or is damaged.
    pub fn authenticode_certificates(&self) -> Result<Vec<WinCertificate>> {
        let Some((offset, size)) = self.get_data_directory(DataDirectoryType::CertificateTable)
        else {
            return Ok(Vec::new());
        };

        parse_certificate_table(self.data_slice(offset as usize, size as usize)?)
    }

    /// The CLR runtime header of a managed image.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] for native images.
    pub fn cor20_header(&self) -> Result<Cor20Header> {
        match self.data_directory_slice(DataDirectoryType::ClrRuntimeHeader)? {
            Some(data) => Cor20Header::read(data),
            None => Err(crate::Error::NotSupported),
        }
    }

    /// The ECMA-335 metadata (starting at the `BSJB` root) of a managed image.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] for native images and an error if the metadata
    /// cannot be mapped.
    pub fn metadata(&self) -> Result<&[u8]> {
        let header = self.cor20_header()?;
        let offset = self.rva_to_offset(header.meta_data_rva as usize)?;

        self.data_slice(offset, header.meta_data_size as usize)
    }
}
