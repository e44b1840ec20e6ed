//! Portable PDB reader.
//!
//! A portable PDB is a standalone metadata root with a `#Pdb` stream and the debug tables
//! (`Document`, `MethodDebugInformation`, `CustomDebugInformation`, ...). [`PortablePdb`] exposes
//! the parts needed to judge the quality of the symbols: the documents with their hashes and
//! embedded sources, Source Link, compiler flags and metadata references.
//!
//! # Examples
//!
//! ```rust,no_run
//! use symscope::metadata::pdb::PortablePdb;
//!
//! let data = std::fs::read("Library.pdb")?;
//! let pdb = PortablePdb::read(&data)?;
//! for document in pdb.documents()? {
//!     println!("{} embedded: {}", document.name, document.embedded_source.is_some());
//! }
//! # Ok::<(), symscope::Error>(())
//! ```

use std::collections::HashMap;

use uguid::Guid;

use crate::{
    file::parser::Parser,
    metadata::{
        customdebuginformation::{
            parse_compilation_options, parse_embedded_source, parse_metadata_references,
            CustomDebugKind, MetadataReference,
        },
        streams::{PdbStream, PDB_ID_SIZE},
        tables::{
            CodedIndex, CustomDebugInformationRaw, DocumentRaw, MethodDebugInformationRaw, TableId,
        },
        view::MetadataView,
    },
    Result,
};

/// One source document recorded in the PDB
#[derive(Debug, Clone)]
pub struct PdbDocument<'a> {
    /// Row id in the `Document` table
    pub rid: u32,
    /// Path of the document at compile time
    pub name: String,
    /// Hash algorithm GUID, `None` if no hash was recorded
    pub hash_algorithm: Option<Guid>,
    /// Hash of the document content
    pub hash: &'a [u8],
    /// Language GUID
    pub language: Option<Guid>,
    /// Raw embedded source blob, if the document is embedded
    pub embedded_source: Option<&'a [u8]>,
}

impl PdbDocument<'_> {
    /// Decode the embedded source content.
    ///
    /// # Errors
    /// Returns an error if the embedded blob is damaged.
    pub fn source(&self) -> Result<Option<Vec<u8>>> {
        self.embedded_source.map(parse_embedded_source).transpose()
    }
}

/// One `CustomDebugInformation` row
#[derive(Debug, Clone)]
pub struct CustomDebugInformation<'a> {
    /// The owning row
    pub parent: CodedIndex,
    /// Kind of the information
    pub kind: CustomDebugKind,
    /// Raw blob
    pub value: &'a [u8],
}

/// A parsed portable PDB
pub struct PortablePdb<'a> {
    data: &'a [u8],
    view: MetadataView<'a>,
    pdb: PdbStream,
}

impl<'a> PortablePdb<'a> {
    /// Parse a portable PDB.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the data is not a metadata root with a `#Pdb`
    /// stream, or a stream is damaged.
    pub fn read(data: &'a [u8]) -> Result<PortablePdb<'a>> {
        let view = MetadataView::read(data)?;
        let Some(pdb) = view.pdb.clone() else {
            return Err(malformed_error!("Metadata has no #Pdb stream"));
        };

        Ok(PortablePdb { data, view, pdb })
    }

    /// The raw PDB bytes
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// The decoded `#Pdb` stream
    #[must_use]
    pub fn pdb_stream(&self) -> &PdbStream {
        &self.pdb
    }

    /// The metadata view over the PDB tables and heaps
    #[must_use]
    pub fn view(&self) -> &MetadataView<'a> {
        &self.view
    }

    /// GUID of the PDB id, matched against the CodeView GUID
    #[must_use]
    pub fn guid(&self) -> Guid {
        self.pdb.guid()
    }

    /// File offset of the 20-byte PDB id, which is zeroed for checksum calculation
    #[must_use]
    pub fn id_offset(&self) -> Option<usize> {
        self.view
            .root
            .stream("#Pdb")
            .map(|header| header.offset as usize)
    }

    /// The PDB bytes with the PDB id zeroed, as hashed for the PE `PdbChecksum` entry
    #[must_use]
    pub fn checksum_content(&self) -> Vec<u8> {
        let mut content = self.data.to_vec();
        if let Some(offset) = self.id_offset() {
            if let Some(id) = content.get_mut(offset..offset + PDB_ID_SIZE) {
                id.fill(0);
            }
        }
        content
    }

    /// Every document with its name decoded and its embedded source attached.
    ///
    /// # Errors
    /// Returns an error if a document row or name blob is damaged.
    pub fn documents(&self) -> Result<Vec<PdbDocument<'a>>> {
        let Some(table) = self.view.table::<DocumentRaw>() else {
            return Ok(Vec::new());
        };

        let mut embedded: HashMap<u32, &'a [u8]> = HashMap::new();
        for info in self.custom_debug_information()? {
            if info.kind == CustomDebugKind::EmbeddedSource && info.parent.tag == TableId::Document
            {
                embedded.insert(info.parent.row, info.value);
            }
        }

        let mut documents = Vec::with_capacity(table.row_count() as usize);
        for row in table.rows()? {
            documents.push(PdbDocument {
                rid: row.rid,
                name: self.document_name(row.name)?,
                hash_algorithm: self.view.guid(row.hash_algorithm)?,
                hash: self.view.blob(row.hash)?,
                language: self.view.guid(row.language)?,
                embedded_source: embedded.get(&row.rid).copied(),
            });
        }

        Ok(documents)
    }

    /// Decode a document name blob.
    ///
    /// The blob holds a separator character (0 for none) followed by compressed blob indexes of
    /// the UTF-8 name parts. Index 0 is an empty part.
    ///
    /// # Errors
    /// Returns an error for a damaged blob or invalid UTF-8.
    pub fn document_name(&self, index: u32) -> Result<String> {
        let mut parser = Parser::new(self.view.blob(index)?);
        if !parser.has_more_data() {
            return Ok(String::new());
        }

        let separator = parser.read_le::<u8>()?;
        let mut name = Vec::new();
        let mut first = true;

        while parser.has_more_data() {
            if !first && separator != 0 {
                name.push(separator);
            }
            first = false;

            let part = parser.read_compressed_uint()?;
            name.extend_from_slice(self.view.blob(part)?);
        }

        String::from_utf8(name).map_err(|error| {
            malformed_error!("Invalid document name {}: {}", index, error.utf8_error())
        })
    }

    /// Every `CustomDebugInformation` row.
    ///
    /// # Errors
    /// Returns an error if a row, kind GUID or blob index is damaged.
    pub fn custom_debug_information(&self) -> Result<Vec<CustomDebugInformation<'a>>> {
        let Some(table) = self.view.table::<CustomDebugInformationRaw>() else {
            return Ok(Vec::new());
        };

        let mut result = Vec::with_capacity(table.row_count() as usize);
        for row in table.rows()? {
            let Some(kind) = self.view.guid(row.kind)? else {
                continue;
            };

            result.push(CustomDebugInformation {
                parent: row.parent,
                kind: CustomDebugKind::from(kind),
                value: self.view.blob(row.value)?,
            });
        }

        Ok(result)
    }

    /// Rows of `MethodDebugInformation`, one per method of the assembly.
    ///
    /// # Errors
    /// Returns the first row decoding error.
    pub fn method_debug_information(&self) -> Result<Vec<MethodDebugInformationRaw>> {
        match self.view.table::<MethodDebugInformationRaw>() {
            Some(table) => table.rows(),
            None => Ok(Vec::new()),
        }
    }

    fn module_information(&self, kind: CustomDebugKind) -> Result<Option<&'a [u8]>> {
        Ok(self
            .custom_debug_information()?
            .into_iter()
            .find(|info| info.kind == kind && info.parent.tag == TableId::Module)
            .map(|info| info.value))
    }

    /// The Source Link JSON attached to the module.
    ///
    /// # Errors
    /// Returns an error if the custom debug information is damaged or not UTF-8.
    pub fn source_link(&self) -> Result<Option<String>> {
        let Some(value) = self.module_information(CustomDebugKind::SourceLink)? else {
            return Ok(None);
        };

        String::from_utf8(value.to_vec())
            .map(Some)
            .map_err(|error| malformed_error!("Source Link is not UTF-8: {}", error.utf8_error()))
    }

    /// The compiler flags attached to the module.
    ///
    /// # Errors
    /// Returns an error if the custom debug information is damaged.
    pub fn compilation_options(&self) -> Result<Vec<(String, String)>> {
        match self.module_information(CustomDebugKind::CompilationOptions)? {
            Some(value) => parse_compilation_options(value),
            None => Ok(Vec::new()),
        }
    }

    /// The metadata references attached to the module.
    ///
    /// # Errors
    /// Returns an error if the custom debug information is damaged.
    pub fn metadata_references(&self) -> Result<Vec<MetadataReference>> {
        match self.module_information(CustomDebugKind::CompilationMetadataReferences)? {
            Some(value) => parse_metadata_references(value),
            None => Ok(Vec::new()),
        }
    }
}
