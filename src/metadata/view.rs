//! A borrowed view on one metadata root with its heaps and tables.
//!
//! The same view serves the metadata of an assembly and a portable PDB. When a `#Pdb` stream is
//! present its row counts size the indexes into the assembly tables.

use crate::{
    metadata::{
        root::Root,
        streams::{Blob, Guid, PdbStream, Strings, TablesHeader},
        tables::{MetadataTable, RowReadable},
    },
    Result,
};

/// Heaps and tables of one metadata root
pub struct MetadataView<'a> {
    /// The root with the stream directory
    pub root: Root,
    /// `#Strings`
    pub strings: Option<Strings<'a>>,
    /// `#Blob`
    pub blobs: Option<Blob<'a>>,
    /// `#GUID`
    pub guids: Option<Guid<'a>>,
    /// `#Pdb`, only in portable PDBs
    pub pdb: Option<PdbStream>,
    /// `#~` or `#-`
    pub tables: TablesHeader<'a>,
}

impl<'a> MetadataView<'a> {
    /// Read the metadata root at the start of `data` and locate all streams.
    ///
    /// # Errors
    /// Returns an error if the root or a stream is damaged, or the tables stream is missing.
    pub fn read(data: &'a [u8]) -> Result<MetadataView<'a>> {
        let root = Root::read(data)?;

        let stream = |name: &str| -> Option<&'a [u8]> {
            root.stream(name).and_then(|header| {
                data.get(header.offset as usize..(header.offset + header.size) as usize)
            })
        };

        let strings = stream("#Strings").map(Strings::from).transpose()?;
        let blobs = stream("#Blob").map(Blob::from).transpose()?;
        let guids = stream("#GUID").map(Guid::from).transpose()?;
        let pdb = stream("#Pdb").map(PdbStream::read).transpose()?;

        let Some(tables_data) = stream("#~").or_else(|| stream("#-")) else {
            return Err(malformed_error!("Metadata has no tables stream"));
        };
        let tables = TablesHeader::read(tables_data, pdb.as_ref())?;

        Ok(MetadataView {
            root,
            strings,
            blobs,
            guids,
            pdb,
            tables,
        })
    }

    /// Typed access to a present table
    #[must_use]
    pub fn table<T: RowReadable>(&self) -> Option<MetadataTable<'_, T>> {
        self.tables.table::<T>()
    }

    /// The `#Strings` entry at `index`; index 0 is the empty string.
    ///
    /// # Errors
    /// Returns an error for an invalid index or a missing heap.
    pub fn string(&self, index: u32) -> Result<&'a str> {
        match (index, &self.strings) {
            (0, _) => Ok(""),
            (_, Some(strings)) => strings.get(index as usize),
            (_, None) => Err(malformed_error!("String {} referenced without #Strings", index)),
        }
    }

    /// The `#Blob` entry at `index`; index 0 is the empty blob.
    ///
    /// # Errors
    /// Returns an error for an invalid index or a missing heap.
    pub fn blob(&self, index: u32) -> Result<&'a [u8]> {
        match (index, &self.blobs) {
            (0, _) => Ok(&[]),
            (_, Some(blobs)) => blobs.get(index as usize),
            (_, None) => Err(malformed_error!("Blob {} referenced without #Blob", index)),
        }
    }

    /// The `#GUID` entry at `index`; index 0 is the nil reference.
    ///
    /// # Errors
    /// Returns an error for an invalid index or a missing heap.
    pub fn guid(&self, index: u32) -> Result<Option<uguid::Guid>> {
        match (index, &self.guids) {
            (0, _) => Ok(None),
            (_, Some(guids)) => guids.get(index as usize).map(Some),
            (_, None) => Err(malformed_error!("Guid {} referenced without #GUID", index)),
        }
    }
}
