//! Metadata tables of the `#~` stream.
//!
//! Row sizes of every table, including the ones this crate never decodes, are known through
//! [`TableInfo`] so that the start of any table can be located. The tables needed for assembly
//! identity, custom attributes and portable PDB debug information are decoded into typed rows
//! implementing [`RowReadable`] and accessed through [`MetadataTable`].
//!
//! # Reference
//! - ECMA-335 II.22 and II.24.2.6
//! - Portable PDB v1.0 format specification, tables 0x30 to 0x37

mod codedindex;
mod rows;
mod tableinfo;

pub use codedindex::{CodedIndex, CodedIndexType};
pub use rows::{
    AssemblyRaw, AssemblyRefRaw, CustomAttributeRaw, CustomDebugInformationRaw, DocumentRaw,
    FieldRaw, MemberRefRaw, MethodDebugInformationRaw, MethodDefRaw, ModuleRaw, TypeDefRaw,
    TypeRefRaw,
};
pub(crate) use tableinfo::{schema, Column};
pub use tableinfo::{TableInfo, TableRowInfo};

use std::marker::PhantomData;

use strum::{EnumCount, EnumIter};

use crate::Result;

/// Identifiers of the metadata tables
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, EnumIter, EnumCount, PartialOrd, Ord)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum TableId {
    Module = 0x00,
    TypeRef = 0x01,
    TypeDef = 0x02,
    FieldPtr = 0x03,
    Field = 0x04,
    MethodPtr = 0x05,
    MethodDef = 0x06,
    ParamPtr = 0x07,
    Param = 0x08,
    InterfaceImpl = 0x09,
    MemberRef = 0x0A,
    Constant = 0x0B,
    CustomAttribute = 0x0C,
    FieldMarshal = 0x0D,
    DeclSecurity = 0x0E,
    ClassLayout = 0x0F,
    FieldLayout = 0x10,
    StandAloneSig = 0x11,
    EventMap = 0x12,
    EventPtr = 0x13,
    Event = 0x14,
    PropertyMap = 0x15,
    PropertyPtr = 0x16,
    Property = 0x17,
    MethodSemantics = 0x18,
    MethodImpl = 0x19,
    ModuleRef = 0x1A,
    TypeSpec = 0x1B,
    ImplMap = 0x1C,
    FieldRVA = 0x1D,
    EncLog = 0x1E,
    EncMap = 0x1F,
    Assembly = 0x20,
    AssemblyProcessor = 0x21,
    AssemblyOS = 0x22,
    AssemblyRef = 0x23,
    AssemblyRefProcessor = 0x24,
    AssemblyRefOS = 0x25,
    File = 0x26,
    ExportedType = 0x27,
    ManifestResource = 0x28,
    NestedClass = 0x29,
    GenericParam = 0x2A,
    MethodSpec = 0x2B,
    GenericParamConstraint = 0x2C,
    Document = 0x30,
    MethodDebugInformation = 0x31,
    LocalScope = 0x32,
    LocalVariable = 0x33,
    LocalConstant = 0x34,
    ImportScope = 0x35,
    StateMachineMethod = 0x36,
    CustomDebugInformation = 0x37,
}

/// A typed row that can be decoded from table data
pub trait RowReadable: Sized {
    /// The table holding rows of this type
    const TABLE_ID: TableId;

    /// Decode the row with id `rid` at `offset`, advancing `offset` past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated data.
    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self>;
}

/// A view on the rows of one table
pub struct MetadataTable<'a, T> {
    data: &'a [u8],
    row_count: u32,
    row_size: u32,
    sizes: &'a TableInfo,
    _marker: PhantomData<T>,
}

impl<'a, T: RowReadable> MetadataTable<'a, T> {
    /// Create a table view over `data`, which must hold exactly `row_count` rows
    #[must_use]
    pub fn new(data: &'a [u8], row_count: u32, sizes: &'a TableInfo) -> Self {
        MetadataTable {
            data,
            row_count,
            row_size: sizes.row_size(T::TABLE_ID),
            sizes,
            _marker: PhantomData,
        }
    }

    /// Number of rows
    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// The row with 1-based id `rid`, `None` if out of range or undecodable
    #[must_use]
    pub fn get(&self, rid: u32) -> Option<T> {
        if rid == 0 || rid > self.row_count {
            return None;
        }

        let mut offset = (rid - 1) as usize * self.row_size as usize;
        T::row_read(self.data, &mut offset, rid, self.sizes).ok()
    }

    /// Decode every row in order.
    ///
    /// # Errors
    /// Returns the first row decoding error.
    pub fn rows(&self) -> Result<Vec<T>> {
        let mut offset = 0;
        (1..=self.row_count)
            .map(|rid| T::row_read(self.data, &mut offset, rid, self.sizes))
            .collect()
    }

    /// Iterate over the rows, stopping at the first undecodable one
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (1..=self.row_count).map_while(move |rid| self.get(rid))
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn table_ids() {
        assert_eq!(TableId::COUNT, 53);
        assert_eq!(TableId::iter().next(), Some(TableId::Module));
        assert_eq!(TableId::iter().last(), Some(TableId::CustomDebugInformation));
        assert!(TableId::iter().zip(TableId::iter().skip(1)).all(|(a, b)| a < b));
    }
}
