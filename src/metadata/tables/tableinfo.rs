use strum::{EnumCount, IntoEnumIterator};

use crate::metadata::tables::{CodedIndexType, TableId};

/// Row count and index width of one table
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct TableRowInfo {
    /// Number of rows
    pub rows: u32,
    /// Bits needed to address every row
    pub bits: u8,
    /// Whether simple indexes into this table take 4 bytes
    pub is_large: bool,
}

impl TableRowInfo {
    /// Row info for a table with `rows` rows
    #[must_use]
    pub fn new(rows: u32) -> Self {
        let bits = if rows == 0 {
            1
        } else {
            (32 - rows.leading_zeros()) as u8
        };

        TableRowInfo {
            rows,
            bits,
            is_large: rows > u32::from(u16::MAX),
        }
    }
}

/// A column of a metadata table row
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Column {
    /// A fixed-size integer of the given byte width
    Fixed(u8),
    /// `#Strings` heap index
    Str,
    /// `#GUID` heap index
    Guid,
    /// `#Blob` heap index
    Blob,
    /// Simple index into a table
    Table(TableId),
    /// Coded index
    Coded(CodedIndexType),
}

/// Row layouts from ECMA-335 II.22 and the portable PDB format
pub(crate) fn schema(table: TableId) -> &'static [Column] {
    use Column::{Blob, Coded, Fixed, Guid, Str, Table};

    match table {
        TableId::Module => &[Fixed(2), Str, Guid, Guid, Guid],
        TableId::TypeRef => &[Coded(CodedIndexType::ResolutionScope), Str, Str],
        TableId::TypeDef => &[
            Fixed(4),
            Str,
            Str,
            Coded(CodedIndexType::TypeDefOrRef),
            Table(TableId::Field),
            Table(TableId::MethodDef),
        ],
        TableId::FieldPtr => &[Table(TableId::Field)],
        TableId::Field => &[Fixed(2), Str, Blob],
        TableId::MethodPtr => &[Table(TableId::MethodDef)],
        TableId::MethodDef => &[Fixed(4), Fixed(2), Fixed(2), Str, Blob, Table(TableId::Param)],
        TableId::ParamPtr => &[Table(TableId::Param)],
        TableId::Param => &[Fixed(2), Fixed(2), Str],
        TableId::InterfaceImpl => &[Table(TableId::TypeDef), Coded(CodedIndexType::TypeDefOrRef)],
        TableId::MemberRef => &[Coded(CodedIndexType::MemberRefParent), Str, Blob],
        TableId::Constant => &[Fixed(1), Fixed(1), Coded(CodedIndexType::HasConstant), Blob],
        TableId::CustomAttribute => &[
            Coded(CodedIndexType::HasCustomAttribute),
            Coded(CodedIndexType::CustomAttributeType),
            Blob,
        ],
        TableId::FieldMarshal => &[Coded(CodedIndexType::HasFieldMarshal), Blob],
        TableId::DeclSecurity => &[Fixed(2), Coded(CodedIndexType::HasDeclSecurity), Blob],
        TableId::ClassLayout => &[Fixed(2), Fixed(4), Table(TableId::TypeDef)],
        TableId::FieldLayout => &[Fixed(4), Table(TableId::Field)],
        TableId::StandAloneSig => &[Blob],
        TableId::EventMap => &[Table(TableId::TypeDef), Table(TableId::Event)],
        TableId::EventPtr => &[Table(TableId::Event)],
        TableId::Event => &[Fixed(2), Str, Coded(CodedIndexType::TypeDefOrRef)],
        TableId::PropertyMap => &[Table(TableId::TypeDef), Table(TableId::Property)],
        TableId::PropertyPtr => &[Table(TableId::Property)],
        TableId::Property => &[Fixed(2), Str, Blob],
        TableId::MethodSemantics => &[
            Fixed(2),
            Table(TableId::MethodDef),
            Coded(CodedIndexType::HasSemantics),
        ],
        TableId::MethodImpl => &[
            Table(TableId::TypeDef),
            Coded(CodedIndexType::MethodDefOrRef),
            Coded(CodedIndexType::MethodDefOrRef),
        ],
        TableId::ModuleRef => &[Str],
        TableId::TypeSpec => &[Blob],
        TableId::ImplMap => &[
            Fixed(2),
            Coded(CodedIndexType::MemberForwarded),
            Str,
            Table(TableId::ModuleRef),
        ],
        TableId::FieldRVA => &[Fixed(4), Table(TableId::Field)],
        TableId::EncLog => &[Fixed(4), Fixed(4)],
        TableId::EncMap => &[Fixed(4)],
        TableId::Assembly => &[
            Fixed(4),
            Fixed(2),
            Fixed(2),
            Fixed(2),
            Fixed(2),
            Fixed(4),
            Blob,
            Str,
            Str,
        ],
        TableId::AssemblyProcessor => &[Fixed(4)],
        TableId::AssemblyOS => &[Fixed(4), Fixed(4), Fixed(4)],
        TableId::AssemblyRef => &[
            Fixed(2),
            Fixed(2),
            Fixed(2),
            Fixed(2),
            Fixed(4),
            Blob,
            Str,
            Str,
            Blob,
        ],
        TableId::AssemblyRefProcessor => &[Fixed(4), Table(TableId::AssemblyRef)],
        TableId::AssemblyRefOS => &[Fixed(4), Fixed(4), Fixed(4), Table(TableId::AssemblyRef)],
        TableId::File => &[Fixed(4), Str, Blob],
        TableId::ExportedType => &[
            Fixed(4),
            Fixed(4),
            Str,
            Str,
            Coded(CodedIndexType::Implementation),
        ],
        TableId::ManifestResource => &[
            Fixed(4),
            Fixed(4),
            Str,
            Coded(CodedIndexType::Implementation),
        ],
        TableId::NestedClass => &[Table(TableId::TypeDef), Table(TableId::TypeDef)],
        TableId::GenericParam => &[
            Fixed(2),
            Fixed(2),
            Coded(CodedIndexType::TypeOrMethodDef),
            Str,
        ],
        TableId::MethodSpec => &[Coded(CodedIndexType::MethodDefOrRef), Blob],
        TableId::GenericParamConstraint => &[
            Table(TableId::GenericParam),
            Coded(CodedIndexType::TypeDefOrRef),
        ],
        TableId::Document => &[Blob, Guid, Blob, Guid],
        TableId::MethodDebugInformation => &[Table(TableId::Document), Blob],
        TableId::LocalScope => &[
            Table(TableId::MethodDef),
            Table(TableId::ImportScope),
            Table(TableId::LocalVariable),
            Table(TableId::LocalConstant),
            Fixed(4),
            Fixed(4),
        ],
        TableId::LocalVariable => &[Fixed(2), Fixed(2), Str],
        TableId::LocalConstant => &[Str, Blob],
        TableId::ImportScope => &[Table(TableId::ImportScope), Blob],
        TableId::StateMachineMethod => &[Table(TableId::MethodDef), Table(TableId::MethodDef)],
        TableId::CustomDebugInformation => &[
            Coded(CodedIndexType::HasCustomDebugInformation),
            Guid,
            Blob,
        ],
    }
}

/// Row counts and index widths of every table of a metadata image.
///
/// Index widths depend on the row counts of the referenced tables. A standalone portable PDB
/// references type-system tables that live in the assembly; their row counts come from the
/// `#Pdb` stream and are merged in with [`TableInfo::with_external_rows`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableInfo {
    rows: Vec<TableRowInfo>,
    coded_indexes: Vec<u8>,
    is_large_index_str: bool,
    is_large_index_guid: bool,
    is_large_index_blob: bool,
}

impl TableInfo {
    /// Build the table info from per-table row counts (indexed by table id) and the
    /// `HeapSizes` flags of the `#~` header.
    #[must_use]
    pub fn new(row_counts: &[u32; 64], heap_sizes: u8) -> Self {
        let mut table_info = TableInfo {
            rows: vec![TableRowInfo::default(); 64],
            coded_indexes: vec![0; CodedIndexType::COUNT],
            is_large_index_str: heap_sizes & 0x01 != 0,
            is_large_index_guid: heap_sizes & 0x02 != 0,
            is_large_index_blob: heap_sizes & 0x04 != 0,
        };

        for table in TableId::iter() {
            table_info.rows[table as usize] = TableRowInfo::new(row_counts[table as usize]);
        }

        table_info.calculate_coded_index_bits();
        table_info
    }

    /// Merge the row counts of tables stored in another image.
    ///
    /// Counts are taken for the tables flagged in `referenced`, in ascending table id order.
    #[must_use]
    pub fn with_external_rows(mut self, referenced: u64, counts: &[u32]) -> Self {
        let mut counts = counts.iter();
        for table in TableId::iter() {
            if referenced & (1 << table as u64) == 0 {
                continue;
            }
            if let Some(rows) = counts.next() {
                self.rows[table as usize] = TableRowInfo::new(*rows);
            }
        }

        self.calculate_coded_index_bits();
        self
    }

    /// Row info of `table`
    #[must_use]
    pub fn get(&self, table: TableId) -> &TableRowInfo {
        &self.rows[table as usize]
    }

    /// Returns `true` if `#Strings` indexes are 4 bytes wide
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.is_large_index_str
    }

    /// Returns `true` if `#GUID` indexes are 4 bytes wide
    #[must_use]
    pub fn is_large_guid(&self) -> bool {
        self.is_large_index_guid
    }

    /// Returns `true` if `#Blob` indexes are 4 bytes wide
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.is_large_index_blob
    }

    /// Returns `true` if simple indexes into `table` are 4 bytes wide
    #[must_use]
    pub fn is_large(&self, table: TableId) -> bool {
        self.rows[table as usize].is_large
    }

    /// Width in bytes of a coded index
    #[must_use]
    pub fn coded_index_bytes(&self, coded_index_type: CodedIndexType) -> u8 {
        if self.coded_indexes[coded_index_type as usize] > 16 {
            4
        } else {
            2
        }
    }

    /// Width in bytes of one column
    pub(crate) fn column_bytes(&self, column: Column) -> u32 {
        let wide = |large: bool| if large { 4 } else { 2 };
        match column {
            Column::Fixed(width) => u32::from(width),
            Column::Str => wide(self.is_large_index_str),
            Column::Guid => wide(self.is_large_index_guid),
            Column::Blob => wide(self.is_large_index_blob),
            Column::Table(table) => wide(self.is_large(table)),
            Column::Coded(coded) => u32::from(self.coded_index_bytes(coded)),
        }
    }

    /// Size in bytes of one row of `table`
    #[must_use]
    pub fn row_size(&self, table: TableId) -> u32 {
        schema(table)
            .iter()
            .map(|column| self.column_bytes(*column))
            .sum()
    }

    fn calculate_coded_index_bits(&mut self) {
        for coded_index in CodedIndexType::iter() {
            let max_bits = coded_index
                .tables()
                .iter()
                .flatten()
                .map(|table| self.rows[*table as usize].bits)
                .max()
                .unwrap_or(1);

            self.coded_indexes[coded_index as usize] = max_bits + coded_index.tag_bits();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(tables: &[(TableId, u32)]) -> [u32; 64] {
        let mut counts = [0; 64];
        for (table, rows) in tables {
            counts[*table as usize] = *rows;
        }
        counts
    }

    #[test]
    fn small_image() {
        let info = TableInfo::new(&counts(&[(TableId::TypeDef, 10), (TableId::Field, 4)]), 0);

        assert_eq!(info.row_size(TableId::Module), 10);
        assert_eq!(info.row_size(TableId::TypeDef), 14);
        assert_eq!(info.row_size(TableId::Assembly), 22);
        assert_eq!(info.row_size(TableId::AssemblyRef), 20);
        assert_eq!(info.row_size(TableId::Document), 8);
        assert_eq!(info.row_size(TableId::LocalScope), 16);
        assert_eq!(info.row_size(TableId::CustomDebugInformation), 6);
    }

    #[test]
    fn wide_heaps() {
        let info = TableInfo::new(&[0; 64], 0x07);

        assert_eq!(info.row_size(TableId::Module), 2 + 4 * 4);
        assert_eq!(info.row_size(TableId::Document), 16);
    }

    #[test]
    fn coded_index_widths() {
        let info = TableInfo::new(&counts(&[(TableId::TypeRef, 0x3FFF)]), 0);
        assert_eq!(info.coded_index_bytes(CodedIndexType::TypeDefOrRef), 2);

        let info = TableInfo::new(&counts(&[(TableId::TypeRef, 0x4000)]), 0);
        assert_eq!(info.coded_index_bytes(CodedIndexType::TypeDefOrRef), 4);
        assert_eq!(info.row_size(TableId::TypeRef), 8);
    }

    #[test]
    fn external_rows() {
        let info = TableInfo::new(&[0; 64], 0);
        assert!(!info.is_large(TableId::MethodDef));

        let referenced = 1 << TableId::TypeDef as u64 | 1 << TableId::MethodDef as u64;
        let info = info.with_external_rows(referenced, &[12, 0x10000]);

        assert_eq!(info.get(TableId::TypeDef).rows, 12);
        assert!(info.is_large(TableId::MethodDef));
        assert_eq!(info.row_size(TableId::StateMachineMethod), 8);
        assert_eq!(info.coded_index_bytes(CodedIndexType::HasCustomDebugInformation), 4);
    }
}
