//! The `#~` stream header and the location of each table (ECMA-335 II.24.2.6).

use strum::IntoEnumIterator;

use crate::{
    file::parser::Parser,
    metadata::{
        streams::PdbStream,
        tables::{MetadataTable, RowReadable, TableId, TableInfo},
    },
    Result,
};

/// `HeapSizes` bit announcing four extra bytes after the row counts
const EXTRA_DATA: u8 = 0x40;

/// The decoded `#~` header with a slice per present table
pub struct TablesHeader<'a> {
    /// Major version of the table schema, 2
    pub major_version: u8,
    /// Minor version of the table schema, 0
    pub minor_version: u8,
    /// Bit vector of present tables
    pub valid: u64,
    /// Bit vector of sorted tables
    pub sorted: u64,
    /// Row counts and index widths
    pub info: TableInfo,
    tables: Vec<Option<&'a [u8]>>,
}

impl<'a> TablesHeader<'a> {
    /// Read the header and locate every table.
    ///
    /// A portable PDB passes its `#Pdb` stream, whose row counts of the assembly tables size
    /// the indexes into them.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if an unknown table is flagged present and
    /// [`crate::Error::OutOfBounds`] if the tables do not fit the stream.
    pub fn read(data: &'a [u8], external: Option<&PdbStream>) -> Result<TablesHeader<'a>> {
        let mut parser = Parser::new(data);

        parser.advance_by(4)?;
        let major_version = parser.read_le::<u8>()?;
        let minor_version = parser.read_le::<u8>()?;
        let heap_sizes = parser.read_le::<u8>()?;
        parser.advance_by(1)?;
        let valid = parser.read_le::<u64>()?;
        let sorted = parser.read_le::<u64>()?;

        let known = TableId::iter().fold(0u64, |mask, table| mask | (1 << table as u64));
        if valid & !known != 0 {
            return Err(malformed_error!(
                "Unknown tables flagged present - 0x{:016x}",
                valid & !known
            ));
        }

        let mut row_counts = [0u32; 64];
        for (table, rows) in row_counts.iter_mut().enumerate() {
            if valid & (1 << table) != 0 {
                *rows = parser.read_le::<u32>()?;
            }
        }

        if heap_sizes & EXTRA_DATA != 0 {
            parser.advance_by(4)?;
        }

        let mut info = TableInfo::new(&row_counts, heap_sizes);
        if let Some(pdb) = external {
            info = info.with_external_rows(
                pdb.referenced_type_system_tables,
                &pdb.referenced_row_counts(),
            );
        }

        let mut tables = vec![None; 64];
        for table in TableId::iter() {
            if valid & (1 << table as u64) == 0 {
                continue;
            }

            let rows = row_counts[table as usize] as usize;
            let Some(size) = rows.checked_mul(info.row_size(table) as usize) else {
                return Err(out_of_bounds_error!());
            };
            tables[table as usize] = Some(parser.read_bytes(size)?);
        }

        Ok(TablesHeader {
            major_version,
            minor_version,
            valid,
            sorted,
            info,
            tables,
        })
    }

    /// Returns `true` if the table is present
    #[must_use]
    pub fn has_table(&self, table: TableId) -> bool {
        self.valid & (1 << table as u64) != 0
    }

    /// Number of rows of `table`, 0 if absent
    #[must_use]
    pub fn table_row_count(&self, table: TableId) -> u32 {
        if self.has_table(table) {
            self.info.get(table).rows
        } else {
            0
        }
    }

    /// Typed access to a present table
    #[must_use]
    pub fn table<T: RowReadable>(&self) -> Option<MetadataTable<'_, T>> {
        let data = self.tables[T::TABLE_ID as usize]?;
        Some(MetadataTable::new(
            data,
            self.table_row_count(T::TABLE_ID),
            &self.info,
        ))
    }
}
