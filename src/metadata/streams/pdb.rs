//! The `#Pdb` stream of a portable PDB.
//!
//! ```text
//! PdbId                   20 bytes  (GUID followed by a 4-byte stamp)
//! EntryPoint              u32       (MethodDef token or 0)
//! ReferencedTypeSystemTables  u64   (bit vector of tables living in the assembly)
//! TypeSystemTableRows     u32[n]    (one per set bit, ascending table id)
//! ```

use crate::{file::parser::Parser, metadata::token::Token, Result};

/// Size of the PDB id
pub const PDB_ID_SIZE: usize = 20;

/// Content of the `#Pdb` stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdbStream {
    /// PDB id, matched against the CodeView record of the assembly
    pub id: [u8; PDB_ID_SIZE],
    /// Entry point of the assembly, nil for libraries
    pub entry_point: Token,
    /// Tables of the assembly referenced from the PDB tables
    pub referenced_type_system_tables: u64,
    /// Row counts of the assembly tables, indexed by table id
    pub type_system_table_rows: [u32; 64],
}

impl PdbStream {
    /// Read the stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for a truncated stream.
    pub fn read(data: &[u8]) -> Result<PdbStream> {
        let mut parser = Parser::new(data);

        let mut id = [0u8; PDB_ID_SIZE];
        id.copy_from_slice(parser.read_bytes(PDB_ID_SIZE)?);

        let entry_point = Token::new(parser.read_le::<u32>()?);
        let referenced_type_system_tables = parser.read_le::<u64>()?;

        let mut type_system_table_rows = [0u32; 64];
        for (table, rows) in type_system_table_rows.iter_mut().enumerate() {
            if referenced_type_system_tables & (1 << table) != 0 {
                *rows = parser.read_le::<u32>()?;
            }
        }

        Ok(PdbStream {
            id,
            entry_point,
            referenced_type_system_tables,
            type_system_table_rows,
        })
    }

    /// Row counts of the referenced tables, in ascending table id order
    #[must_use]
    pub fn referenced_row_counts(&self) -> Vec<u32> {
        (0..64)
            .filter(|table| self.referenced_type_system_tables & (1 << table) != 0)
            .map(|table| self.type_system_table_rows[table])
            .collect()
    }

    /// The GUID part of the PDB id
    #[must_use]
    pub fn guid(&self) -> uguid::Guid {
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&self.id[..16]);
        uguid::Guid::from_bytes(bytes)
    }

    /// The stamp part of the PDB id
    #[must_use]
    pub fn stamp(&self) -> u32 {
        u32::from_le_bytes([self.id[16], self.id[17], self.id[18], self.id[19]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data = [
            0x8e, 0x90, 0x37, 0xd4, 0xe6, 0x65, 0x7c, 0x48, 0x97, 0x35, 0x7b, 0xdf, 0xf6, 0x99, 0xbe, 0xa5,
            0x78, 0x56, 0x34, 0x12,
            0x01, 0x00, 0x00, 0x06,
            0x44, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x07, 0x00, 0x00, 0x00,
            0x03, 0x00, 0x00, 0x00,
        ];

        let stream = PdbStream::read(&data).unwrap();

        assert_eq!(stream.guid(), uguid::guid!("d437908e-65e6-487c-9735-7bdff699bea5"));
        assert_eq!(stream.stamp(), 0x1234_5678);
        assert_eq!(stream.entry_point, Token::new(0x0600_0001));
        assert_eq!(stream.type_system_table_rows[0x02], 7);
        assert_eq!(stream.type_system_table_rows[0x06], 3);
        assert_eq!(stream.type_system_table_rows[0x04], 0);
        assert_eq!(stream.referenced_row_counts(), vec![7, 3]);
    }

    #[test]
    fn truncated() {
        let mut data = vec![0u8; 32];
        data[24] = 0x01;
        if PdbStream::read(&data).is_ok() {
            panic!("This should not work!")
        }
    }
}
