//! The CLR runtime header (`IMAGE_COR20_HEADER`, ECMA-335 II.25.3.3).

use crate::{file::parser::Parser, Result};

/// Size of the CLR runtime header in bytes
pub const COR20_HEADER_SIZE: usize = 72;

/// The parts of the CLR runtime header needed to reach the metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cor20Header {
    /// Major version of the runtime required to run the assembly
    pub major_runtime_version: u16,
    /// Minor version of the runtime required to run the assembly
    pub minor_runtime_version: u16,
    /// RVA of the metadata root
    pub meta_data_rva: u32,
    /// Size of the metadata
    pub meta_data_size: u32,
    /// `COMIMAGE_FLAGS_*`
    pub flags: u32,
    /// Entry point token or RVA, depending on `flags`
    pub entry_point_token: u32,
    /// RVA of the strong name signature, 0 if the assembly is not strong-name signed
    pub strong_name_signature_rva: u32,
    /// Size of the strong name signature
    pub strong_name_signature_size: u32,
}

impl Cor20Header {
    /// `COMIMAGE_FLAGS_STRONGNAMESIGNED`
    pub const FLAGS_STRONG_NAME_SIGNED: u32 = 0x0000_0008;

    /// Read the header from the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated input and
    /// [`crate::Error::Malformed`] if `cb` is not 72 or the metadata location is empty.
    pub fn read(data: &[u8]) -> Result<Cor20Header> {
        let mut parser = Parser::new(data);

        let cb = parser.read_le::<u32>()? as usize;
        if cb != COR20_HEADER_SIZE {
            return Err(malformed_error!(
                "Invalid CLR header size: expected 72, got {}",
                cb
            ));
        }

        let major_runtime_version = parser.read_le::<u16>()?;
        let minor_runtime_version = parser.read_le::<u16>()?;
        let meta_data_rva = parser.read_le::<u32>()?;
        let meta_data_size = parser.read_le::<u32>()?;
        if meta_data_rva == 0 || meta_data_size == 0 {
            return Err(malformed_error!("CLR header does not point at metadata"));
        }

        let flags = parser.read_le::<u32>()?;
        let entry_point_token = parser.read_le::<u32>()?;
        parser.advance_by(8)?; // resources
        let strong_name_signature_rva = parser.read_le::<u32>()?;
        let strong_name_signature_size = parser.read_le::<u32>()?;
        parser.advance_by(COR20_HEADER_SIZE - parser.pos())?;

        Ok(Cor20Header {
            major_runtime_version,
            minor_runtime_version,
            meta_data_rva,
            meta_data_size,
            flags,
            entry_point_token,
            strong_name_signature_rva,
            strong_name_signature_size,
        })
    }
}
