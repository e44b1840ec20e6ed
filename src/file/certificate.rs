//! The attribute certificate table of a PE image (`WIN_CERTIFICATE` entries).

use crate::{file::parser::Parser, Result};

/// `WIN_CERT_TYPE_PKCS_SIGNED_DATA`, the certificate type carrying an Authenticode signature
pub const WIN_CERT_TYPE_PKCS_SIGNED_DATA: u16 = 0x0002;

/// One `WIN_CERTIFICATE` record of the attribute certificate table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinCertificate {
    /// Structure revision, 0x0100 or 0x0200
    pub revision: u16,
    /// Certificate type, see [`WIN_CERT_TYPE_PKCS_SIGNED_DATA`]
    pub certificate_type: u16,
    /// The certificate blob, for Authenticode a DER encoded PKCS#7 `ContentInfo`
    pub certificate: Vec<u8>,
}

impl WinCertificate {
    /// Returns `true` if the blob is a PKCS#7 SignedData structure
    #[must_use]
    pub fn is_pkcs_signed_data(&self) -> bool {
        self.certificate_type == WIN_CERT_TYPE_PKCS_SIGNED_DATA
    }
}

/// Walk the attribute certificate table.
///
/// Records start on 8-byte boundaries relative to the start of the table. Each `dwLength`
/// includes the 8-byte header.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for a record shorter than its header and
/// [`crate::Error::OutOfBounds`] for a record extending past the table.
pub fn parse_certificate_table(table: &[u8]) -> Result<Vec<WinCertificate>> {
    let mut parser = Parser::new(table);
    let mut certificates = Vec::new();

    while parser.remaining() >= 8 {
        let length = parser.read_le::<u32>()? as usize;
        let revision = parser.read_le::<u16>()?;
        let certificate_type = parser.read_le::<u16>()?;

        if length < 8 {
            return Err(malformed_error!(
                "WIN_CERTIFICATE length {} is smaller than its header",
                length
            ));
        }

        let certificate = parser.read_bytes(length - 8)?.to_vec();
        certificates.push(WinCertificate {
            revision,
            certificate_type,
            certificate,
        });

        if parser.has_more_data() {
            parser.align(8)?;
        }
    }

    Ok(certificates)
}
