//! NuGet package signatures (`.signature.p7s`).

use crate::{
    pkcs::SignedData,
    signature::{commitment_kind, Signature},
    Result,
};

/// Name of the signature entry at the root of a signed package
pub const PACKAGE_SIGNATURE_FILE: &str = ".signature.p7s";

/// Decode the content of a package's `.signature.p7s`.
///
/// The kind is taken from the commitment type indication of the primary signer.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for a damaged signature and
/// [`crate::Error::DuplicateAttribute`] if the commitment type indication occurs twice.
pub fn package_signature(data: &[u8]) -> Result<Signature> {
    let signed_data = SignedData::from_content_info(data)?;
    let kind = commitment_kind(&signed_data)?;

    Ok(Signature { kind, signed_data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pkcs::oid,
        signature::SignatureKind,
        test::der::{self, SignedDataBuilder, SignerInfoBuilder},
    };

    #[test]
    fn repository_signature() {
        let data = SignedDataBuilder::new()
            .content(oid::DATA, b"Version:1\r\n\r\n2.16.840.1.101.3.4.2.1-Hash:AAAA\r\n\r\n")
            .signer(
                &SignerInfoBuilder::new()
                    .signed_attribute(
                        oid::COMMITMENT_TYPE_INDICATION,
                        &der::sequence(&[der::oid(oid::COMMITMENT_TYPE_REPOSITORY)]),
                    )
                    .build(),
            )
            .build_content_info();

        let signature = package_signature(&data).unwrap();
        assert_eq!(signature.kind, SignatureKind::Repository);
        assert!(signature.signer_certificate().is_none());
    }

    #[test]
    fn not_signed_data() {
        let data = der::sequence(&[der::oid(oid::DATA)]);
        assert!(package_signature(&data).is_err());
    }
}
