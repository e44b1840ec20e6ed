//! Authenticode signatures from the certificate table of a PE image.

use crate::{
    file::File,
    pkcs::SignedData,
    signature::{Signature, SignatureKind},
    Result,
};

/// The Authenticode signature of `file`, if it has one.
///
/// The first `WIN_CERT_TYPE_PKCS_SIGNED_DATA` entry of the attribute certificate table is
/// decoded. Other certificate types are ignored.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] if the certificate
/// table or the PKCS#7 blob is damaged.
pub fn authenticode_signature(file: &File) -> Result<Option<Signature>> {
    let certificates = file.authenticode_certificates()?;

    let Some(entry) = certificates
        .iter()
        .find(|certificate| certificate.is_pkcs_signed_data())
    else {
        return Ok(None);
    };

    let signed_data = SignedData::from_content_info(&entry.certificate)?;
    Ok(Some(Signature {
        kind: SignatureKind::Authenticode,
        signed_data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pkcs::oid,
        test::{
            der::{self, CertificateBuilder, SignedDataBuilder, SignerInfoBuilder},
            PeBuilder,
        },
    };

    #[test]
    fn microsoft_signer() {
        let certificate = CertificateBuilder::new()
            .subject(&[
                (oid::COUNTRY_NAME, "US"),
                (oid::STATE_OR_PROVINCE_NAME, "Washington"),
                (oid::LOCALITY_NAME, "Redmond"),
                (oid::ORGANIZATION_NAME, "Microsoft Corporation"),
                (oid::COMMON_NAME, "Microsoft Corporation"),
            ])
            .serial(&[0x07])
            .build();
        let blob = SignedDataBuilder::new()
            .encoded_content(oid::SPC_INDIRECT_DATA, &der::sequence(&[der::null()]))
            .certificate(&certificate)
            .signer(&SignerInfoBuilder::new().serial(&[0x07]).build())
            .build_content_info();

        let file = File::from_mem(PeBuilder::new().with_certificate(blob).build()).unwrap();
        let signature = authenticode_signature(&file).unwrap().unwrap();

        assert_eq!(signature.kind, SignatureKind::Authenticode);
        assert_eq!(
            signature.signer_subject().unwrap(),
            "CN=Microsoft Corporation, O=Microsoft Corporation, L=Redmond, S=Washington, C=US"
        );
    }

    #[test]
    fn unsigned() {
        let file = File::from_mem(PeBuilder::new().build()).unwrap();
        assert!(authenticode_signature(&file).unwrap().is_none());
    }

    #[test]
    fn damaged_blob() {
        let file =
            File::from_mem(PeBuilder::new().with_certificate(vec![0x30, 0x05, 0x06]).build())
                .unwrap();
        if authenticode_signature(&file).is_ok() {
            panic!("This should not work!")
        }
    }
}
