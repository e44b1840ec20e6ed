//! PKCS#7 signatures attached to binaries and packages.
//!
//! Two containers are supported:
//!
//! - Authenticode: the attribute certificate table of a PE image, see
//!   [`authenticode_signature`]
//! - NuGet package signatures: the `.signature.p7s` entry of a package, see
//!   [`package_signature`]
//!
//! Both decode into a [`Signature`], which exposes the primary signer, its certificate and
//! the RFC 3161 timestamps countersigning it. No cryptographic verification is performed.

mod authenticode;
mod package;

pub use authenticode::authenticode_signature;
pub use package::{package_signature, PACKAGE_SIGNATURE_FILE};

use crate::{
    pkcs::{oid, AsnReader, Certificate, SignedData, SignerInfo},
    timestamp::{
        validate_signer_certificate_against_timestamp, Rfc3161TimestampToken, Timestamp,
    },
    Result,
};

/// What a signature attests to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    /// Authenticode signature of a PE image
    Authenticode,
    /// NuGet author signature
    Author,
    /// NuGet repository signature
    Repository,
    /// A package signature without a recognized commitment type
    Unknown,
}

/// A decoded PKCS#7 signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Kind of the signature
    pub kind: SignatureKind,
    /// The decoded SignedData
    pub signed_data: SignedData,
}

impl Signature {
    /// The primary signer
    #[must_use]
    pub fn signer_info(&self) -> Option<&SignerInfo> {
        self.signed_data.signer_infos.first()
    }

    /// Certificate of the primary signer, if bundled
    #[must_use]
    pub fn signer_certificate(&self) -> Option<&Certificate> {
        self.signer_info()
            .and_then(|signer| self.signed_data.signer_certificate(signer))
    }

    /// Display form of the primary signer's subject, e.g.
    /// `CN=Microsoft Corporation, O=Microsoft Corporation, L=Redmond, S=Washington, C=US`
    #[must_use]
    pub fn signer_subject(&self) -> Option<String> {
        self.signer_certificate()
            .map(|certificate| certificate.subject().to_string())
    }

    /// Decoded timestamp tokens countersigning the primary signer.
    ///
    /// Tokens that fail to decode are logged and skipped.
    ///
    /// # Errors
    /// Returns [`crate::Error::DuplicateAttribute`] if a timestamp attribute occurs twice.
    pub fn timestamp_tokens(&self) -> Result<Vec<Rfc3161TimestampToken>> {
        let Some(signer) = self.signer_info() else {
            return Ok(Vec::new());
        };

        let mut tokens = Vec::new();
        for encoded in signer.timestamp_tokens()? {
            match Rfc3161TimestampToken::decode(encoded) {
                Ok(token) => {
                    if !token.token_info().is_imprint_of(&signer.signature) {
                        log::debug!("Timestamp imprint does not match the signature value");
                    }
                    tokens.push(token);
                }
                Err(error) => log::warn!("Skipping undecodable timestamp token: {}", error),
            }
        }

        Ok(tokens)
    }

    /// Timestamps countersigning the primary signer.
    ///
    /// # Errors
    /// Returns [`crate::Error::DuplicateAttribute`] if a timestamp attribute occurs twice.
    pub fn timestamps(&self) -> Result<Vec<Timestamp>> {
        Ok(self
            .timestamp_tokens()?
            .iter()
            .map(Timestamp::from_token)
            .collect())
    }

    /// Returns `true` if the signer certificate was valid during the accuracy window of at
    /// least one timestamp
    ///
    /// # Errors
    /// Returns [`crate::Error::DuplicateAttribute`] if a timestamp attribute occurs twice.
    pub fn is_signer_valid_at_timestamp(&self) -> Result<bool> {
        let Some(certificate) = self.signer_certificate() else {
            return Ok(false);
        };

        Ok(self.timestamp_tokens()?.iter().any(|token| {
            validate_signer_certificate_against_timestamp(certificate, token.token_info())
        }))
    }
}

fn commitment_kind(signed_data: &SignedData) -> Result<SignatureKind> {
    let Some(signer) = signed_data.signer_infos.first() else {
        return Ok(SignatureKind::Unknown);
    };

    let Some(attribute) = signer.signed_attribute(oid::COMMITMENT_TYPE_INDICATION)? else {
        return Ok(SignatureKind::Unknown);
    };

    let Some(value) = attribute.values.first() else {
        return Ok(SignatureKind::Unknown);
    };

    let mut reader = AsnReader::new(value);
    let mut indication = reader.read_sequence()?;
    let commitment = indication.read_object_identifier()?;

    Ok(match commitment.as_str() {
        oid::COMMITMENT_TYPE_AUTHOR => SignatureKind::Author,
        oid::COMMITMENT_TYPE_REPOSITORY => SignatureKind::Repository,
        _ => SignatureKind::Unknown,
    })
}
