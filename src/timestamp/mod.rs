//! RFC 3161 timestamp tokens and the signer certificate validity check.
//!
//! A timestamp token is a PKCS#7 `ContentInfo` wrapping a `SignedData` whose encapsulated
//! content is a DER encoded `TSTInfo`. The authority signs the hash (the message imprint) of
//! the countersigned signature value, which pins the signature to `genTime`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use symscope::timestamp::Rfc3161TimestampToken;
//!
//! # let token_bytes: Vec<u8> = Vec::new();
//! let token = Rfc3161TimestampToken::decode(&token_bytes)?;
//! println!("timestamped at {}", token.token_info().timestamp());
//! # Ok::<(), symscope::Error>(())
//! ```

use chrono::{DateTime, Duration, Utc};

use crate::{
    pkcs::{oid, AsnDecode, Certificate, Rfc3161TstInfo, SignedData, SignerInfo},
    utils::digest,
    Result,
};

/// Accuracy assumed for tokens issued under the baseline policy without an explicit accuracy
const BASELINE_POLICY_ACCURACY_MICROSECONDS: u64 = 1_000_000;

/// A decoded `TSTInfo` together with its encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rfc3161TimestampTokenInfo {
    raw: Vec<u8>,
    tst_info: Rfc3161TstInfo,
}

impl Rfc3161TimestampTokenInfo {
    /// Decode a DER encoded `TSTInfo`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `raw` is not a valid `TSTInfo`.
    pub fn new(raw: &[u8]) -> Result<Self> {
        Ok(Rfc3161TimestampTokenInfo {
            tst_info: Rfc3161TstInfo::from_der(raw)?,
            raw: raw.to_vec(),
        })
    }

    /// The DER encoding this info was decoded from
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The decoded `TSTInfo`
    #[must_use]
    pub fn tst_info(&self) -> &Rfc3161TstInfo {
        &self.tst_info
    }

    /// Returns `true` if the message imprint equals `hash`
    #[must_use]
    pub fn has_message_hash(&self, hash: &[u8]) -> bool {
        self.tst_info.message_imprint.hashed_message == hash
    }

    /// Hash `data` with the imprint algorithm and compare it against the imprint.
    ///
    /// Returns `false` for imprint algorithms this crate cannot compute.
    #[must_use]
    pub fn is_imprint_of(&self, data: &[u8]) -> bool {
        let algorithm = &self.tst_info.message_imprint.hash_algorithm;
        match algorithm.digest_name().and_then(|name| digest(name, data)) {
            Some(hash) => self.has_message_hash(&hash),
            None => {
                log::debug!(
                    "Unsupported message imprint algorithm {}",
                    algorithm.algorithm
                );
                false
            }
        }
    }

    /// The time at which the token was created
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.tst_info.gen_time
    }

    /// The explicit accuracy in microseconds, `None` if the token carries no accuracy
    #[must_use]
    pub fn accuracy_in_microseconds(&self) -> Option<u64> {
        self.tst_info
            .accuracy
            .as_ref()
            .map(|accuracy| accuracy.total_microseconds())
    }

    /// The accuracy used for validity checks.
    ///
    /// Tokens without an explicit accuracy get one second under the baseline time-stamp
    /// policy and zero otherwise.
    #[must_use]
    pub fn effective_accuracy(&self) -> Duration {
        let microseconds = self.accuracy_in_microseconds().unwrap_or_else(|| {
            if self.tst_info.policy == oid::BASELINE_TIMESTAMP_POLICY {
                BASELINE_POLICY_ACCURACY_MICROSECONDS
            } else {
                0
            }
        });

        Duration::microseconds(i64::try_from(microseconds).unwrap_or(i64::MAX))
    }

    /// `gen_time` minus the effective accuracy
    #[must_use]
    pub fn lower_limit(&self) -> DateTime<Utc> {
        self.timestamp()
            .checked_sub_signed(self.effective_accuracy())
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// `gen_time` plus the effective accuracy
    #[must_use]
    pub fn upper_limit(&self) -> DateTime<Utc> {
        self.timestamp()
            .checked_add_signed(self.effective_accuracy())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// A complete RFC 3161 timestamp token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rfc3161TimestampToken {
    signed_data: SignedData,
    token_info: Rfc3161TimestampTokenInfo,
}

impl Rfc3161TimestampToken {
    /// Decode a token from its `ContentInfo` encoding.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the token is not a SignedData, its content is not
    /// a `TSTInfo`, or any part fails to decode.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let signed_data = SignedData::from_content_info(data)?;

        let encapsulated = &signed_data.encap_content_info;
        if encapsulated.content_type != oid::TST_INFO {
            return Err(malformed_error!(
                "Timestamp token content type {} is not TSTInfo",
                encapsulated.content_type
            ));
        }

        let Some(content) = &encapsulated.content else {
            return Err(malformed_error!("Timestamp token without TSTInfo content"));
        };

        let token_info = Rfc3161TimestampTokenInfo::new(content)?;
        Ok(Rfc3161TimestampToken {
            signed_data,
            token_info,
        })
    }

    /// The decoded `TSTInfo`
    #[must_use]
    pub fn token_info(&self) -> &Rfc3161TimestampTokenInfo {
        &self.token_info
    }

    /// The SignedData carrying the token
    #[must_use]
    pub fn signed_data(&self) -> &SignedData {
        &self.signed_data
    }

    /// The authority's signer info
    #[must_use]
    pub fn signer_info(&self) -> Option<&SignerInfo> {
        self.signed_data.signer_infos.first()
    }

    /// The authority's certificate, if bundled with the token
    #[must_use]
    pub fn signer_certificate(&self) -> Option<&Certificate> {
        self.signer_info()
            .and_then(|signer| self.signed_data.signer_certificate(signer))
    }
}

/// A timestamp extracted from a token, with its accuracy window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    /// Time at which the token was created
    pub gen_time: DateTime<Utc>,
    /// Earliest time the signature may have existed
    pub lower_limit: DateTime<Utc>,
    /// Latest time the signature must have existed
    pub upper_limit: DateTime<Utc>,
    /// The authority's certificate, if bundled with the token
    pub signer_certificate: Option<Certificate>,
}

impl Timestamp {
    /// Build the timestamp of `token`
    #[must_use]
    pub fn from_token(token: &Rfc3161TimestampToken) -> Self {
        let info = token.token_info();
        Timestamp {
            gen_time: info.timestamp(),
            lower_limit: info.lower_limit(),
            upper_limit: info.upper_limit(),
            signer_certificate: token.signer_certificate().cloned(),
        }
    }
}

impl From<&Rfc3161TimestampToken> for Timestamp {
    fn from(token: &Rfc3161TimestampToken) -> Self {
        Timestamp::from_token(token)
    }
}

/// Check that `certificate` was valid during the whole accuracy window of `token_info`.
///
/// The window `[gen_time - accuracy, gen_time + accuracy]` must lie strictly inside the
/// certificate's `[not_before, not_after]`.
#[must_use]
pub fn validate_signer_certificate_against_timestamp(
    certificate: &Certificate,
    token_info: &Rfc3161TimestampTokenInfo,
) -> bool {
    let valid = certificate
        .tbs_certificate
        .validity
        .strictly_contains(token_info.lower_limit(), token_info.upper_limit());

    if !valid {
        log::debug!(
            "Certificate {} valid {} - {} does not cover timestamp window {} - {}",
            certificate.subject(),
            certificate.not_before(),
            certificate.not_after(),
            token_info.lower_limit(),
            token_info.upper_limit()
        );
    }

    valid
}
