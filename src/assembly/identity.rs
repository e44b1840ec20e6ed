//! Assembly identities of the `Assembly` and `AssemblyRef` tables.
//!
//! A strong-named assembly carries either its full public key or the 8-byte public key token
//! derived from it. The token is the last 8 bytes of the SHA-1 hash of the key, in reverse order.

use std::fmt;

use bitflags::bitflags;
use sha1::{Digest, Sha1};

use crate::{utils::to_hex, Result};

bitflags! {
    /// `AssemblyFlags` of the `Assembly` and `AssemblyRef` tables
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AssemblyFlags: u32 {
        /// The blob holds a full public key rather than a token
        const PUBLIC_KEY = 0x0001;
        /// The implementation may be retargeted at runtime
        const RETARGETABLE = 0x0100;
        /// JIT optimizations are disabled
        const DISABLE_JIT_COMPILE_OPTIMIZER = 0x4000;
        /// JIT tracking is enabled
        const ENABLE_JIT_COMPILE_TRACKING = 0x8000;
    }
}

/// Public key or token of a strong-named assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrongName {
    /// The full public key
    PublicKey(Vec<u8>),
    /// The 8-byte token
    Token([u8; 8]),
}

impl StrongName {
    /// Decode the blob of an `Assembly` or `AssemblyRef` row, `None` for an empty blob.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a token blob is not 8 bytes long.
    pub fn from_blob(blob: &[u8], is_public_key: bool) -> Result<Option<StrongName>> {
        if blob.is_empty() {
            return Ok(None);
        }

        if is_public_key {
            return Ok(Some(StrongName::PublicKey(blob.to_vec())));
        }

        let token: [u8; 8] = blob
            .try_into()
            .map_err(|_| malformed_error!("Public key token has {} bytes", blob.len()))?;
        Ok(Some(StrongName::Token(token)))
    }

    /// The public key token
    #[must_use]
    pub fn token(&self) -> [u8; 8] {
        match self {
            StrongName::PublicKey(key) => {
                let hash = Sha1::digest(key);
                let mut token = [0u8; 8];
                token.copy_from_slice(&hash[hash.len() - 8..]);
                token.reverse();
                token
            }
            StrongName::Token(token) => *token,
        }
    }
}

/// A four-part assembly version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[allow(missing_docs)]
pub struct AssemblyVersion {
    pub major: u16,
    pub minor: u16,
    pub build: u16,
    pub revision: u16,
}

impl AssemblyVersion {
    /// Create a version
    #[must_use]
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        AssemblyVersion {
            major,
            minor,
            build,
            revision,
        }
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// Name, version, culture and strong name of an assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyIdentity {
    /// Simple name
    pub name: String,
    /// Version
    pub version: AssemblyVersion,
    /// Culture, `None` for neutral
    pub culture: Option<String>,
    /// Public key or token, `None` if not strong-named
    pub strong_name: Option<StrongName>,
}

impl AssemblyIdentity {
    /// The public key token as lowercase hex, `None` if not strong-named
    #[must_use]
    pub fn public_key_token(&self) -> Option<String> {
        self.strong_name.as_ref().map(|name| to_hex(&name.token()))
    }

    /// The display name, e.g. `Library, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null`
    #[must_use]
    pub fn display_name(&self) -> String {
        format!(
            "{}, Version={}, Culture={}, PublicKeyToken={}",
            self.name,
            self.version,
            self.culture.as_deref().unwrap_or("neutral"),
            self.public_key_token().as_deref().unwrap_or("null")
        )
    }

    /// Returns `true` for satellite resource assemblies
    #[must_use]
    pub fn is_satellite(&self) -> bool {
        self.culture.is_some() && self.name.ends_with(".resources")
    }
}

impl fmt::Display for AssemblyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecma_key_token() {
        // The ECMA standard public key of the core framework assemblies
        let ecma = [0u8, 0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0];
        let name = StrongName::from_blob(&ecma, true).unwrap().unwrap();
        assert_eq!(to_hex(&name.token()), "b77a5c561934e089");
    }

    #[test]
    fn token_blob() {
        let token = [0xcc, 0x7b, 0x13, 0xff, 0xcd, 0x2d, 0xdd, 0x51];
        let name = StrongName::from_blob(&token, false).unwrap().unwrap();
        assert_eq!(name.token(), token);

        assert!(StrongName::from_blob(&[], false).unwrap().is_none());
        if StrongName::from_blob(&[1, 2, 3], false).is_ok() {
            panic!("This should not work!")
        }
    }

    #[test]
    fn display_name() {
        let identity = AssemblyIdentity {
            name: "Library".to_string(),
            version: AssemblyVersion::new(1, 2, 3, 4),
            culture: None,
            strong_name: None,
        };
        assert_eq!(
            identity.display_name(),
            "Library, Version=1.2.3.4, Culture=neutral, PublicKeyToken=null"
        );
        assert!(!identity.is_satellite());

        let satellite = AssemblyIdentity {
            name: "Library.resources".to_string(),
            version: AssemblyVersion::new(1, 0, 0, 0),
            culture: Some("de".to_string()),
            strong_name: Some(StrongName::Token([0xcc, 0x7b, 0x13, 0xff, 0xcd, 0x2d, 0xdd, 0x51])),
        };
        assert_eq!(
            satellite.to_string(),
            "Library.resources, Version=1.0.0.0, Culture=de, PublicKeyToken=cc7b13ffcd2ddd51"
        );
        assert!(satellite.is_satellite());
    }
}
