use md5::{Digest, Md5};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};

/// Hash `data` with the algorithm named `algorithm` (`MD5`, `SHA1`, `SHA256`, `SHA384` or
/// `SHA512`, case-insensitive, an optional dash is accepted).
///
/// Returns `None` for unknown algorithms.
#[must_use]
pub fn digest(algorithm: &str, data: &[u8]) -> Option<Vec<u8>> {
    let normalized = algorithm.replace('-', "").to_ascii_uppercase();
    let hash = match normalized.as_str() {
        "MD5" => Md5::digest(data).to_vec(),
        "SHA1" => Sha1::digest(data).to_vec(),
        "SHA256" => Sha256::digest(data).to_vec(),
        "SHA384" => Sha384::digest(data).to_vec(),
        "SHA512" => Sha512::digest(data).to_vec(),
        _ => return None,
    };

    Some(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::to_hex;

    #[test]
    fn known_digests() {
        assert_eq!(
            to_hex(&digest("MD5", b"abc").unwrap()),
            "900150983cd24fb0d6963f7d28e17f72"
        );
        assert_eq!(
            to_hex(&digest("sha-1", b"abc").unwrap()),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            to_hex(&digest("SHA256", b"abc").unwrap()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(digest("SHA384", b"").unwrap().len(), 48);
        assert_eq!(digest("SHA512", b"").unwrap().len(), 64);
        assert!(digest("CRC32", b"abc").is_none());
    }
}
