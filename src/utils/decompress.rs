//! Raw deflate decompression for embedded PDBs and embedded sources.

use std::io::Read;

use flate2::read::DeflateDecoder;

use crate::Result;

/// Inflate a raw deflate stream whose decompressed size is known in advance.
///
/// The output is capped at `expected_len + 1` bytes, so a stream that claims a small size but
/// expands further is rejected without being fully materialized.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the stream is corrupt or its decompressed length
/// differs from `expected_len`.
pub fn inflate(data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut decompressed = Vec::with_capacity(expected_len.min(64 * 1024 * 1024));
    let limit = u64::try_from(expected_len)
        .map_err(|_| malformed_error!("Decompressed size too large - {}", expected_len))?
        .saturating_add(1);

    DeflateDecoder::new(data)
        .take(limit)
        .read_to_end(&mut decompressed)
        .map_err(|error| malformed_error!("Deflate decompression error: {}", error))?;

    if decompressed.len() != expected_len {
        return Err(malformed_error!(
            "Decompressed size mismatch - expected {}, got {}",
            expected_len,
            decompressed.len()
        ));
    }

    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::{write::DeflateEncoder, Compression};

    use super::*;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn roundtrip() {
        let compressed = deflate(b"portable pdb payload");
        assert_eq!(inflate(&compressed, 20).unwrap(), b"portable pdb payload");
    }

    #[test]
    fn size_mismatch() {
        let compressed = deflate(b"portable pdb payload");
        assert!(inflate(&compressed, 10).is_err());
        assert!(inflate(&compressed, 30).is_err());
    }

    #[test]
    fn corrupt() {
        if inflate(&[0xFF, 0xFF, 0xFF, 0xFF], 4).is_ok() {
            panic!("This should not work!")
        }
    }
}
