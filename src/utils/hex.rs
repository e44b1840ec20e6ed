use std::fmt::Write;

/// Render bytes as lowercase hex
#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

/// Render bytes as uppercase hex
#[must_use]
pub fn to_hex_upper(bytes: &[u8]) -> String {
    to_hex(bytes).to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex() {
        assert_eq!(to_hex(&[0x00, 0xAB, 0x10]), "00ab10");
        assert_eq!(to_hex_upper(&[0x00, 0xAB, 0x10]), "00AB10");
        assert_eq!(to_hex(&[]), "");
    }
}
