//! The `#Blob` heap (ECMA-335 II.24.2.4).

use crate::{file::parser::Parser, Result};

/// Length-prefixed binary values referenced from the tables by byte offset.
///
/// Each blob starts with its length as a compressed unsigned integer: one byte `0bbbbbbb`, two
/// bytes `10bbbbbb x` or four bytes `110bbbbb x y z`.
///
/// # Examples
///
/// ```rust
/// use symscope::metadata::streams::Blob;
/// let data = &[0u8, 0x03, 0x41, 0x42, 0x43];
/// let blob = Blob::from(data)?;
/// assert_eq!(blob.get(1)?, &[0x41, 0x42, 0x43]);
/// assert!(blob.get(0)?.is_empty());
/// # Ok::<(), symscope::Error>(())
/// ```
#[derive(Clone, Copy)]
pub struct Blob<'a> {
    data: &'a [u8],
}

impl<'a> Blob<'a> {
    /// Wrap the heap data, which must start with the empty blob.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the data is empty or does not start with `\0`.
    pub fn from(data: &'a [u8]) -> Result<Blob<'a>> {
        if data.first() != Some(&0) {
            return Err(malformed_error!("Invalid memory for #Blob heap"));
        }

        Ok(Blob { data })
    }

    /// The blob starting at byte offset `index`, without its length prefix.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the index or the declared length lie outside the
    /// heap, or [`crate::Error::Malformed`] for an invalid length prefix.
    pub fn get(&self, index: usize) -> Result<&'a [u8]> {
        let Some(rest) = self.data.get(index..) else {
            return Err(out_of_bounds_error!());
        };

        let mut parser = Parser::new(rest);
        let len = parser.read_compressed_uint()? as usize;
        parser.read_bytes(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data = {
            let mut data = vec![0xCC; 600];
            /* i - 0    - should always be 0    */ data[0]          = 0b_00000000_u8;

            /* i - 1    - len 10                */ data[1]          = 0b_00001010_u8;
            /* i - 1    - len 10                */ data[2..12]      .copy_from_slice(&[0x0A; 10]);

            /* i - 12   - len 5                 */ data[12]         = 0b_00000101_u8;
            /* i - 12   - len 5                 */ data[13..18]     .copy_from_slice(&[0xAB; 5]);

            /* i - 18   - invalid prefix        */ data[18]         = 0b_11111111_u8;

            /* i - 19   - len 257               */ data[19]         = 0b_10000001_u8;
            /* i - 19   - len 257               */ data[20]         = 0b_00000001_u8;
            /* i - 19   - len 257               */ data[21..278]    .copy_from_slice(&[0xBA; 257]);

            /* i - 278  - len 65793, truncated  */ data[278]        = 0b_11000000_u8;
            /* i - 278  - len 65793, truncated  */ data[279]        = 0b_00000001_u8;
            /* i - 278  - len 65793, truncated  */ data[280]        = 0b_00000001_u8;
            /* i - 278  - len 65793, truncated  */ data[281]        = 0b_00000001_u8;

            data
        };

        let blob = Blob::from(&data).unwrap();

        assert_eq!(blob.get(1).unwrap(), &[0x0A; 10]);
        assert_eq!(blob.get(12).unwrap(), &[0xAB; 5]);
        assert!(matches!(blob.get(18), Err(Error::Malformed { .. })));
        assert_eq!(blob.get(19).unwrap().len(), 257);
        assert!(matches!(blob.get(278), Err(Error::OutOfBounds)));
        assert!(matches!(blob.get(601), Err(Error::OutOfBounds)));
    }

    #[test]
    fn invalid_heap() {
        if Blob::from(&[]).is_ok() {
            panic!("This should not work!")
        }
        assert!(Blob::from(&[0x01]).is_err());
    }
}
