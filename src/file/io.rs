//! Bounds-checked primitive reads from byte slices.
//!
//! PE headers, debug directories, metadata tables and heaps are all little-endian, while the
//! DER structures handled by [`crate::pkcs`] carry big-endian integers. Both directions are
//! served by the [`crate::file::io::ByteIO`] trait and the free functions in this module.
//!
//! Every read checks the requested range against the slice and fails with
//! [`crate::Error::OutOfBounds`] instead of panicking.
//!
//! # Examples
//!
//! ```rust
//! use symscope::file::io::{read_le, read_le_at};
//!
//! let data = [0x01, 0x00, 0x00, 0x00, 0x34, 0x12];
//! assert_eq!(read_le::<u32>(&data)?, 1);
//!
//! let mut offset = 4;
//! assert_eq!(read_le_at::<u16>(&data, &mut offset)?, 0x1234);
//! assert_eq!(offset, 6);
//! # Ok::<(), symscope::Error>(())
//! ```

use crate::{Error::OutOfBounds, Result};

/// Fixed-width primitive that can be decoded from either byte order.
pub trait ByteIO: Sized {
    /// Byte array holding one encoded value, e.g. `[u8; 4]` for `u32`
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Decode from little-endian bytes
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
    /// Decode from big-endian bytes
    fn from_be_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_byte_io {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ByteIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }
            }
        )*
    };
}

impl_byte_io!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Read a little-endian `T` from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than `T`.
pub fn read_le<T: ByteIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Read a little-endian `T` at `offset` and advance the offset past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit in `data`.
pub fn read_le_at<T: ByteIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let bytes = take::<T>(data, *offset)?;
    *offset += std::mem::size_of::<T>();
    Ok(T::from_le_bytes(bytes))
}

/// Read a big-endian `T` at `offset` and advance the offset past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit in `data`.
pub fn read_be_at<T: ByteIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let bytes = take::<T>(data, *offset)?;
    *offset += std::mem::size_of::<T>();
    Ok(T::from_be_bytes(bytes))
}

/// Read a metadata index that is either 2 or 4 bytes wide.
///
/// Table and heap indexes in ECMA-335 tables switch to 4 bytes once the referenced table or
/// heap grows past 16 bits; `is_large` selects the width.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the index does not fit in `data`.
pub fn read_le_at_dyn(data: &[u8], offset: &mut usize, is_large: bool) -> Result<u32> {
    if is_large {
        read_le_at::<u32>(data, offset)
    } else {
        Ok(u32::from(read_le_at::<u16>(data, offset)?))
    }
}

fn take<T: ByteIO>(data: &[u8], offset: usize) -> Result<T::Bytes> {
    let size = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(size) else {
        return Err(OutOfBounds);
    };

    let Some(slice) = data.get(offset..end) else {
        return Err(OutOfBounds);
    };

    <T::Bytes as TryFrom<&[u8]>>::try_from(slice).map_err(|_| OutOfBounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[rustfmt::skip]
    const TEST_BUFFER: [u8; 8] = [
        0x01, 0x02, 0x03, 0x04,
        0x05, 0x06, 0x07, 0x08,
    ];

    #[test]
    fn read_le_primitives() {
        assert_eq!(read_le::<u8>(&TEST_BUFFER).unwrap(), 0x01);
        assert_eq!(read_le::<u16>(&TEST_BUFFER).unwrap(), 0x0201);
        assert_eq!(read_le::<u32>(&TEST_BUFFER).unwrap(), 0x0403_0201);
        assert_eq!(read_le::<u64>(&TEST_BUFFER).unwrap(), 0x0807_0605_0403_0201);
        assert_eq!(read_le::<i8>(&[0xFF]).unwrap(), -1);
    }

    #[test]
    fn read_be_primitives() {
        let mut offset = 0;
        assert_eq!(read_be_at::<u16>(&TEST_BUFFER, &mut offset).unwrap(), 0x0102);
        assert_eq!(read_be_at::<u32>(&TEST_BUFFER, &mut offset).unwrap(), 0x0304_0506);
        assert_eq!(offset, 6);
    }

    #[test]
    fn read_dyn() {
        let mut offset = 0;
        assert_eq!(read_le_at_dyn(&TEST_BUFFER, &mut offset, false).unwrap(), 0x0201);
        assert_eq!(read_le_at_dyn(&TEST_BUFFER, &mut offset, true).unwrap(), 0x0605_0403);
        assert_eq!(offset, 6);
    }

    #[test]
    fn out_of_bounds() {
        let mut offset = 6;
        assert!(matches!(
            read_le_at::<u32>(&TEST_BUFFER, &mut offset),
            Err(Error::OutOfBounds)
        ));
        assert_eq!(offset, 6);

        let mut offset = usize::MAX;
        if read_le_at::<u8>(&TEST_BUFFER, &mut offset).is_ok() {
            panic!("This should not work!")
        }
    }
}
