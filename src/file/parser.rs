//! Forward-only cursor over a byte slice.
//!
//! [`crate::file::parser::Parser`] is the workhorse for every little-endian structure in the
//! crate: debug directory entries, certificate table entries, metadata stream headers, blob
//! heap entries, custom attribute blobs and custom debug information payloads.

use crate::{
    file::io::{read_be_at, read_le_at, ByteIO},
    Result,
};

/// Position-tracking reader over borrowed data.
///
/// All reads are bounds checked. A failed read leaves the position unchanged, so callers may
/// report the offset at which decoding stopped.
///
/// # Examples
///
/// ```rust
/// use symscope::file::parser::Parser;
///
/// let data = [0x04, b'M', b'P', b'D', b'B', 0x10, 0x00, 0x00, 0x00];
/// let mut parser = Parser::new(&data);
///
/// let length = parser.read_compressed_uint()?;
/// assert_eq!(parser.read_bytes(length as usize)?, b"MPDB");
/// assert_eq!(parser.read_le::<u32>()?, 16);
/// assert!(!parser.has_more_data());
/// # Ok::<(), symscope::Error>(())
/// ```
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser positioned at the start of `data`
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Total length of the underlying data
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the underlying data is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` while unread bytes remain
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Number of unread bytes
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Current read position
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// The complete underlying data, independent of the position
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Move to an absolute position. Seeking to the very end is allowed.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` lies past the end of the data.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Skip `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `step` bytes remain.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        self.read_bytes(step).map(|_| ())
    }

    /// Skip padding up to the next multiple of `alignment`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the padding runs past the end of the data.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let padding = (alignment - (self.position % alignment)) % alignment;
        self.advance_by(padding)
    }

    /// Look at the next byte without consuming it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of the data.
    pub fn peek_byte(&self) -> Result<u8> {
        self.data
            .get(self.position)
            .copied()
            .ok_or(out_of_bounds_error!())
    }

    /// Read a little-endian value.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit.
    pub fn read_le<T: ByteIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read a big-endian value.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit.
    pub fn read_be<T: ByteIO>(&mut self) -> Result<T> {
        read_be_at::<T>(self.data, &mut self.position)
    }

    /// Read `length` raw bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(length)
            .ok_or(out_of_bounds_error!())?;

        let bytes = self
            .data
            .get(self.position..end)
            .ok_or(out_of_bounds_error!())?;

        self.position = end;
        Ok(bytes)
    }

    /// Read everything from the current position to the end.
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let bytes = &self.data[self.position.min(self.data.len())..];
        self.position = self.data.len();
        bytes
    }

    /// Read an ECMA-335 compressed unsigned integer (II.23.2).
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated input, or
    /// [`crate::Error::Malformed`] for an invalid lead byte.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let first_byte = self.peek_byte()?;

        if (first_byte & 0x80) == 0 {
            self.position += 1;
            return Ok(u32::from(first_byte));
        }

        if (first_byte & 0xC0) == 0x80 {
            let bytes = self.read_bytes(2)?;
            return Ok((u32::from(bytes[0] & 0x3F) << 8) | u32::from(bytes[1]));
        }

        if (first_byte & 0xE0) == 0xC0 {
            let bytes = self.read_bytes(4)?;
            return Ok((u32::from(bytes[0] & 0x1F) << 24)
                | (u32::from(bytes[1]) << 16)
                | (u32::from(bytes[2]) << 8)
                | u32::from(bytes[3]));
        }

        Err(malformed_error!("Invalid compressed uint - {}", first_byte))
    }

    /// Read a NUL-terminated UTF-8 string. A missing terminator consumes the rest of the data.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for invalid UTF-8.
    pub fn read_string_utf8(&mut self) -> Result<String> {
        let start = self.position;
        let rest = &self.data[start.min(self.data.len())..];
        let length = rest.iter().position(|byte| *byte == 0).unwrap_or(rest.len());

        let string_data = &rest[..length];
        self.position = (start + length + 1).min(self.data.len());

        String::from_utf8(string_data.to_vec()).map_err(|e| {
            malformed_error!(
                "Invalid UTF-8 string at offset {}-{}: {}",
                start,
                start + length,
                e.utf8_error()
            )
        })
    }

    /// Read a string preceded by a compressed length.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated input, or
    /// [`crate::Error::Malformed`] for invalid UTF-8.
    pub fn read_compressed_string_utf8(&mut self) -> Result<String> {
        let length = self.read_compressed_uint()? as usize;
        let start = self.position;
        let string_data = self.read_bytes(length)?;

        String::from_utf8(string_data.to_vec()).map_err(|e| {
            malformed_error!(
                "Invalid UTF-8 compressed string at offset {}-{}: {}",
                start,
                self.position,
                e.utf8_error()
            )
        })
    }
}
