//! The `#Strings` heap (ECMA-335 II.24.2.3).

use std::{ffi::CStr, str};

use crate::Result;

/// NUL-terminated UTF-8 identifiers referenced from the tables by byte offset.
///
/// # Examples
///
/// ```rust
/// use symscope::metadata::streams::Strings;
/// let data = &[0u8, b'H', b'e', b'l', b'l', b'o', 0u8];
/// let strings = Strings::from(data)?;
/// assert_eq!(strings.get(1)?, "Hello");
/// assert_eq!(strings.get(0)?, "");
/// # Ok::<(), symscope::Error>(())
/// ```
#[derive(Clone, Copy)]
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Wrap the heap data, which must start with the empty string.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap is empty or does not start with `\0`.
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if data.first() != Some(&0) {
            return Err(malformed_error!("Provided #Strings heap is empty"));
        }

        Ok(Strings { data })
    }

    /// The string starting at byte offset `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for an index past the heap and
    /// [`crate::Error::Malformed`] for an unterminated or non UTF-8 string.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        let Some(rest) = self.data.get(index..) else {
            return Err(out_of_bounds_error!());
        };

        CStr::from_bytes_until_nul(rest)
            .ok()
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| malformed_error!("Invalid string at index - {}", index))
    }
}
