//! Small helpers shared across the crate.

pub(crate) mod decompress;
mod hash;
mod hex;

pub use hash::digest;
pub use hex::{to_hex, to_hex_upper};
