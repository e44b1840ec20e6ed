//! Builders that synthesize the binary inputs of the decoders: DER structures, metadata roots,
//! portable PDBs, PE images and package archives.
//!
//! The builder files only depend on `std` and the dev-facing crates, so `tests/common` includes
//! the same files through `#[path]`.

pub mod der;
pub mod package;

pub use metadata::MetadataBuilder;
pub use pdb::PortablePdbBuilder;
pub use pe::PeBuilder;
