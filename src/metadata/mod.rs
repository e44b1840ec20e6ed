//! ECMA-335 metadata and portable PDB reading.
//!
//! The reader is layered bottom-up:
//!
//! - [`root`] - the `BSJB` metadata root and its stream directory
//! - [`streams`] - heaps, the `#~` table header and the `#Pdb` stream
//! - [`tables`] - table layout, coded indexes and typed rows
//! - [`view`] - one metadata root with its heaps and tables, for assemblies and PDBs alike
//! - [`signatures`] - method and field signatures
//! - [`customattributes`] - custom attribute value blobs
//! - [`customdebuginformation`] - Source Link, embedded sources and compiler flags
//! - [`pdb`] - the portable PDB reader built on all of the above
//!
//! # Examples
//!
//! ```rust,no_run
//! use symscope::{metadata::view::MetadataView, metadata::tables::AssemblyRaw, File};
//!
//! let file = File::from_file("Library.dll".as_ref())?;
//! let view = MetadataView::read(file.metadata()?)?;
//!
//! if let Some(assembly) = view.table::<AssemblyRaw>().and_then(|table| table.get(1)) {
//!     println!("{}", view.string(assembly.name)?);
//! }
//! # Ok::<(), symscope::Error>(())
//! ```

pub mod cor20header;
pub mod customattributes;
pub mod customdebuginformation;
pub mod pdb;
pub mod root;
pub mod signatures;
pub mod streams;
pub mod tables;
pub mod token;
pub mod view;
