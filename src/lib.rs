// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # symscope
//!
//! Inspection of .NET assemblies, portable PDBs and PKCS#7 signatures, and the symbol
//! validation of NuGet packages built on top of them.
//!
//! ## Features
//!
//! - **PE images** - debug directory, embedded portable PDBs, CodeView and PDB checksum records,
//!   the Authenticode certificate table
//! - **ECMA-335 metadata** - heaps, tables and signatures, read directly from the image
//! - **Portable PDBs** - documents, embedded sources, Source Link, compiler flags and metadata
//!   references
//! - **PKCS#7 and X.509** - a bounded DER reader with decoders for `SignedData`, `SignerInfo`,
//!   certificates and RFC 3161 `TSTInfo`
//! - **Symbol validation** - decides whether the binaries of a package have symbols, whether
//!   their sources are reachable through Source Link and whether they were built
//!   deterministically
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use symscope::prelude::*;
//!
//! let package = ZipPackage::open("Contoso.Library.1.0.0.nupkg".as_ref())?;
//! let validator = SymbolValidator::new(ValidatorOptions::default())?;
//!
//! let result = validator.validate(&package);
//! println!("Source Link: {:?}", result.source_link_result);
//! println!("Deterministic: {:?}", result.deterministic_result);
//! # Ok::<(), symscope::Error>(())
//! ```
//!
//! ### Debug data of one assembly
//!
//! ```rust,no_run
//! use symscope::assembly::AssemblyDebugParser;
//!
//! let parser = AssemblyDebugParser::new(std::fs::read("Library.dll")?, None)?;
//! let data = parser.get_debug_data()?;
//!
//! println!("PDB: {:?}", data.pdb_type);
//! for document in &data.sources {
//!     println!("{} -> {:?}", document.name, document.url);
//! }
//! # Ok::<(), symscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`file`] - PE images over memory or memory-mapped files, and the little-endian [`Parser`]
//! - [`pkcs`] - DER reader and PKCS#7 / X.509 decoders
//! - [`timestamp`] - RFC 3161 timestamp tokens and the signer validity check
//! - [`signature`] - Authenticode and NuGet package signatures
//! - [`metadata`] - ECMA-335 metadata and portable PDB reader
//! - [`assembly`] - assembly identity, attributes and debug data
//! - [`validation`] - the symbol validator
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result):
//!
//! ```rust,no_run
//! use symscope::{Error, File};
//!
//! match File::from_file(std::path::Path::new("Library.dll")) {
//!     Ok(file) => println!("managed: {}", file.is_managed()),
//!     Err(Error::Malformed { message, .. }) => println!("Malformed file: {}", message),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Logging
//!
//! Diagnostics are emitted through the [`log`](https://docs.rs/log) facade. The crate installs
//! no logger.
#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust,no_run
/// use symscope::prelude::*;
///
/// let parser = AssemblyMetadataParser::new(std::fs::read("Library.dll")?)?;
/// println!("{:?}", parser.assembly_identity()?);
/// # Ok::<(), symscope::Error>(())
/// ```
pub mod prelude;

/// PE images and byte-level readers.
///
/// [`File`] abstracts over an in-memory buffer and a memory-mapped file and exposes the parts
/// of a PE image the rest of the crate needs: data directories, the debug directory, the
/// certificate table and the CLR header.
pub mod file;

/// Small helpers: digests, hex encoding and raw deflate.
pub mod utils;

/// DER reader and PKCS#7 / X.509 decoders.
pub mod pkcs;

/// RFC 3161 timestamp tokens.
pub mod timestamp;

/// Authenticode and NuGet package signatures.
pub mod signature;

/// ECMA-335 metadata and portable PDB reading.
///
/// - [`metadata::view::MetadataView`] - one metadata root with its heaps and tables
/// - [`metadata::pdb::PortablePdb`] - documents, custom debug information and the PDB id
/// - [`metadata::customattributes`] - custom attribute value blobs
///
/// # Examples
///
/// ```rust,no_run
/// use symscope::metadata::pdb::PortablePdb;
///
/// let data = std::fs::read("Library.pdb")?;
/// let pdb = PortablePdb::read(&data)?;
/// println!("{}", pdb.guid());
/// for document in pdb.documents()? {
///     println!("{}", document.name);
/// }
/// # Ok::<(), symscope::Error>(())
/// ```
pub mod metadata;

/// Identity, attributes and debug data of one assembly.
pub mod assembly;

/// Symbol validation of NuGet packages.
pub mod validation;

/// `symscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `symscope` Error type
///
/// The main error type for all operations in this crate.
///
/// # Examples
///
/// ```rust,no_run
/// use symscope::{Error, assembly::AssemblyMetadataParser};
///
/// match AssemblyMetadataParser::new(std::fs::read("native.dll")?) {
///     Ok(parser) => println!("{:?}", parser.assembly_identity()?),
///     Err(Error::NotSupported) => println!("Not a .NET assembly"),
///     Err(e) => println!("Error: {}", e),
/// }
/// # Ok::<(), symscope::Error>(())
/// ```
pub use error::Error;

/// A PE image in memory or mapped from disk
pub use file::File;

/// Little-endian cursor over a byte slice
pub use file::parser::Parser;
