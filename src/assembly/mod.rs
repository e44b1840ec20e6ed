//! Facts about one .NET assembly.
//!
//! Two entry points sit on top of the [`crate::metadata`] reader:
//!
//! - [`AssemblyMetadataParser`] - identity, referenced assemblies and assembly-level attributes
//! - [`AssemblyDebugParser`] - PDB documents, Source Link, compiler flags and symbol keys
//!
//! # Examples
//!
//! ```rust,no_run
//! use symscope::assembly::AssemblyMetadataParser;
//!
//! let parser = AssemblyMetadataParser::new(std::fs::read("Library.dll")?)?;
//! if let Some(identity) = parser.assembly_identity()? {
//!     println!("{identity}");
//! }
//! for (name, value) in parser.metadata()? {
//!     println!("{name}: {value}");
//! }
//! # Ok::<(), symscope::Error>(())
//! ```

mod debug;
mod identity;
mod metadata;
mod sourcelink;

pub use debug::{
    AssemblyDebugData, AssemblyDebugParser, AssemblyDebugSourceDocument, CompilerFlag, PdbType,
    SymbolHashAlgorithm, SymbolKey, SymbolLanguage,
};
pub use identity::{AssemblyFlags, AssemblyIdentity, AssemblyVersion, StrongName};
pub use metadata::{AssemblyAttribute, AssemblyMetadataParser};
pub use sourcelink::SourceLinkMap;
