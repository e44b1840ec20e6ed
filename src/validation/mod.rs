//! Symbol validation of NuGet packages.
//!
//! A [`SymbolValidator`] checks every binary of a [`Package`] for a PDB, follows the PDB's
//! Source Link document and decides whether the build was deterministic. PDBs are taken from
//! the package itself, from the binaries, or fetched from symbol packages and symbol servers
//! through a [`SymbolClient`].
//!
//! The outcome is a [`SymbolValidatorResult`]. Decode and network failures never surface as
//! errors; they are folded into the verdicts and their messages.

mod client;
mod options;
mod package;
mod result;
mod validator;

pub use client::{HttpSymbolClient, SymbolClient};
pub use options::{ValidatorOptions, MICROSOFT_SYMBOL_SERVER, NUGET_ORG_SYMBOL_PACKAGES};
pub use package::{
    normalize_version, MemoryPackage, MemoryPackageFile, Package, PackageFile, ZipPackage,
};
pub use result::{DeterministicResult, SymbolValidationResult, SymbolValidatorResult};
pub use validator::SymbolValidator;
