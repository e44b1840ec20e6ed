//! # symscope Prelude
//!
//! The most commonly used types of the crate, for glob imports.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all symscope operations
pub use crate::Error;

/// The result type used throughout symscope
pub use crate::Result;

/// PE image access and the byte cursor
pub use crate::{File, Parser};

// ================================================================================================
// Assemblies and Debug Data
// ================================================================================================

/// Identity and attributes of an assembly
pub use crate::assembly::{AssemblyAttribute, AssemblyIdentity, AssemblyMetadataParser};

/// Debug data of an assembly and its PDB
pub use crate::assembly::{
    AssemblyDebugData, AssemblyDebugParser, AssemblyDebugSourceDocument, PdbType, SourceLinkMap,
    SymbolKey,
};

/// Portable PDB reader
pub use crate::metadata::pdb::PortablePdb;

// ================================================================================================
// Signatures and Timestamps
// ================================================================================================

/// DER reader and the PKCS#7 / X.509 structures
pub use crate::pkcs::{AsnReader, Certificate, DistinguishedName, SignedData, SignerInfo};

/// RFC 3161 timestamps
pub use crate::timestamp::{
    validate_signer_certificate_against_timestamp, Rfc3161TimestampToken,
    Rfc3161TimestampTokenInfo, Timestamp,
};

/// Authenticode and package signatures
pub use crate::signature::{authenticode_signature, package_signature, Signature};

// ================================================================================================
// Symbol Validation
// ================================================================================================

/// The validator and its inputs and outputs
pub use crate::validation::{
    DeterministicResult, MemoryPackage, Package, PackageFile, SymbolValidationResult,
    SymbolValidator, SymbolValidatorResult, ValidatorOptions, ZipPackage,
};
