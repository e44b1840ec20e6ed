//! Verdicts produced by the validator.

use serde::{Deserialize, Serialize};

/// Verdict on the symbols and Source Link information of a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolValidationResult {
    /// Every file has symbols and every document is embedded or source linked
    Valid,
    /// As [`Self::Valid`], with symbols downloaded from a symbol server
    ValidExternal,
    /// A Source Link document could not be read
    InvalidSourceLink,
    /// Symbols exist but carry no Source Link document
    NoSourceLink,
    /// At least one file has no usable symbols
    NoSymbols,
    /// Validation has not finished
    Pending,
    /// The package contains no files to validate
    NothingToValidate,
    /// Some documents are neither embedded nor source linked
    HasUntrackedSources,
}

/// Verdict on whether a package was built deterministically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeterministicResult {
    /// Every file was built deterministically
    Valid,
    /// Validation has not finished
    Pending,
    /// At least one file was not built deterministically, or has no symbols
    NonDeterministic,
    /// The package contains no files to validate
    NothingToValidate,
    /// Some documents are neither embedded nor source linked
    HasUntrackedSources,
}

/// Outcome of [`crate::validation::SymbolValidator::validate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolValidatorResult {
    /// Symbol and Source Link verdict
    pub source_link_result: SymbolValidationResult,
    /// Explanation of [`Self::source_link_result`]
    pub source_link_error_message: Option<String>,
    /// Determinism verdict
    pub deterministic_result: DeterministicResult,
    /// Explanation of [`Self::deterministic_result`]
    pub deterministic_error_message: Option<String>,
}

impl Default for SymbolValidatorResult {
    fn default() -> Self {
        SymbolValidatorResult {
            source_link_result: SymbolValidationResult::Pending,
            source_link_error_message: None,
            deterministic_result: DeterministicResult::Pending,
            deterministic_error_message: None,
        }
    }
}

impl SymbolValidatorResult {
    /// Result for a package without files to validate
    #[must_use]
    pub fn nothing_to_validate() -> Self {
        SymbolValidatorResult {
            source_link_result: SymbolValidationResult::NothingToValidate,
            source_link_error_message: None,
            deterministic_result: DeterministicResult::NothingToValidate,
            deterministic_error_message: None,
        }
    }
}
