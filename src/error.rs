use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants fall into four families, and callers are expected to treat them differently:
///
/// ## Decode errors
/// - [`Error::Malformed`] - Corrupted or invalid ASN.1, PE, or metadata structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of a buffer or bounded region
/// - [`Error::NotSupported`] - Unsupported file format or feature
/// - [`Error::Empty`] - Empty input provided
/// - [`Error::GoblinErr`] - PE parsing errors from the goblin crate
/// - [`Error::Json`] - The Source Link document is not valid JSON
/// - [`Error::UnresolvedType`] - A custom attribute argument type could not be resolved
///
/// ## Contract violations
/// - [`Error::DuplicateAttribute`] - A single-valued signer attribute occurs more than once
/// - [`Error::UnsupportedCertificateChoice`] - A `CertificateChoices` variant other than a plain
///   X.509 certificate
/// - [`Error::ContractViolation`] - An accessor was used on a value it does not apply to
///
/// ## I/O and network errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::Network`] - HTTP transport errors or non-success status codes
/// - [`Error::Timeout`] - A bounded operation exceeded its time budget
/// - [`Error::ZipError`] - A symbol package could not be opened as an archive
///
/// ## Other
/// - [`Error::Error`] - Miscellaneous failures
///
/// Decode and I/O errors are folded into a verdict by [`crate::validation::SymbolValidator`] and
/// never surface past it. Contract violations always propagate out of the decoders.
///
/// # Examples
///
/// ```rust
/// use symscope::{pkcs::{AsnDecode, Certificate}, Error};
///
/// match Certificate::from_der(&[0x30, 0x05, 0x02]) {
///     Ok(_) => println!("decoded"),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed certificate: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The input is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the input.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This file type is not supported.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),

    /// Error from the goblin crate during PE parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// A custom attribute argument type could not be resolved to a decodable type.
    ///
    /// The associated value names the type. Only the affected attribute is skipped.
    #[error("Unresolved type - {0}")]
    UnresolvedType(String),

    /// A signer attribute that must be single-valued was found more than once.
    ///
    /// The associated value is the dotted object identifier of the attribute.
    #[error("Attribute {0} occurs more than once")]
    DuplicateAttribute(String),

    /// A `CertificateChoices` alternative other than a plain X.509 certificate was found.
    ///
    /// The associated value is the raw identifier octet of the choice.
    #[error("CertificateChoices alternative with tag 0x{0:02x} is not supported")]
    UnsupportedCertificateChoice(u8),

    /// An accessor was called on a value it is not defined for.
    #[error("Contract violation - {0}")]
    ContractViolation(String),

    /// HTTP transport error or unexpected status.
    #[error("Network error - {0}")]
    Network(String),

    /// An operation exceeded its time budget.
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A symbol package archive could not be read.
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    /// A JSON document could not be parsed.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::Network(error.to_string())
    }
}
