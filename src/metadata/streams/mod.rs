//! Metadata streams.
//!
//! - **`#Strings`** - NUL-terminated UTF-8 identifiers
//! - **`#Blob`** - length-prefixed signatures, custom attribute values, document names and
//!   custom debug information
//! - **`#GUID`** - 16-byte GUIDs: module version ids, document hash algorithms and languages,
//!   custom debug information kinds
//! - **`#~`** - the compressed tables
//! - **`#Pdb`** - portable PDB id and the row counts of the assembly tables
//!
//! `#US` is recognized in the stream directory but never read.

mod blob;
mod guid;
mod pdb;
mod streamheader;
mod strings;
mod tablesheader;

pub use blob::Blob;
pub use guid::Guid;
pub use pdb::{PdbStream, PDB_ID_SIZE};
pub use streamheader::{StreamHeader, KNOWN_STREAMS};
pub use strings::Strings;
pub use tablesheader::TablesHeader;
