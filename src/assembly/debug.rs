//! Debug information of an assembly and its PDB.
//!
//! [`AssemblyDebugParser`] combines the debug directory of a PE image with a portable PDB, taken
//! either from a separate file or from the image itself, into [`AssemblyDebugData`]: documents
//! with their Source Link URLs, compiler flags, metadata references, symbol server keys and the
//! outcome of the checksum checks.
//!
//! # Examples
//!
//! ```rust,no_run
//! use symscope::assembly::AssemblyDebugParser;
//!
//! let pe = std::fs::read("Library.dll")?;
//! let parser = AssemblyDebugParser::new(pe, None)?;
//! let data = parser.get_debug_data()?;
//!
//! for document in data.untracked_sources() {
//!     println!("not source linked: {}", document.name);
//! }
//! # Ok::<(), symscope::Error>(())
//! ```

use std::sync::OnceLock;

use uguid::{guid, Guid};

use crate::{
    assembly::sourcelink::SourceLinkMap,
    metadata::{
        customdebuginformation::MetadataReference,
        pdb::{PdbDocument, PortablePdb},
    },
    utils::{digest, to_hex_upper},
    File, Result,
};

/// Magic of a Windows (MSF) PDB
const MSF_MAGIC: &[u8] = b"Microsoft C/C++ MSF 7.00\r\n\x1aDS\0\0\0";
/// Magic of a metadata root
const BSJB_MAGIC: &[u8] = b"BSJB";

const HASH_MD5: Guid = guid!("406ea660-64cf-4c82-b6f0-42d48172a799");
const HASH_SHA1: Guid = guid!("ff1816ec-aa5e-4d10-87f7-6f4963833460");
const HASH_SHA256: Guid = guid!("8829d00f-11b8-4213-878b-770e8597ac16");

const LANGUAGE_CSHARP: Guid = guid!("3f5162f8-07c6-11d3-9053-00c04fa302a1");
const LANGUAGE_VISUAL_BASIC: Guid = guid!("3a12d0b8-c26c-11d0-b442-00a0244a1dd2");
const LANGUAGE_FSHARP: Guid = guid!("ab4f38c9-b6e6-43ba-be3b-58080b2ccce3");

/// Where the PDB came from and what format it has
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdbType {
    /// A separate portable PDB
    Portable,
    /// A portable PDB embedded into the image
    Embedded,
    /// A Windows PDB, whose content is not inspected
    Full,
}

/// Hash algorithm of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum SymbolHashAlgorithm {
    MD5,
    SHA1,
    SHA256,
    Unknown,
}

impl SymbolHashAlgorithm {
    /// Name accepted by [`crate::utils::digest`], `None` for unknown algorithms
    #[must_use]
    pub fn name(&self) -> Option<&'static str> {
        match self {
            SymbolHashAlgorithm::MD5 => Some("MD5"),
            SymbolHashAlgorithm::SHA1 => Some("SHA1"),
            SymbolHashAlgorithm::SHA256 => Some("SHA256"),
            SymbolHashAlgorithm::Unknown => None,
        }
    }
}

impl From<Option<Guid>> for SymbolHashAlgorithm {
    fn from(guid: Option<Guid>) -> Self {
        match guid {
            Some(guid) if guid == HASH_MD5 => SymbolHashAlgorithm::MD5,
            Some(guid) if guid == HASH_SHA1 => SymbolHashAlgorithm::SHA1,
            Some(guid) if guid == HASH_SHA256 => SymbolHashAlgorithm::SHA256,
            _ => SymbolHashAlgorithm::Unknown,
        }
    }
}

/// Source language of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum SymbolLanguage {
    CSharp,
    VisualBasic,
    FSharp,
    Unknown,
}

impl From<Option<Guid>> for SymbolLanguage {
    fn from(guid: Option<Guid>) -> Self {
        match guid {
            Some(guid) if guid == LANGUAGE_CSHARP => SymbolLanguage::CSharp,
            Some(guid) if guid == LANGUAGE_VISUAL_BASIC => SymbolLanguage::VisualBasic,
            Some(guid) if guid == LANGUAGE_FSHARP => SymbolLanguage::FSharp,
            _ => SymbolLanguage::Unknown,
        }
    }
}

/// A source document of the PDB
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyDebugSourceDocument {
    /// Path at compile time
    pub name: String,
    /// Declared content hash
    pub hash: Vec<u8>,
    /// Algorithm of [`Self::hash`]
    pub hash_algorithm: SymbolHashAlgorithm,
    /// Source language
    pub language: SymbolLanguage,
    /// The content is embedded into the PDB
    pub is_embedded: bool,
    /// Source Link URL, `None` for embedded or untracked documents
    pub url: Option<String>,
}

/// One compiler option recorded in the PDB
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct CompilerFlag {
    pub key: String,
    pub value: String,
}

/// A symbol server lookup key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolKey {
    /// Key relative to the symbol server root
    pub key: String,
    /// Value of the `SymbolChecksum` request header, if the image records PDB checksums
    pub checksum: Option<String>,
}

/// Everything known about the debug information of one assembly
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssemblyDebugData {
    /// Kind of PDB, `None` if there is none
    pub pdb_type: Option<PdbType>,
    /// Source Link maps
    pub source_link: Vec<SourceLinkMap>,
    /// Source documents
    pub sources: Vec<AssemblyDebugSourceDocument>,
    /// Symbol server keys of the image
    pub symbol_keys: Vec<SymbolKey>,
    /// Compiler options
    pub compiler_flags: Vec<CompilerFlag>,
    /// Assemblies referenced by the compilation
    pub metadata_references: Vec<MetadataReference>,
    /// `false` if checksum validation was requested and failed
    pub pdb_checksum_is_valid: bool,
    /// Problems found in the Source Link document
    pub source_link_errors: Vec<String>,
}

/// Returns `true` for paths rewritten by `-pathmap`, `/_/` or `/_1/` and so on
fn is_pathmap_normalized(path: &str) -> bool {
    let Some(rest) = path.strip_prefix("/_") else {
        return false;
    };

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    rest[digits..].starts_with('/')
}

impl AssemblyDebugData {
    /// A PDB was found
    #[must_use]
    pub fn has_debug_info(&self) -> bool {
        self.pdb_type.is_some()
    }

    /// At least one document is embedded or resolves to a Source Link URL
    #[must_use]
    pub fn has_source_link(&self) -> bool {
        self.sources
            .iter()
            .any(|document| document.is_embedded || document.url.is_some())
    }

    /// Every document is either embedded or source linked
    #[must_use]
    pub fn all_source_link(&self) -> bool {
        self.has_source_link() && self.untracked_sources().is_empty()
    }

    /// Documents that are neither embedded nor source linked
    #[must_use]
    pub fn untracked_sources(&self) -> Vec<&AssemblyDebugSourceDocument> {
        self.sources
            .iter()
            .filter(|document| !document.is_embedded && document.url.is_none())
            .collect()
    }

    /// Every document outside the PDB has a path normalized with `-pathmap`
    #[must_use]
    pub fn sources_are_deterministic(&self) -> bool {
        matches!(self.pdb_type, Some(PdbType::Portable | PdbType::Embedded))
            && self
                .sources
                .iter()
                .filter(|document| !document.is_embedded)
                .all(|document| is_pathmap_normalized(&document.name))
    }

    /// The PDB records the compiler options
    #[must_use]
    pub fn has_compiler_flags(&self) -> bool {
        !self.compiler_flags.is_empty()
    }
}

/// Reads the debug information of a PE image and its PDB
pub struct AssemblyDebugParser {
    file: File,
    pdb: Option<Vec<u8>>,
    validate_checksums: bool,
    data: OnceLock<AssemblyDebugData>,
}

impl AssemblyDebugParser {
    /// Create a parser for the image `pe`, with a separate PDB or `None` to use the embedded one.
    ///
    /// # Errors
    /// Returns an error if `pe` is not a PE image.
    pub fn new(pe: Vec<u8>, pdb: Option<Vec<u8>>) -> Result<Self> {
        Ok(AssemblyDebugParser {
            file: File::from_mem(pe)?,
            pdb,
            validate_checksums: false,
            data: OnceLock::new(),
        })
    }

    /// Check the PDB against the image: PDB checksums, PDB id and embedded document hashes
    #[must_use]
    pub fn with_checksum_validation(mut self, validate: bool) -> Self {
        self.validate_checksums = validate;
        self
    }

    /// The PE image
    #[must_use]
    pub fn file(&self) -> &File {
        &self.file
    }

    /// The decoded debug data. Decoding happens on the first call; later calls return the same
    /// data.
    ///
    /// # Errors
    /// Returns an error if the debug directory or the PDB is damaged.
    pub fn get_debug_data(&self) -> Result<&AssemblyDebugData> {
        if let Some(data) = self.data.get() {
            return Ok(data);
        }

        let data = self.read_debug_data()?;
        Ok(self.data.get_or_init(|| data))
    }

    fn read_debug_data(&self) -> Result<AssemblyDebugData> {
        let mut data = AssemblyDebugData {
            symbol_keys: self.symbol_keys()?,
            pdb_checksum_is_valid: true,
            ..AssemblyDebugData::default()
        };

        let (pdb, pdb_type) = match &self.pdb {
            Some(pdb) if pdb.starts_with(MSF_MAGIC) => {
                data.pdb_type = Some(PdbType::Full);
                return Ok(data);
            }
            Some(pdb) if pdb.starts_with(BSJB_MAGIC) => (pdb.clone(), PdbType::Portable),
            Some(_) => return Err(malformed_error!("Unknown PDB format")),
            None => match self.file.embedded_pdb()? {
                Some(pdb) => (pdb, PdbType::Embedded),
                None => return Ok(data),
            },
        };

        let pdb = PortablePdb::read(&pdb)?;
        data.pdb_type = Some(pdb_type);

        if let Some(json) = pdb.source_link()? {
            match SourceLinkMap::parse(&json) {
                Ok((maps, errors)) => {
                    data.source_link = maps;
                    data.source_link_errors = errors;
                }
                Err(error) => data
                    .source_link_errors
                    .push(format!("Invalid Source Link document: {error}")),
            }
        }

        let documents = pdb.documents()?;
        data.sources = documents
            .iter()
            .map(|document| AssemblyDebugSourceDocument {
                name: document.name.clone(),
                hash: document.hash.to_vec(),
                hash_algorithm: SymbolHashAlgorithm::from(document.hash_algorithm),
                language: SymbolLanguage::from(document.language),
                is_embedded: document.embedded_source.is_some(),
                url: if document.embedded_source.is_some() {
                    None
                } else {
                    SourceLinkMap::resolve(&data.source_link, &document.name)
                },
            })
            .collect();

        data.compiler_flags = pdb
            .compilation_options()?
            .into_iter()
            .map(|(key, value)| CompilerFlag { key, value })
            .collect();
        data.metadata_references = pdb.metadata_references()?;

        if self.validate_checksums {
            data.pdb_checksum_is_valid = self.checksums_match(&pdb, &documents)?;
        }

        Ok(data)
    }

    fn checksums_match(&self, pdb: &PortablePdb<'_>, documents: &[PdbDocument<'_>]) -> Result<bool> {
        let portable: Vec<_> = self
            .file
            .codeviews()?
            .into_iter()
            .filter(|codeview| codeview.portable)
            .collect();
        if !portable.is_empty() && !portable.iter().any(|codeview| codeview.guid == pdb.guid()) {
            log::debug!("No CodeView record matches the PDB id {}", pdb.guid());
            return Ok(false);
        }

        let checksums = self.file.pdb_checksums()?;
        if !checksums.is_empty() {
            let content = pdb.checksum_content();
            for checksum in &checksums {
                match digest(&checksum.algorithm, &content) {
                    Some(hash) if hash == checksum.checksum => {}
                    Some(_) => {
                        log::debug!("{} PDB checksum mismatch", checksum.algorithm);
                        return Ok(false);
                    }
                    None => log::debug!("Unknown PDB checksum algorithm {}", checksum.algorithm),
                }
            }
        }

        for document in documents {
            let Some(content) = document.source()? else {
                continue;
            };
            let Some(algorithm) = SymbolHashAlgorithm::from(document.hash_algorithm).name() else {
                continue;
            };

            if digest(algorithm, &content).as_deref() != Some(document.hash) {
                log::debug!("Embedded source {} does not match its hash", document.name);
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Symbol server keys of every CodeView record.
    ///
    /// Portable PDBs use `name/{guid}FFFFFFFF/name`, Windows PDBs `name/{GUID}{age}/name`.
    /// Only the debug directory is read, the PDB itself is never decoded.
    ///
    /// # Errors
    /// Returns an error if a CodeView or PdbChecksum entry is malformed.
    pub fn symbol_keys(&self) -> Result<Vec<SymbolKey>> {
        let checksums = self.file.pdb_checksums()?;
        let checksum = (!checksums.is_empty()).then(|| {
            checksums
                .iter()
                .map(|checksum| {
                    format!("{}:{}", checksum.algorithm, to_hex_upper(&checksum.checksum))
                })
                .collect::<Vec<_>>()
                .join(";")
        });

        Ok(self
            .file
            .codeviews()?
            .iter()
            .map(|codeview| {
                let name = codeview.file_name().to_lowercase();
                let guid = codeview.guid.to_string().replace('-', "").to_lowercase();
                if codeview.portable {
                    SymbolKey {
                        key: format!("{name}/{guid}FFFFFFFF/{name}"),
                        checksum: checksum.clone(),
                    }
                } else {
                    SymbolKey {
                        key: format!("{name}/{guid}{:X}/{name}", codeview.age).to_lowercase(),
                        checksum: None,
                    }
                }
            })
            .collect())
    }
}
