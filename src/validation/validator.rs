//! The symbol validator.
//!
//! Each binary of a package moves through a small state machine: a PDB shipped next to it, then
//! an embedded PDB, then the remote sources. PDBs that do not come from the package itself must
//! match the CodeView id and PDB checksums of the binary. Every file is validated on its own, in
//! parallel, and the per-file outcomes are folded into one [`SymbolValidatorResult`], where the
//! most severe finding wins.
//!
//! Remote symbols are fetched through a [`SymbolClient`], so tests can replace the network.

use std::{
    path::PathBuf,
    sync::{mpsc, OnceLock},
    thread,
};

use rayon::prelude::*;

use crate::{
    assembly::{AssemblyDebugData, AssemblyDebugParser, SymbolKey},
    signature::authenticode_signature,
    validation::{
        package::normalize_version, DeterministicResult, HttpSymbolClient, Package, PackageFile,
        SymbolClient, SymbolValidationResult, SymbolValidatorResult, ValidatorOptions, ZipPackage,
    },
    Error, File, Result,
};

/// Trailing subject attributes of Microsoft signing certificates
const MICROSOFT_SIGNER: &str = "O=Microsoft Corporation, L=Redmond, S=Washington, C=US";

/// Extensions of binaries that must have symbols
const SYMBOL_EXTENSIONS: [&str; 3] = [".dll", ".exe", ".winmd"];

/// Where the PDB of a binary came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolSource {
    Local,
    Embedded,
    SymbolPackage,
    NuGetOrg,
    SymbolServer,
}

impl SymbolSource {
    fn is_external(self) -> bool {
        matches!(self, SymbolSource::NuGetOrg | SymbolSource::SymbolServer)
    }
}

/// Per-file states, entered in order until symbols are found
enum FileState<'a> {
    HasPdbLocally(&'a dyn PackageFile),
    NoPdbButMaybeEmbedded,
    NoSymbols,
    Done,
}

struct FileOutcome {
    path: String,
    symbols: Option<(AssemblyDebugData, SymbolSource)>,
    checksum_mismatch: bool,
}

/// Symbol packages of one validation run, each loaded at most once
struct SymbolPackages<'a> {
    package: &'a dyn Package,
    local: OnceLock<Option<ZipPackage>>,
    nuget_org: OnceLock<Option<ZipPackage>>,
}

/// Decides whether the binaries of a package have trustworthy symbols.
///
/// Every binary under `lib/` or `runtimes/*/` (except `native/`) is validated on its own:
///
/// 1. A `.pdb` next to it in the package is used as is
/// 2. Otherwise its embedded portable PDB is used
/// 3. Otherwise the PDB is searched in a `.snupkg` or `.symbols.nupkg` next to the package on
///    disk, then in the symbol package published on NuGet.org, and for binaries signed by
///    Microsoft on the Microsoft symbol server. These PDBs must match the PDB checksums and id
///    recorded in the binary.
///
/// The per-file findings are folded into one [`SymbolValidatorResult`].
///
/// # Examples
///
/// ```rust,no_run
/// use symscope::validation::{SymbolValidator, ValidatorOptions, ZipPackage};
///
/// let package = ZipPackage::open("Contoso.Library.1.0.0.nupkg".as_ref())?;
/// let validator = SymbolValidator::new(ValidatorOptions::default())?;
///
/// let result = validator.validate(&package);
/// println!("{:?} {:?}", result.source_link_result, result.deterministic_result);
/// # Ok::<(), symscope::Error>(())
/// ```
pub struct SymbolValidator {
    options: ValidatorOptions,
    client: Option<Box<dyn SymbolClient>>,
}

impl SymbolValidator {
    /// Create a validator with an HTTP client built from `options`.
    ///
    /// # Errors
    /// Returns [`Error::Network`] if the HTTP client cannot be created.
    pub fn new(options: ValidatorOptions) -> Result<Self> {
        let client: Option<Box<dyn SymbolClient>> = if options.disable_network {
            None
        } else {
            Some(Box::new(HttpSymbolClient::new(&options)?))
        };

        Ok(SymbolValidator { options, client })
    }

    /// Create a validator that fetches remote symbols through `client`
    #[must_use]
    pub fn with_client(options: ValidatorOptions, client: Box<dyn SymbolClient>) -> Self {
        SymbolValidator {
            options,
            client: Some(client),
        }
    }

    /// The options of this validator
    #[must_use]
    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// Validate the symbols of `package`
    pub fn validate(&self, package: &dyn Package) -> SymbolValidatorResult {
        let files = package.files();
        let binaries: Vec<&dyn PackageFile> = files
            .iter()
            .copied()
            .filter(|file| is_validation_candidate(file.path()))
            .collect();

        if binaries.is_empty() {
            log::debug!("{} {} has no binaries", package.id(), package.version());
            return SymbolValidatorResult::nothing_to_validate();
        }

        log::debug!(
            "Validating symbols of {} binaries in {} {}",
            binaries.len(),
            package.id(),
            package.version()
        );

        let packages = SymbolPackages {
            package,
            local: OnceLock::new(),
            nuget_org: OnceLock::new(),
        };

        let outcomes: Vec<FileOutcome> = binaries
            .par_iter()
            .map(|binary| {
                let pdb_path = pdb_path(binary.path());
                let pdb = files
                    .iter()
                    .copied()
                    .find(|file| file.path().eq_ignore_ascii_case(&pdb_path));
                self.validate_file(&packages, *binary, pdb)
            })
            .collect();

        aggregate(&outcomes)
    }

    fn validate_file(
        &self,
        packages: &SymbolPackages<'_>,
        binary: &dyn PackageFile,
        pdb: Option<&dyn PackageFile>,
    ) -> FileOutcome {
        let mut outcome = FileOutcome {
            path: binary.path().to_string(),
            symbols: None,
            checksum_mismatch: false,
        };

        let pe = match binary.data() {
            Ok(pe) => pe,
            Err(error) => {
                log::warn!("Cannot read {}: {}", outcome.path, error);
                return outcome;
            }
        };

        let mut state = match pdb {
            Some(pdb) => FileState::HasPdbLocally(pdb),
            None => FileState::NoPdbButMaybeEmbedded,
        };
        loop {
            state = match state {
                FileState::HasPdbLocally(pdb) => {
                    let data = pdb
                        .data()
                        .and_then(|pdb| self.decode(pe.clone(), Some(pdb), false));
                    match data {
                        Ok(data) if data.has_debug_info() => {
                            outcome.symbols = Some((data, SymbolSource::Local));
                            FileState::Done
                        }
                        Ok(_) => FileState::NoPdbButMaybeEmbedded,
                        Err(error) => {
                            log::warn!("Cannot read {}: {}", pdb.path(), error);
                            FileState::NoPdbButMaybeEmbedded
                        }
                    }
                }
                FileState::NoPdbButMaybeEmbedded => match self.decode(pe.clone(), None, false) {
                    Ok(data) if data.has_debug_info() => {
                        outcome.symbols = Some((data, SymbolSource::Embedded));
                        FileState::Done
                    }
                    Ok(_) => FileState::NoSymbols,
                    Err(error) => {
                        log::warn!("Cannot read debug data of {}: {}", outcome.path, error);
                        FileState::NoSymbols
                    }
                },
                FileState::NoSymbols => {
                    let symbol_keys = match AssemblyDebugParser::new(pe.clone(), None)
                        .and_then(|parser| parser.symbol_keys())
                    {
                        Ok(keys) => keys,
                        Err(error) => {
                            log::warn!("Cannot read symbol keys of {}: {}", outcome.path, error);
                            Vec::new()
                        }
                    };
                    self.fetch_symbols(packages, &pe, &symbol_keys, &mut outcome);
                    FileState::Done
                }
                FileState::Done => break,
            };
        }

        outcome
    }

    /// Search the remaining symbol sources, stopping at the first PDB that matches `pe`
    fn fetch_symbols(
        &self,
        packages: &SymbolPackages<'_>,
        pe: &[u8],
        symbol_keys: &[SymbolKey],
        outcome: &mut FileOutcome,
    ) {
        let pdb_path = pdb_path(&outcome.path);

        let symbol_packages = [
            (packages.local(), SymbolSource::SymbolPackage),
            (packages.nuget_org(self), SymbolSource::NuGetOrg),
        ];
        for (symbol_package, source) in symbol_packages {
            let Some(symbol_package) = symbol_package else {
                continue;
            };
            let Some(pdb) = symbol_package
                .files()
                .into_iter()
                .find(|file| file.path().eq_ignore_ascii_case(&pdb_path))
            else {
                continue;
            };

            let data = pdb
                .data()
                .and_then(|pdb| self.decode(pe.to_vec(), Some(pdb), true));
            if self.accept(data, source, outcome) {
                return;
            }
        }

        let Some(client) = &self.client else {
            return;
        };
        if symbol_keys.is_empty() || !is_microsoft_signed(pe) {
            return;
        }

        for key in symbol_keys {
            let url = format!("{}{}", self.options.symbol_server_url, key.key);
            let headers: Vec<(&str, &str)> = key
                .checksum
                .iter()
                .map(|checksum| ("SymbolChecksum", checksum.as_str()))
                .collect();

            let pdb = match client.get(&url, &headers) {
                Ok(pdb) => pdb,
                Err(error) => {
                    log::debug!("No symbols at {url}: {error}");
                    continue;
                }
            };

            let data = self.decode(pe.to_vec(), Some(pdb), true);
            if self.accept(data, SymbolSource::SymbolServer, outcome) {
                return;
            }
        }
    }

    /// Record `data` as the symbols of `outcome` if it holds a PDB matching the binary
    fn accept(
        &self,
        data: Result<AssemblyDebugData>,
        source: SymbolSource,
        outcome: &mut FileOutcome,
    ) -> bool {
        match data {
            Ok(data) if !data.has_debug_info() => false,
            Ok(data) if !data.pdb_checksum_is_valid => {
                log::info!(
                    "{:?} symbols of {} do not match the binary",
                    source,
                    outcome.path
                );
                outcome.checksum_mismatch = true;
                false
            }
            Ok(data) => {
                outcome.symbols = Some((data, source));
                true
            }
            Err(error) => {
                log::warn!(
                    "Cannot read {:?} symbols of {}: {}",
                    source,
                    outcome.path,
                    error
                );
                false
            }
        }
    }

    /// Decode the debug data on a helper thread, bounded by the decode timeout
    fn decode(
        &self,
        pe: Vec<u8>,
        pdb: Option<Vec<u8>>,
        validate_checksums: bool,
    ) -> Result<AssemblyDebugData> {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let result = AssemblyDebugParser::new(pe, pdb).and_then(|parser| {
                let parser = parser.with_checksum_validation(validate_checksums);
                let data = parser.get_debug_data()?.clone();
                Ok(data)
            });
            // The receiver is gone once the budget is exceeded
            let _ = sender.send(result);
        });

        match receiver.recv_timeout(self.options.decode_timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                Err(Error::Timeout(self.options.decode_timeout))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(Error::Error("Debug data decoder terminated".to_string()))
            }
        }
    }
}

impl SymbolPackages<'_> {
    /// `.snupkg` or `.symbols.nupkg` next to the package on disk
    fn local(&self) -> Option<&ZipPackage> {
        self.local
            .get_or_init(|| {
                let path = self.package.local_path()?;
                let stem = path.file_stem()?.to_string_lossy().into_owned();
                let candidates: [PathBuf; 2] = [
                    path.with_file_name(format!("{stem}.snupkg")),
                    path.with_file_name(format!("{stem}.symbols.nupkg")),
                ];

                candidates
                    .iter()
                    .filter(|candidate| candidate.is_file())
                    .find_map(|candidate| match ZipPackage::open(candidate) {
                        Ok(package) => Some(package),
                        Err(error) => {
                            log::warn!("Cannot read {}: {}", candidate.display(), error);
                            None
                        }
                    })
            })
            .as_ref()
    }

    /// The symbol package published on NuGet.org
    fn nuget_org(&self, validator: &SymbolValidator) -> Option<&ZipPackage> {
        self.nuget_org
            .get_or_init(|| {
                let client = validator.client.as_ref()?;
                if !self.package.is_published_on_nuget_org() {
                    return None;
                }

                let url = format!(
                    "{}{}/{}",
                    validator.options.nuget_symbol_url,
                    self.package.id(),
                    normalize_version(self.package.version())
                );
                let data = match client.get(&url, &[]) {
                    Ok(data) => data,
                    Err(error) => {
                        log::debug!("No symbol package at {url}: {error}");
                        return None;
                    }
                };

                match ZipPackage::from_bytes(&data) {
                    Ok(package) => Some(package),
                    Err(error) => {
                        log::warn!("Cannot read symbol package {url}: {error}");
                        None
                    }
                }
            })
            .as_ref()
    }
}

/// Binaries under `lib/` or `runtimes/{rid}/` (except `native/`), satellite assemblies excluded
fn is_validation_candidate(path: &str) -> bool {
    let path = path.to_ascii_lowercase();

    let mut segments = path.split('/');
    let in_scope = match segments.next() {
        Some("lib") => true,
        Some("runtimes") => segments.nth(1).is_some_and(|kind| kind != "native"),
        _ => false,
    };

    in_scope
        && SYMBOL_EXTENSIONS.iter().any(|extension| path.ends_with(extension))
        && !path.ends_with(".resources.dll")
}

/// `path` with its extension replaced by `.pdb`
fn pdb_path(path: &str) -> String {
    let stem = match path.rfind('.') {
        Some(dot) if !path[dot..].contains('/') => &path[..dot],
        _ => path,
    };
    format!("{stem}.pdb")
}

fn is_microsoft_signed(pe: &[u8]) -> bool {
    let signature = File::from_mem(pe.to_vec()).and_then(|file| authenticode_signature(&file));
    match signature {
        Ok(Some(signature)) => signature
            .signer_subject()
            .is_some_and(|subject| subject.ends_with(MICROSOFT_SIGNER)),
        Ok(None) => false,
        Err(error) => {
            log::debug!("Cannot read Authenticode signature: {error}");
            false
        }
    }
}

/// Fold the per-file findings into one verdict; the most severe finding wins
fn aggregate(outcomes: &[FileOutcome]) -> SymbolValidatorResult {
    let mut no_symbols = Vec::new();
    let mut checksum_mismatches = Vec::new();
    let mut invalid_source_link = Vec::new();
    let mut no_source_link = Vec::new();
    let mut untracked = Vec::new();
    let mut non_deterministic = Vec::new();
    let mut external = false;

    for outcome in outcomes {
        let path = outcome.path.as_str();
        let Some((data, source)) = &outcome.symbols else {
            no_symbols.push(path);
            if outcome.checksum_mismatch {
                checksum_mismatches.push(path);
            }
            continue;
        };

        external |= source.is_external();

        if !data.source_link_errors.is_empty() {
            invalid_source_link.push(format!("{path}: {}", data.source_link_errors.join("; ")));
        } else if !data.has_source_link() {
            no_source_link.push(path);
        }

        let documents: Vec<&str> = data
            .untracked_sources()
            .iter()
            .map(|document| document.name.as_str())
            .collect();
        if !documents.is_empty() {
            untracked.push(format!("{path}: {}", documents.join(", ")));
        }

        if !(data.sources_are_deterministic() && data.has_compiler_flags()) {
            non_deterministic.push(path);
        }
    }

    let missing_symbols = (!no_symbols.is_empty()).then(|| {
        let mut message = format!("Missing symbols for {}", no_symbols.join(", "));
        if !checksum_mismatches.is_empty() {
            message.push_str(&format!(
                ". Symbols were found for {} but do not match the binaries",
                checksum_mismatches.join(", ")
            ));
        }
        message
    });

    let (source_link_result, source_link_error_message) = if let Some(message) = &missing_symbols
    {
        (SymbolValidationResult::NoSymbols, Some(message.clone()))
    } else if !invalid_source_link.is_empty() {
        (
            SymbolValidationResult::InvalidSourceLink,
            Some(format!("Invalid Source Link in {}", invalid_source_link.join("\n"))),
        )
    } else if !no_source_link.is_empty() {
        (
            SymbolValidationResult::NoSourceLink,
            Some(format!("Missing Source Link for {}", no_source_link.join(", "))),
        )
    } else if !untracked.is_empty() {
        (
            SymbolValidationResult::HasUntrackedSources,
            Some(format!("Contains untracked sources:\n{}", untracked.join("\n"))),
        )
    } else if external {
        (SymbolValidationResult::ValidExternal, None)
    } else {
        (SymbolValidationResult::Valid, None)
    };

    let (deterministic_result, deterministic_error_message) = if let Some(message) = missing_symbols
    {
        (DeterministicResult::NonDeterministic, Some(message))
    } else if !non_deterministic.is_empty() {
        (
            DeterministicResult::NonDeterministic,
            Some(format!(
                "Not built deterministically: {}",
                non_deterministic.join(", ")
            )),
        )
    } else if !untracked.is_empty() {
        (
            DeterministicResult::HasUntrackedSources,
            Some(format!("Contains untracked sources:\n{}", untracked.join("\n"))),
        )
    } else {
        (DeterministicResult::Valid, None)
    };

    SymbolValidatorResult {
        source_link_result,
        source_link_error_message,
        deterministic_result,
        deterministic_error_message,
    }
}
