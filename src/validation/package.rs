//! Packages handed to the validator.
//!
//! A package is anything implementing [`Package`]. [`MemoryPackage`] holds its files directly;
//! [`ZipPackage`] reads a `.nupkg` or `.snupkg` and takes id and version from its nuspec.

use std::{
    io::{Cursor, Read},
    path::{Path, PathBuf},
};

use quick_xml::{events::Event, Reader};

use crate::Result;

/// One file of a package
pub trait PackageFile: Send + Sync {
    /// Path relative to the package root, with `/` separators
    fn path(&self) -> &str;

    /// Content of the file
    ///
    /// # Errors
    /// Returns an error if the content cannot be read.
    fn data(&self) -> Result<Vec<u8>>;
}

/// A NuGet package handed to the validator
pub trait Package: Send + Sync {
    /// Package id
    fn id(&self) -> &str;

    /// Package version as written in the manifest
    fn version(&self) -> &str;

    /// Every file of the package
    fn files(&self) -> Vec<&dyn PackageFile>;

    /// Location of the package on disk, if it was opened from one
    fn local_path(&self) -> Option<&Path> {
        None
    }

    /// Whether the package is published on NuGet.org
    fn is_published_on_nuget_org(&self) -> bool {
        false
    }
}

/// Normalize a NuGet version: drop build metadata and leading zeros, pad to three parts and drop
/// a zero fourth part.
#[must_use]
pub fn normalize_version(version: &str) -> String {
    let version = version.split('+').next().unwrap_or(version).trim();
    let (release, prerelease) = match version.split_once('-') {
        Some((release, prerelease)) => (release, Some(prerelease)),
        None => (version, None),
    };

    let mut parts: Vec<String> = release
        .split('.')
        .map(|part| match part.parse::<u64>() {
            Ok(number) => number.to_string(),
            Err(_) => part.to_string(),
        })
        .collect();
    while parts.len() < 3 {
        parts.push("0".to_string());
    }
    if parts.len() == 4 && parts[3] == "0" {
        parts.pop();
    }

    match prerelease {
        Some(prerelease) => format!("{}-{prerelease}", parts.join(".")),
        None => parts.join("."),
    }
}

/// A package file held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryPackageFile {
    path: String,
    data: Vec<u8>,
}

impl MemoryPackageFile {
    /// Create a file, `\` in `path` is normalized to `/`
    #[must_use]
    pub fn new(path: &str, data: Vec<u8>) -> Self {
        MemoryPackageFile {
            path: path.replace('\\', "/"),
            data,
        }
    }
}

impl PackageFile for MemoryPackageFile {
    fn path(&self) -> &str {
        &self.path
    }

    fn data(&self) -> Result<Vec<u8>> {
        Ok(self.data.clone())
    }
}

/// A package held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryPackage {
    id: String,
    version: String,
    files: Vec<MemoryPackageFile>,
    local_path: Option<PathBuf>,
    published_on_nuget_org: bool,
}

impl MemoryPackage {
    /// Create an empty package
    #[must_use]
    pub fn new(id: &str, version: &str) -> Self {
        MemoryPackage {
            id: id.to_string(),
            version: version.to_string(),
            ..MemoryPackage::default()
        }
    }

    /// Add a file
    #[must_use]
    pub fn with_file(mut self, path: &str, data: Vec<u8>) -> Self {
        self.files.push(MemoryPackageFile::new(path, data));
        self
    }

    /// Set the location on disk, used to find sibling symbol packages
    #[must_use]
    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    /// Mark the package as published on NuGet.org
    #[must_use]
    pub fn with_nuget_org(mut self, published: bool) -> Self {
        self.published_on_nuget_org = published;
        self
    }
}

impl Package for MemoryPackage {
    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn files(&self) -> Vec<&dyn PackageFile> {
        self.files
            .iter()
            .map(|file| file as &dyn PackageFile)
            .collect()
    }

    fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }

    fn is_published_on_nuget_org(&self) -> bool {
        self.published_on_nuget_org
    }
}

/// A `.nupkg` or `.snupkg` archive, read fully into memory
#[derive(Debug, Clone)]
pub struct ZipPackage {
    package: MemoryPackage,
}

impl ZipPackage {
    /// Read the package at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not a zip archive or has no valid nuspec.
    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let mut package = ZipPackage::from_bytes(&data)?;
        package.package.local_path = Some(path.to_path_buf());
        Ok(package)
    }

    /// Read a package from memory.
    ///
    /// # Errors
    /// Returns an error if `data` is not a zip archive or has no valid nuspec.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data))?;

        let mut files = Vec::with_capacity(archive.len());
        let mut nuspec = None;
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }

            let name = entry.name().to_string();
            let mut content = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
            entry.read_to_end(&mut content)?;

            if nuspec.is_none() && !name.contains('/') && name.ends_with(".nuspec") {
                nuspec = Some(parse_nuspec(&content)?);
            }
            files.push(MemoryPackageFile::new(&name, content));
        }

        let Some((id, version)) = nuspec else {
            return Err(malformed_error!("Package has no nuspec"));
        };

        Ok(ZipPackage {
            package: MemoryPackage {
                id,
                version,
                files,
                local_path: None,
                published_on_nuget_org: false,
            },
        })
    }

    /// Mark the package as published on NuGet.org
    #[must_use]
    pub fn with_nuget_org(mut self, published: bool) -> Self {
        self.package.published_on_nuget_org = published;
        self
    }
}

impl Package for ZipPackage {
    fn id(&self) -> &str {
        self.package.id()
    }

    fn version(&self) -> &str {
        self.package.version()
    }

    fn files(&self) -> Vec<&dyn PackageFile> {
        self.package.files()
    }

    fn local_path(&self) -> Option<&Path> {
        self.package.local_path()
    }

    fn is_published_on_nuget_org(&self) -> bool {
        self.package.is_published_on_nuget_org()
    }
}

/// Read `package/metadata/id` and `package/metadata/version` of a nuspec
fn parse_nuspec(content: &[u8]) -> Result<(String, String)> {
    let text = std::str::from_utf8(content)
        .map_err(|_| malformed_error!("Nuspec is not valid UTF-8"))?;
    let mut reader = Reader::from_str(text.trim_start_matches('\u{feff}'));
    reader.config_mut().trim_text(true);

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut id = None;
    let mut version = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => path.push(element.local_name().as_ref().to_vec()),
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(text)) => {
                let in_metadata = path.len() == 3 && path[0] == b"package" && path[1] == b"metadata";
                if !in_metadata {
                    continue;
                }

                let value = text
                    .unescape()
                    .map_err(|error| malformed_error!("Invalid nuspec - {}", error))?
                    .into_owned();
                match path[2].as_slice() {
                    b"id" => id = Some(value),
                    b"version" => version = Some(value),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => return Err(malformed_error!("Invalid nuspec - {}", error)),
        }
    }

    match (id, version) {
        (Some(id), Some(version)) => Ok((id, version)),
        _ => Err(malformed_error!("Nuspec has no id or version")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::package::{archive, nupkg};

    #[test]
    fn versions() {
        assert_eq!(normalize_version("1.0"), "1.0.0");
        assert_eq!(normalize_version("1.02.0-beta+sha.abc"), "1.2.0-beta");
        assert_eq!(normalize_version("1.0.0.0"), "1.0.0");
        assert_eq!(normalize_version("1.0.0.4"), "1.0.0.4");
    }

    #[test]
    fn zip_package() {
        let data = nupkg(
            "Contoso.Library",
            "1.02.0-beta+sha.abc",
            &[
                ("lib/net8.0/Contoso.Library.dll", b"MZ"),
                ("lib\\net8.0\\Contoso.Library.pdb", b"BSJB"),
            ],
        );

        let package = ZipPackage::from_bytes(&data).unwrap().with_nuget_org(true);
        assert_eq!(package.id(), "Contoso.Library");
        assert_eq!(package.version(), "1.02.0-beta+sha.abc");
        assert!(package.is_published_on_nuget_org());
        assert!(package.local_path().is_none());

        let paths: Vec<&str> = package.files().iter().map(|file| file.path()).collect();
        assert_eq!(
            paths,
            [
                "Contoso.Library.nuspec",
                "lib/net8.0/Contoso.Library.dll",
                "lib/net8.0/Contoso.Library.pdb"
            ]
        );
        assert_eq!(package.files()[1].data().unwrap(), b"MZ");
    }

    #[test]
    fn open_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Contoso.Library.1.2.0.nupkg");
        std::fs::write(&path, nupkg("Contoso.Library", "1.2.0", &[])).unwrap();

        let package = ZipPackage::open(&path).unwrap();
        assert_eq!(package.version(), "1.2.0");
        assert_eq!(package.local_path(), Some(path.as_path()));
    }

    #[test]
    fn invalid_packages() {
        if ZipPackage::from_bytes(b"not a zip").is_ok() {
            panic!("This should not work!")
        }

        let no_nuspec = archive(&[("lib/net8.0/A.dll", b"MZ")]);
        assert!(ZipPackage::from_bytes(&no_nuspec).is_err());

        let no_version = archive(&[(
            "A.nuspec",
            b"<package><metadata><id>A</id></metadata></package>".as_slice(),
        )]);
        assert!(ZipPackage::from_bytes(&no_version).is_err());
    }
}
