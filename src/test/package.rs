//! Zip archives laid out like NuGet packages.

use std::io::{Cursor, Write};

/// A zip archive with the given entries, stored in order
pub fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A minimal nuspec
pub fn nuspec(id: &str, version: &str) -> Vec<u8> {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://schemas.microsoft.com/packaging/2013/05/nuspec.xsd">
  <metadata>
    <id>{id}</id>
    <version>{version}</version>
    <authors>Contoso</authors>
  </metadata>
</package>"#
    )
    .into_bytes()
}

/// A package archive with a nuspec and `files`
pub fn nupkg(id: &str, version: &str, files: &[(&str, &[u8])]) -> Vec<u8> {
    let nuspec = nuspec(id, version);
    let name = format!("{id}.nuspec");

    let mut entries: Vec<(&str, &[u8])> = vec![(name.as_str(), nuspec.as_slice())];
    entries.extend_from_slice(files);
    archive(&entries)
}
