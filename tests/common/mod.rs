//! Builders shared with the unit tests of the crate.
#![allow(dead_code)]

#[path = "../../src/test/der.rs"]
pub mod der;
#[path = "../../src/test/metadata.rs"]
pub mod metadata;
#[path = "../../src/test/package.rs"]
pub mod package;
#[path = "../../src/test/pdb.rs"]
pub mod pdb;
#[path = "../../src/test/pe.rs"]
pub mod pe;

pub use pdb::PortablePdbBuilder;
pub use pe::PeBuilder;

use symscope::metadata::pdb::PortablePdb;
use uguid::{guid, Guid};

/// Id of the PDBs built by [`symbols`]
pub const PDB_ID: Guid = guid!("9a1c4e0b-58f3-4d3c-8a0f-2b7e6d1c5f44");

/// A portable PDB with one source-linked document, compiled deterministically
pub fn symbols() -> PortablePdbBuilder {
    PortablePdbBuilder::new()
        .with_id(PDB_ID, 0x6600_0000)
        .with_source_document("/_/src/Contoso/Widget.cs", b"namespace Contoso { class Widget {} }")
        .with_source_link(
            r#"{"documents":{"/_/*":"https://raw.githubusercontent.com/contoso/widgets/4f2a9c1/*"}}"#,
        )
        .with_compilation_options(&[
            ("language", "C#"),
            ("compiler-version", "4.8.0"),
            ("optimization", "release"),
        ])
}

/// A PE image referencing `pdb` through CodeView and PDB checksum records
pub fn binary_for(pdb: &[u8]) -> PeBuilder {
    let content = PortablePdb::read(pdb).unwrap().checksum_content();
    PeBuilder::new()
        .with_codeview(PDB_ID, "Contoso.Widgets.pdb")
        .with_pdb_checksum("SHA256", pdb::sha256(&content))
}
