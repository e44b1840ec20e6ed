//! Debug data of binaries paired with portable PDBs.

mod common;

use common::{binary_for, pdb::sha256, symbols, PDB_ID};
use symscope::{
    assembly::{AssemblyDebugParser, PdbType, SymbolHashAlgorithm, SymbolLanguage},
    metadata::pdb::PortablePdb,
    utils::to_hex_upper,
};
use uguid::guid;

#[test]
fn debug_data_is_computed_once() {
    let pdb = symbols().build();
    let parser = AssemblyDebugParser::new(binary_for(&pdb).build(), Some(pdb)).unwrap();

    let first = parser.get_debug_data().unwrap();
    let second = parser.get_debug_data().unwrap();
    assert!(std::ptr::eq(first, second));

    assert_eq!(first.pdb_type, Some(PdbType::Portable));
    assert_eq!(first.sources.len(), 1);

    let document = &first.sources[0];
    assert_eq!(document.name, "/_/src/Contoso/Widget.cs");
    assert_eq!(document.hash_algorithm, SymbolHashAlgorithm::SHA256);
    assert_eq!(document.language, SymbolLanguage::CSharp);
    assert!(!document.is_embedded);
    assert_eq!(
        document.url.as_deref(),
        Some("https://raw.githubusercontent.com/contoso/widgets/4f2a9c1/src/Contoso/Widget.cs")
    );
    assert!(first.untracked_sources().is_empty());
    assert!(first.sources_are_deterministic());
    assert!(first.has_compiler_flags());
}

#[test]
fn checksums_of_a_separate_pdb() {
    let pdb = symbols().build();
    let binary = binary_for(&pdb).build();

    let parser = AssemblyDebugParser::new(binary.clone(), Some(pdb))
        .unwrap()
        .with_checksum_validation(true);
    assert!(parser.get_debug_data().unwrap().pdb_checksum_is_valid);

    let other = symbols()
        .with_id(guid!("0d7c3b52-1e49-4a86-b0f3-6c2e8a917d05"), 0x6600_0000)
        .build();
    let parser = AssemblyDebugParser::new(binary, Some(other))
        .unwrap()
        .with_checksum_validation(true);
    assert!(!parser.get_debug_data().unwrap().pdb_checksum_is_valid);
}

#[test]
fn symbol_keys_without_pdb() {
    let pdb = symbols().build();
    let content = PortablePdb::read(&pdb).unwrap().checksum_content();

    let parser = AssemblyDebugParser::new(binary_for(&pdb).build(), None).unwrap();
    let data = parser.get_debug_data().unwrap();
    assert!(!data.has_debug_info());

    let guid = PDB_ID.to_string().replace('-', "");
    assert_eq!(data.symbol_keys.len(), 1);
    assert_eq!(
        data.symbol_keys[0].key,
        format!("contoso.widgets.pdb/{guid}FFFFFFFF/contoso.widgets.pdb")
    );
    assert_eq!(
        data.symbol_keys[0].checksum,
        Some(format!("SHA256:{}", to_hex_upper(&sha256(&content))))
    );
}

#[test]
fn not_a_pdb() {
    let pdb = symbols().build();
    let parser =
        AssemblyDebugParser::new(binary_for(&pdb).build(), Some(b"not a pdb".to_vec())).unwrap();

    if parser.get_debug_data().is_ok() {
        panic!("This should not work!")
    }
}
