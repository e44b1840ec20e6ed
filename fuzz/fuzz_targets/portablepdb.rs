#![no_main]

use libfuzzer_sys::fuzz_target;
use symscope::metadata::pdb::PortablePdb;

fuzz_target!(|data: &[u8]| {
    if let Ok(pdb) = PortablePdb::read(data) {
        let _ = pdb.documents();
        let _ = pdb.source_link();
        let _ = pdb.compilation_options();
        let _ = pdb.metadata_references();
    }
});
