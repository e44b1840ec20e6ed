#![no_main]

use libfuzzer_sys::fuzz_target;
use symscope::assembly::AssemblyDebugParser;

fuzz_target!(|data: &[u8]| {
    if let Ok(parser) = AssemblyDebugParser::new(data.to_vec(), None) {
        let _ = parser.get_debug_data();
    }
});
