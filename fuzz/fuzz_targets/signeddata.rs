#![no_main]

use libfuzzer_sys::fuzz_target;
use symscope::{
    pkcs::{AsnDecode, Certificate},
    signature::package_signature,
};

fuzz_target!(|data: &[u8]| {
    let _ = Certificate::from_der(data);
    if let Ok(signature) = package_signature(data) {
        let _ = signature.signer_subject();
        let _ = signature.is_signer_valid_at_timestamp();
    }
});
