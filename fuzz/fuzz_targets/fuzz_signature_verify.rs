#![no_main]
use libfuzzer_sys::fuzz_target;
use quantum_vault_core::crypto::signing;

fuzz_target!(|data: &[u8]| {
    // verify() returns a bool for every input, never panics.
    let split = data.len() / 3;
    let (sig, rest) = data.split_at(split);
    let (msg, pk) = rest.split_at(rest.len() / 2);
    assert!(!signing::verify(sig, msg, pk) || sig.len() == signing::SIGNATURE_BYTES);
});
