#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use quantum_vault_core::crypto::aead;
use quantum_vault_core::Error;

#[derive(Arbitrary, Debug)]
struct Input {
    key: [u8; 32],
    nonce: Vec<u8>,
    ciphertext: Vec<u8>,
}

fuzz_target!(|input: Input| {
    // Forged ciphertexts must fail closed with the one opaque error.
    match aead::decrypt(&input.ciphertext, &input.nonce, &input.key) {
        Ok(_) => {}
        Err(e) => assert_eq!(e, Error::AuthenticationFailure),
    }
});
