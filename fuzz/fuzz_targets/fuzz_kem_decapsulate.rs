#![no_main]
use libfuzzer_sys::fuzz_target;
use quantum_vault_core::crypto::kem;

fuzz_target!(|data: &[u8]| {
    if data.len() < 32 {
        return;
    }
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&data[..32]);
    let rest = &data[32..];

    let keypair = kem::generate_keypair_from_seed(&seed).expect("seeded keygen must succeed");

    // Arbitrary ciphertexts of any length must not panic.
    let _ = kem::decapsulate(rest, keypair.private_key());

    // Valid encapsulations must round-trip.
    let enc = kem::encapsulate(keypair.public_key()).expect("encapsulation to own key must succeed");
    let ss = kem::decapsulate(&enc.ciphertext, keypair.private_key())
        .expect("Decapsulation of valid ciphertext must succeed");
    assert_eq!(*ss, *enc.shared_secret, "Shared secret mismatch");

    // Arbitrary public keys must not panic.
    let _ = kem::encapsulate(rest);
});
