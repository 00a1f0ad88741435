#![no_main]
use libfuzzer_sys::fuzz_target;
use quantum_vault_core::EncryptedEnvelope;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };

    // Arbitrary JSON must never panic; anything that decodes must re-encode
    // to an equivalent envelope.
    if let Ok(envelope) = EncryptedEnvelope::from_json(json) {
        let encoded = envelope.to_json().expect("decoded envelope must encode");
        let again = EncryptedEnvelope::from_json(&encoded).expect("re-encoded envelope must decode");
        assert_eq!(envelope, again, "Envelope JSON round-trip mismatch");
    }
});
