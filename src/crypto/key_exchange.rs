/// Classical key agreement: ECDH over NIST P-256
///
/// Key pairs carry the public key as a 65-byte SEC1 uncompressed point and
/// the private key as its 32-byte scalar. On the wire the public key travels
/// as base64 SPKI DER and the private key as base64 PKCS#8 DER.
use p256::ecdh::diffie_hellman;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use p256::{PublicKey, SecretKey};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use zeroize::Zeroizing;

use crate::crypto::{decode_b64, encode_b64, Algorithm, KeyPair};
use crate::entropy::EntropySource;
use crate::error::{Error, Result};

/// SEC1 uncompressed point: 0x04 || X || Y
pub const PUBLIC_KEY_BYTES: usize = 65;
/// Raw scalar
pub const PRIVATE_KEY_BYTES: usize = 32;
pub const SHARED_SECRET_BYTES: usize = 32;

/// Generate a P-256 key pair from pool entropy.
pub async fn generate_keypair(entropy: &EntropySource) -> Result<KeyPair> {
    let mut rng = entropy.seeded_rng().await?;
    keypair_from_rng(&mut rng)
}

/// Deterministic key pair from a 32-byte seed
pub fn generate_keypair_from_seed(seed: &[u8; 32]) -> Result<KeyPair> {
    let mut rng = ChaCha20Rng::from_seed(*seed);
    keypair_from_rng(&mut rng)
}

fn keypair_from_rng(rng: &mut ChaCha20Rng) -> Result<KeyPair> {
    let secret = SecretKey::random(rng);
    let public = secret.public_key().to_encoded_point(false);
    KeyPair::new(
        Algorithm::EcdhP256,
        public.as_bytes().to_vec(),
        secret.to_bytes().to_vec(),
    )
}

fn parse_public(public_key: &[u8]) -> Result<PublicKey> {
    PublicKey::from_sec1_bytes(public_key).map_err(|_| Error::InvalidKeyMaterial)
}

fn parse_private(private_key: &[u8]) -> Result<SecretKey> {
    if private_key.len() != PRIVATE_KEY_BYTES {
        return Err(Error::InvalidKeyMaterial);
    }
    SecretKey::from_slice(private_key).map_err(|_| Error::InvalidKeyMaterial)
}

/// Public key for a raw private scalar.
pub fn derive_public_key(private_key: &[u8]) -> Result<Vec<u8>> {
    let secret = parse_private(private_key)?;
    Ok(secret.public_key().to_encoded_point(false).as_bytes().to_vec())
}

/// ECDH shared secret (the x-coordinate of the shared point).
///
/// # Arguments
/// * `own_private_key` - our 32-byte scalar
/// * `peer_public_key` - their 65-byte SEC1 point
pub fn derive_shared_secret(
    own_private_key: &[u8],
    peer_public_key: &[u8],
) -> Result<Zeroizing<[u8; SHARED_SECRET_BYTES]>> {
    let secret = parse_private(own_private_key)?;
    let peer = parse_public(peer_public_key)?;

    let shared = diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
    let mut out = Zeroizing::new([0u8; SHARED_SECRET_BYTES]);
    out.copy_from_slice(shared.raw_secret_bytes());
    Ok(out)
}

/// base64(SPKI DER) of a SEC1 public key
pub fn export_public_key(public_key: &[u8]) -> Result<String> {
    let der = parse_public(public_key)?
        .to_public_key_der()
        .map_err(|_| Error::InvalidKeyMaterial)?;
    Ok(encode_b64(der.as_bytes()))
}

/// Inverse of `export_public_key`; yields the SEC1 point.
pub fn import_public_key(encoded: &str) -> Result<Vec<u8>> {
    let der = decode_b64(encoded).ok_or(Error::InvalidKeyMaterial)?;
    let public = PublicKey::from_public_key_der(&der).map_err(|_| Error::InvalidKeyMaterial)?;
    Ok(public.to_encoded_point(false).as_bytes().to_vec())
}

/// base64(PKCS#8 DER) of a raw private scalar
pub fn export_private_key(private_key: &[u8]) -> Result<Zeroizing<String>> {
    let der = parse_private(private_key)?
        .to_pkcs8_der()
        .map_err(|_| Error::InvalidKeyMaterial)?;
    Ok(Zeroizing::new(encode_b64(der.as_bytes())))
}

/// Inverse of `export_private_key`; yields the raw scalar.
pub fn import_private_key(encoded: &str) -> Result<Zeroizing<Vec<u8>>> {
    let der = Zeroizing::new(decode_b64(encoded).ok_or(Error::InvalidKeyMaterial)?);
    let secret = SecretKey::from_pkcs8_der(&der).map_err(|_| Error::InvalidKeyMaterial)?;
    Ok(Zeroizing::new(secret.to_bytes().to_vec()))
}
