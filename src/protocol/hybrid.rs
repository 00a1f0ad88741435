/// Hybrid message encryption: ECDH P-256 + ML-KEM-768 → combiner → AES-256-GCM
///
/// Every message runs the full handshake. The sender derives
/// `combine(ECDH(own_ec, peer_ec), KEM-ss)`, encrypts under it, and ships the
/// KEM ciphertext alongside. The recipient recomputes the ECDH half from the
/// sender's published key and decapsulates the KEM half. Any tampering shows
/// up as `Error::AuthenticationFailure` at the AEAD step.
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use super::directory::PeerKeyDirectory;
use super::envelope::EncryptedEnvelope;
use super::keys::{HybridKeyPair, HybridPublicKeys};
use crate::config::{ProtocolConfig, PROTOCOL_VERSION};
use crate::crypto::{aead, combine, kem, key_exchange, CombinedSecret};
use crate::entropy::EntropySource;
use crate::error::{Error, Result};
use crate::telemetry::{names, MetricsSink, NoopMetricsSink};

/// Algorithm suite description returned by `HybridProtocol::info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolInfo {
    pub version: String,
    pub algorithms: AlgorithmSuite,
    pub security_level: &'static str,
    pub quantum_resistant: bool,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmSuite {
    pub classical: &'static str,
    pub post_quantum: &'static str,
    pub signature: &'static str,
    pub randomness: &'static str,
}

pub struct HybridProtocol {
    entropy: EntropySource,
    config: ProtocolConfig,
    metrics: Arc<dyn MetricsSink>,
    directory: Option<Arc<dyn PeerKeyDirectory>>,
}

impl HybridProtocol {
    pub fn new(entropy: EntropySource) -> Self {
        Self {
            entropy,
            config: ProtocolConfig::default(),
            metrics: Arc::new(NoopMetricsSink),
            directory: None,
        }
    }

    /// Replace the protocol settings. Only `hybrid-v1` can be selected.
    pub fn with_config(mut self, config: ProtocolConfig) -> Result<Self> {
        if config.version != PROTOCOL_VERSION {
            return Err(Error::UnsupportedVersion(config.version));
        }
        self.config = config;
        Ok(self)
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_directory(mut self, directory: Arc<dyn PeerKeyDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn entropy(&self) -> &EntropySource {
        &self.entropy
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    /// Fresh hybrid identity drawn from the entropy source.
    pub async fn generate_keypair(&self) -> Result<HybridKeyPair> {
        let keys = HybridKeyPair::generate(&self.entropy).await?;
        self.metrics.increment(names::KEYGEN);
        log::debug!("Generated hybrid key pair ({})", keys.version);
        Ok(keys)
    }

    /// Encrypt `message` from the holder of `own_keys` to `recipient`.
    pub async fn encrypt_for_recipient(
        &self,
        message: &[u8],
        own_keys: &HybridKeyPair,
        recipient: &HybridPublicKeys,
    ) -> Result<EncryptedEnvelope> {
        let started = Instant::now();
        let result = self.seal(message, own_keys, recipient).await;
        self.record(names::ENCRYPT, names::ENCRYPT_FAILURE, started, &result);
        result
    }

    async fn seal(
        &self,
        message: &[u8],
        own_keys: &HybridKeyPair,
        recipient: &HybridPublicKeys,
    ) -> Result<EncryptedEnvelope> {
        let ecdh = key_exchange::derive_shared_secret(own_keys.ec.private_key(), &recipient.ec)?;
        let encapsulation = kem::encapsulate(&recipient.kem)?;
        let key: CombinedSecret = combine(&ecdh[..], &encapsulation.shared_secret[..]);

        let sealed = aead::encrypt(message, key.as_bytes(), &self.entropy).await?;
        log::debug!(
            "Sealed {} byte message into {} byte ciphertext",
            message.len(),
            sealed.ciphertext.len()
        );

        Ok(EncryptedEnvelope::from_parts(
            sealed.ciphertext,
            sealed.nonce.to_vec(),
            encapsulation.ciphertext,
            self.config.version.clone(),
        ))
    }

    /// Decrypt an envelope sent by `sender` to the holder of `own_keys`.
    pub fn decrypt_from_sender(
        &self,
        envelope: &EncryptedEnvelope,
        own_keys: &HybridKeyPair,
        sender: &HybridPublicKeys,
    ) -> Result<Vec<u8>> {
        let started = Instant::now();
        let result = self.open(envelope, own_keys, sender);
        self.record(names::DECRYPT, names::DECRYPT_FAILURE, started, &result);
        result
    }

    fn open(
        &self,
        envelope: &EncryptedEnvelope,
        own_keys: &HybridKeyPair,
        sender: &HybridPublicKeys,
    ) -> Result<Vec<u8>> {
        if envelope.version() != self.config.version {
            return Err(Error::UnsupportedVersion(envelope.version().to_string()));
        }

        let ecdh = key_exchange::derive_shared_secret(own_keys.ec.private_key(), &sender.ec)?;
        let kem_secret = kem::decapsulate(envelope.kem_ciphertext(), own_keys.kem.private_key())?;
        let key = combine(&ecdh[..], &kem_secret[..]);

        aead::decrypt(envelope.ciphertext(), envelope.iv(), key.as_bytes())
    }

    /// `encrypt_for_recipient` with the recipient's keys looked up by id.
    pub async fn encrypt_for_user(
        &self,
        message: &[u8],
        own_keys: &HybridKeyPair,
        recipient_id: &str,
    ) -> Result<EncryptedEnvelope> {
        let recipient = self.lookup(recipient_id)?;
        self.encrypt_for_recipient(message, own_keys, &recipient).await
    }

    /// `decrypt_from_sender` with the sender's keys looked up by id.
    pub fn decrypt_from_user(
        &self,
        envelope: &EncryptedEnvelope,
        own_keys: &HybridKeyPair,
        sender_id: &str,
    ) -> Result<Vec<u8>> {
        let sender = self.lookup(sender_id)?;
        self.decrypt_from_sender(envelope, own_keys, &sender)
    }

    fn lookup(&self, user_id: &str) -> Result<HybridPublicKeys> {
        self.directory
            .as_ref()
            .and_then(|dir| dir.public_keys(user_id))
            .ok_or_else(|| Error::UnknownPeer(user_id.to_string()))
    }

    pub fn info(&self) -> ProtocolInfo {
        ProtocolInfo {
            version: self.config.version.clone(),
            algorithms: AlgorithmSuite {
                classical: "ECDH P-256 + AES-256-GCM",
                post_quantum: "ML-KEM-768",
                signature: "ML-DSA-65",
                randomness: "QRNG (ANU) with OS RNG fallback",
            },
            security_level: "NIST Level 3",
            quantum_resistant: true,
            description: "Hybrid encryption combining classical ECDH and post-quantum ML-KEM",
        }
    }

    fn record<T>(&self, ok: &'static str, failed: &'static str, started: Instant, result: &Result<T>) {
        self.metrics.observe_duration(ok, started.elapsed());
        match result {
            Ok(_) => self.metrics.increment(ok),
            Err(e) => {
                self.metrics.increment(failed);
                log::warn!("{} failed: {}", ok, e);
            }
        }
    }
}
