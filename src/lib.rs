//! # Quantum Vault Core
//!
//! **Hybrid classical + post-quantum message encryption fed by a cached
//! quantum entropy pool.**
//!
//! - **Entropy**: bytes from the ANU quantum random number service, pooled
//!   and refilled in the background, with an OS-RNG fallback so callers
//!   never stall on the network
//! - **Key agreement**: ECDH P-256 and ML-KEM-768 (FIPS 203), merged into
//!   one AES-256-GCM key by a fixed combiner
//! - **Signatures**: ML-DSA-65 (FIPS 204), offered alongside encryption
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quantum_vault_core::{EntropyConfig, EntropySource, HybridProtocol};
//!
//! # #[cfg(feature = "network")]
//! # async fn demo() -> quantum_vault_core::Result<()> {
//! let protocol = HybridProtocol::new(EntropySource::new(EntropyConfig::server()));
//! let alice = protocol.generate_keypair().await?;
//! let bob = protocol.generate_keypair().await?;
//!
//! let envelope = protocol
//!     .encrypt_for_recipient(b"Hello, Quantum World!", &alice, &bob.public_keys())
//!     .await?;
//! let plaintext = protocol.decrypt_from_sender(&envelope, &bob, &alice.public_keys())?;
//! assert_eq!(plaintext, b"Hello, Quantum World!");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`entropy`] | Entropy pool, QRNG client, fallback, background refill, metrics, health |
//! | [`crypto`] | ECDH P-256, ML-KEM-768, ML-DSA-65, secret combiner, AES-256-GCM |
//! | [`protocol`] | `HybridProtocol`, key bundles, wire envelope, peer key directory |
//! | [`config`] | Entropy pool and protocol settings |
//! | [`telemetry`] | Metrics sink trait |
//! | [`error`] | Domain error kinds |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `network` | Yes | `reqwest` client for the QRNG service (`EntropySource::new`) |

// Crate-level lint configuration: stylistic lints only.
#![allow(
    clippy::empty_line_after_doc_comments,
    clippy::doc_lazy_continuation,
    clippy::new_without_default
)]

// ── Public modules ──────────────────────────────────────────────────────────

pub mod config;

/// Key exchange, KEM, signatures, secret combination and AEAD.
pub mod crypto;

/// Pooled quantum randomness with local fallback.
pub mod entropy;

pub mod error;

/// Hybrid encryption protocol and its wire format.
pub mod protocol;

pub mod telemetry;

// ── Re-exports for convenience ──────────────────────────────────────────────

pub use config::{EntropyConfig, ProtocolConfig, PROTOCOL_VERSION};
pub use crypto::{Algorithm, KeyPair};
pub use entropy::{EntropyFetcher, EntropySource, HealthStatus, MetricsSnapshot};
pub use error::{Error, Result};
pub use protocol::{
    EncryptedEnvelope, ExportedKeyPair, ExportedPublicKeys, HybridKeyPair, HybridProtocol,
    HybridPublicKeys, InMemoryKeyDirectory, PeerKeyDirectory,
};
pub use telemetry::{MetricsSink, NoopMetricsSink};

// ── Library metadata ────────────────────────────────────────────────────────

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str {
    VERSION
}

// ── Tests ───────────────────────────────────────────────────────────────────
