pub mod directory;
pub mod envelope;
pub mod hybrid;
pub mod keys;

pub use directory::{InMemoryKeyDirectory, PeerKeyDirectory};
pub use envelope::EncryptedEnvelope;
pub use hybrid::{AlgorithmSuite, HybridProtocol, ProtocolInfo};
pub use keys::{ExportedKeyHalf, ExportedKeyPair, ExportedPublicKeys, HybridKeyPair, HybridPublicKeys};
