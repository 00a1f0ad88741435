use serde::{Deserialize, Serialize};

use crate::crypto::{decode_b64, encode_b64};
use crate::error::{Error, Result};

/// One hybrid-encrypted message as it travels between peers.
///
/// Fields are private: an envelope is only built by `HybridProtocol` or
/// decoded from the wire, and never edited afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireEnvelope", into = "WireEnvelope")]
pub struct EncryptedEnvelope {
    ciphertext: Vec<u8>,
    iv: Vec<u8>,
    kem_ciphertext: Vec<u8>,
    version: String,
}

/// JSON shape: every binary field is standard base64.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope {
    ciphertext: String,
    iv: String,
    kem_ciphertext: String,
    version: String,
}

impl EncryptedEnvelope {
    pub fn from_parts(
        ciphertext: Vec<u8>,
        iv: Vec<u8>,
        kem_ciphertext: Vec<u8>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            ciphertext,
            iv,
            kem_ciphertext,
            version: version.into(),
        }
    }

    /// AES-GCM ciphertext including the tag
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    /// ML-KEM-768 ciphertext for the recipient
    pub fn kem_ciphertext(&self) -> &[u8] {
        &self.kem_ciphertext
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|_| Error::MalformedEnvelope)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            log::debug!("Rejected envelope JSON: {}", e);
            Error::MalformedEnvelope
        })
    }
}

impl From<EncryptedEnvelope> for WireEnvelope {
    fn from(envelope: EncryptedEnvelope) -> Self {
        Self {
            ciphertext: encode_b64(&envelope.ciphertext),
            iv: encode_b64(&envelope.iv),
            kem_ciphertext: encode_b64(&envelope.kem_ciphertext),
            version: envelope.version,
        }
    }
}

impl TryFrom<WireEnvelope> for EncryptedEnvelope {
    type Error = Error;

    fn try_from(wire: WireEnvelope) -> Result<Self> {
        let decode = |field: &str| decode_b64(field).ok_or(Error::MalformedEnvelope);
        Ok(Self {
            ciphertext: decode(&wire.ciphertext)?,
            iv: decode(&wire.iv)?,
            kem_ciphertext: decode(&wire.kem_ciphertext)?,
            version: wire.version,
        })
    }
}
