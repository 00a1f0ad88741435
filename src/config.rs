//! Runtime configuration for the entropy pool and the hybrid protocol.
//!
//! Both structs deserialize from JSON with every field optional, so a
//! deployment only has to spell out what it changes:
//!
//! ```rust
//! use quantum_vault_core::config::EntropyConfig;
//!
//! let cfg = EntropyConfig::from_json(r#"{ "pool_capacity": 2048, "low_water": 256 }"#).unwrap();
//! assert_eq!(cfg.pool_capacity, 2048);
//! assert_eq!(cfg.max_request, 10_000);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// ANU quantum random number service.
pub const DEFAULT_QRNG_ENDPOINT: &str = "https://qrng.anu.edu.au/API/jsonI.php";

/// Protocol version tag carried by every envelope.
pub const PROTOCOL_VERSION: &str = "hybrid-v1";

/// Tuning knobs for `EntropySource`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntropyConfig {
    /// Remote QRNG endpoint (queried with `length` and `type=uint8`).
    pub endpoint: String,
    /// Bytes fetched per refill; also the pool's upper bound.
    pub pool_capacity: usize,
    /// A background refill is scheduled once the pool drops below this.
    pub low_water: usize,
    /// Largest single `request_bytes` call accepted.
    pub max_request: usize,
    /// Batch refill timeout, in milliseconds.
    pub refill_timeout_ms: u64,
    /// Health probe timeout, in milliseconds.
    pub health_timeout_ms: u64,
    /// How long a caller waits on somebody else's in-flight refill before
    /// falling back to local generation, in milliseconds.
    pub refill_wait_ms: u64,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self::server()
    }
}

impl EntropyConfig {
    /// Server-side pool: 10 000 byte batches, refill below 1 000.
    pub fn server() -> Self {
        Self {
            endpoint: DEFAULT_QRNG_ENDPOINT.to_string(),
            pool_capacity: 10_000,
            low_water: 1_000,
            max_request: 10_000,
            refill_timeout_ms: 5_000,
            health_timeout_ms: 3_000,
            refill_wait_ms: 100,
        }
    }

    /// Client-side pool: 5 000 byte batches, refill below 500.
    pub fn client() -> Self {
        Self {
            pool_capacity: 5_000,
            low_water: 500,
            max_request: 5_000,
            ..Self::server()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_pool(mut self, capacity: usize, low_water: usize) -> Self {
        self.pool_capacity = capacity;
        self.low_water = low_water;
        self
    }

    pub fn with_max_request(mut self, max_request: usize) -> Self {
        self.max_request = max_request;
        self
    }

    pub fn with_refill_wait(mut self, wait: Duration) -> Self {
        self.refill_wait_ms = wait.as_millis() as u64;
        self
    }

    pub fn refill_timeout(&self) -> Duration {
        Duration::from_millis(self.refill_timeout_ms)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    pub fn refill_wait(&self) -> Duration {
        Duration::from_millis(self.refill_wait_ms)
    }

    /// Capacity and limits are clamped so a request of `max_request` bytes
    /// can always be served from one full batch.
    pub(crate) fn normalized(mut self) -> Self {
        self.max_request = self.max_request.max(1);
        self.pool_capacity = self.pool_capacity.max(self.max_request);
        self.low_water = self.low_water.min(self.pool_capacity);
        self
    }
}

/// Settings for `HybridProtocol`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Version tag written into envelopes and required on decrypt.
    pub version: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
        }
    }
}
