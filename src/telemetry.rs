//! Metrics sink consumed by `HybridProtocol`.
//!
//! The library never picks a metrics backend. Hosts that want counters and
//! latencies in their own system implement `MetricsSink`; everyone else gets
//! `NoopMetricsSink`.

use std::time::Duration;

/// Counter names emitted by the protocol.
pub mod names {
    pub const ENCRYPT: &str = "hybrid.encrypt";
    pub const ENCRYPT_FAILURE: &str = "hybrid.encrypt.failure";
    pub const DECRYPT: &str = "hybrid.decrypt";
    pub const DECRYPT_FAILURE: &str = "hybrid.decrypt.failure";
    pub const KEYGEN: &str = "hybrid.keygen";
}

pub trait MetricsSink: Send + Sync {
    fn increment(&self, name: &'static str);

    fn observe_duration(&self, name: &'static str, elapsed: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn increment(&self, _name: &'static str) {}

    fn observe_duration(&self, _name: &'static str, _elapsed: Duration) {}
}
