//! # Client Configuration

use serde::{Deserialize, Serialize};

/// Tuning knobs for reads, retries, and reconnection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Attempts per ledger read before surfacing a timeout.
    pub read_retry_attempts: u32,

    /// Base delay between read retries in milliseconds; doubles per attempt.
    pub retry_base_ms: u64,

    /// Base delay before reconnecting a failed feed, in milliseconds.
    pub reconnect_base_ms: u64,

    /// Ceiling for the reconnect backoff, in milliseconds.
    pub reconnect_max_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            read_retry_attempts: 3,
            retry_base_ms: 200,
            reconnect_base_ms: 500,
            reconnect_max_ms: 30_000,
        }
    }
}

impl ClientConfig {
    /// Config for tests: same shape, millisecond-scale waits.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            read_retry_attempts: 2,
            retry_base_ms: 5,
            reconnect_base_ms: 10,
            reconnect_max_ms: 50,
        }
    }
}
