use serde::{Deserialize, Serialize};

/// Client side timing and retry bounds for distributed requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSpec {
    /// Time a shard has to answer before its sub request is sent again.
    pub ttl_ms: u64,
    /// Period at which a blocked request checks for expired sub requests.
    pub tick_ms: u64,
    /// Amount of resends allowed per shard before giving up.
    pub max_retries: usize,
}

impl Default for ClientSpec {
    fn default() -> Self {
        Self {
            ttl_ms: 1000,
            tick_ms: 100,
            max_retries: 10,
        }
    }
}
