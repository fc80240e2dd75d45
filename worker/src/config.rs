use std::time::Duration;

use comms::specs::worker::ClientSpec;

/// Immutable timing and retry bounds of the client side of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    ttl: Duration,
    tick: Duration,
    max_retries: usize,
}

impl ClientConfig {
    /// Creates a new client configuration.
    ///
    /// # Args
    /// * `ttl` - Time a shard has to answer before its sub request is resent.
    /// * `tick` - Period at which a blocked request looks for expired sub requests.
    /// * `max_retries` - Amount of resends allowed per shard.
    ///
    /// # Returns
    /// A `ClientConfig` instance.
    pub fn new(ttl: Duration, tick: Duration, max_retries: usize) -> Self {
        Self {
            ttl,
            tick,
            max_retries,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientSpec::default().into()
    }
}

impl From<ClientSpec> for ClientConfig {
    fn from(spec: ClientSpec) -> Self {
        Self::new(
            Duration::from_millis(spec.ttl_ms),
            Duration::from_millis(spec.tick_ms),
            spec.max_retries,
        )
    }
}
