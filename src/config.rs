//! Socket configuration (C11): the tunables named in `SPEC_FULL.md` §6,
//! collected into one builder instead of scattered constructor
//! arguments.
//!
//! Grounded on the teacher's `RUdpServer::builder()` pattern in
//! `rudp_server.rs`, which assembles a handful of tunables (ping
//! interval, max connections) the same way before `build()`.

use std::time::Duration;

use crate::checksum_mode::ChecksumMode;
use crate::consts::{
    DEFAULT_MAXIMUM_CONNECTIONS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RETRANSMISSION_ATTEMPTS, DEFAULT_RETRANSMISSION_TIMEOUT_MS,
};
use crate::transfer_mode::TransferMode;

/// Configuration for a [`crate::RUdpSocket`], built with
/// [`SocketConfig::builder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketConfig {
    pub(crate) retransmission_timeout: Duration,
    pub(crate) retransmission_attempts: u32,
    pub(crate) maximum_connections: usize,
    pub(crate) poll_interval: Duration,
    pub(crate) default_transfer_mode: TransferMode,
    pub(crate) default_checksum_mode: ChecksumMode,
}

impl Default for SocketConfig {
    fn default() -> Self {
        SocketConfig {
            retransmission_timeout: Duration::from_millis(DEFAULT_RETRANSMISSION_TIMEOUT_MS),
            retransmission_attempts: DEFAULT_RETRANSMISSION_ATTEMPTS,
            maximum_connections: DEFAULT_MAXIMUM_CONNECTIONS,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            default_transfer_mode: TransferMode::AckEveryPacket,
            default_checksum_mode: ChecksumMode::Enabled,
        }
    }
}

impl SocketConfig {
    pub fn builder() -> SocketConfigBuilder {
        SocketConfigBuilder { config: SocketConfig::default() }
    }
}

/// Builder for [`SocketConfig`]. Every setter returns `Self` for chaining.
#[derive(Debug, Clone, Copy)]
pub struct SocketConfigBuilder {
    config: SocketConfig,
}

impl SocketConfigBuilder {
    /// How long `send_to` waits for an ack before retransmitting a
    /// fragment (`SPEC_FULL.md` §6).
    pub fn retransmission_timeout(mut self, timeout: Duration) -> Self {
        self.config.retransmission_timeout = timeout;
        self
    }

    /// How many times a fragment is retransmitted before `send_to`
    /// gives up with [`crate::SocketError::AckFailure`].
    pub fn retransmission_attempts(mut self, attempts: u32) -> Self {
        self.config.retransmission_attempts = attempts;
        self
    }

    /// Upper bound on distinct peers tracked for reassembly at once.
    pub fn maximum_connections(mut self, maximum_connections: usize) -> Self {
        self.config.maximum_connections = maximum_connections;
        self
    }

    /// Ceiling on how long the receive worker's poll call blocks
    /// between checks of its shutdown flag, when the wake-up signal
    /// doesn't fire first.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// [`TransferMode`] used by [`crate::RUdpSocket::send`], the
    /// convenience entry point that applies the socket's configured
    /// defaults instead of taking them as explicit arguments
    /// (`SPEC_FULL.md` §6, spec.md §6).
    pub fn default_transfer_mode(mut self, mode: TransferMode) -> Self {
        self.config.default_transfer_mode = mode;
        self
    }

    /// [`ChecksumMode`] used by [`crate::RUdpSocket::send`], the
    /// convenience entry point that applies the socket's configured
    /// defaults instead of taking them as explicit arguments.
    pub fn default_checksum_mode(mut self, mode: ChecksumMode) -> Self {
        self.config.default_checksum_mode = mode;
        self
    }

    pub fn build(self) -> SocketConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_defaults() {
        let config = SocketConfig::default();
        assert_eq!(config.retransmission_timeout, Duration::from_millis(100));
        assert_eq!(config.retransmission_attempts, 5);
        assert_eq!(config.maximum_connections, 5);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.default_transfer_mode, TransferMode::AckEveryPacket);
        assert_eq!(config.default_checksum_mode, ChecksumMode::Enabled);
    }

    #[test]
    fn builder_overrides_apply() {
        let config = SocketConfig::builder()
            .retransmission_attempts(10)
            .default_transfer_mode(TransferMode::AckNone)
            .default_checksum_mode(ChecksumMode::Disabled)
            .build();
        assert_eq!(config.retransmission_attempts, 10);
        assert_eq!(config.default_transfer_mode, TransferMode::AckNone);
        assert_eq!(config.default_checksum_mode, ChecksumMode::Disabled);
        assert_eq!(config.maximum_connections, DEFAULT_MAXIMUM_CONNECTIONS);
    }
}
