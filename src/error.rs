//! Error taxonomy for the codec, the packet model and the socket facade.
//!
//! Grounded on the teacher's `RUdpCreateError` (`rudp.rs`), generalized
//! from a hand-rolled `From<io::Error>` impl into `thiserror` derives
//! so every named failure in `SPEC_FULL.md` §7 is a concrete, matchable
//! variant instead of a string.

use std::io;

use thiserror::Error;

/// Failures raised while decoding or constructing a [`crate::Packet`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// Decoded buffer was shorter than [`crate::consts::HEADER_SIZE`].
    #[error("packet header too short: got {len} bytes, need at least {}", crate::consts::HEADER_SIZE)]
    InvalidHeaderLength { len: usize },

    /// Decoded `version` field did not equal [`crate::consts::PROTOCOL_VERSION`].
    #[error("invalid packet version {version} (expected {})", crate::consts::PROTOCOL_VERSION)]
    InvalidVersion { version: u8 },

    /// Recomputed checksum did not match the checksum carried on the wire.
    #[error("invalid packet checksum: wire=0x{wire:08x} recomputed=0x{recomputed:08x}")]
    InvalidChecksum { wire: u32, recomputed: u32 },

    /// [`crate::Packet::data`] was called with `message_id == 0`.
    #[error("data packets cannot use message_id 0 (reserved for Sync)")]
    InvalidMessageId,

    /// [`crate::Packet::data`] was called with `fragment_amount == 0`.
    #[error("fragment_amount must be at least 1, got {amount}")]
    InvalidFragmentAmount { amount: u8 },

    /// [`crate::Packet::data`] was called with `fragment_number >= fragment_amount`.
    #[error("fragment_number {number} out of range for fragment_amount {amount}")]
    InvalidFragmentNumber { number: u8, amount: u8 },

    /// [`crate::Packet::ack`] was called on a packet that is neither Data nor Sync.
    #[error("cannot build an ack from a packet that is neither data nor sync")]
    AckBasePacket,
}

/// Failures raised by the socket facade ([`crate::RUdpSocket`]).
#[derive(Debug, Error)]
pub enum SocketError {
    /// Operation attempted on a socket that was never opened, or has been closed.
    #[error("socket is closed")]
    Closed,

    /// `send_to` exhausted `retransmission_attempts` without a matching ack.
    #[error("ack for message {message_id} fragment {fragment_number} not received after all retransmission attempts")]
    AckFailure { message_id: u16, fragment_number: u8 },

    /// `send_to`'s payload would need more than [`crate::consts::MAX_FRAGMENTS`] fragments.
    #[error("payload of {len} bytes needs more than {} fragments", crate::consts::MAX_FRAGMENTS)]
    MessageTooLarge { len: usize },

    /// The receive worker observed an ack with no pending-ack slot to match it against.
    #[error("received an ack with no outstanding send in flight")]
    UnsolicitedAck,

    /// A decoded packet did not classify as Ack, Sync or Data.
    #[error("received a packet that did not classify as ack, sync or data")]
    InvalidPacket(#[from] PacketError),

    /// Underlying OS socket I/O failure.
    #[error("socket I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A non-fatal anomaly observed by the receive worker, reported on the
/// worker fault channel (`SPEC_FULL.md` §4.4) instead of tearing the
/// worker thread down.
#[derive(Debug)]
pub enum WorkerFault {
    /// A datagram failed to decode entirely (bad length, checksum, or version).
    InvalidPacket(PacketError),
    /// A datagram decoded fine but classified as [`crate::PacketType::Invalid`].
    UnclassifiablePacket,
    /// An ack arrived that did not match the pending-ack slot (or none was pending).
    UnsolicitedAck,
}
