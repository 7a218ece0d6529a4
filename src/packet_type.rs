//! `PacketType` (C3): derived, mutually exclusive packet classification.

/// The classification of a [`crate::Packet`], derived on demand from
/// its fields rather than modeled as a subtype. Exactly one variant
/// applies to any given packet (`SPEC_FULL.md` §8, P3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// `message_type=Ack ∧ transfer_mode=AckNone ∧ message_data_length=0`.
    Ack,
    /// `message_type=Data ∧ transfer_mode=AckEveryPacket ∧ ¬is_duplicate ∧ message_id=0 ∧ message_data_length=0`.
    Sync,
    /// `message_type=Data ∧ ¬is_duplicate ∧ message_id≠0`.
    Data,
    /// Well-formed on the wire, but none of the above apply.
    Invalid,
}
