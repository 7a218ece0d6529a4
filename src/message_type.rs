//! `MessageType` (C3): the 2-bit `message_type` header field.

/// The raw `message_type` header field.
///
/// Only `Data` (1) and `Ack` (2) are meaningful; the 2-bit field can
/// also carry 0 or 3 off the wire (a malformed or foreign sender).
/// Those values are preserved as [`MessageType::Other`] rather than
/// rejected at decode time, so that a packet carrying one simply fails
/// every [`crate::PacketType`] classification and surfaces as
/// `PacketType::Invalid` — consistent with `SPEC_FULL.md`'s "robust
/// port" stance instead of tearing down the receive worker over a
/// single bad bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Data,
    Ack,
    /// An off-spec raw value (0 or 3); never produced by this crate.
    Other(u8),
}

impl MessageType {
    pub(crate) fn from_bits(value: u8) -> MessageType {
        match value {
            1 => MessageType::Data,
            2 => MessageType::Ack,
            other => MessageType::Other(other),
        }
    }

    pub(crate) fn bits(self) -> u8 {
        match self {
            MessageType::Data => 1,
            MessageType::Ack => 2,
            MessageType::Other(v) => v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_values() {
        assert_eq!(MessageType::from_bits(1), MessageType::Data);
        assert_eq!(MessageType::from_bits(2), MessageType::Ack);
        assert_eq!(MessageType::Data.bits(), 1);
        assert_eq!(MessageType::Ack.bits(), 2);
    }

    #[test]
    fn preserves_off_spec_values() {
        assert_eq!(MessageType::from_bits(0), MessageType::Other(0));
        assert_eq!(MessageType::from_bits(3), MessageType::Other(3));
        assert_eq!(MessageType::Other(3).bits(), 3);
    }
}
