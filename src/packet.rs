//! The packet model (C2): typed construction, the checksum protocol,
//! and classification predicates over the codec in `codec.rs`.
//!
//! Grounded on the teacher's `udp_packet.rs` (the hand/Debug impl,
//! the `from_*`/`compute_*` split, the inline `#[test]`s exercising
//! specific byte vectors) but built around this protocol's own wire
//! format and checksum protocol instead of the teacher's CRC32 one.

use std::fmt;
use std::sync::Arc;

use adler32::RollingAdler32;

use crate::checksum_mode::ChecksumMode;
use crate::codec::{self, RawPacket};
use crate::consts::PROTOCOL_VERSION;
use crate::error::PacketError;
use crate::message_type::MessageType;
use crate::packet_type::PacketType;
use crate::transfer_mode::TransferMode;

/// An immutable UDPCP packet. Constructed only through the factories
/// below, each of which fills in `checksum` itself — there is no
/// public way to build a `Packet` with a stale or forged checksum.
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    checksum: u32,
    message_type: MessageType,
    transfer_mode: TransferMode,
    checksum_mode: ChecksumMode,
    is_duplicate: bool,
    fragment_amount: u8,
    fragment_number: u8,
    message_id: u16,
    payload_data: Arc<[u8]>,
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Packet");
        d.field("type", &self.packet_type())
            .field("message_id", &self.message_id)
            .field("fragment_number", &self.fragment_number)
            .field("fragment_amount", &self.fragment_amount)
            .field("checksum", &format_args!("0x{:08x}", self.checksum))
            .field("payload_len", &self.payload_data.len());
        #[cfg(feature = "extended_debug")]
        d.field("payload_hex", &hex::encode(&self.payload_data));
        d.finish()
    }
}

impl Packet {
    /// Builds a packet from its logical fields and fills in the
    /// checksum (the "checksum protocol" in `SPEC_FULL.md` §4.2): set
    /// to 0, serialize, and if `checksum_mode` is Enabled, overwrite
    /// with the Adler-32 digest of that zeroed image.
    fn assemble(
        message_type: MessageType,
        transfer_mode: TransferMode,
        checksum_mode: ChecksumMode,
        is_duplicate: bool,
        fragment_amount: u8,
        fragment_number: u8,
        message_id: u16,
        payload_data: Arc<[u8]>,
    ) -> Packet {
        let mut packet = Packet {
            checksum: 0,
            message_type,
            transfer_mode,
            checksum_mode,
            is_duplicate,
            fragment_amount,
            fragment_number,
            message_id,
            payload_data,
        };
        packet.checksum = packet.compute_checksum();
        packet
    }

    fn to_raw_with_checksum(&self, checksum: u32) -> RawPacket {
        RawPacket {
            checksum,
            message_type: self.message_type.bits(),
            version: PROTOCOL_VERSION,
            nbit: self.transfer_mode.nbit(),
            cbit: self.checksum_mode.cbit(),
            sbit: self.transfer_mode.sbit(),
            dbit: self.is_duplicate,
            fragment_amount: self.fragment_amount,
            fragment_number: self.fragment_number,
            message_id: self.message_id,
            message_data_length: self.payload_data.len() as u16,
            payload_data: self.payload_data.iter().copied().collect(),
        }
    }

    /// Adler-32 over the byte image with the checksum field zeroed,
    /// starting from 0 rather than the textbook seed of 1 — this
    /// matches the reference implementation's `zlib.adler32(data, 0)`
    /// call and is what reproduces the test vector in `SPEC_FULL.md`
    /// §8 scenario 1 (`sync(Enabled).checksum == 0x02960053`). See
    /// DESIGN.md for the discrepancy with the spec's prose, which
    /// says seed 1.
    fn compute_checksum(&self) -> u32 {
        if self.checksum_mode == ChecksumMode::Disabled {
            return 0;
        }
        let raw = self.to_raw_with_checksum(0);
        let bytes = codec::encode(&raw);
        let mut hasher = RollingAdler32::from_value(0);
        hasher.update_buffer(&bytes);
        hasher.hash()
    }

    /// Serializes this packet to its on-wire byte image (C1's `encode`).
    pub fn to_bytes(&self) -> Vec<u8> {
        codec::encode(&self.to_raw_with_checksum(self.checksum))
    }

    /// Builds a Data packet carrying one fragment of a message.
    ///
    /// `message_id` must be non-zero (0 is reserved for Sync) and
    /// `fragment_number` must be a valid index into `fragment_amount`.
    pub fn data(
        transfer_mode: TransferMode,
        checksum_mode: ChecksumMode,
        fragment_amount: u8,
        fragment_number: u8,
        message_id: u16,
        payload_data: impl Into<Arc<[u8]>>,
    ) -> Result<Packet, PacketError> {
        if message_id == 0 {
            return Err(PacketError::InvalidMessageId);
        }
        if fragment_amount < 1 {
            return Err(PacketError::InvalidFragmentAmount { amount: fragment_amount });
        }
        if fragment_number >= fragment_amount {
            return Err(PacketError::InvalidFragmentNumber { number: fragment_number, amount: fragment_amount });
        }
        Ok(Packet::assemble(
            MessageType::Data,
            transfer_mode,
            checksum_mode,
            false,
            fragment_amount,
            fragment_number,
            message_id,
            payload_data.into(),
        ))
    }

    /// Builds the advisory Sync packet: a Data packet with `message_id = 0`.
    pub fn sync(checksum_mode: ChecksumMode) -> Packet {
        Packet::assemble(
            MessageType::Data,
            TransferMode::AckEveryPacket,
            checksum_mode,
            false,
            1,
            0,
            0,
            Arc::from(Vec::new().into_boxed_slice()),
        )
    }

    /// Builds an Ack for `base_packet`, which must itself be classified
    /// Data or Sync. Mirrors `fragment_amount`/`fragment_number`/
    /// `message_id` and inherits `checksum_mode`; forces
    /// `transfer_mode = AckNone` and an empty payload.
    pub fn ack(base_packet: &Packet, is_duplicate: bool) -> Result<Packet, PacketError> {
        if !base_packet.is_data() && !base_packet.is_sync() {
            return Err(PacketError::AckBasePacket);
        }
        Ok(Packet::assemble(
            MessageType::Ack,
            TransferMode::AckNone,
            base_packet.checksum_mode,
            is_duplicate,
            base_packet.fragment_amount,
            base_packet.fragment_number,
            base_packet.message_id,
            Arc::from(Vec::new().into_boxed_slice()),
        ))
    }

    /// Decodes and validates a packet off the wire: rejects a version
    /// other than [`PROTOCOL_VERSION`], rejects a `fragment_amount`/
    /// `fragment_number` that would violate (I1) (every `Packet`, not
    /// just ones built through [`Packet::data`], must satisfy
    /// `fragment_amount >= 1` and `fragment_number < fragment_amount`),
    /// then reconstructs through the normal constructor (which
    /// recomputes the checksum) and rejects a mismatch against the
    /// wire checksum.
    pub fn from_bytes(bytes: &[u8]) -> Result<Packet, PacketError> {
        let raw = codec::decode(bytes)?;
        if raw.version != PROTOCOL_VERSION {
            return Err(PacketError::InvalidVersion { version: raw.version });
        }
        if raw.fragment_amount < 1 {
            return Err(PacketError::InvalidFragmentAmount { amount: raw.fragment_amount });
        }
        if raw.fragment_number >= raw.fragment_amount {
            return Err(PacketError::InvalidFragmentNumber { number: raw.fragment_number, amount: raw.fragment_amount });
        }

        let packet = Packet::assemble(
            MessageType::from_bits(raw.message_type),
            TransferMode::from_bits(raw.nbit, raw.sbit),
            ChecksumMode::from_bits(raw.cbit),
            raw.dbit,
            raw.fragment_amount,
            raw.fragment_number,
            raw.message_id,
            Arc::from(raw.payload_data),
        );

        if packet.checksum != raw.checksum {
            return Err(PacketError::InvalidChecksum { wire: raw.checksum, recomputed: packet.checksum });
        }

        Ok(packet)
    }

    /// The derived, mutually-exclusive classification of this packet.
    pub fn packet_type(&self) -> PacketType {
        if self.is_ack() {
            PacketType::Ack
        } else if self.is_sync() {
            PacketType::Sync
        } else if self.is_data() {
            PacketType::Data
        } else {
            PacketType::Invalid
        }
    }

    pub fn is_ack(&self) -> bool {
        self.message_type == MessageType::Ack
            && self.transfer_mode == TransferMode::AckNone
            && self.payload_data.is_empty()
    }

    pub fn is_sync(&self) -> bool {
        self.message_type == MessageType::Data
            && self.transfer_mode == TransferMode::AckEveryPacket
            && !self.is_duplicate
            && self.message_id == 0
            && self.payload_data.is_empty()
    }

    pub fn is_data(&self) -> bool {
        self.message_type == MessageType::Data && !self.is_duplicate && self.message_id != 0
    }

    pub fn is_single(&self) -> bool {
        self.fragment_amount == 1 && self.fragment_number == 0
    }

    pub fn is_last(&self) -> bool {
        self.fragment_number + 1 == self.fragment_amount
    }

    pub fn is_ack_needed(&self) -> bool {
        match self.transfer_mode {
            TransferMode::AckEveryPacket => true,
            TransferMode::AckLastFragmentOnly => self.is_last(),
            TransferMode::AckNone => false,
        }
    }

    /// True iff `self` is an ack that names `data_packet`'s
    /// `(message_id, fragment_amount, fragment_number)`.
    pub fn is_ack_for(&self, data_packet: &Packet) -> bool {
        self.is_ack()
            && self.message_id == data_packet.message_id
            && self.fragment_amount == data_packet.fragment_amount
            && self.fragment_number == data_packet.fragment_number
    }

    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn transfer_mode(&self) -> TransferMode {
        self.transfer_mode
    }

    pub fn checksum_mode(&self) -> ChecksumMode {
        self.checksum_mode
    }

    pub fn is_duplicate(&self) -> bool {
        self.is_duplicate
    }

    pub fn fragment_amount(&self) -> u8 {
        self.fragment_amount
    }

    pub fn fragment_number(&self) -> u8 {
        self.fragment_number
    }

    pub fn message_id(&self) -> u16 {
        self.message_id
    }

    pub fn message_data_length(&self) -> u16 {
        self.payload_data.len() as u16
    }

    pub fn payload_data(&self) -> &[u8] {
        &self.payload_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_enabled_matches_known_checksum() {
        let packet = Packet::sync(ChecksumMode::Enabled);
        assert_eq!(packet.checksum(), 0x0296_0053);
        assert_eq!(packet.packet_type(), PacketType::Sync);
        assert!(packet.is_ack_needed());
    }

    #[test]
    fn sync_disabled_has_zero_checksum() {
        let packet = Packet::sync(ChecksumMode::Disabled);
        assert_eq!(packet.checksum(), 0);
        assert_eq!(packet.packet_type(), PacketType::Sync);
    }

    #[test]
    fn data_last_fragment_round_trips() {
        let packet = Packet::data(TransferMode::AckEveryPacket, ChecksumMode::Disabled, 10, 9, 12345, &b"dummy"[..]).unwrap();
        assert!(packet.is_last());
        assert!(packet.is_ack_needed());
        assert!(!packet.is_single());

        let bytes = packet.to_bytes();
        let decoded = Packet::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.to_bytes(), bytes);
    }

    #[test]
    fn ack_mirrors_base_packet_fields() {
        let base = Packet::data(TransferMode::AckEveryPacket, ChecksumMode::Disabled, 10, 5, 12345, &b"dummy"[..]).unwrap();
        let ack = Packet::ack(&base, false).unwrap();
        assert_eq!(ack.packet_type(), PacketType::Ack);
        assert_eq!(ack.fragment_amount(), 10);
        assert_eq!(ack.fragment_number(), 5);
        assert_eq!(ack.message_id(), 12345);
        assert_eq!(ack.transfer_mode(), TransferMode::AckNone);
        assert!(!ack.is_ack_needed());
        assert!(ack.is_ack_for(&base));
    }

    #[test]
    fn data_rejects_out_of_range_fragment_number() {
        let err = Packet::data(TransferMode::AckEveryPacket, ChecksumMode::Disabled, 1, 1, 1, &b""[..]).unwrap_err();
        assert_eq!(err, PacketError::InvalidFragmentNumber { number: 1, amount: 1 });
    }

    #[test]
    fn data_rejects_zero_message_id() {
        let err = Packet::data(TransferMode::AckEveryPacket, ChecksumMode::Disabled, 1, 0, 0, &b""[..]).unwrap_err();
        assert_eq!(err, PacketError::InvalidMessageId);
    }

    #[test]
    fn from_bytes_rejects_short_buffer() {
        let err = Packet::from_bytes(b"dummy").unwrap_err();
        assert_eq!(err, PacketError::InvalidHeaderLength { len: 5 });
    }

    #[test]
    fn from_bytes_rejects_wrong_version() {
        // 12 ASCII '0' bytes: version bits decode to something other than 2.
        let err = Packet::from_bytes(b"000000000000").unwrap_err();
        assert!(matches!(err, PacketError::InvalidVersion { .. }));
    }

    #[test]
    fn from_bytes_rejects_fragment_number_out_of_range() {
        // Well-formed, checksum-disabled wire image with fragment_amount=1
        // but fragment_number=5: violates (I1) and must never reach the
        // reassembly table's fragment_number-indexed slot lookup.
        use crate::codec::{self, RawPacket};
        let raw = RawPacket {
            checksum: 0,
            message_type: MessageType::Data.bits(),
            version: PROTOCOL_VERSION,
            nbit: false,
            cbit: false,
            sbit: false,
            dbit: false,
            fragment_amount: 1,
            fragment_number: 5,
            message_id: 7,
            message_data_length: 0,
            payload_data: Box::new([]),
        };
        let bytes = codec::encode(&raw);
        let err = Packet::from_bytes(&bytes).unwrap_err();
        assert_eq!(err, PacketError::InvalidFragmentNumber { number: 5, amount: 1 });
    }

    #[test]
    fn from_bytes_rejects_zero_fragment_amount() {
        use crate::codec::{self, RawPacket};
        let raw = RawPacket {
            checksum: 0,
            message_type: MessageType::Data.bits(),
            version: PROTOCOL_VERSION,
            nbit: false,
            cbit: false,
            sbit: false,
            dbit: false,
            fragment_amount: 0,
            fragment_number: 0,
            message_id: 7,
            message_data_length: 0,
            payload_data: Box::new([]),
        };
        let bytes = codec::encode(&raw);
        let err = Packet::from_bytes(&bytes).unwrap_err();
        assert_eq!(err, PacketError::InvalidFragmentAmount { amount: 0 });
    }

    #[test]
    fn from_bytes_rejects_tampered_payload() {
        let packet = Packet::data(TransferMode::AckEveryPacket, ChecksumMode::Enabled, 1, 0, 1, &b"dummy"[..]).unwrap();
        let mut bytes = packet.to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let err = Packet::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, PacketError::InvalidChecksum { .. }));
    }

    #[test]
    fn ack_base_must_be_data_or_sync() {
        let ack_packet = Packet::data(TransferMode::AckNone, ChecksumMode::Disabled, 1, 0, 1, &b""[..])
            .map(|p| Packet::ack(&p, false).unwrap())
            .unwrap();
        let err = Packet::ack(&ack_packet, false).unwrap_err();
        assert_eq!(err, PacketError::AckBasePacket);
    }

    #[test]
    fn invalid_classification_for_duplicate_ack_with_zero_id() {
        // Built by hand through raw codec fields: message_type=Ack,
        // transfer_mode bits = AckEveryPacket, is_duplicate=true, id=0,
        // payload non-empty.
        use crate::codec::{self, RawPacket};
        let mut raw = RawPacket {
            checksum: 0,
            message_type: MessageType::Ack.bits(),
            version: PROTOCOL_VERSION,
            nbit: false,
            cbit: false,
            sbit: false,
            dbit: true,
            fragment_amount: 1,
            fragment_number: 0,
            message_id: 0,
            message_data_length: 5,
            payload_data: Box::new(*b"dummy"),
        };
        let bytes = codec::encode(&raw);
        raw.checksum = 0; // checksum disabled path: wire checksum must be 0 to pass from_bytes
        let packet = Packet::from_bytes(&bytes).unwrap();
        assert_eq!(packet.packet_type(), PacketType::Invalid);
        assert!(!packet.is_ack());
        assert!(!packet.is_sync());
        assert!(!packet.is_data());
    }
}
