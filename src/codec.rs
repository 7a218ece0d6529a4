//! The packet codec (C1): bit-precise serialization of the 12-byte
//! wire header.
//!
//! None of the first six fields (`checksum` excepted) are byte-aligned,
//! so encoding/decoding works over a flat bitstream rather than over
//! `byteorder` alone; `byteorder` is still used for the two 16-bit
//! fields and the 32-bit checksum once we fall back to aligned reads.

use byteorder::{BigEndian, ByteOrder};

use crate::consts::*;
use crate::error::PacketError;

/// The header, decoded field-by-field, before any semantic validation
/// (version check, checksum verification, id/fragment range checks)
/// has been applied. [`crate::Packet::from_bytes`] is what turns this
/// into a validated [`crate::Packet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawPacket {
    pub(crate) checksum: u32,
    pub(crate) message_type: u8,
    pub(crate) version: u8,
    pub(crate) nbit: bool,
    pub(crate) cbit: bool,
    pub(crate) sbit: bool,
    pub(crate) dbit: bool,
    pub(crate) fragment_amount: u8,
    pub(crate) fragment_number: u8,
    pub(crate) message_id: u16,
    pub(crate) message_data_length: u16,
    pub(crate) payload_data: Box<[u8]>,
}

/// Accumulates values of arbitrary bit width into a byte buffer,
/// most-significant-bit first, matching the wire order in
/// `SPEC_FULL.md` §3/§6 ("byte 0 bit 7 is the highest bit of checksum").
struct BitWriter {
    buf: Vec<u8>,
    acc: u16,
    filled: u8,
}

impl BitWriter {
    fn new(capacity: usize) -> Self {
        BitWriter { buf: Vec::with_capacity(capacity), acc: 0, filled: 0 }
    }

    fn push(&mut self, value: u32, width: u8) {
        for i in (0..width).rev() {
            let bit = ((value >> i) & 1) as u16;
            self.acc = (self.acc << 1) | bit;
            self.filled += 1;
            if self.filled == 8 {
                self.buf.push(self.acc as u8);
                self.acc = 0;
                self.filled = 0;
            }
        }
    }

    fn finish(self) -> Vec<u8> {
        debug_assert_eq!(self.filled, 0, "header field widths must sum to a byte boundary");
        self.buf
    }
}

/// Reads values of arbitrary bit width off a byte slice,
/// most-significant-bit first.
struct BitReader<'a> {
    bytes: &'a [u8],
    byte_pos: usize,
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        BitReader { bytes, byte_pos: 0, bit_pos: 0 }
    }

    fn read(&mut self, width: u8) -> u32 {
        let mut value: u32 = 0;
        for _ in 0..width {
            let bit = (self.bytes[self.byte_pos] >> (7 - self.bit_pos)) & 1;
            value = (value << 1) | u32::from(bit);
            self.bit_pos += 1;
            if self.bit_pos == 8 {
                self.bit_pos = 0;
                self.byte_pos += 1;
            }
        }
        value
    }
}

/// Serializes a packet's fields into its on-wire byte image, header
/// followed by payload verbatim. `checksum` is written as given —
/// callers who need the checksummed image zero it first, encode,
/// compute the digest, then encode again with the real value (mirrors
/// the teacher's two-pass CRC pattern in `udp_packet.rs`).
pub(crate) fn encode(raw: &RawPacket) -> Vec<u8> {
    let mut writer = BitWriter::new(HEADER_SIZE + raw.payload_data.len());
    writer.push(raw.checksum, CHECKSUM_BITS);
    writer.push(u32::from(raw.message_type), MESSAGE_TYPE_BITS);
    writer.push(u32::from(raw.version), VERSION_BITS);
    writer.push(raw.nbit as u32, N_BIT_BITS);
    writer.push(raw.cbit as u32, C_BIT_BITS);
    writer.push(raw.sbit as u32, S_BIT_BITS);
    writer.push(raw.dbit as u32, D_BIT_BITS);
    writer.push(0, RESERVED_BITS);
    writer.push(u32::from(raw.fragment_amount), FRAGMENT_AMOUNT_BITS);
    writer.push(u32::from(raw.fragment_number), FRAGMENT_NUMBER_BITS);
    writer.push(u32::from(raw.message_id), MESSAGE_ID_BITS);
    writer.push(u32::from(raw.message_data_length), MESSAGE_DATA_LENGTH_BITS);
    let mut bytes = writer.finish();
    bytes.extend_from_slice(&raw.payload_data);
    bytes
}

/// Decodes a byte image into a [`RawPacket`]. Fails only when the
/// buffer is shorter than the fixed header; every other field is
/// accepted as-is (version/checksum validation happens one layer up,
/// in [`crate::Packet::from_bytes`]).
pub(crate) fn decode(bytes: &[u8]) -> Result<RawPacket, PacketError> {
    if bytes.len() < HEADER_SIZE {
        return Err(PacketError::InvalidHeaderLength { len: bytes.len() });
    }

    let mut reader = BitReader::new(bytes);
    let checksum = reader.read(CHECKSUM_BITS);
    let message_type = reader.read(MESSAGE_TYPE_BITS) as u8;
    let version = reader.read(VERSION_BITS) as u8;
    let nbit = reader.read(N_BIT_BITS) != 0;
    let cbit = reader.read(C_BIT_BITS) != 0;
    let sbit = reader.read(S_BIT_BITS) != 0;
    let dbit = reader.read(D_BIT_BITS) != 0;
    let _reserved = reader.read(RESERVED_BITS);
    let fragment_amount = reader.read(FRAGMENT_AMOUNT_BITS) as u8;
    let fragment_number = reader.read(FRAGMENT_NUMBER_BITS) as u8;
    let message_id = reader.read(MESSAGE_ID_BITS) as u16;
    let message_data_length = reader.read(MESSAGE_DATA_LENGTH_BITS) as u16;

    // Sanity-check the aligned 32/16-bit reads against byteorder's own
    // interpretation of the same bytes, since checksum/message_id/
    // message_data_length all happen to start at byte boundaries.
    debug_assert_eq!(checksum, BigEndian::read_u32(&bytes[0..4]));

    Ok(RawPacket {
        checksum,
        message_type,
        version,
        nbit,
        cbit,
        sbit,
        dbit,
        fragment_amount,
        fragment_number,
        message_id,
        message_data_length,
        payload_data: bytes[HEADER_SIZE..].to_vec().into_boxed_slice(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawPacket {
        RawPacket {
            checksum: 0,
            message_type: 1,
            version: 2,
            nbit: false,
            cbit: true,
            sbit: false,
            dbit: false,
            fragment_amount: 1,
            fragment_number: 0,
            message_id: 0,
            message_data_length: 0,
            payload_data: Box::new([]),
        }
    }

    #[test]
    fn encodes_sync_like_header_to_expected_bytes() {
        let bytes = encode(&sample());
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(bytes, vec![0x00, 0x00, 0x00, 0x00, 0x52, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn decode_rejects_short_buffers() {
        let err = decode(&[0u8; HEADER_SIZE - 1]).unwrap_err();
        assert_eq!(err, PacketError::InvalidHeaderLength { len: HEADER_SIZE - 1 });
    }

    #[test]
    fn round_trips_arbitrary_fields() {
        let raw = RawPacket {
            checksum: 0xDEAD_BEEF,
            message_type: 2,
            version: 2,
            nbit: true,
            cbit: false,
            sbit: true,
            dbit: true,
            fragment_amount: 200,
            fragment_number: 37,
            message_id: 54321,
            message_data_length: 5,
            payload_data: Box::new(*b"dummy"),
        };
        let bytes = encode(&raw);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, raw);
    }
}
