//! Wire-format widths and protocol-wide constants.
//!
//! The header is a sequence of bit-packed fields; none of them are
//! byte-aligned individually (the first six fields share three bytes),
//! so the codec in `packet.rs` works bit-by-bit over this table rather
//! than relying on `byteorder` for anything but the aligned 16/32-bit
//! fields.

/// Width in bits of every header field, in wire order.
pub(crate) const CHECKSUM_BITS: u8 = 32;
pub(crate) const MESSAGE_TYPE_BITS: u8 = 2;
pub(crate) const VERSION_BITS: u8 = 3;
pub(crate) const N_BIT_BITS: u8 = 1;
pub(crate) const C_BIT_BITS: u8 = 1;
pub(crate) const S_BIT_BITS: u8 = 1;
pub(crate) const D_BIT_BITS: u8 = 1;
pub(crate) const RESERVED_BITS: u8 = 7;
pub(crate) const FRAGMENT_AMOUNT_BITS: u8 = 8;
pub(crate) const FRAGMENT_NUMBER_BITS: u8 = 8;
pub(crate) const MESSAGE_ID_BITS: u8 = 16;
pub(crate) const MESSAGE_DATA_LENGTH_BITS: u8 = 16;

/// Sum of every header field width above, in bytes. Header fields are
/// packed back to back with no padding; the sum happens to be
/// byte-aligned (96 bits = 12 bytes).
pub const HEADER_SIZE: usize = 12;

/// Fixed protocol version carried by every packet this crate emits.
pub const PROTOCOL_VERSION: u8 = 2;

/// The maximum value of the IPv4 total-length field, not a safe
/// link-layer MTU: fragmentation at lower layers is left to IP. Also
/// sized the receive worker's datagram buffer (`src/socket.rs`). This
/// is not the per-fragment *payload* ceiling — see
/// `MAX_FRAGMENT_PAYLOAD` in `src/socket.rs`, which is this value minus
/// `HEADER_SIZE`, and `SPEC_FULL.md` §9 (Q4) for why fragmentation
/// slices at that instead of at `MTU` itself.
pub const MTU: usize = 65536;

/// `fragment_amount` is an 8-bit field with no "count minus one"
/// indirection, so a message can be split into at most this many
/// fragments, bounding a message to `MAX_FRAGMENTS *
/// MAX_FRAGMENT_PAYLOAD` bytes (`src/socket.rs`).
pub const MAX_FRAGMENTS: usize = u8::MAX as usize;

/// Default UDPCP socket configuration, from `SPEC_FULL.md` §6.
pub const DEFAULT_RETRANSMISSION_TIMEOUT_MS: u64 = 100;
pub const DEFAULT_RETRANSMISSION_ATTEMPTS: u32 = 5;
pub const DEFAULT_MAXIMUM_CONNECTIONS: usize = 5;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
