//! udpcp: a lightweight reliable datagram transport layered on top of UDP.
//!
//! UDPCP adds per-fragment acknowledgement, retransmission, and
//! message reassembly on top of a plain UDP socket, without the
//! connection handshake or congestion control of TCP. A socket is
//! opened once, its receive worker runs on its own thread, and
//! `send_to`/`receive_from` are ordinary blocking calls from any
//! caller thread.
//!
//! # Examples
//!
//! ## Server
//!
//! ```rust,no_run
//! use udpcp::{RUdpSocket, SocketConfig, TransferMode, ChecksumMode};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = RUdpSocket::open("0.0.0.0:61244", SocketConfig::default())?;
//!     loop {
//!         let (peer, message) = server.receive_from()?;
//!         println!("received {} bytes from {}", message.len(), peer);
//!         server.send_to(peer, &message, TransferMode::AckEveryPacket, ChecksumMode::Enabled)?;
//!     }
//! }
//! ```
//!
//! ## Client
//!
//! ```rust,no_run
//! use udpcp::{RUdpSocket, SocketConfig, TransferMode, ChecksumMode};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RUdpSocket::open("0.0.0.0:0", SocketConfig::default())?;
//!     let server_addr = "127.0.0.1:61244".parse()?;
//!     client.send_to(server_addr, b"hello", TransferMode::AckEveryPacket, ChecksumMode::Enabled)?;
//!     let (_peer, echoed) = client.receive_from()?;
//!     println!("echoed back {} bytes", echoed.len());
//!     Ok(())
//! }
//! ```

mod checksum_mode;
mod codec;
mod config;
mod consts;
mod error;
mod identifier;
mod message_type;
mod packet;
mod packet_type;
mod reassembly;
mod socket;
mod transfer_mode;
mod wake;

pub use checksum_mode::ChecksumMode;
pub use config::{SocketConfig, SocketConfigBuilder};
pub use consts::{HEADER_SIZE, MAX_FRAGMENTS, MTU, PROTOCOL_VERSION};
pub use error::{PacketError, SocketError, WorkerFault};
pub use message_type::MessageType;
pub use packet::Packet;
pub use packet_type::PacketType;
pub use socket::RUdpSocket;
pub use transfer_mode::TransferMode;
