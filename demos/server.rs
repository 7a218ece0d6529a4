//! Minimal echo server: opens a socket, logs and echoes back every
//! message it receives.
//!
//! Run with `RUST_LOG=info cargo run --example server`.

use udpcp::{ChecksumMode, RUdpSocket, SocketConfig, TransferMode};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let server = RUdpSocket::open("0.0.0.0:61244", SocketConfig::default())?;
    println!("listening on {}", server.local_addr());

    loop {
        let (peer, message) = server.receive_from()?;
        println!("received {} bytes from {}, echoing back", message.len(), peer);
        server.send_to(peer, &message, TransferMode::AckEveryPacket, ChecksumMode::Enabled)?;
    }
}
