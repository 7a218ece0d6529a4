//! Minimal client: sends one message to the echo server and prints
//! whatever comes back.
//!
//! Run with `RUST_LOG=info cargo run --example client -- 127.0.0.1:61244`.

use udpcp::{ChecksumMode, RUdpSocket, SocketConfig, TransferMode};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let server_addr = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1:61244".into());
    let server_addr = server_addr.parse()?;

    let client = RUdpSocket::open("0.0.0.0:0", SocketConfig::default())?;
    println!("bound on {}, sending to {}", client.local_addr(), server_addr);

    let payload: Vec<u8> = (0..2000).map(|v| (v % 256) as u8).collect();
    client.send_to(server_addr, &payload, TransferMode::AckEveryPacket, ChecksumMode::Enabled)?;

    let (peer, echoed) = client.receive_from()?;
    println!("got {} bytes back from {}", echoed.len(), peer);
    assert_eq!(echoed, payload);
    println!("round trip matched the original payload");
    Ok(())
}
