//! The socket facade (C6+C7+C9): fragmentation and ack-wait on send,
//! dispatch and reassembly on receive, and the open/serve/shutdown/close
//! lifecycle tying both to a dedicated worker thread.
//!
//! Grounded on the teacher's `RUdpSocket`/`RUdpServer` (`rudp.rs`,
//! `rudp_server.rs`): the `UdpSocketWrapper` pattern of owning the raw
//! `UdpSocket` behind a small wrapper, the `VecDeque`-based event
//! queue drained by the caller, and the `log` call sites at each state
//! transition. The thread-per-socket plus `Mutex`/`Condvar`
//! coordination replaces the teacher's single-threaded `next_tick`
//! polling, since this protocol's `send_to`/`receive_from` are
//! blocking calls rather than a tick the caller drives by hand; the
//! ack-wait and dispatch logic otherwise follows the reference
//! implementation's `_send_data_packet`/`_process_packet` one to one.

use std::collections::VecDeque;
use std::io::{self, ErrorKind};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::os::unix::io::AsRawFd;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use hashbrown::HashMap;
use nix::poll::{poll, PollFd, PollFlags};
use socket2::{Domain, Socket, Type};

use crate::checksum_mode::ChecksumMode;
use crate::config::SocketConfig;
use crate::consts::MTU;
use crate::error::{SocketError, WorkerFault};
use crate::identifier::MessageIdGenerator;
use crate::packet::Packet;
use crate::reassembly::{ReassemblyOutcome, ReassemblyTable};
use crate::transfer_mode::TransferMode;
use crate::wake::WakeSignal;

/// Per-fragment payload ceiling. spec.md §4.3 slices a message at
/// `MTU`-sized chunks directly; this crate slices at `MTU -
/// HEADER_SIZE` instead so that header-plus-payload never exceeds
/// `MTU` on the wire — the receive worker's datagram buffer
/// (`serve_forever`) is sized to exactly `MTU` bytes, and a fragment
/// sliced at the full `MTU` would produce a datagram too large for
/// that buffer once the 12-byte header is added. See `SPEC_FULL.md`
/// §9 (Q4) and `DESIGN.md` for this resolution.
const MAX_FRAGMENT_PAYLOAD: usize = MTU - crate::consts::HEADER_SIZE;
const MAX_PENDING_FAULTS: usize = 64;

/// One fragment this socket is currently waiting on an ack for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingAck {
    peer: SocketAddr,
    message_id: u16,
    fragment_amount: u8,
    fragment_number: u8,
    satisfied: bool,
}

struct State {
    reassembly: ReassemblyTable,
    identifiers: HashMap<SocketAddr, MessageIdGenerator>,
    inbound: VecDeque<(SocketAddr, Vec<u8>)>,
    faults: VecDeque<WorkerFault>,
    pending_ack: Option<PendingAck>,
    shutdown: bool,
}

impl State {
    fn new() -> Self {
        State {
            reassembly: ReassemblyTable::new(),
            identifiers: HashMap::new(),
            inbound: VecDeque::new(),
            faults: VecDeque::new(),
            pending_ack: None,
            shutdown: false,
        }
    }

    fn push_fault(&mut self, fault: WorkerFault) {
        if self.faults.len() >= MAX_PENDING_FAULTS {
            self.faults.pop_front();
        }
        self.faults.push_back(fault);
    }
}

struct Shared {
    socket: UdpSocket,
    config: SocketConfig,
    wake: WakeSignal,
    state: Mutex<State>,
    inbound_ready: Condvar,
    ack_ready: Condvar,
    send_lock: Mutex<()>,
}

/// A UDPCP socket: a bound, non-blocking UDP datagram socket paired
/// with a dedicated receive worker thread.
///
/// `send_to` fragments and blocks until every ack-needed fragment is
/// acknowledged (or all retransmission attempts are exhausted);
/// `receive_from` blocks until a full message from some peer has been
/// reassembled. Both may be called from any thread; concurrent
/// `send_to` calls are serialized internally (`SPEC_FULL.md` §4.3, Q2).
pub struct RUdpSocket {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for RUdpSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RUdpSocket").field("local_addr", &self.local_addr()).finish()
    }
}

impl RUdpSocket {
    /// Binds a UDP socket at `local_addr` with `SO_REUSEADDR`/`SO_REUSEPORT`
    /// (`SPEC_FULL.md` §6) and starts its receive worker.
    pub fn open<A: ToSocketAddrs>(local_addr: A, config: SocketConfig) -> io::Result<RUdpSocket> {
        let socket = bind_reusable(local_addr)?;
        socket.set_nonblocking(true)?;
        log::info!("udpcp socket opened on {}", socket.local_addr()?);

        let shared = Arc::new(Shared {
            socket,
            config,
            wake: WakeSignal::new()?,
            state: Mutex::new(State::new()),
            inbound_ready: Condvar::new(),
            ack_ready: Condvar::new(),
            send_lock: Mutex::new(()),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("udpcp-worker".into())
            .spawn(move || serve_forever(worker_shared))
            .map_err(|e| io::Error::new(ErrorKind::Other, e))?;

        Ok(RUdpSocket { shared, worker: Mutex::new(Some(handle)) })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.shared.socket.local_addr().expect("bound socket always has a local address")
    }

    /// The readiness fd that becomes selectable whenever `receive_from`
    /// has a message ready to return without blocking.
    pub fn fileno(&self) -> std::os::unix::io::RawFd {
        self.shared.wake.fileno()
    }

    /// Drains worker faults observed since the last call (`SPEC_FULL.md` §4.4).
    pub fn drain_faults(&self) -> Vec<WorkerFault> {
        let mut state = self.shared.state.lock().unwrap();
        state.faults.drain(..).collect()
    }

    /// Sends `payload` to `peer` under the socket's configured
    /// `default_transfer_mode`/`default_checksum_mode` (`SocketConfig`,
    /// `SPEC_FULL.md` §6), rather than requiring the caller to name a
    /// policy on every call. Equivalent to calling [`Self::send_to`]
    /// with those two defaults.
    pub fn send(&self, peer: SocketAddr, payload: &[u8]) -> Result<(), SocketError> {
        let (transfer_mode, checksum_mode) = {
            let config = self.shared.config;
            (config.default_transfer_mode, config.default_checksum_mode)
        };
        self.send_to(peer, payload, transfer_mode, checksum_mode)
    }

    /// Sends `payload` to `peer`, fragmenting as needed, under
    /// `transfer_mode`/`checksum_mode`. Blocks until every ack-needed
    /// fragment has been acknowledged; returns
    /// [`SocketError::AckFailure`] if retransmission attempts run out
    /// on any fragment. An empty `payload` still sends exactly one
    /// zero-length Data fragment (resolves Q1).
    pub fn send_to(
        &self,
        peer: SocketAddr,
        payload: &[u8],
        transfer_mode: TransferMode,
        checksum_mode: ChecksumMode,
    ) -> Result<(), SocketError> {
        {
            let state = self.shared.state.lock().unwrap();
            if state.shutdown {
                return Err(SocketError::Closed);
            }
        }

        let fragments = split_into_fragments(payload);
        if fragments.len() > crate::consts::MAX_FRAGMENTS {
            return Err(SocketError::MessageTooLarge { len: payload.len() });
        }
        let fragment_amount = fragments.len() as u8;

        // serializes concurrent senders: the pending-ack slot is single-element.
        let _send_guard = self.shared.send_lock.lock().unwrap();

        let message_id = {
            let mut state = self.shared.state.lock().unwrap();
            state.identifiers.entry(peer).or_insert_with(MessageIdGenerator::new).next()
        };

        for (fragment_number, chunk) in fragments.into_iter().enumerate() {
            let fragment_number = fragment_number as u8;
            let packet = Packet::data(transfer_mode, checksum_mode, fragment_amount, fragment_number, message_id, chunk)
                .expect("fragment bounds are computed internally and always valid");

            self.send_fragment(peer, &packet)?;
        }

        Ok(())
    }

    fn send_fragment(&self, peer: SocketAddr, packet: &Packet) -> Result<(), SocketError> {
        let bytes = packet.to_bytes();

        if !packet.is_ack_needed() {
            self.shared.socket.send_to(&bytes, peer)?;
            log::trace!("sent fragment {}/{} to {} (no ack required)", packet.fragment_number(), packet.fragment_amount(), peer);
            return Ok(());
        }

        for attempt in 0..self.shared.config.retransmission_attempts {
            {
                let mut state = self.shared.state.lock().unwrap();
                state.pending_ack = Some(PendingAck {
                    peer,
                    message_id: packet.message_id(),
                    fragment_amount: packet.fragment_amount(),
                    fragment_number: packet.fragment_number(),
                    satisfied: false,
                });
            }

            self.shared.socket.send_to(&bytes, peer)?;
            log::trace!(
                "sent fragment {}/{} message {} to {} (attempt {}/{})",
                packet.fragment_number(),
                packet.fragment_amount(),
                packet.message_id(),
                peer,
                attempt + 1,
                self.shared.config.retransmission_attempts
            );

            let state = self.shared.state.lock().unwrap();
            let (mut state, _timeout_result) = self
                .shared
                .ack_ready
                .wait_timeout_while(state, self.shared.config.retransmission_timeout, |s| {
                    !s.shutdown && s.pending_ack.map_or(false, |p| !p.satisfied)
                })
                .unwrap();
            let acked = state.pending_ack.map_or(false, |p| p.satisfied);
            let shutting_down = state.shutdown;
            state.pending_ack = None;
            drop(state);

            if acked {
                return Ok(());
            }
            if shutting_down {
                return Err(SocketError::Closed);
            }
            log::debug!(
                "ack timeout for fragment {}/{} message {} to {}",
                packet.fragment_number(),
                packet.fragment_amount(),
                packet.message_id(),
                peer
            );
        }

        let mut state = self.shared.state.lock().unwrap();
        state.pending_ack = None;
        log::warn!(
            "exhausted {} retransmission attempts for fragment {}/{} message {} to {}",
            self.shared.config.retransmission_attempts,
            packet.fragment_number(),
            packet.fragment_amount(),
            packet.message_id(),
            peer
        );
        Err(SocketError::AckFailure { message_id: packet.message_id(), fragment_number: packet.fragment_number() })
    }

    /// Blocks until a full message has been reassembled from some peer,
    /// returning it alongside that peer's address.
    pub fn receive_from(&self) -> Result<(SocketAddr, Vec<u8>), SocketError> {
        let mut state = self.shared.state.lock().unwrap();
        loop {
            if let Some(message) = state.inbound.pop_front() {
                self.shared.wake.notify_read();
                return Ok(message);
            }
            if state.shutdown {
                return Err(SocketError::Closed);
            }
            state = self.shared.inbound_ready.wait(state).unwrap();
        }
    }

    /// Signals the worker thread to stop and wakes anyone blocked in
    /// `send_to`/`receive_from` with [`SocketError::Closed`]. Idempotent.
    pub fn shutdown(&self) {
        let mut state = self.shared.state.lock().unwrap();
        if state.shutdown {
            return;
        }
        state.shutdown = true;
        drop(state);
        self.shared.ack_ready.notify_all();
        self.shared.inbound_ready.notify_all();
        log::info!("udpcp socket {} shutting down", self.local_addr());
    }

    /// Shuts the socket down (if not already) and joins the worker thread.
    pub fn close(&self) {
        self.shutdown();
        if let Some(handle) = self.worker.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RUdpSocket {
    fn drop(&mut self) {
        self.close();
    }
}

/// Binds a UDP socket with `SO_REUSEADDR` and `SO_REUSEPORT` set before
/// `bind`, matching `original_source/src/udpcp/socket.py`'s
/// `create_socket`/`open` (`native_socket.SO_REUSEADDR`/`SO_REUSEPORT`
/// both set to 1). `std::net::UdpSocket` has no portable way to set
/// these ahead of binding, so the socket is built and bound through
/// `socket2` and only converted to a plain `std::net::UdpSocket`
/// afterwards.
fn bind_reusable<A: ToSocketAddrs>(local_addr: A) -> io::Result<UdpSocket> {
    let addr = local_addr
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "no local address to bind to"))?;

    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, None)?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.bind(&addr.into())?;
    Ok(socket.into())
}

/// Splits `payload` into fragments of at most [`MAX_FRAGMENT_PAYLOAD`]
/// bytes. An empty payload still yields exactly one empty fragment
/// (resolution of Q1 in `SPEC_FULL.md` §4.3).
fn split_into_fragments(payload: &[u8]) -> Vec<&[u8]> {
    if payload.is_empty() {
        return vec![&payload[0..0]];
    }
    payload.chunks(MAX_FRAGMENT_PAYLOAD).collect()
}

/// The receive worker's main loop: blocks on a readiness poll of the
/// socket (mirroring the reference implementation's
/// `selector.select(poll_interval)`, which wakes as soon as the socket
/// is readable rather than waiting out the full interval), then
/// decodes and dispatches each datagram. Exits only once
/// `state.shutdown` is set and the socket itself is no longer
/// yielding data.
fn serve_forever(shared: Arc<Shared>) {
    let mut buf = vec![0u8; MTU];
    let fd = shared.socket.as_raw_fd();
    let timeout_ms = shared.config.poll_interval.as_millis().min(i32::MAX as u128) as i32;

    loop {
        {
            let state = shared.state.lock().unwrap();
            if state.shutdown {
                break;
            }
        }

        let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
        match poll(&mut fds, timeout_ms) {
            Ok(0) => continue, // poll_interval elapsed with nothing ready; recheck shutdown
            Ok(_) => {}
            // A signal interrupting the poll call looks the same to us as a
            // plain timeout: go around and recheck shutdown, then poll again.
            Err(err) if err.as_errno() == Some(nix::errno::Errno::EINTR) => continue,
            Err(err) => {
                log::error!("udpcp receive worker stopping after poll error: {}", err);
                stop_worker(&shared);
                break;
            }
        }

        match shared.socket.recv_from(&mut buf) {
            Ok((len, peer)) => dispatch(&shared, peer, &buf[..len]),
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) => {
                log::error!("udpcp receive worker stopping after socket error: {}", err);
                stop_worker(&shared);
                break;
            }
        }
    }
}

fn stop_worker(shared: &Arc<Shared>) {
    let mut state = shared.state.lock().unwrap();
    state.shutdown = true;
    drop(state);
    shared.inbound_ready.notify_all();
    shared.ack_ready.notify_all();
}

fn dispatch(shared: &Arc<Shared>, peer: SocketAddr, bytes: &[u8]) {
    let packet = match Packet::from_bytes(bytes) {
        Ok(packet) => packet,
        Err(err) => {
            log::warn!("dropping unparseable packet from {}: {}", peer, err);
            let mut state = shared.state.lock().unwrap();
            state.push_fault(WorkerFault::InvalidPacket(err));
            return;
        }
    };

    if packet.is_ack() {
        process_ack(shared, peer, &packet);
    } else if packet.is_sync() {
        process_sync(shared, peer, &packet);
    } else if packet.is_data() {
        process_data(shared, peer, &packet);
    } else {
        log::warn!("dropping packet from {} that classified as invalid", peer);
        let mut state = shared.state.lock().unwrap();
        state.push_fault(WorkerFault::UnclassifiablePacket);
    }
}

fn process_ack(shared: &Arc<Shared>, peer: SocketAddr, ack: &Packet) {
    let mut state = shared.state.lock().unwrap();
    let matched = match state.pending_ack.as_mut() {
        Some(pending) if pending.peer == peer && pending.message_id == ack.message_id() && pending.fragment_amount == ack.fragment_amount() && pending.fragment_number == ack.fragment_number() => {
            pending.satisfied = true;
            true
        }
        _ => false,
    };
    drop(state);

    if matched {
        log::trace!("ack matched for message {} fragment {} from {}", ack.message_id(), ack.fragment_number(), peer);
        shared.ack_ready.notify_all();
    } else {
        log::warn!("unsolicited ack from {} (message {} fragment {})", peer, ack.message_id(), ack.fragment_number());
        let mut state = shared.state.lock().unwrap();
        state.push_fault(WorkerFault::UnsolicitedAck);
    }
}

fn process_sync(shared: &Arc<Shared>, peer: SocketAddr, sync: &Packet) {
    log::debug!("received sync from {}", peer);
    send_ack(shared, peer, sync, false);
}

fn process_data(shared: &Arc<Shared>, peer: SocketAddr, data: &Packet) {
    let mut state = shared.state.lock().unwrap();
    let outcome = state.reassembly.push(peer, data);
    let is_duplicate = outcome == ReassemblyOutcome::Duplicate;
    if let ReassemblyOutcome::Completed(message) = outcome {
        state.inbound.push_back((peer, message));
        drop(state);
        shared.wake.notify_write();
        shared.inbound_ready.notify_all();
    } else {
        drop(state);
    }

    if is_duplicate {
        log::debug!("dropped retransmitted fragment {}/{} from {}", data.fragment_number(), data.fragment_amount(), peer);
    }
    send_ack(shared, peer, data, is_duplicate);
}

fn send_ack(shared: &Arc<Shared>, peer: SocketAddr, base_packet: &Packet, is_duplicate: bool) {
    match Packet::ack(base_packet, is_duplicate) {
        Ok(ack) => {
            if let Err(err) = shared.socket.send_to(&ack.to_bytes(), peer) {
                log::error!("failed to send ack to {}: {}", peer, err);
            }
        }
        Err(err) => {
            // unreachable in practice: base_packet is always Data or Sync here.
            log::warn!("could not build ack for packet from {}: {}", peer, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_empty_payload_into_one_empty_fragment() {
        let fragments = split_into_fragments(&[]);
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].is_empty());
    }

    #[test]
    fn splits_large_payload_across_multiple_fragments() {
        let payload = vec![0u8; MAX_FRAGMENT_PAYLOAD * 2 + 10];
        let fragments = split_into_fragments(&payload);
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[0].len(), MAX_FRAGMENT_PAYLOAD);
        assert_eq!(fragments[2].len(), 10);
    }

    #[test]
    fn small_payload_is_a_single_fragment() {
        let payload = b"hello world";
        let fragments = split_into_fragments(payload);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0], payload);
    }
}
