//! Fragment reassembly (C5): per-peer, per-message-id fragment tables,
//! indexed by `fragment_number` rather than arrival order so a
//! retransmitted fragment can never corrupt the reassembled byte
//! stream. A retransmission is reported back to the caller as
//! [`ReassemblyOutcome::Duplicate`] rather than silently dropped, so
//! the socket facade can carry the duplicate bit through to the ack it
//! sends back.

use std::net::SocketAddr;

use hashbrown::HashMap;

use crate::packet::Packet;

#[derive(Debug)]
struct PendingMessage {
    fragment_amount: u8,
    slots: Vec<Option<Box<[u8]>>>,
    received: u8,
}

/// Result of feeding one fragment into a [`ReassemblyTable`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ReassemblyOutcome {
    /// This `fragment_number` had already been filled; the payload was dropped.
    Duplicate,
    /// Accepted a new fragment; the message is still incomplete.
    Pending,
    /// Accepted the last missing fragment; the message is complete.
    Completed(Vec<u8>),
}

/// Tracks in-progress multi-fragment messages across all peers.
#[derive(Debug, Default)]
pub(crate) struct ReassemblyTable {
    pending: HashMap<(SocketAddr, u16), PendingMessage>,
}

impl ReassemblyTable {
    pub(crate) fn new() -> Self {
        ReassemblyTable { pending: HashMap::new() }
    }

    /// Feeds one Data fragment from `peer` into the table.
    ///
    /// Returns [`ReassemblyOutcome::Duplicate`] if this `fragment_number`
    /// had already been filled (a retransmission whose first ack was
    /// presumably lost), [`ReassemblyOutcome::Completed`] once every
    /// `fragment_number` in `0..fragment_amount` has been seen, and
    /// [`ReassemblyOutcome::Pending`] otherwise.
    pub(crate) fn push(&mut self, peer: SocketAddr, packet: &Packet) -> ReassemblyOutcome {
        if packet.is_single() {
            return ReassemblyOutcome::Completed(packet.payload_data().to_vec());
        }

        let key = (peer, packet.message_id());
        let fragment_amount = packet.fragment_amount();
        let entry = self.pending.entry(key).or_insert_with(|| PendingMessage {
            fragment_amount,
            slots: vec![None; fragment_amount as usize],
            received: 0,
        });

        let idx = packet.fragment_number() as usize;
        if entry.slots[idx].is_some() {
            return ReassemblyOutcome::Duplicate;
        }
        entry.slots[idx] = Some(packet.payload_data().to_vec().into_boxed_slice());
        entry.received += 1;
        let done = entry.received == entry.fragment_amount;

        if done {
            let message = self.pending.remove(&key).expect("just populated above");
            let mut out = Vec::with_capacity(message.slots.iter().map(|s| s.as_ref().map_or(0, |b| b.len())).sum());
            for slot in message.slots {
                out.extend_from_slice(&slot.expect("every slot filled once received == fragment_amount"));
            }
            ReassemblyOutcome::Completed(out)
        } else {
            ReassemblyOutcome::Pending
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum_mode::ChecksumMode;
    use crate::transfer_mode::TransferMode;

    fn peer() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    #[test]
    fn single_fragment_message_completes_immediately() {
        let mut table = ReassemblyTable::new();
        let packet = Packet::data(TransferMode::AckEveryPacket, ChecksumMode::Disabled, 1, 0, 7, &b"hello"[..]).unwrap();
        assert_eq!(table.push(peer(), &packet), ReassemblyOutcome::Completed(b"hello".to_vec()));
        assert_eq!(table.pending_count(), 0);
    }

    #[test]
    fn multi_fragment_message_completes_in_any_arrival_order() {
        let mut table = ReassemblyTable::new();
        let frag0 = Packet::data(TransferMode::AckEveryPacket, ChecksumMode::Disabled, 3, 0, 1, &b"foo"[..]).unwrap();
        let frag2 = Packet::data(TransferMode::AckEveryPacket, ChecksumMode::Disabled, 3, 2, 1, &b"baz"[..]).unwrap();
        let frag1 = Packet::data(TransferMode::AckEveryPacket, ChecksumMode::Disabled, 3, 1, 1, &b"bar"[..]).unwrap();

        assert_eq!(table.push(peer(), &frag2), ReassemblyOutcome::Pending);
        assert_eq!(table.push(peer(), &frag0), ReassemblyOutcome::Pending);
        assert_eq!(table.push(peer(), &frag1), ReassemblyOutcome::Completed(b"foobarbaz".to_vec()));
    }

    #[test]
    fn retransmitted_duplicate_fragment_does_not_corrupt_message() {
        let mut table = ReassemblyTable::new();
        let frag0 = Packet::data(TransferMode::AckEveryPacket, ChecksumMode::Disabled, 2, 0, 1, &b"aa"[..]).unwrap();
        let frag1 = Packet::data(TransferMode::AckEveryPacket, ChecksumMode::Disabled, 2, 1, 1, &b"bb"[..]).unwrap();

        assert_eq!(table.push(peer(), &frag0), ReassemblyOutcome::Pending);
        // retransmission of fragment 0, e.g. because its ack was lost
        assert_eq!(table.push(peer(), &frag0), ReassemblyOutcome::Duplicate);
        assert_eq!(table.push(peer(), &frag1), ReassemblyOutcome::Completed(b"aabb".to_vec()));
    }

    #[test]
    fn distinct_peers_do_not_share_reassembly_state() {
        let mut table = ReassemblyTable::new();
        let other: SocketAddr = "127.0.0.1:9001".parse().unwrap();
        let frag0 = Packet::data(TransferMode::AckEveryPacket, ChecksumMode::Disabled, 2, 0, 1, &b"aa"[..]).unwrap();

        assert_eq!(table.push(peer(), &frag0), ReassemblyOutcome::Pending);
        assert_eq!(table.push(other, &frag0), ReassemblyOutcome::Pending);
        assert_eq!(table.pending_count(), 2);
    }
}
