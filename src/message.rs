//! Message assembler: fragmentation and reassembly (§4.4).
use crate::packet::{Packet, PacketType};

/// Maximum payload carried by a single packet before a message must be split into
/// multiple chunks (§4.4.1).
const MAX_BODY_LEN: usize = 31;

const MORE_CHUNKS_FOLLOW: u8 = 0x01;
const FINAL_CHUNK: u8 = 0x00;

/// Assembly state of an incoming [`Message`] (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageState {
    /// More `CON` packets are expected.
    Incomplete,
    /// The message has been fully assembled.
    Complete,
    /// Framing or semantics failed after assembly.
    Invalid,
}

/// A logical command or response, 1..N packets (§3, §4.4).
#[derive(Debug, Clone)]
pub struct Message {
    address: u32,
    sequence: u8,
    body: Vec<u8>,
    state: MessageState,
}

impl Message {
    /// Build a new outgoing message, to be stamped with the current message sequence
    /// and fragmented via [`Message::into_packets`] (§4.1 step 1-2).
    pub fn new(address: u32, body: Vec<u8>) -> Self {
        Self {
            address,
            sequence: 0,
            body,
            state: MessageState::Complete,
        }
    }

    /// The pod's address.
    pub fn address(&self) -> u32 {
        self.address
    }

    /// The message's sequence number, `0..=15`.
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    /// Stamp the message's sequence number (§4.1 step 1).
    pub fn set_sequence(&mut self, sequence: u8) {
        self.sequence = sequence % 16;
    }

    /// The message's assembly state.
    pub fn state(&self) -> MessageState {
        self.state
    }

    /// The assembled body. Only meaningful once `state() == Complete`.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Fragment an outgoing message into an ordered, non-empty list of `PDM` packets
    /// (§4.4.1). Packet sequence numbers are left at `0`; the engine stamps each one
    /// immediately before sending it (§4.1 step 2, §4.2 step 1).
    pub fn into_packets(&self) -> Vec<Packet> {
        if self.body.is_empty() {
            return vec![Packet::new(self.address, 0, PacketType::Pdm, vec![FINAL_CHUNK])];
        }

        let chunks: Vec<&[u8]> = self.body.chunks(MAX_BODY_LEN).collect();
        let last = chunks.len() - 1;
        chunks
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| {
                let mut payload = Vec::with_capacity(chunk.len() + 1);
                payload.push(if index == last { FINAL_CHUNK } else { MORE_CHUNKS_FOLLOW });
                payload.extend_from_slice(chunk);
                Packet::new(self.address, 0, PacketType::Pdm, payload)
            })
            .collect()
    }

    /// Seed a response message from the initial `POD` packet (§4.4.2).
    pub fn from_packet(packet: &Packet) -> Self {
        let mut message = Self {
            address: packet.address(),
            sequence: packet.sequence(),
            body: Vec::new(),
            state: MessageState::Incomplete,
        };
        message.ingest(packet.payload());
        message
    }

    /// Append a `CON` continuation packet (§4.4.2). A no-op once the message has
    /// settled into `Complete` or `Invalid`.
    pub fn add_con_packet(&mut self, packet: &Packet) {
        if self.state != MessageState::Incomplete {
            return;
        }
        self.ingest(packet.payload());
    }

    fn ingest(&mut self, payload: &[u8]) {
        let Some((&prefix, body)) = payload.split_first() else {
            self.state = MessageState::Invalid;
            return;
        };
        self.body.extend_from_slice(body);
        self.state = match prefix {
            FINAL_CHUNK => MessageState::Complete,
            MORE_CHUNKS_FOLLOW => MessageState::Incomplete,
            _ => MessageState::Invalid,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_message_yields_one_packet() {
        let message = Message::new(0x1F00_EE01, vec![1, 2, 3]);
        let packets = message.into_packets();
        assert_eq!(packets.len(), 1);
        assert!(matches!(packets[0].packet_type(), PacketType::Pdm));
        assert_eq!(packets[0].payload(), &[0x00, 1, 2, 3]);
    }

    #[test]
    fn multi_chunk_message_marks_all_but_last_as_more_follows() {
        let body = vec![0xAB; MAX_BODY_LEN * 2 + 5];
        let message = Message::new(1, body.clone());
        let packets = message.into_packets();
        assert_eq!(packets.len(), 3);
        assert_eq!(packets[0].payload()[0], MORE_CHUNKS_FOLLOW);
        assert_eq!(packets[1].payload()[0], MORE_CHUNKS_FOLLOW);
        assert_eq!(packets[2].payload()[0], FINAL_CHUNK);

        let mut reassembled = Vec::new();
        for packet in &packets {
            reassembled.extend_from_slice(&packet.payload()[1..]);
        }
        assert_eq!(reassembled, body);
    }

    #[test]
    fn single_pod_packet_completes_the_message() {
        let pod = Packet::new(7, 1, PacketType::Pod, vec![0x00, 9, 9]);
        let message = Message::from_packet(&pod);
        assert_eq!(message.state(), MessageState::Complete);
        assert_eq!(message.body(), &[9, 9]);
    }

    #[test]
    fn pod_then_con_packets_complete_the_message() {
        let pod = Packet::new(7, 1, PacketType::Pod, vec![0x01, 1]);
        let mut message = Message::from_packet(&pod);
        assert_eq!(message.state(), MessageState::Incomplete);

        message.add_con_packet(&Packet::new(7, 3, PacketType::Con, vec![0x01, 2]));
        assert_eq!(message.state(), MessageState::Incomplete);

        message.add_con_packet(&Packet::new(7, 5, PacketType::Con, vec![0x00, 3]));
        assert_eq!(message.state(), MessageState::Complete);
        assert_eq!(message.body(), &[1, 2, 3]);
    }

    #[test]
    fn bad_continuation_prefix_is_invalid() {
        let pod = Packet::new(7, 1, PacketType::Pod, vec![0x02, 1]);
        let message = Message::from_packet(&pod);
        assert_eq!(message.state(), MessageState::Invalid);
    }

    #[test]
    fn empty_payload_is_invalid() {
        let pod = Packet::new(7, 1, PacketType::Pod, vec![]);
        let message = Message::from_packet(&pod);
        assert_eq!(message.state(), MessageState::Invalid);
    }

    #[test]
    fn invalid_message_ignores_further_con_packets() {
        let pod = Packet::new(7, 1, PacketType::Pod, vec![0x02]);
        let mut message = Message::from_packet(&pod);
        assert_eq!(message.state(), MessageState::Invalid);
        message.add_con_packet(&Packet::new(7, 3, PacketType::Con, vec![0x00, 1]));
        assert_eq!(message.state(), MessageState::Invalid);
        assert!(message.body().is_empty());
    }
}
