//! On-air packet codec (§3, §4.5, §9.1).
use byteorder::{BigEndian, ByteOrder};
use proc_bitfield::bitfield;

use crate::crc;

/// Minimum length of a decoded, de-CRC'd packet: 4 bytes of address plus the control byte.
const MIN_PACKET_LEN: usize = 5;

/// Length of the radio-adapter framing metadata a conforming `RadioLink` prepends to
/// every buffer it returns, ahead of the packet and its trailing CRC-8 (§4.5, §6).
/// This engine has no use for the adapter's own metadata bytes; it only skips them.
pub(crate) const ADAPTER_META_LEN: usize = 2;

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    /// The control byte that carries a packet's sequence number and type (§9.1).
    struct Control(pub u8): Debug, FromStorage, IntoStorage {
        /// `0..=31`.
        pub sequence: u8 @ 3..=7,
        /// `0b00=PDM, 0b01=POD, 0b10=ACK, 0b11=CON`.
        pub packet_type_raw: u8 @ 0..=1,
    }
}

/// The type of an on-air packet (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// Controller to pod, data-carrying.
    Pdm,
    /// Pod to controller, first/only response fragment.
    Pod,
    /// Either direction, one-byte acknowledgement.
    Ack,
    /// Pod to controller, continuation fragment of a multi-packet response.
    Con,
}

impl PacketType {
    fn to_raw(self) -> u8 {
        match self {
            Self::Pdm => 0b00,
            Self::Pod => 0b01,
            Self::Ack => 0b10,
            Self::Con => 0b11,
        }
    }

    fn from_raw(raw: u8) -> Self {
        match raw & 0b11 {
            0b00 => Self::Pdm,
            0b01 => Self::Pod,
            0b10 => Self::Ack,
            _ => Self::Con,
        }
    }
}

/// Errors from decoding a received buffer into a [`Packet`] (§4.2 step 5, §8 invariant 4).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The buffer was shorter than a packet can possibly be.
    #[error("packet too short: expected at least {expected}, found {found}")]
    TooShort {
        /// Minimum valid length.
        expected: usize,
        /// Length of the buffer actually received.
        found: usize,
    },
    /// The trailing CRC-8 byte did not match.
    #[error("CRC mismatch")]
    CrcMismatch,
}

/// One on-air packet (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    address: u32,
    control: Control,
    payload: Vec<u8>,
}

impl Packet {
    /// Build a new packet. `sequence` is masked to `0..=31`.
    pub fn new(address: u32, sequence: u8, packet_type: PacketType, payload: Vec<u8>) -> Self {
        Self {
            address,
            control: Control(0).with_sequence(sequence % 32).with_packet_type_raw(packet_type.to_raw()),
            payload,
        }
    }

    /// Construct the fixed synthetic ACK packet used both mid-conversation (`final = false`)
    /// and to end it (`final = true`) (§2 item 2). The `final` flag carries no on-air
    /// meaning of its own — both are plain `Ack` packets — it only distinguishes which
    /// of §4.2/§4.3 the caller is about to invoke.
    pub fn ack(address: u32, sequence: u8, _final: bool) -> Self {
        Self::new(address, sequence, PacketType::Ack, Vec::new())
    }

    /// The pod's address.
    pub fn address(&self) -> u32 {
        self.address
    }

    /// The packet's sequence number, `0..=31`.
    pub fn sequence(&self) -> u8 {
        self.control.sequence()
    }

    /// Stamp a new sequence number onto the packet (§4.1 step 2, §4.2 step 1).
    pub fn set_sequence(&mut self, sequence: u8) {
        self.control = self.control.with_sequence(sequence % 32);
    }

    /// The packet's type.
    pub fn packet_type(&self) -> PacketType {
        PacketType::from_raw(self.control.packet_type_raw())
    }

    /// The packet's payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Encode to on-air bytes, without CRC framing.
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(5 + self.payload.len());
        bytes.extend_from_slice(&self.address.to_be_bytes());
        bytes.push(self.control.0);
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Encode to on-air bytes, with a trailing CRC-8 (§4.2 step 2, §4.3 step 1).
    pub fn to_framed_bytes(&self) -> Vec<u8> {
        crc::frame(&self.to_bytes())
    }

    /// Decode a raw buffer exactly as a [`crate::driver::RadioLink`] returns it:
    /// `[adapter_meta(2) | packet_payload(>=1) | crc8(1)]` (§4.5, §6). The leading
    /// adapter metadata is skipped before CRC verification and decoding.
    ///
    /// Returns `Ok(None)` for a buffer whose CRC does not verify — decode failure and CRC
    /// failure are the same "illegal packet" outcome from the caller's perspective
    /// (§4.2 step 5: "If CRC fails or decode fails, treat as illegal and continue").
    pub fn from_framed_bytes(framed: &[u8]) -> Result<Option<Self>, ParseError> {
        let Some(packet_and_crc) = framed.get(ADAPTER_META_LEN..) else {
            return Err(ParseError::TooShort {
                expected: ADAPTER_META_LEN,
                found: framed.len(),
            });
        };
        let Some(payload_and_header) = crc::verify(packet_and_crc) else {
            return Ok(None);
        };
        Self::from_bytes(payload_and_header).map(Some)
    }

    fn from_bytes(data: &[u8]) -> Result<Self, ParseError> {
        if data.len() < MIN_PACKET_LEN {
            return Err(ParseError::TooShort {
                expected: MIN_PACKET_LEN,
                found: data.len(),
            });
        }
        let address = BigEndian::read_u32(&data[0..4]);
        let control = Control(data[4]);
        let payload = data[5..].to_vec();
        Ok(Self { address, control, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Prefix `framed` with adapter metadata, as a conforming `RadioLink` would
    /// return it from `send_and_receive_packet`/`get_packet` (§4.5, §6).
    fn with_adapter_meta(meta: [u8; ADAPTER_META_LEN], framed: Vec<u8>) -> Vec<u8> {
        let mut raw = meta.to_vec();
        raw.extend_from_slice(&framed);
        raw
    }

    #[test]
    fn round_trips_through_framed_bytes() {
        let packet = Packet::new(0x1F00_EE01, 17, PacketType::Pdm, vec![1, 2, 3]);
        let raw = with_adapter_meta([0, 0], packet.to_framed_bytes());
        let decoded = Packet::from_framed_bytes(&raw).unwrap().unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn adapter_meta_prefix_is_skipped_regardless_of_content() {
        // The two leading bytes are the adapter's own metadata, not packet data; any
        // value there must decode identically.
        let packet = Packet::new(0x1F00_EE01, 17, PacketType::Pdm, vec![1, 2, 3]);
        let raw = with_adapter_meta([0xAA, 0xBB], packet.to_framed_bytes());
        let decoded = Packet::from_framed_bytes(&raw).unwrap().unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn sequence_is_masked_to_five_bits() {
        let packet = Packet::new(1, 200, PacketType::Ack, Vec::new());
        assert_eq!(packet.sequence(), 200 % 32);
    }

    #[test]
    fn corrupted_crc_decodes_to_none() {
        let packet = Packet::new(0xAABB_CCDD, 3, PacketType::Pod, vec![9]);
        let mut framed = packet.to_framed_bytes();
        let last = framed.len() - 1;
        framed[last] ^= 0x01;
        let raw = with_adapter_meta([0, 0], framed);
        assert_eq!(Packet::from_framed_bytes(&raw).unwrap(), None);
    }

    #[test]
    fn too_short_buffer_is_a_parse_error() {
        let framed = crc::frame(&[1, 2]);
        let raw = with_adapter_meta([0, 0], framed);
        assert!(matches!(
            Packet::from_framed_bytes(&raw),
            Err(ParseError::TooShort { .. })
        ));
    }

    #[test]
    fn buffer_shorter_than_adapter_meta_is_a_parse_error() {
        assert!(matches!(
            Packet::from_framed_bytes(&[0u8]),
            Err(ParseError::TooShort { .. })
        ));
    }

    #[test]
    fn ack_packet_carries_no_payload() {
        let ack = Packet::ack(0x1234, 5, true);
        assert!(ack.payload().is_empty());
        assert!(matches!(ack.packet_type(), PacketType::Ack));
    }

    #[test]
    fn all_packet_types_round_trip_through_raw() {
        for ty in [PacketType::Pdm, PacketType::Pod, PacketType::Ack, PacketType::Con] {
            assert_eq!(PacketType::from_raw(ty.to_raw()), ty);
        }
    }
}
