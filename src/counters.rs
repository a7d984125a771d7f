//! Sequence counters used by the exchange engine, and the duplicate-reply memo.
use crate::packet::{Packet, PacketType};

/// A modular counter over `0..MODULUS`.
///
/// Both of the engine's sequence spaces (§3) are small unsigned integers that wrap
/// around a fixed modulus; this is the shared arithmetic for both, kept distinct by
/// type so the two spaces can never be mixed up at a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Counter<const MODULUS: u8> {
    value: u8,
}

impl<const MODULUS: u8> Counter<MODULUS> {
    fn new(seed: u8) -> Self {
        Self { value: seed % MODULUS }
    }

    fn value(self) -> u8 {
        self.value
    }

    fn set(&mut self, value: u8) {
        self.value = value % MODULUS;
    }

    fn advance(&mut self, delta: u8) {
        self.value = (self.value + delta) % MODULUS;
    }
}

/// The packet sequence counter, `0..32` (§3, §4.2, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketSequence(Counter<32>);

impl PacketSequence {
    /// Create a counter seeded at `seed mod 32`.
    pub fn new(seed: u8) -> Self {
        Self(Counter::new(seed))
    }

    /// The current value.
    pub fn value(self) -> u8 {
        self.0.value()
    }

    /// Advance by `+2 mod 32`, after a successful request/reply pair (§3, §4.2).
    pub fn advance_pair(&mut self) {
        self.0.advance(2);
    }

    /// Advance by `+1 mod 32`, after a trailing end-of-conversation ACK or a resync (§3, §4.3).
    pub fn advance_single(&mut self) {
        self.0.advance(1);
    }

    /// Rewind to `observed + 1 mod 32`, entering resync (§4.2, §4.3).
    pub fn resync_to(&mut self, observed_sequence: u8) {
        self.0.set(observed_sequence + 1);
    }

    /// The reply sequence expected for a packet sent at the current value (§4.2 step 1).
    pub fn expected_reply(self) -> u8 {
        let mut next = self.0;
        next.advance(1);
        next.value()
    }
}

/// The message sequence counter, `0..16` (§3, §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageSequence(Counter<16>);

impl MessageSequence {
    /// Create a counter seeded at `seed mod 16`.
    pub fn new(seed: u8) -> Self {
        Self(Counter::new(seed))
    }

    /// The current value.
    pub fn value(self) -> u8 {
        self.0.value()
    }

    /// Set directly to `response_sequence + 1 mod 16`, after a successful exchange (§4.1 step 5).
    pub fn follow(&mut self, response_sequence: u8) {
        self.0.set(response_sequence + 1);
    }

    /// Reset to zero, entering resync (§4.2, §4.3).
    pub fn reset(&mut self) {
        self.0.set(0);
    }
}

/// Single-slot memo of the most recently accepted incoming packet, used to recognise a
/// replayed prior response as silence rather than a fresh reply (§4.2 step 5, §9).
#[derive(Debug, Clone, Default)]
pub struct PacketMemo {
    last: Option<(PacketType, u8)>,
}

impl PacketMemo {
    /// An empty memo, as held by a freshly constructed engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `packet` has the same `(type, sequence)` as the last accepted packet.
    pub fn is_duplicate(&self, packet: &Packet) -> bool {
        self.last == Some((packet.packet_type(), packet.sequence()))
    }

    /// Record `packet` as the most recently accepted reply. Overwrites any prior memo.
    pub fn record(&mut self, packet: &Packet) {
        self.last = Some((packet.packet_type(), packet.sequence()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_sequence_wraps_at_32() {
        let mut seq = PacketSequence::new(30);
        seq.advance_pair();
        assert_eq!(seq.value(), 0);
    }

    #[test]
    fn packet_sequence_expected_reply_is_one_ahead() {
        let seq = PacketSequence::new(5);
        assert_eq!(seq.expected_reply(), 6);
        let seq = PacketSequence::new(31);
        assert_eq!(seq.expected_reply(), 0);
    }

    #[test]
    fn message_sequence_follows_response() {
        let mut seq = MessageSequence::new(0);
        seq.follow(15);
        assert_eq!(seq.value(), 0);
        seq.follow(3);
        assert_eq!(seq.value(), 4);
    }

    #[test]
    fn resync_rewinds_packet_sequence_past_observed() {
        let mut seq = PacketSequence::new(0);
        seq.resync_to(7);
        assert_eq!(seq.value(), 8);
    }
}
