//! A mock [`RadioLink`] test double, modeled on the teacher's queued-injection
//! `DummyDriver` (§2.1).
//!
//! Enabled by `#[cfg(test)]` for this crate's own tests, and exposed to downstream
//! crates that want to exercise [`crate::exchange::ExchangeEngine`] against scripted
//! radio behaviour via the `testing` feature.
use std::collections::VecDeque;

use crate::driver::{RadioLink, RadioLinkError};
use crate::packet::{ADAPTER_META_LEN, Packet};
use crate::timing::TimingProfile;

/// Wrap `packet`'s framed bytes with a zeroed adapter-meta prefix, as a conforming
/// `RadioLink` would return them from `send_and_receive_packet`/`get_packet`
/// (§4.5, §6). Use this (not bare [`Packet::to_framed_bytes`]) to build a
/// [`ScriptedReply::Packet`] — the engine's decode path always skips the leading
/// `ADAPTER_META_LEN` bytes of whatever a `RadioLink` hands it back.
pub fn reply_bytes(packet: &Packet) -> Vec<u8> {
    let mut raw = vec![0u8; ADAPTER_META_LEN];
    raw.extend_from_slice(&packet.to_framed_bytes());
    raw
}

/// One scripted outcome for a single `send_and_receive_packet`/`get_packet` call.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Return this raw buffer as the reply — build it with [`reply_bytes`] so it
    /// carries the adapter-meta prefix a real `RadioLink` would include.
    Packet(Vec<u8>),
    /// Silence: no reply arrived within the listen window.
    Silence,
    /// The call itself fails, as if the adapter lost the USB connection.
    LinkFailure(String),
}

/// A [`RadioLink`] driven entirely by a pre-scripted queue of replies.
///
/// Every call to [`MockRadioLink::send_and_receive_packet`] or
/// [`MockRadioLink::get_packet`] pops the next [`ScriptedReply`] off the front of the
/// queue. Panics if the queue runs dry, so a test's scripted sequence doubles as an
/// exact expectation on how many times the engine talks to the radio.
#[derive(Debug, Default)]
pub struct MockRadioLink {
    replies: VecDeque<ScriptedReply>,
    sent: Vec<Vec<u8>>,
    disconnected: bool,
}

impl MockRadioLink {
    /// An empty script; replies must be queued with [`MockRadioLink::push_reply`]
    /// before the engine is driven against it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one scripted reply to the back of the queue.
    pub fn push_reply(&mut self, reply: ScriptedReply) {
        self.replies.push_back(reply);
    }

    /// Queue a scripted reply, builder-style.
    pub fn with_reply(mut self, reply: ScriptedReply) -> Self {
        self.push_reply(reply);
        self
    }

    /// Every buffer this link was asked to transmit, in call order.
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Whether [`RadioLink::disconnect`] was ever called.
    pub fn was_disconnected(&self) -> bool {
        self.disconnected
    }

    /// How many scripted replies remain unconsumed.
    pub fn remaining(&self) -> usize {
        self.replies.len()
    }

    fn pop(&mut self) -> Result<Option<Vec<u8>>, RadioLinkError> {
        match self.replies.pop_front().expect("mock radio link ran out of scripted replies") {
            ScriptedReply::Packet(bytes) => Ok(Some(bytes)),
            ScriptedReply::Silence => Ok(None),
            ScriptedReply::LinkFailure(message) => Err(RadioLinkError(message)),
        }
    }
}

impl RadioLink for MockRadioLink {
    fn send_and_receive_packet(
        &mut self,
        data: &[u8],
        _channel: u32,
        _profile: TimingProfile,
    ) -> Result<Option<Vec<u8>>, RadioLinkError> {
        self.sent.push(data.to_vec());
        self.pop()
    }

    fn get_packet(&mut self, _seconds: f32) -> Result<Option<Vec<u8>>, RadioLinkError> {
        self.pop()
    }

    fn disconnect(&mut self, _ignore_errors: bool) -> Result<(), RadioLinkError> {
        self.disconnected = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_are_consumed_in_order() {
        let mut link = MockRadioLink::new()
            .with_reply(ScriptedReply::Silence)
            .with_reply(ScriptedReply::Packet(vec![1, 2, 3]));

        assert_eq!(link.send_and_receive_packet(&[0xFF], 0, TimingProfile::default()).unwrap(), None);
        assert_eq!(
            link.send_and_receive_packet(&[0xFF], 0, TimingProfile::default()).unwrap(),
            Some(vec![1, 2, 3])
        );
        assert_eq!(link.sent().len(), 2);
    }

    #[test]
    fn link_failure_surfaces_as_an_error() {
        let mut link = MockRadioLink::new().with_reply(ScriptedReply::LinkFailure("usb gone".into()));
        let err = link.send_and_receive_packet(&[0x00], 0, TimingProfile::default()).unwrap_err();
        assert_eq!(err.0, "usb gone");
    }

    #[test]
    #[should_panic(expected = "ran out of scripted replies")]
    fn exhausted_script_panics() {
        let mut link = MockRadioLink::new();
        let _ = link.send_and_receive_packet(&[0x00], 0, TimingProfile::default());
    }
}
