//! The exchange engine: the core state machine (§4.1–§4.3).
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, warn};

use crate::config::ExchangeConfig;
use crate::counters::{MessageSequence, PacketMemo, PacketSequence};
use crate::driver::RadioLink;
use crate::error::{ExchangeError, ProtocolErrorKind};
use crate::message::{Message, MessageState};
use crate::packet::{Packet, PacketType};

/// Orchestrates one conversation at a time between this controller and a pod over
/// `R`, owning both sequence counters, the duplicate-reply memo, and the radio link
/// for the engine's whole lifetime (§2 item 5, §3).
pub struct ExchangeEngine<R: RadioLink> {
    radio: R,
    config: ExchangeConfig,
    packet_sequence: PacketSequence,
    message_sequence: MessageSequence,
    last_packet_received: PacketMemo,
    stop_requested: AtomicBool,
}

impl<R: RadioLink> ExchangeEngine<R> {
    /// Create a new engine, seeding both counters from `config` (§3).
    pub fn new(radio: R, config: ExchangeConfig) -> Self {
        Self {
            radio,
            packet_sequence: PacketSequence::new(config.packet_sequence_seed),
            message_sequence: MessageSequence::new(config.message_sequence_seed),
            last_packet_received: PacketMemo::new(),
            stop_requested: AtomicBool::new(false),
            config,
        }
    }

    /// The current packet sequence counter value, `0..=31` (§3). Exposed read-only for tests.
    pub fn packet_sequence(&self) -> u8 {
        self.packet_sequence.value()
    }

    /// The current message sequence counter value, `0..=15` (§3). Exposed read-only for tests.
    pub fn message_sequence(&self) -> u8 {
        self.message_sequence.value()
    }

    /// Request that the engine stop at its next loop boundary (§3, §5). Polled only
    /// inside [`ExchangeEngine::exchange_packet`] and [`ExchangeEngine::send_final`];
    /// it does not abort mid-transmission, and a subsequent resync may be needed
    /// since the peer may be left expecting a reply that never comes.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Clear a previously requested stop, so the engine can be reused.
    pub fn clear_stop(&self) {
        self.stop_requested.store(false, Ordering::SeqCst);
    }

    fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Give back the underlying radio link, consuming the engine.
    pub fn into_radio(self) -> R {
        self.radio
    }

    /// Send `message` and return the assembled response (§4.1).
    ///
    /// `stay_connected` controls whether the radio link is released on a
    /// successful exchange; any non-resync failure disconnects it regardless, and
    /// a [`ExchangeError::OutOfSync`] failure never disconnects it unless
    /// `stay_connected` is also `false` (§4.1 step 6, §7, §8 invariant 6).
    pub fn send_request_get_response(&mut self, message: Message, stay_connected: bool) -> Result<Message, ExchangeError> {
        let mut message = message;
        let result = self.run_conversation(&mut message);

        let is_out_of_sync = matches!(result, Err(ExchangeError::OutOfSync));
        if !stay_connected || (result.is_err() && !is_out_of_sync) {
            let _ = self.radio.disconnect(true);
        }
        result
    }

    fn run_conversation(&mut self, message: &mut Message) -> Result<Message, ExchangeError> {
        message.set_sequence(self.message_sequence.value());
        debug!(
            "sending message: seq={} address={:#010x}",
            message.sequence(),
            message.address()
        );

        let packets = message.into_packets();
        let packet_count = packets.len();
        let mut last_received: Option<Packet> = None;
        for (index, packet) in packets.into_iter().enumerate() {
            let expected_type = if index + 1 == packet_count {
                PacketType::Pod
            } else {
                PacketType::Ack
            };
            last_received = Some(self.exchange_packet(packet, expected_type)?);
        }
        // `into_packets` always yields a non-empty list (§4.4.1), so this always fired at least once.
        let pod_packet = last_received.expect("message fragments into at least one packet");

        let mut response = Message::from_packet(&pod_packet);
        while response.state() == MessageState::Incomplete {
            let ack = Packet::ack(message.address(), self.packet_sequence.value(), false);
            let con = self.exchange_packet(ack, PacketType::Con)?;
            response.add_con_packet(&con);
        }

        if response.state() == MessageState::Invalid {
            return Err(ProtocolErrorKind::InvalidMessage.into());
        }
        debug!("received message: seq={}", response.sequence());

        debug!("sending end of conversation");
        self.send_final(message.address())?;
        debug!("conversation ended");

        self.message_sequence.follow(response.sequence());
        Ok(response)
    }

    /// Send one packet expecting a reply of type `expected_type`, retrying on silence
    /// (§4.2). Only `PDM` packets consume the retry budget; an exchange built from an
    /// `ACK`/`CON` packet loops on silence without bound (§4.2 step 3, §9).
    fn exchange_packet(&mut self, mut packet: Packet, expected_type: PacketType) -> Result<Packet, ExchangeError> {
        packet.set_sequence(self.packet_sequence.value());
        let expected_reply_sequence = self.packet_sequence.expected_reply();
        let expected_address = packet.address();
        let is_pdm = matches!(packet.packet_type(), PacketType::Pdm);
        let profile = if is_pdm {
            self.config.timing.pdm_send
        } else {
            self.config.timing.ack_send
        };
        let framed = packet.to_framed_bytes();

        let mut attempts = 0u8;
        loop {
            if self.is_stop_requested() {
                return Err(ProtocolErrorKind::Cancelled.into());
            }
            if is_pdm {
                if attempts >= self.config.retry_budget {
                    return Err(ProtocolErrorKind::RetriesExceeded.into());
                }
                attempts += 1;
            }

            let reply = self
                .radio
                .send_and_receive_packet(&framed, 0, profile)
                .map_err(ProtocolErrorKind::from)?;

            let Some(raw) = reply else {
                debug!("received nothing");
                continue;
            };

            let decoded = match Packet::from_framed_bytes(&raw) {
                Ok(Some(decoded)) => decoded,
                Ok(None) | Err(_) => {
                    debug!("received illegal packet");
                    continue;
                }
            };

            if decoded.address() != expected_address {
                debug!("received packet for a different address");
                continue;
            }

            if self.last_packet_received.is_duplicate(&decoded) {
                debug!("received previous response");
                continue;
            }

            if decoded.packet_type() != expected_type || decoded.sequence() != expected_reply_sequence {
                warn!(
                    "resynchronization requested: expected ({:?}, {}), got ({:?}, {})",
                    expected_type,
                    expected_reply_sequence,
                    decoded.packet_type(),
                    decoded.sequence()
                );
                self.packet_sequence.resync_to(decoded.sequence());
                self.message_sequence.reset();
                return Err(ExchangeError::OutOfSync);
            }

            self.packet_sequence.advance_pair();
            self.last_packet_received.record(&decoded);
            debug!("send and receive complete");
            return Ok(decoded);
        }
    }

    /// Send the end-of-conversation `ACK` and wait for silence (§4.3).
    ///
    /// The loop only breaks after *two* consecutive silences: the active send's
    /// listen window, then a passive receive. A stray duplicate observed during the
    /// passive receive restarts that count, so it can in principle continue
    /// indefinitely until either a new (non-duplicate) packet triggers resync or a
    /// genuine silence ends it; this is an inherited property of the protocol this
    /// engine implements, not a bug in this implementation (§9, DESIGN.md).
    fn send_final(&mut self, address: u32) -> Result<(), ExchangeError> {
        let packet = Packet::ack(address, self.packet_sequence.value(), true);
        let framed = packet.to_framed_bytes();
        let profile = self.config.timing.final_send;

        loop {
            if self.is_stop_requested() {
                return Err(ProtocolErrorKind::Cancelled.into());
            }
            debug!("sending final packet");
            let active_reply = self
                .radio
                .send_and_receive_packet(&framed, 0, profile)
                .map_err(ProtocolErrorKind::from)?;

            let raw = match active_reply {
                Some(raw) => raw,
                None => {
                    match self
                        .radio
                        .get_packet(self.config.timing.final_passive_wait_secs)
                        .map_err(ProtocolErrorKind::from)?
                    {
                        Some(raw) => raw,
                        None => {
                            debug!("silence has fallen");
                            break;
                        }
                    }
                }
            };

            let decoded = match Packet::from_framed_bytes(&raw) {
                Ok(Some(decoded)) => decoded,
                Ok(None) | Err(_) => {
                    debug!("received illegal packet");
                    continue;
                }
            };

            if decoded.address() != address {
                debug!("received packet for a different address");
                continue;
            }

            if self.last_packet_received.is_duplicate(&decoded) {
                debug!("received previous response");
                continue;
            }

            warn!("resynchronization requested");
            self.packet_sequence.resync_to(decoded.sequence());
            self.message_sequence.reset();
            return Err(ExchangeError::OutOfSync);
        }

        self.packet_sequence.advance_single();
        debug!("send final complete");
        Ok(())
    }
}
