//! The radio driver bridge: a blocking contract for one send/receive round-trip,
//! and the engine's view of its failures (§6).
use crate::timing::TimingProfile;

/// A transport failure reported by the radio adapter driver (§6, §7).
///
/// The engine never constructs this itself; it only wraps whatever a [`RadioLink`]
/// implementation raises, as a [`crate::error::ExchangeError::Protocol`].
#[derive(thiserror::Error, Debug)]
#[error("radio link error: {0}")]
pub struct RadioLinkError(pub String);

/// The blocking primitive the exchange engine drives the physical (or mocked) radio
/// through (§2 item 4, §6). All methods may block for up to their timing parameters.
pub trait RadioLink {
    /// Transmit `data` (already CRC-framed) and listen for one reply, per `profile`.
    ///
    /// Returns `Ok(None)` on silence (no reply within the listen window), or the raw
    /// bytes the adapter returned: `[adapter_meta(2) | packet_payload(>=1) | crc8(1)]`
    /// (§4.5, §6).
    fn send_and_receive_packet(
        &mut self,
        data: &[u8],
        channel: u32,
        profile: TimingProfile,
    ) -> Result<Option<Vec<u8>>, RadioLinkError>;

    /// Passively listen for a reply for up to `seconds`, without transmitting
    /// anything (§4.3 step 2). Same return-value shape as
    /// [`RadioLink::send_and_receive_packet`].
    fn get_packet(&mut self, seconds: f32) -> Result<Option<Vec<u8>>, RadioLinkError>;

    /// Release the radio link. `ignore_errors` mirrors §4.1/§7: on a non-resync
    /// failure path the engine disconnects and discards any secondary error from
    /// this call.
    fn disconnect(&mut self, ignore_errors: bool) -> Result<(), RadioLinkError>;
}
