//! Error types (§7, §7.1).
use crate::driver::RadioLinkError;

/// Why a [`ExchangeError::Protocol`] occurred.
///
/// These are the detailed, loggable reasons; callers that only care about the
/// coarse distinction from §7 match on the outer [`ExchangeError`] instead. CRC and
/// decode failures (§4.2 step 5) and type/sequence mismatches (§4.2 step 5, §4.3
/// step 4) never reach this enum: the former are silently retried as illegal
/// packets, the latter raise [`ExchangeError::OutOfSync`] instead.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ProtocolErrorKind {
    /// The retry budget for a `PDM` exchange was exhausted against silence (§4.2 step 6).
    #[error("exceeded retry count")]
    RetriesExceeded,
    /// The response message failed to assemble into a valid message (§4.1 step 3).
    #[error("received message is not valid")]
    InvalidMessage,
    /// The underlying radio link failed.
    #[error("radio error during send and receive")]
    RadioLink(#[from] RadioLinkError),
    /// The caller requested a stop via the shutdown flag (§3, §5). Only ever
    /// observed at a loop boundary; the peer may be left in an indeterminate
    /// sequence state and a subsequent resync may be required.
    #[error("exchange cancelled")]
    Cancelled,
}

/// The engine's public error type (§7).
#[derive(thiserror::Error, Debug)]
pub enum ExchangeError {
    /// The peer's sequencing disagreed with ours. Counters have already been
    /// rewound per §4.2/§4.3; the radio link is left connected (§7).
    #[error("transmission out of sync")]
    OutOfSync,
    /// Any other protocol failure (§7, §7.1). The radio link has been disconnected.
    #[error("protocol error: {0}")]
    Protocol(#[source] ProtocolErrorKind),
}

impl From<ProtocolErrorKind> for ExchangeError {
    fn from(kind: ProtocolErrorKind) -> Self {
        Self::Protocol(kind)
    }
}
