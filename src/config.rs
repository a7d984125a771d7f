//! Engine configuration: counter seeds, timing overrides, and the retry budget (§2.1, §3).
use crate::timing::TimingProfiles;

/// Retry budget for a single exchange-packet call (§4.2 step 3). Only packets of type
/// `PDM` consume it; ACK/CON exchanges loop on silence without bound (§9).
pub const DEFAULT_RETRY_BUDGET: u8 = 3;

/// Construction-time configuration for an [`crate::exchange::ExchangeEngine`].
///
/// Mirrors the teacher's `ProtocolLayer::new(driver, default_header)` constructor
/// shape: everything the engine needs besides the driver itself, gathered into one
/// named value instead of scattered literals.
#[derive(Debug, Clone, Copy)]
pub struct ExchangeConfig {
    /// Initial value of the packet sequence counter (§3).
    pub packet_sequence_seed: u8,
    /// Initial value of the message sequence counter (§3).
    pub message_sequence_seed: u8,
    /// Driver timing profiles (§6). Defaults to the spec's table; tests may shrink these.
    pub timing: TimingProfiles,
    /// Number of retries against silence for a `PDM` exchange (§4.2 step 3).
    pub retry_budget: u8,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            packet_sequence_seed: 0,
            message_sequence_seed: 0,
            timing: TimingProfiles::default(),
            retry_budget: DEFAULT_RETRY_BUDGET,
        }
    }
}

impl ExchangeConfig {
    /// Build a config seeded with the given counter values, keeping default timing
    /// and retry budget (the common case: resuming a conversation at known counters).
    pub fn with_seeds(packet_sequence_seed: u8, message_sequence_seed: u8) -> Self {
        Self {
            packet_sequence_seed,
            message_sequence_seed,
            ..Self::default()
        }
    }
}
