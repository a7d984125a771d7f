//! Driver timing profiles (§6), generalised from the teacher's per-type timer table
//! (`TimerType` in the outer `elagil-usbpd` snapshot's `src/timers.rs`) down to the
//! small closed set this protocol needs.

/// One `send_and_receive_packet` timing profile: `(preamble_ms, listen_ms, repeat, listen_channel)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingProfile {
    /// Preamble length, in milliseconds.
    pub preamble_ms: u32,
    /// Listen window, in milliseconds.
    pub listen_ms: u32,
    /// Number of on-air repeats of the transmitted packet.
    pub repeat: u32,
    /// Channel to listen on for the reply.
    pub listen_channel: u32,
}

impl TimingProfile {
    const fn new(preamble_ms: u32, listen_ms: u32, repeat: u32, listen_channel: u32) -> Self {
        Self {
            preamble_ms,
            listen_ms,
            repeat,
            listen_channel,
        }
    }
}

impl Default for TimingProfile {
    /// Matches the `PDM` send profile; only meaningful as a placeholder for tests
    /// that don't care which profile a call used.
    fn default() -> Self {
        TimingProfiles::default().pdm_send
    }
}

/// All timing profiles the engine uses (§6 table). Overridable via [`crate::config::ExchangeConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingProfiles {
    /// Used when sending a `PDM` packet that expects a reply (§4.2 step 4).
    pub pdm_send: TimingProfile,
    /// Used when sending an `ACK`/`CON` exchange packet that expects a reply (§4.2 step 4).
    pub ack_send: TimingProfile,
    /// Used for the active half of the end-of-conversation send (§4.3 step 2).
    pub final_send: TimingProfile,
    /// Passive-receive duration for the end-of-conversation silence check, in seconds (§4.3 step 2).
    pub final_passive_wait_secs: f32,
}

impl Default for TimingProfiles {
    fn default() -> Self {
        Self {
            pdm_send: TimingProfile::new(300, 300, 10, 80),
            ack_send: TimingProfile::new(20, 300, 10, 20),
            final_send: TimingProfile::new(20, 1000, 2, 40),
            final_passive_wait_secs: 2.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profiles_match_spec_table() {
        let profiles = TimingProfiles::default();
        assert_eq!(profiles.pdm_send, TimingProfile::new(300, 300, 10, 80));
        assert_eq!(profiles.ack_send, TimingProfile::new(20, 300, 10, 20));
        assert_eq!(profiles.final_send, TimingProfile::new(20, 1000, 2, 40));
        assert_eq!(profiles.final_passive_wait_secs, 2.5);
    }
}
