//! Connection policy knobs.

use std::time::Duration;

/// Bounded retry policy for the connect handshake.
///
/// Retries are transient and bounded; once exhausted the caller sees a
/// terminal [`SessionError::ConnectFailed`](crate::SessionError) and must
/// not retry automatically. Timeouts apply only here: in-flight command
/// responses have no read timeout, so a hung engine blocks the caller.
#[derive(Debug, Clone, Copy)]
pub struct ConnectPolicy {
    /// Total connect attempts before giving up.
    pub attempts: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
    /// Per-attempt handshake timeout.
    pub handshake_timeout: Duration,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            retry_delay: Duration::from_secs(1),
            handshake_timeout: Duration::from_secs(5),
        }
    }
}

/// Half-open port range scanned when spawning an engine without an
/// explicit port.
#[derive(Debug, Clone, Copy)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl Default for PortRange {
    fn default() -> Self {
        Self { start: 5000, end: 6000 }
    }
}
