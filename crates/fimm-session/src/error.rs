//! Session and transport errors.

use thiserror::Error;

/// Session failure.
///
/// Connect exhaustion and socket errors are terminal transport failures;
/// the mode/connection-state variants are programming-contract violations
/// surfaced immediately and never retried.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("already connected")]
    AlreadyConnected,

    #[error("port {0} is reserved by another session")]
    PortInUse(u16),

    #[error("connect failed after {attempts} attempts")]
    ConnectFailed { attempts: u32 },

    #[error("not connected")]
    NotConnected,

    /// Batched-only operation used in immediate mode (or vice versa).
    #[error("operation requires batched mode")]
    BadMode,

    /// Immediate-only operation while batched mode is on; the round trip
    /// cannot be deferred.
    #[error("operation cannot run while batched mode is active")]
    BatchModeActive,

    #[error("executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("no free port in range {start}..{end}")]
    NoFreePort { start: u16, end: u16 },

    #[error("failed to launch engine: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
