//! Transport and session lifecycle for the engine's TCP console.
//!
//! One [`Session`] owns one TCP connection, the immediate/batched mode
//! switch and the pending-command queue. Port reservations are shared
//! process-wide through [`PortRegistry`] so two live sessions can never
//! hold the same port.

pub mod config;
pub mod error;
pub mod ports;
pub mod session;
pub mod transport;

pub use config::{ConnectPolicy, PortRange};
pub use error::SessionError;
pub use ports::PortRegistry;
pub use session::{Mode, Session};
pub use transport::{TcpTransport, Transport};
