//! Process-wide engine port reservations.

use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

use crate::config::PortRange;

/// Reservation set shared by every session in the process.
///
/// Reserve and release run under one lock, atomic with the owning
/// session's connect/disconnect, so two live sessions can never believe
/// they hold the same port.
#[derive(Debug, Default)]
pub struct PortRegistry {
    ports: Mutex<HashSet<u16>>,
}

impl PortRegistry {
    /// The registry used by sessions that do not bring their own.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<PortRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::default)
    }

    /// Try to reserve `port`; `false` if a live session already holds it.
    pub fn reserve(&self, port: u16) -> bool {
        self.ports.lock().unwrap().insert(port)
    }

    pub fn release(&self, port: u16) {
        self.ports.lock().unwrap().remove(&port);
    }

    #[must_use]
    pub fn is_reserved(&self, port: u16) -> bool {
        self.ports.lock().unwrap().contains(&port)
    }

    /// First unreserved port in `range`, if any.
    #[must_use]
    pub fn pick_free(&self, range: PortRange) -> Option<u16> {
        let held = self.ports.lock().unwrap();
        (range.start..range.end).find(|port| !held.contains(port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_is_exclusive() {
        let registry = PortRegistry::default();
        assert!(registry.reserve(5101));
        assert!(!registry.reserve(5101));
        registry.release(5101);
        assert!(registry.reserve(5101));
    }

    #[test]
    fn picks_first_free_port_in_range() {
        let registry = PortRegistry::default();
        let range = PortRange { start: 5000, end: 5003 };
        assert!(registry.reserve(5000));
        assert!(registry.reserve(5001));
        assert_eq!(registry.pick_free(range), Some(5002));

        assert!(registry.reserve(5002));
        assert_eq!(registry.pick_free(range), None);
    }
}
