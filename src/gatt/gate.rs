//! Per-value notification subscription flags.
//!
//! The transport flips a flag when the peer writes the client configuration
//! descriptor; the sessions read it before notifying.

use super::table::AttributeKind;
use std::sync::atomic::{AtomicBool, Ordering};

/// Subscription state of the notifiable values.
#[derive(Debug, Default)]
pub struct NotificationGate {
    scan_mode: AtomicBool,
    connection_state: AtomicBool,
}

impl NotificationGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self, kind: AttributeKind) -> Option<&AtomicBool> {
        match kind {
            AttributeKind::ScanMode => Some(&self.scan_mode),
            AttributeKind::ConnectionState => Some(&self.connection_state),
            _ => None,
        }
    }

    /// Record a subscribe/unsubscribe from the peer.
    ///
    /// Returns `false` if `kind` does not support notifications.
    pub fn set(&self, kind: AttributeKind, enabled: bool) -> bool {
        match self.flag(kind) {
            Some(flag) => {
                flag.store(enabled, Ordering::Release);
                true
            }
            None => false,
        }
    }

    /// Whether the peer wants notifications for `kind`.
    pub fn is_open(&self, kind: AttributeKind) -> bool {
        self.flag(kind)
            .map(|flag| flag.load(Ordering::Acquire))
            .unwrap_or(false)
    }
}
