//! The insecure-TLS warning gate.
//!
//! Disabling certificate verification is sometimes intentional (self-signed
//! appliances on a management network). The first insecure HTTPS session built
//! through a gate logs one warning; after that the gate is suppressed and
//! further insecure sessions are silent.
//!
//! A gate is an explicit value injected into each session builder rather than
//! process state. A client factory shares one gate across every builder it
//! creates.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

/// Warn-once gate for sessions that skip certificate verification.
#[derive(Debug, Default)]
pub struct InsecureTlsWarnings {
    suppressed: AtomicBool,
}

impl InsecureTlsWarnings {
    /// Creates a gate that has not warned yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that an insecure session is being built.
    ///
    /// Logs a warning the first time and suppresses it afterwards. Returns
    /// `true` if this call emitted the warning.
    pub fn suppress(&self) -> bool {
        let first = !self.suppressed.swap(true, Ordering::AcqRel);
        if first {
            warn!(
                "TLS certificate verification is disabled; \
                 further insecure-connection warnings are suppressed"
            );
        }
        first
    }

    /// Returns `true` once any insecure session has been built through this gate.
    pub fn is_suppressed(&self) -> bool {
        self.suppressed.load(Ordering::Acquire)
    }
}
