//! RAII guard for active sessions
//!
//! Keeps the server's active-session count accurate however a session task
//! ends: completion, error, panic or abort.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts one active session for as long as it lives
pub struct SessionGuard {
    active: Arc<AtomicUsize>,
}

impl SessionGuard {
    /// Register a new active session
    pub fn new(active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        SessionGuard { active }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}
