//! Deterministic, session-scoped mapping from participant name to a
//! display color.

use std::collections::HashMap;
use std::sync::Mutex;

/// Fixed display palette. Assignment wraps around when exhausted.
const PALETTE: [&str; 8] = [
    "#61afef", "#98c379", "#e06c75", "#c678dd", "#d19a66", "#56b6c2", "#e5c07b", "#abb2bf",
];

/// Round-robin name → color assignment, stable for the process lifetime.
/// Slots are never reassigned or freed.
#[derive(Default)]
pub struct PresenceColorAssigner {
    inner: Mutex<AssignerState>,
}

#[derive(Default)]
struct AssignerState {
    assigned: HashMap<String, usize>,
    next_slot: usize,
}

impl PresenceColorAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Color token for a participant name. The first sighting of a name
    /// takes the next palette slot; every later call returns the same token.
    pub fn color_for(&self, name: &str) -> &'static str {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(&slot) = state.assigned.get(name) {
            return PALETTE[slot];
        }
        let slot = state.next_slot % PALETTE.len();
        state.next_slot += 1;
        state.assigned.insert(name.to_string(), slot);
        PALETTE[slot]
    }
}
