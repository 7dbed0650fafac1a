//! Per-trigger debounce.
//!
//! A single physical key transition can reach the dispatcher more than once
//! (OS auto-repeat, duplicate hook delivery). The gate admits one firing
//! per trigger per window. Entries are never cleared; the map is bounded by
//! the number of distinct triggers ever fired.

use std::{collections::HashMap, time::{Duration, Instant}};

use parking_lot::Mutex;

/// Map from trigger spec to its last admitted firing time.
pub(crate) struct DebounceGate {
    window: Duration,
    last: Mutex<HashMap<String, Instant>>,
}

impl DebounceGate {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            last: Mutex::new(HashMap::new()),
        }
    }

    /// Admit the firing and record it, or reject it as a duplicate.
    pub(crate) fn admit(&self, trigger: &str, now: Instant) -> bool {
        let mut last = self.last.lock();
        if let Some(prev) = last.get(trigger)
            && now.duration_since(*prev) < self.window
        {
            return false;
        }
        last.insert(trigger.to_string(), now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(250);

    #[test]
    fn duplicate_within_window_is_rejected() {
        let gate = DebounceGate::new(WINDOW);
        let t0 = Instant::now();
        assert!(gate.admit("ctrl+d", t0));
        assert!(!gate.admit("ctrl+d", t0 + Duration::from_millis(100)));
        assert!(!gate.admit("ctrl+d", t0 + Duration::from_millis(249)));
    }

    #[test]
    fn firing_after_window_is_admitted() {
        let gate = DebounceGate::new(WINDOW);
        let t0 = Instant::now();
        assert!(gate.admit("ctrl+d", t0));
        assert!(gate.admit("ctrl+d", t0 + WINDOW));
        assert!(gate.admit("ctrl+d", t0 + WINDOW * 2));
    }

    #[test]
    fn triggers_debounce_independently() {
        let gate = DebounceGate::new(WINDOW);
        let t0 = Instant::now();
        assert!(gate.admit("ctrl+d", t0));
        assert!(gate.admit("esc", t0 + Duration::from_millis(10)));
        assert!(!gate.admit("ctrl+d", t0 + Duration::from_millis(10)));
    }
}
