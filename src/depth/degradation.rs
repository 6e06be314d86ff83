// SPDX-License-Identifier: GPL-3.0-only

//! Edge-triggered degradation state
//!
//! The statistics engine produces an over-threshold flag for every frame.
//! External actions (driving an LED, logging) should only fire when that
//! flag changes, so the tracker keeps the one bit of cross-frame state and
//! reports transitions.

use tracing::debug;

/// Transition of the degradation flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradationEvent {
    /// Invalid fraction went above the threshold
    EnteredDegraded,
    /// Invalid fraction went back to or below the threshold
    ExitedDegraded,
}

/// Tracks the over-threshold flag across frames
///
/// Must be updated once per frame, in frame-arrival order.
#[derive(Debug, Clone, Default)]
pub struct DegradationTracker {
    degraded: bool,
    previous: bool,
}

impl DegradationTracker {
    /// Create a tracker in the "not degraded" state
    pub fn new() -> Self {
        Self::default()
    }

    /// Record this frame's flag and report a transition if it changed
    pub fn update(&mut self, over_threshold: bool) -> Option<DegradationEvent> {
        self.previous = self.degraded;
        self.degraded = over_threshold;

        match (self.previous, self.degraded) {
            (false, true) => {
                debug!("Entered degraded state");
                Some(DegradationEvent::EnteredDegraded)
            }
            (true, false) => {
                debug!("Exited degraded state");
                Some(DegradationEvent::ExitedDegraded)
            }
            _ => None,
        }
    }

    /// Current state
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// State before the most recent update
    pub fn previous(&self) -> bool {
        self.previous
    }

    /// Return to the initial "not degraded" state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_fire_on_change_only() {
        let mut tracker = DegradationTracker::new();
        let events: Vec<_> = [false, false, true, true, false]
            .into_iter()
            .map(|flag| tracker.update(flag))
            .collect();

        assert_eq!(
            events,
            vec![
                None,
                None,
                Some(DegradationEvent::EnteredDegraded),
                None,
                Some(DegradationEvent::ExitedDegraded),
            ]
        );
        assert!(!tracker.is_degraded());
        assert!(tracker.previous());
    }

    #[test]
    fn test_first_degraded_frame_enters() {
        let mut tracker = DegradationTracker::new();
        assert_eq!(tracker.update(true), Some(DegradationEvent::EnteredDegraded));
        assert!(tracker.is_degraded());

        tracker.reset();
        assert!(!tracker.is_degraded());
        assert_eq!(tracker.update(false), None);
    }
}
